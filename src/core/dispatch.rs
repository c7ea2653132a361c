// src/core/dispatch.rs

//! The command dispatcher: encode, route, send, decode, merge.
//!
//! This is the thin orchestration layer everything funnels through. All of
//! its collaborators are pure, synchronous computations over already-available
//! data; only the transport seam suspends, and only on I/O.

use crate::config::DispatchConfig;
use crate::core::SlotcastError;
use crate::core::cluster::{TopologyHandle, route};
use crate::core::commands::{
    CommandArgs, CommandSpec, CommandTable, EncodedRequest, encode_with_version,
    key_extractor::extract_keys,
};
use crate::core::merge::{NodeReply, merge};
use crate::core::protocol::RespFrame;
use crate::core::reply::{DecodedReply, decode};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// A request/response channel to one node. Implemented by the transport
/// collaborator; the core only requires that replies are correlated to
/// requests in submission order per connection.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn request(&self, request: &EncodedRequest) -> Result<RespFrame, SlotcastError>;
}

/// Hands out connections by node address. Whether that is a dedicated
/// connection per node or a multiplexed pool is the implementation's choice.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn connection(&self, addr: &str) -> Result<Arc<dyn Connection>, SlotcastError>;
}

/// Orchestrates command execution against a sharded deployment.
pub struct Dispatcher {
    table: Arc<CommandTable>,
    topology: Arc<TopologyHandle>,
    connections: Arc<dyn ConnectionProvider>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        table: Arc<CommandTable>,
        topology: Arc<TopologyHandle>,
        connections: Arc<dyn ConnectionProvider>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            table,
            topology,
            connections,
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn topology(&self) -> &Arc<TopologyHandle> {
        &self.topology
    }

    /// Executes a named command with structured arguments and returns its
    /// typed, merged result.
    pub async fn execute(
        &self,
        command: &str,
        args: &CommandArgs,
    ) -> Result<DecodedReply, SlotcastError> {
        let spec = self
            .table
            .get(command)
            .ok_or_else(|| SlotcastError::UnknownCommand(command.to_string()))?;

        // Encode once; every target receives the same request.
        let request = encode_with_version(&spec, args, self.config.server_version)?;

        let keys = match &spec.key_spec {
            Some(key_spec) => extract_keys(key_spec, &request)?,
            None => Vec::new(),
        };

        // One snapshot per dispatch: a concurrent topology refresh never
        // affects an in-flight routing decision.
        let snapshot = self.topology.snapshot();
        let targets = route(&spec, &keys, &snapshot, &self.config)?;
        debug!(
            command = %spec.name,
            keys = keys.len(),
            targets = targets.len(),
            "dispatching"
        );

        if targets.len() == 1 {
            let addr = &targets[0];
            let frame = self.send(addr, &request).await?;
            return decode(&spec.reply, &frame);
        }

        self.fan_out(&spec, &request, targets).await
    }

    /// Sends to every target concurrently and merges the decoded replies.
    /// The fan-out is complete only once every node has replied, failed, or
    /// exceeded the per-node timeout.
    async fn fan_out(
        &self,
        spec: &CommandSpec,
        request: &EncodedRequest,
        targets: Vec<String>,
    ) -> Result<DecodedReply, SlotcastError> {
        let sends = targets.iter().map(|addr| {
            async move {
                let outcome = tokio::time::timeout(
                    self.config.fanout_timeout,
                    self.send(addr, request),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(SlotcastError::Transport("request timed out".to_string()))
                });
                let decoded = outcome.and_then(|frame| decode(&spec.reply, &frame));
                (addr.clone(), decoded)
            }
        });

        let replies: Vec<NodeReply> = futures::future::join_all(sends).await;
        let failed = replies.iter().filter(|(_, r)| r.is_err()).count();
        if failed > 0 {
            warn!(
                command = %spec.name,
                failed,
                total = replies.len(),
                "fan-out had failing nodes"
            );
        }
        merge(spec.merge, replies, self.config.strict_aggregate)
    }

    async fn send(
        &self,
        addr: &str,
        request: &EncodedRequest,
    ) -> Result<RespFrame, SlotcastError> {
        let connection = self.connections.connection(addr).await?;
        connection.request(request).await
    }

    /// Computes the key tokens a command would route by, without sending it.
    /// Exposed for introspection and topology debugging.
    pub fn keys_for(
        &self,
        command: &str,
        args: &CommandArgs,
    ) -> Result<Vec<Bytes>, SlotcastError> {
        let spec = self
            .table
            .get(command)
            .ok_or_else(|| SlotcastError::UnknownCommand(command.to_string()))?;
        let request = encode_with_version(&spec, args, self.config.server_version)?;
        match &spec.key_spec {
            Some(key_spec) => extract_keys(key_spec, &request),
            None => Ok(Vec::new()),
        }
    }
}
