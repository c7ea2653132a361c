// src/core/protocol/resp_frame.rs

//! Implements the RESP frame structure (RESP2 plus the RESP3 reply kinds) and
//! a `tokio_util::codec` for transports that want standard RESP framing.
//!
//! The dispatch core itself never frames bytes; it consumes `RespFrame` values
//! produced by the transport collaborator and hands it `EncodedRequest`s. The
//! codec lives here so a transport implementation does not have to reinvent it.

use crate::core::SlotcastError;
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// The CRLF (Carriage Return, Line Feed) sequence used to terminate lines in RESP.
const CRLF: &[u8] = b"\r\n";
const CRLF_LEN: usize = 2;

// Protocol-level limits to prevent unbounded allocation on malformed input.
const MAX_FRAME_ELEMENTS: usize = 1_024 * 1_024;
const MAX_BULK_STRING_SIZE: usize = 512 * 1024 * 1024;
const MAX_RECURSION_DEPTH: usize = 256;

/// A single frame in the RESP protocol.
///
/// Covers the RESP2 kinds plus the RESP3 reply kinds (`Double`, `Boolean`,
/// `BigNumber`, `Map`, `Set`, `Push`). This is the raw-reply union the decoder
/// consumes; it carries no per-command typing.
#[derive(Debug, Clone, PartialEq)]
pub enum RespFrame {
    SimpleString(String),
    Error(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    BulkString(Bytes),
    BigNumber(String),
    Null,
    NullArray,
    Array(Vec<RespFrame>),
    Map(Vec<(RespFrame, RespFrame)>),
    Set(Vec<RespFrame>),
    Push(Vec<RespFrame>),
}

impl RespFrame {
    /// A short name for the frame's kind, used in `ProtocolMismatch` errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            RespFrame::SimpleString(_) => "simple-string",
            RespFrame::Error(_) => "error",
            RespFrame::Integer(_) => "integer",
            RespFrame::Double(_) => "double",
            RespFrame::Boolean(_) => "boolean",
            RespFrame::BulkString(_) => "bulk-string",
            RespFrame::BigNumber(_) => "big-number",
            RespFrame::Null | RespFrame::NullArray => "nil",
            RespFrame::Array(_) => "array",
            RespFrame::Map(_) => "map",
            RespFrame::Set(_) => "set",
            RespFrame::Push(_) => "push",
        }
    }

    /// A convenience method to encode a frame into a `Vec<u8>`.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, SlotcastError> {
        let mut buf = BytesMut::new();
        RespFrameCodec.encode(self.clone(), &mut buf)?;
        Ok(buf.to_vec())
    }
}

/// A `tokio_util::codec` implementation for encoding and decoding `RespFrame`s.
#[derive(Debug)]
pub struct RespFrameCodec;

impl Encoder<RespFrame> for RespFrameCodec {
    type Error = SlotcastError;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            RespFrame::SimpleString(s) => {
                dst.extend_from_slice(b"+");
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Error(s) => {
                dst.extend_from_slice(b"-");
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Integer(i) => {
                let mut fmt = itoa::Buffer::new();
                dst.extend_from_slice(b":");
                dst.extend_from_slice(fmt.format(i).as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Double(d) => {
                let mut fmt = ryu::Buffer::new();
                dst.extend_from_slice(b",");
                dst.extend_from_slice(fmt.format(d).as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Boolean(b) => {
                dst.extend_from_slice(if b { b"#t\r\n" } else { b"#f\r\n" });
            }
            RespFrame::BulkString(b) => {
                let mut fmt = itoa::Buffer::new();
                dst.extend_from_slice(b"$");
                dst.extend_from_slice(fmt.format(b.len()).as_bytes());
                dst.extend_from_slice(CRLF);
                dst.extend_from_slice(&b);
                dst.extend_from_slice(CRLF);
            }
            RespFrame::BigNumber(s) => {
                dst.extend_from_slice(b"(");
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Null => {
                dst.extend_from_slice(b"$-1\r\n");
            }
            RespFrame::NullArray => {
                dst.extend_from_slice(b"*-1\r\n");
            }
            RespFrame::Array(arr) => {
                self.encode_aggregate(b'*', arr, dst)?;
            }
            RespFrame::Set(items) => {
                self.encode_aggregate(b'~', items, dst)?;
            }
            RespFrame::Push(items) => {
                self.encode_aggregate(b'>', items, dst)?;
            }
            RespFrame::Map(pairs) => {
                let mut fmt = itoa::Buffer::new();
                dst.extend_from_slice(b"%");
                dst.extend_from_slice(fmt.format(pairs.len()).as_bytes());
                dst.extend_from_slice(CRLF);
                for (key, value) in pairs {
                    self.encode(key, dst)?;
                    self.encode(value, dst)?;
                }
            }
        }
        Ok(())
    }
}

impl RespFrameCodec {
    fn encode_aggregate(
        &mut self,
        marker: u8,
        items: Vec<RespFrame>,
        dst: &mut BytesMut,
    ) -> Result<(), SlotcastError> {
        let mut fmt = itoa::Buffer::new();
        dst.extend_from_slice(&[marker]);
        dst.extend_from_slice(fmt.format(items.len()).as_bytes());
        dst.extend_from_slice(CRLF);
        for frame in items {
            self.encode(frame, dst)?;
        }
        Ok(())
    }
}

impl Decoder for RespFrameCodec {
    type Item = RespFrame;
    type Error = SlotcastError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut bytes = &src[..];
        match self.decode_recursive(&mut bytes, 0) {
            Ok(frame) => {
                let len = src.len() - bytes.len();
                src.advance(len);
                Ok(Some(frame))
            }
            // `IncompleteData` signals that more bytes are needed; anything else
            // is a real protocol violation and propagates.
            Err(SlotcastError::IncompleteData) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl RespFrameCodec {
    /// A recursive helper to decode a single frame; `bytes` is advanced as it
    /// is parsed and `depth` bounds the nesting level.
    fn decode_recursive(&self, bytes: &mut &[u8], depth: usize) -> Result<RespFrame, SlotcastError> {
        if depth > MAX_RECURSION_DEPTH {
            return Err(SlotcastError::InvalidFrame(
                "recursion depth limit exceeded".to_string(),
            ));
        }

        if bytes.is_empty() {
            return Err(SlotcastError::IncompleteData);
        }

        let marker = bytes[0];
        *bytes = &bytes[1..];
        match marker {
            b'+' => Ok(RespFrame::SimpleString(self.parse_text_line(bytes)?)),
            b'-' => Ok(RespFrame::Error(self.parse_text_line(bytes)?)),
            b'(' => Ok(RespFrame::BigNumber(self.parse_text_line(bytes)?)),
            b':' => self.parse_integer(bytes),
            b',' => self.parse_double(bytes),
            b'#' => self.parse_boolean(bytes),
            b'$' => self.parse_bulk_string(bytes),
            b'_' => self.parse_null(bytes),
            b'*' => self.parse_aggregate(bytes, depth, false),
            b'~' => self.parse_aggregate(bytes, depth, true),
            b'>' => {
                let frame = self.parse_aggregate(bytes, depth, false)?;
                match frame {
                    RespFrame::Array(items) => Ok(RespFrame::Push(items)),
                    other => Ok(other),
                }
            }
            b'%' => self.parse_map(bytes, depth),
            _ => Err(SlotcastError::SyntaxError),
        }
    }

    /// Finds the next CRLF and returns the line, advancing past it.
    fn parse_line<'a>(&self, bytes: &mut &'a [u8]) -> Result<&'a [u8], SlotcastError> {
        if let Some(pos) = find_crlf(bytes) {
            let line = &bytes[..pos];
            *bytes = &bytes[pos + CRLF_LEN..];
            Ok(line)
        } else {
            Err(SlotcastError::IncompleteData)
        }
    }

    fn parse_text_line(&self, bytes: &mut &[u8]) -> Result<String, SlotcastError> {
        let line = self.parse_line(bytes)?;
        Ok(String::from_utf8_lossy(line).to_string())
    }

    fn parse_integer(&self, bytes: &mut &[u8]) -> Result<RespFrame, SlotcastError> {
        let line = self.parse_line(bytes)?;
        let s = String::from_utf8_lossy(line);
        let i = s.parse::<i64>().map_err(|_| SlotcastError::SyntaxError)?;
        Ok(RespFrame::Integer(i))
    }

    fn parse_double(&self, bytes: &mut &[u8]) -> Result<RespFrame, SlotcastError> {
        let line = self.parse_line(bytes)?;
        let s = String::from_utf8_lossy(line);
        let d = match s.as_ref() {
            "inf" => f64::INFINITY,
            "-inf" => f64::NEG_INFINITY,
            other => other.parse::<f64>().map_err(|_| SlotcastError::SyntaxError)?,
        };
        Ok(RespFrame::Double(d))
    }

    fn parse_boolean(&self, bytes: &mut &[u8]) -> Result<RespFrame, SlotcastError> {
        let line = self.parse_line(bytes)?;
        match line {
            b"t" => Ok(RespFrame::Boolean(true)),
            b"f" => Ok(RespFrame::Boolean(false)),
            _ => Err(SlotcastError::SyntaxError),
        }
    }

    fn parse_null(&self, bytes: &mut &[u8]) -> Result<RespFrame, SlotcastError> {
        let line = self.parse_line(bytes)?;
        if line.is_empty() {
            Ok(RespFrame::Null)
        } else {
            Err(SlotcastError::SyntaxError)
        }
    }

    fn parse_bulk_string(&self, bytes: &mut &[u8]) -> Result<RespFrame, SlotcastError> {
        let line = self.parse_line(bytes)?;
        let s = String::from_utf8_lossy(line);
        let str_len = s.parse::<isize>().map_err(|_| SlotcastError::SyntaxError)?;

        if str_len == -1 {
            return Ok(RespFrame::Null);
        }

        let str_len = str_len as usize;
        if str_len > MAX_BULK_STRING_SIZE {
            return Err(SlotcastError::SyntaxError);
        }

        if bytes.len() < str_len + CRLF_LEN {
            return Err(SlotcastError::IncompleteData);
        }

        if &bytes[str_len..str_len + CRLF_LEN] != CRLF {
            return Err(SlotcastError::SyntaxError);
        }

        let data = Bytes::copy_from_slice(&bytes[..str_len]);
        *bytes = &bytes[str_len + CRLF_LEN..];
        Ok(RespFrame::BulkString(data))
    }

    fn parse_aggregate(
        &self,
        bytes: &mut &[u8],
        depth: usize,
        as_set: bool,
    ) -> Result<RespFrame, SlotcastError> {
        let line = self.parse_line(bytes)?;
        let s = String::from_utf8_lossy(line);
        let len = s.parse::<isize>().map_err(|_| SlotcastError::SyntaxError)?;

        if len == -1 {
            return Ok(RespFrame::NullArray);
        }

        let len = len as usize;
        if len > MAX_FRAME_ELEMENTS {
            return Err(SlotcastError::SyntaxError);
        }

        let mut frames = Vec::with_capacity(len);
        for _ in 0..len {
            frames.push(self.decode_recursive(bytes, depth + 1)?);
        }
        if as_set {
            Ok(RespFrame::Set(frames))
        } else {
            Ok(RespFrame::Array(frames))
        }
    }

    fn parse_map(&self, bytes: &mut &[u8], depth: usize) -> Result<RespFrame, SlotcastError> {
        let line = self.parse_line(bytes)?;
        let s = String::from_utf8_lossy(line);
        let len = s.parse::<usize>().map_err(|_| SlotcastError::SyntaxError)?;

        if len > MAX_FRAME_ELEMENTS {
            return Err(SlotcastError::SyntaxError);
        }

        let mut pairs = Vec::with_capacity(len);
        for _ in 0..len {
            let key = self.decode_recursive(bytes, depth + 1)?;
            let value = self.decode_recursive(bytes, depth + 1)?;
            pairs.push((key, value));
        }
        Ok(RespFrame::Map(pairs))
    }
}

/// Helper function to find the next CRLF sequence in a buffer.
fn find_crlf(src: &[u8]) -> Option<usize> {
    src.windows(CRLF_LEN).position(|window| window == CRLF)
}
