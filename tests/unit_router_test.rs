use bytes::Bytes;
use slotcast::config::DispatchConfig;
use slotcast::core::cluster::{ShardInfo, SlotTable, key_slot, route};
use slotcast::core::commands::CommandTable;
use slotcast::core::errors::SlotcastError;

fn three_shard_table() -> SlotTable {
    SlotTable::new(vec![
        ShardInfo {
            primary: "10.0.0.1:7000".into(),
            replicas: vec!["10.0.0.1:7100".into()],
            slots: vec![(0, 5460)],
        },
        ShardInfo {
            primary: "10.0.0.2:7000".into(),
            replicas: vec!["10.0.0.2:7100".into()],
            slots: vec![(5461, 10922)],
        },
        ShardInfo {
            primary: "10.0.0.3:7000".into(),
            replicas: vec![],
            slots: vec![(10923, 16383)],
        },
    ])
    .unwrap()
}

#[test]
fn test_all_shards_targets_every_primary_in_order() {
    let spec = CommandTable::builtin().get("DBSIZE").unwrap();
    let table = three_shard_table();
    let targets = route(&spec, &[], &table, &DispatchConfig::default()).unwrap();
    assert_eq!(
        targets,
        vec!["10.0.0.1:7000", "10.0.0.2:7000", "10.0.0.3:7000"]
    );
}

#[test]
fn test_all_nodes_includes_replicas() {
    let spec = CommandTable::builtin().get("CONFIG RESETSTAT").unwrap();
    let table = three_shard_table();
    let targets = route(&spec, &[], &table, &DispatchConfig::default()).unwrap();
    assert_eq!(
        targets,
        vec![
            "10.0.0.1:7000",
            "10.0.0.1:7100",
            "10.0.0.2:7000",
            "10.0.0.2:7100",
            "10.0.0.3:7000",
        ]
    );
}

#[test]
fn test_key_routes_to_owning_shard() {
    let spec = CommandTable::builtin().get("GET").unwrap();
    let table = three_shard_table();
    // "foo" hashes to slot 12182, owned by the third shard.
    let keys = [Bytes::from_static(b"foo")];
    let targets = route(&spec, &keys, &table, &DispatchConfig::default()).unwrap();
    assert_eq!(targets, vec!["10.0.0.3:7000"]);
}

#[test]
fn test_cross_slot_keys_rejected() {
    let spec = CommandTable::builtin().get("MSET").unwrap();
    let table = three_shard_table();
    let keys = [Bytes::from_static(b"a{x}"), Bytes::from_static(b"b{y}")];
    // Distinct hashtags land in distinct slots for this pair.
    assert_ne!(key_slot(b"a{x}"), key_slot(b"b{y}"));
    let err = route(&spec, &keys, &table, &DispatchConfig::default()).unwrap_err();
    assert_eq!(err, SlotcastError::CrossSlot);
}

#[test]
fn test_shared_hashtag_keys_route_together() {
    let spec = CommandTable::builtin().get("MSET").unwrap();
    let table = three_shard_table();
    let keys = [
        Bytes::from_static(b"a{shared}"),
        Bytes::from_static(b"b{shared}"),
    ];
    let targets = route(&spec, &keys, &table, &DispatchConfig::default()).unwrap();
    assert_eq!(targets.len(), 1);
}

#[test]
fn test_read_from_replicas_prefers_replica_for_reads() {
    let table = three_shard_table();
    let config = DispatchConfig {
        read_from_replicas: true,
        ..Default::default()
    };

    // "bar" hashes to slot 5061, owned by the first shard.
    let get = CommandTable::builtin().get("GET").unwrap();
    let keys = [Bytes::from_static(b"bar")];
    let targets = route(&get, &keys, &table, &config).unwrap();
    assert_eq!(targets, vec!["10.0.0.1:7100"]);

    // A write always goes to the primary.
    let set = CommandTable::builtin().get("SET").unwrap();
    let targets = route(&set, &keys, &table, &config).unwrap();
    assert_eq!(targets, vec!["10.0.0.1:7000"]);
}

#[test]
fn test_keyless_command_falls_back_to_default_node() {
    let spec = CommandTable::builtin().get("GET").unwrap();
    let table = three_shard_table();
    let config = DispatchConfig {
        default_node: Some("127.0.0.1:6379".into()),
        ..Default::default()
    };
    let targets = route(&spec, &[], &table, &config).unwrap();
    assert_eq!(targets, vec!["127.0.0.1:6379"]);
}

#[test]
fn test_keyless_command_without_default_has_no_route() {
    let spec = CommandTable::builtin().get("GET").unwrap();
    let table = three_shard_table();
    let err = route(&spec, &[], &table, &DispatchConfig::default()).unwrap_err();
    assert!(matches!(err, SlotcastError::NoRoute(_)));
}

#[test]
fn test_unassigned_slot_has_no_route() {
    let spec = CommandTable::builtin().get("GET").unwrap();
    let table = SlotTable::new(vec![ShardInfo {
        primary: "10.0.0.1:7000".into(),
        replicas: vec![],
        slots: vec![(0, 100)],
    }])
    .unwrap();
    let keys = [Bytes::from_static(b"foo")]; // slot 12182, unassigned
    let err = route(&spec, &keys, &table, &DispatchConfig::default()).unwrap_err();
    assert!(matches!(err, SlotcastError::NoRoute(_)));
}

#[test]
fn test_random_routing_picks_one_primary() {
    let spec = CommandTable::builtin().get("PING").unwrap();
    let table = three_shard_table();
    let targets = route(&spec, &[], &table, &DispatchConfig::default()).unwrap();
    assert_eq!(targets.len(), 1);
    assert!(table.all_primaries().contains(&targets[0].as_str()));
}

#[test]
fn test_overlapping_slot_ranges_rejected() {
    let err = SlotTable::new(vec![
        ShardInfo {
            primary: "a:1".into(),
            replicas: vec![],
            slots: vec![(0, 100)],
        },
        ShardInfo {
            primary: "b:1".into(),
            replicas: vec![],
            slots: vec![(100, 200)],
        },
    ])
    .unwrap_err();
    assert!(matches!(err, SlotcastError::InvalidSpec(_)));
}
