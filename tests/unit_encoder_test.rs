use bytes::Bytes;
use slotcast::core::commands::{
    ArgValue, CommandArgs, CommandTable, Version, encode, encode_with_version,
};
use slotcast::core::errors::SlotcastError;

fn tokens(encoded: &slotcast::core::commands::EncodedRequest) -> Vec<&[u8]> {
    encoded.tokens().iter().map(|t| t.as_ref()).collect()
}

#[test]
fn test_encode_simple_get() {
    let spec = CommandTable::builtin().get("GET").unwrap();
    let args = CommandArgs::new().with("key", "mykey");
    let encoded = encode(&spec, &args).unwrap();
    assert_eq!(tokens(&encoded), vec![b"GET".as_ref(), b"mykey"]);
}

#[test]
fn test_encode_set_with_condition_and_expiration() {
    let spec = CommandTable::builtin().get("SET").unwrap();
    let args = CommandArgs::new()
        .with("key", "k")
        .with("value", "v")
        .with("condition", ArgValue::token("NX"))
        .with("expiration", ArgValue::choice("seconds", 10i64));
    let encoded = encode(&spec, &args).unwrap();
    assert_eq!(
        tokens(&encoded),
        vec![b"SET".as_ref(), b"k", b"v", b"NX", b"EX", b"10"]
    );
}

#[test]
fn test_encode_oneof_addressed_by_child_name() {
    // The expiration oneof can also be addressed through a child's own name.
    let spec = CommandTable::builtin().get("SET").unwrap();
    let args = CommandArgs::new()
        .with("key", "k")
        .with("value", "v")
        .with("milliseconds", 1500i64);
    let encoded = encode(&spec, &args).unwrap();
    assert_eq!(
        tokens(&encoded),
        vec![b"SET".as_ref(), b"k", b"v", b"PX", b"1500"]
    );
}

#[test]
fn test_encode_mutually_exclusive_children_rejected() {
    let spec = CommandTable::builtin().get("SET").unwrap();
    let args = CommandArgs::new()
        .with("key", "k")
        .with("value", "v")
        .with("nx", true)
        .with("xx", true);
    let err = encode(&spec, &args).unwrap_err();
    assert!(matches!(err, SlotcastError::MutuallyExclusive { .. }));
}

#[test]
fn test_encode_unknown_oneof_token_rejected() {
    let spec = CommandTable::builtin().get("SET").unwrap();
    let args = CommandArgs::new()
        .with("key", "k")
        .with("value", "v")
        .with("condition", ArgValue::token("MAYBE"));
    let err = encode(&spec, &args).unwrap_err();
    assert!(matches!(err, SlotcastError::UnknownToken { .. }));
}

#[test]
fn test_encode_missing_required_argument() {
    let spec = CommandTable::builtin().get("SET").unwrap();
    let args = CommandArgs::new().with("key", "k");
    let err = encode(&spec, &args).unwrap_err();
    assert!(matches!(
        err,
        SlotcastError::MissingArgument { ref arg, .. } if arg == "value"
    ));
}

#[test]
fn test_encode_mset_repeated_blocks() {
    let spec = CommandTable::builtin().get("MSET").unwrap();
    let args = CommandArgs::new().with(
        "data",
        ArgValue::many(vec![
            ArgValue::group(vec!["k1".into(), "v1".into()]),
            ArgValue::group(vec!["k2".into(), "v2".into()]),
        ]),
    );
    let encoded = encode(&spec, &args).unwrap();
    assert_eq!(
        tokens(&encoded),
        vec![b"MSET".as_ref(), b"k1", b"v1", b"k2", b"v2"]
    );
}

#[test]
fn test_encode_partial_block_rejected() {
    // A block's children are mutually inclusive; half a pair is an error.
    let spec = CommandTable::builtin().get("MSET").unwrap();
    let args = CommandArgs::new().with(
        "data",
        ArgValue::many(vec![ArgValue::group(vec!["k1".into()])]),
    );
    let err = encode(&spec, &args).unwrap_err();
    assert!(matches!(err, SlotcastError::MissingArgument { .. }));
}

#[test]
fn test_encode_zadd_flags_and_scores() {
    let spec = CommandTable::builtin().get("ZADD").unwrap();
    let args = CommandArgs::new()
        .with("key", "zs")
        .with("change", true)
        .with(
            "data",
            ArgValue::many(vec![
                ArgValue::group(vec![1.5f64.into(), "a".into()]),
                ArgValue::group(vec![2.5f64.into(), "b".into()]),
            ]),
        );
    let encoded = encode(&spec, &args).unwrap();
    assert_eq!(
        tokens(&encoded),
        vec![b"ZADD".as_ref(), b"zs", b"CH", b"1.5", b"a", b"2.5", b"b"]
    );
}

#[test]
fn test_encode_pure_token_false_emits_nothing() {
    let spec = CommandTable::builtin().get("ZADD").unwrap();
    let args = CommandArgs::new()
        .with("key", "zs")
        .with("change", false)
        .with(
            "data",
            ArgValue::many(vec![ArgValue::group(vec![1.0f64.into(), "a".into()])]),
        );
    let encoded = encode(&spec, &args).unwrap();
    assert_eq!(
        tokens(&encoded),
        vec![b"ZADD".as_ref(), b"zs", b"1.0", b"a"]
    );
}

#[test]
fn test_encode_block_with_prefix_token() {
    let spec = CommandTable::builtin().get("SORT").unwrap();
    let args = CommandArgs::new()
        .with("key", "mylist")
        .with("limit", ArgValue::group(vec![0i64.into(), 10i64.into()]))
        .with("sorting", true);
    let encoded = encode(&spec, &args).unwrap();
    assert_eq!(
        tokens(&encoded),
        vec![b"SORT".as_ref(), b"mylist", b"LIMIT", b"0", b"10", b"ALPHA"]
    );
}

#[test]
fn test_encode_xread_streams_block() {
    let spec = CommandTable::builtin().get("XREAD").unwrap();
    let args = CommandArgs::new().with("count", 5i64).with(
        "streams",
        ArgValue::group(vec![
            ArgValue::many(vec!["s1".into(), "s2".into()]),
            ArgValue::many(vec!["0-0".into(), "0-0".into()]),
        ]),
    );
    let encoded = encode(&spec, &args).unwrap();
    assert_eq!(
        tokens(&encoded),
        vec![
            b"XREAD".as_ref(),
            b"COUNT",
            b"5",
            b"STREAMS",
            b"s1",
            b"s2",
            b"0-0",
            b"0-0"
        ]
    );
}

#[test]
fn test_encode_composite_name_emits_two_tokens() {
    let spec = CommandTable::builtin().get("MEMORY USAGE").unwrap();
    let args = CommandArgs::new().with("key", "k");
    let encoded = encode(&spec, &args).unwrap();
    assert_eq!(tokens(&encoded), vec![b"MEMORY".as_ref(), b"USAGE", b"k"]);
    assert_eq!(encoded.name_tokens().len(), 2);
    assert_eq!(encoded.arg_tokens(), &[Bytes::from_static(b"k")]);
}

#[test]
fn test_encode_version_gate() {
    let spec = CommandTable::builtin().get("SET").unwrap();
    let args = CommandArgs::new()
        .with("key", "k")
        .with("value", "v")
        .with("get", true);

    let old: Version = "6.0.0".parse().unwrap();
    let err = encode_with_version(&spec, &args, Some(old)).unwrap_err();
    assert!(matches!(err, SlotcastError::UnsupportedArgument { .. }));

    let new: Version = "7.0.0".parse().unwrap();
    let encoded = encode_with_version(&spec, &args, Some(new)).unwrap();
    assert_eq!(tokens(&encoded), vec![b"SET".as_ref(), b"k", b"v", b"GET"]);
}

#[test]
fn test_encode_is_deterministic() {
    let spec = CommandTable::builtin().get("SET").unwrap();
    let args = CommandArgs::new()
        .with("key", "k")
        .with("value", "v")
        .with("condition", ArgValue::token("XX"))
        .with("expiration", ArgValue::choice("keepttl", true));
    let first = encode(&spec, &args).unwrap();
    let second = encode(&spec, &args).unwrap();
    assert_eq!(first, second);
}
