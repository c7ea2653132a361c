use bytes::Bytes;
use slotcast::core::errors::SlotcastError;
use slotcast::core::protocol::RespFrame;
use slotcast::core::reply::{DecodedReply, ReplyShape, decode};

#[test]
fn test_server_error_surfaces_regardless_of_shape() {
    let frame = RespFrame::Error("ERR unknown command".into());
    for shape in [ReplyShape::Raw, ReplyShape::Int, ReplyShape::Bool] {
        let err = decode(&shape, &frame).unwrap_err();
        assert_eq!(err, SlotcastError::ServerError("ERR unknown command".into()));
    }
}

#[test]
fn test_bool_coercions() {
    let shape = ReplyShape::Bool;
    assert_eq!(
        decode(&shape, &RespFrame::Boolean(true)).unwrap(),
        DecodedReply::Bool(true)
    );
    assert_eq!(
        decode(&shape, &RespFrame::Integer(1)).unwrap(),
        DecodedReply::Bool(true)
    );
    assert_eq!(
        decode(&shape, &RespFrame::Integer(0)).unwrap(),
        DecodedReply::Bool(false)
    );
    assert_eq!(
        decode(&shape, &RespFrame::SimpleString("OK".into())).unwrap(),
        DecodedReply::Bool(true)
    );
}

#[test]
fn test_int_from_bulk_string() {
    let frame = RespFrame::BulkString(Bytes::from_static(b"42"));
    assert_eq!(
        decode(&ReplyShape::Int, &frame).unwrap(),
        DecodedReply::Int(42)
    );
}

#[test]
fn test_int_rejects_non_numeric_bulk() {
    let frame = RespFrame::BulkString(Bytes::from_static(b"forty-two"));
    let err = decode(&ReplyShape::Int, &frame).unwrap_err();
    assert!(matches!(err, SlotcastError::ProtocolMismatch { .. }));
}

#[test]
fn test_double_from_bulk_string_and_infinity() {
    let shape = ReplyShape::Double;
    assert_eq!(
        decode(&shape, &RespFrame::BulkString(Bytes::from_static(b"3.5"))).unwrap(),
        DecodedReply::Double(3.5)
    );
    assert_eq!(
        decode(&shape, &RespFrame::BulkString(Bytes::from_static(b"inf"))).unwrap(),
        DecodedReply::Double(f64::INFINITY)
    );
    assert_eq!(
        decode(&shape, &RespFrame::Integer(2)).unwrap(),
        DecodedReply::Double(2.0)
    );
}

#[test]
fn test_optional_nil_and_value() {
    let shape = ReplyShape::optional(ReplyShape::Bytes);
    assert_eq!(decode(&shape, &RespFrame::Null).unwrap(), DecodedReply::Nil);
    assert_eq!(
        decode(&shape, &RespFrame::BulkString(Bytes::from_static(b"v"))).unwrap(),
        DecodedReply::Bytes(Bytes::from_static(b"v"))
    );
}

#[test]
fn test_nil_as_empty_collection() {
    let plain = ReplyShape::array_of(ReplyShape::Bytes);
    assert_eq!(decode(&plain, &RespFrame::Null).unwrap(), DecodedReply::Nil);

    let empty = ReplyShape::array_of(ReplyShape::Bytes).nil_as_empty();
    assert_eq!(
        decode(&empty, &RespFrame::NullArray).unwrap(),
        DecodedReply::Array(Vec::new())
    );

    let pairs = ReplyShape::pairs_of(ReplyShape::Bytes, ReplyShape::Bytes).nil_as_empty();
    assert_eq!(
        decode(&pairs, &RespFrame::Null).unwrap(),
        DecodedReply::Map(Vec::new())
    );
}

#[test]
fn test_array_of_typed_elements() {
    let shape = ReplyShape::array_of(ReplyShape::Int);
    let frame = RespFrame::Array(vec![
        RespFrame::Integer(1),
        RespFrame::BulkString(Bytes::from_static(b"2")),
    ]);
    assert_eq!(
        decode(&shape, &frame).unwrap(),
        DecodedReply::Array(vec![DecodedReply::Int(1), DecodedReply::Int(2)])
    );
}

#[test]
fn test_pairs_from_native_map() {
    let shape = ReplyShape::pairs_of(ReplyShape::Text, ReplyShape::Int);
    let frame = RespFrame::Map(vec![(
        RespFrame::BulkString(Bytes::from_static(b"hits")),
        RespFrame::Integer(3),
    )]);
    assert_eq!(
        decode(&shape, &frame).unwrap(),
        DecodedReply::Map(vec![(DecodedReply::Text("hits".into()), DecodedReply::Int(3))])
    );
}

#[test]
fn test_pairs_from_flat_array() {
    let shape = ReplyShape::pairs_of(ReplyShape::Text, ReplyShape::Text);
    let frame = RespFrame::Array(vec![
        RespFrame::BulkString(Bytes::from_static(b"f1")),
        RespFrame::BulkString(Bytes::from_static(b"v1")),
        RespFrame::BulkString(Bytes::from_static(b"f2")),
        RespFrame::BulkString(Bytes::from_static(b"v2")),
    ]);
    assert_eq!(
        decode(&shape, &frame).unwrap(),
        DecodedReply::Map(vec![
            (DecodedReply::Text("f1".into()), DecodedReply::Text("v1".into())),
            (DecodedReply::Text("f2".into()), DecodedReply::Text("v2".into())),
        ])
    );
}

#[test]
fn test_pairs_odd_length_array_rejected() {
    let shape = ReplyShape::pairs_of(ReplyShape::Text, ReplyShape::Text);
    let frame = RespFrame::Array(vec![RespFrame::BulkString(Bytes::from_static(b"f1"))]);
    let err = decode(&shape, &frame).unwrap_err();
    assert!(matches!(err, SlotcastError::ProtocolMismatch { .. }));
}

#[test]
fn test_set_accepts_array_reply() {
    // RESP2 servers return sets as plain arrays.
    let shape = ReplyShape::set_of(ReplyShape::Bytes);
    let frame = RespFrame::Array(vec![RespFrame::BulkString(Bytes::from_static(b"m"))]);
    assert_eq!(
        decode(&shape, &frame).unwrap(),
        DecodedReply::Set(vec![DecodedReply::Bytes(Bytes::from_static(b"m"))])
    );
}

#[test]
fn test_raw_passes_structure_through() {
    let frame = RespFrame::Array(vec![
        RespFrame::SimpleString("a".into()),
        RespFrame::Map(vec![(RespFrame::Integer(1), RespFrame::Boolean(false))]),
    ]);
    assert_eq!(
        decode(&ReplyShape::Raw, &frame).unwrap(),
        DecodedReply::Array(vec![
            DecodedReply::Text("a".into()),
            DecodedReply::Map(vec![(DecodedReply::Int(1), DecodedReply::Bool(false))]),
        ])
    );
}

#[test]
fn test_shape_mismatch_names_both_sides() {
    let err = decode(&ReplyShape::Int, &RespFrame::Boolean(true)).unwrap_err();
    assert_eq!(
        err,
        SlotcastError::ProtocolMismatch {
            expected: "integer",
            actual: "boolean",
        }
    );
}
