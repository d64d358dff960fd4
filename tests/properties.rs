//! Property-based tests for encode/decode round-trips.

use std::collections::BTreeMap;

use proptest::prelude::*;

use avro_binary::codec::varint::{zigzag_decode, zigzag_encode};
use avro_binary::schema::{Field, Schema, ValidSchema};
use avro_binary::{Deserializer, Serializer};

type Row = (i64, String, Option<f64>, Vec<i32>, BTreeMap<String, bool>);

fn row_schema() -> ValidSchema {
    ValidSchema::new(Schema::record(
        "Row",
        vec![
            Field::new("id", Schema::Long),
            Field::new("label", Schema::String),
            Field::new("weight", Schema::optional(Schema::Double)),
            Field::new("samples", Schema::array(Schema::Int)),
            Field::new("flags", Schema::map(Schema::Boolean)),
        ],
    ))
    .unwrap()
}

/// Strategy for generating arbitrary rows.
fn arb_row() -> impl Strategy<Value = Row> {
    (
        any::<i64>(),
        ".*",
        prop::option::of(any::<f64>().prop_filter("not NaN", |f| !f.is_nan())),
        prop::collection::vec(any::<i32>(), 0..50),
        prop::collection::btree_map("[a-z]{0,8}", any::<bool>(), 0..10),
    )
}

proptest! {
    #[test]
    fn zigzag_roundtrip(n in any::<i64>()) {
        prop_assert_eq!(zigzag_decode(zigzag_encode(n)), n);
    }

    #[test]
    fn long_roundtrip(n in any::<i64>()) {
        let mut serializer = Serializer::new();
        serializer.serialize(&n).unwrap();
        serializer.finish();
        prop_assert!(serializer.size() <= 10);

        let bytes = serializer.buffer();
        let mut deserializer = Deserializer::from_slice(&bytes);
        prop_assert_eq!(deserializer.deserialize::<i64>().unwrap(), n);
        prop_assert_eq!(deserializer.bytes_remaining(), 0);
    }

    #[test]
    fn rows_roundtrip_in_order(
        rows in prop::collection::vec(arb_row(), 0..8),
        chunk_size in 1usize..64,
    ) {
        let schema = row_schema();
        let mut serializer = Serializer::validating_with_chunk_size(schema.clone(), chunk_size);
        for row in &rows {
            serializer.serialize(row).unwrap();
        }
        serializer.finish();

        let mut deserializer = Deserializer::validating_from_snapshot(schema, serializer.snapshot());
        for row in &rows {
            prop_assert_eq!(&deserializer.deserialize::<Row>().unwrap(), row);
        }
        prop_assert_eq!(deserializer.bytes_remaining(), 0);
    }

    #[test]
    fn chunk_size_does_not_change_bytes(row in arb_row(), chunk_size in 1usize..32) {
        let mut small = Serializer::with_chunk_size(chunk_size);
        let mut large = Serializer::new();
        small.serialize(&row).unwrap();
        large.serialize(&row).unwrap();
        small.finish();
        large.finish();
        prop_assert_eq!(small.buffer(), large.buffer());
    }

    /// Truncated encodings fail without consuming input.
    #[test]
    fn truncated_row_is_rejected(row in arb_row()) {
        let mut serializer = Serializer::new();
        serializer.serialize(&row).unwrap();
        serializer.finish();
        let bytes = serializer.buffer();

        for cut in 0..bytes.len() {
            let mut deserializer = Deserializer::from_slice(&bytes[..cut]);
            let err = deserializer.deserialize::<Row>().unwrap_err();
            prop_assert!(err.is_truncated());
            prop_assert_eq!(deserializer.bytes_remaining(), cut);
        }
    }

    /// Arbitrary bytes return a value or an error, never panic.
    #[test]
    fn arbitrary_bytes_dont_crash(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let schema = row_schema();
        let mut deserializer = Deserializer::validating_from_slice(schema.clone(), &bytes);
        let _ = deserializer.deserialize::<Row>();

        let mut deserializer = Deserializer::from_slice(&bytes);
        let _ = deserializer.deserialize_value(&schema);
    }
}
