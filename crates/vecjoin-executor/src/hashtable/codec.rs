use std::io::{ErrorKind, Read, Write};

use serde::{Deserialize, Serialize};
use vecjoin_common::error::{Error, Result};
use vecjoin_common::types::DataType;
use vecjoin_storage::Record;

use super::container::EntryMap;
use super::{HashTableContainer, JoinKey};

pub const MAGIC: &[u8; 4] = b"VJHT";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 8 + 4;

#[derive(Serialize)]
struct PayloadRef<'a> {
    key_types: &'a [DataType],
    value_types: &'a [DataType],
    entries: Vec<(&'a JoinKey, &'a [Record])>,
}

#[derive(Deserialize)]
struct Payload {
    key_types: Vec<DataType>,
    value_types: Vec<DataType>,
    entries: Vec<(JoinKey, Vec<Record>)>,
}

/// Byte-stream encoding of a [`HashTableContainer`].
///
/// Layout: magic `VJHT`, format version (u32 LE), payload length (u64 LE),
/// CRC32 of the payload (u32 LE), then the JSON payload.
#[derive(Debug, Clone, Copy)]
pub struct HashTableSerDe {
    verify_checksum: bool,
}

impl Default for HashTableSerDe {
    fn default() -> Self {
        Self {
            verify_checksum: true,
        }
    }
}

impl HashTableSerDe {
    pub fn new(verify_checksum: bool) -> Self {
        Self { verify_checksum }
    }

    /// Writes `container` to `writer`, returning the number of bytes written.
    pub fn encode<W: Write>(&self, container: &HashTableContainer, writer: &mut W) -> Result<u64> {
        let payload = PayloadRef {
            key_types: container.key_types(),
            value_types: container.value_types(),
            entries: container.iter().collect(),
        };
        let json = serde_json::to_vec(&payload)
            .map_err(|e| Error::internal(format!("hash table encode failed: {e}")))?;

        let mut header = Vec::with_capacity(HEADER_LEN);
        header.extend_from_slice(MAGIC);
        header.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        header.extend_from_slice(&(json.len() as u64).to_le_bytes());
        header.extend_from_slice(&crc32fast::hash(&json).to_le_bytes());

        writer
            .write_all(&header)
            .and_then(|_| writer.write_all(&json))
            .and_then(|_| writer.flush())
            .map_err(|e| Error::storage("<stream>", e))?;
        Ok((HEADER_LEN + json.len()) as u64)
    }

    pub fn encode_to_vec(&self, container: &HashTableContainer) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(container, &mut out)?;
        Ok(out)
    }

    pub fn decode<R: Read>(&self, reader: &mut R) -> Result<HashTableContainer> {
        let mut header = [0u8; HEADER_LEN];
        reader.read_exact(&mut header).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::deserialization("truncated header"),
            _ => Error::deserialization(format!("header read failed: {e}")),
        })?;
        if &header[0..4] != MAGIC {
            return Err(Error::deserialization(format!(
                "bad magic {:?}, expected {:?}",
                &header[0..4],
                MAGIC
            )));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != FORMAT_VERSION {
            return Err(Error::deserialization(format!(
                "unsupported format version {}, expected {}",
                version, FORMAT_VERSION
            )));
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&header[8..16]);
        let len = u64::from_le_bytes(len_bytes);
        let crc = u32::from_le_bytes([header[16], header[17], header[18], header[19]]);

        let mut payload = Vec::new();
        reader
            .take(len)
            .read_to_end(&mut payload)
            .map_err(|e| Error::deserialization(format!("payload read failed: {e}")))?;
        if payload.len() as u64 != len {
            return Err(Error::deserialization(format!(
                "truncated payload: expected {} bytes, got {}",
                len,
                payload.len()
            )));
        }
        if self.verify_checksum && crc32fast::hash(&payload) != crc {
            return Err(Error::deserialization("payload checksum mismatch"));
        }

        let decoded: Payload = serde_json::from_slice(&payload)
            .map_err(|e| Error::deserialization(format!("malformed payload: {e}")))?;
        let mut entries = EntryMap::default();
        for (key, rows) in decoded.entries {
            if key.len() != decoded.key_types.len() {
                return Err(Error::deserialization(format!(
                    "key arity {} does not match {} key types",
                    key.len(),
                    decoded.key_types.len()
                )));
            }
            if let Some(bad) = rows.iter().find(|r| r.len() != decoded.value_types.len()) {
                return Err(Error::deserialization(format!(
                    "value row arity {} does not match {} value types",
                    bad.len(),
                    decoded.value_types.len()
                )));
            }
            if entries.insert(key, rows).is_some() {
                return Err(Error::deserialization("duplicate key in payload"));
            }
        }
        Ok(HashTableContainer::from_parts(
            decoded.key_types,
            decoded.value_types,
            entries,
        ))
    }

    pub fn decode_from_slice(&self, mut bytes: &[u8]) -> Result<HashTableContainer> {
        self.decode(&mut bytes)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use vecjoin_common::types::Value;

    use super::*;
    use crate::hashtable::HashTableBuilder;

    fn sample() -> HashTableContainer {
        let mut builder =
            HashTableBuilder::new(vec![DataType::Int64, DataType::String], vec![DataType::Float64]);
        for i in 0..10i64 {
            builder
                .add_row(
                    JoinKey::new(vec![Value::int64(i % 3), Value::string(format!("k{}", i % 2))]),
                    Record::from_values(vec![if i == 4 {
                        Value::Null
                    } else {
                        Value::float64(i as f64 / 2.0)
                    }]),
                )
                .unwrap();
        }
        builder.build()
    }

    #[test]
    fn test_round_trip() {
        let serde = HashTableSerDe::default();
        let table = sample();
        let bytes = serde.encode_to_vec(&table).unwrap();
        assert_eq!(&bytes[0..4], MAGIC);
        let back = serde.decode_from_slice(&bytes).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_bad_magic() {
        let serde = HashTableSerDe::default();
        let mut bytes = serde.encode_to_vec(&sample()).unwrap();
        bytes[0] = b'X';
        let err = serde.decode_from_slice(&bytes).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_unsupported_version() {
        let serde = HashTableSerDe::default();
        let mut bytes = serde.encode_to_vec(&sample()).unwrap();
        bytes[4..8].copy_from_slice(&7u32.to_le_bytes());
        let err = serde.decode_from_slice(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported format version 7"));
    }

    #[test]
    fn test_truncated_payload() {
        let serde = HashTableSerDe::default();
        let bytes = serde.encode_to_vec(&sample()).unwrap();
        let err = serde
            .decode_from_slice(&bytes[..bytes.len() - 3])
            .unwrap_err();
        assert!(err.to_string().contains("truncated payload"));
        let err = serde.decode_from_slice(&bytes[..10]).unwrap_err();
        assert!(err.to_string().contains("truncated header"));
    }

    #[test]
    fn test_checksum_mismatch() {
        let table = sample();
        let mut bytes = HashTableSerDe::default().encode_to_vec(&table).unwrap();
        let last = bytes.len() - 2;
        bytes[last] ^= 0x01;
        let err = HashTableSerDe::default()
            .decode_from_slice(&bytes)
            .unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn test_checksum_can_be_skipped() {
        let table = sample();
        let mut bytes = HashTableSerDe::default().encode_to_vec(&table).unwrap();
        bytes[16..20].copy_from_slice(&0u32.to_le_bytes());
        assert!(HashTableSerDe::new(false).decode_from_slice(&bytes).is_ok());
        assert!(HashTableSerDe::new(true).decode_from_slice(&bytes).is_err());
    }

    #[test]
    fn test_empty_table_round_trip() {
        let serde = HashTableSerDe::default();
        let table = HashTableBuilder::new(vec![DataType::Int64], vec![]).build();
        let back = serde
            .decode_from_slice(&serde.encode_to_vec(&table).unwrap())
            .unwrap();
        assert!(back.is_empty());
        assert_eq!(back.key_types(), &[DataType::Int64]);
    }

    fn float_table(values: &[f64]) -> HashTableContainer {
        let mut builder = HashTableBuilder::new(vec![DataType::Float64], vec![DataType::Float64]);
        for v in values {
            builder
                .add_row(
                    JoinKey::new(vec![Value::float64(*v)]),
                    Record::from_values(vec![Value::float64(*v)]),
                )
                .unwrap();
        }
        builder.build()
    }

    fn float_bits(table: &HashTableContainer) -> Vec<u64> {
        let mut bits: Vec<u64> = table
            .iter()
            .flat_map(|(_, rows)| rows.iter().map(|r| r[0].as_f64().unwrap_or_default().to_bits()))
            .collect();
        bits.sort_unstable();
        bits
    }

    #[test]
    fn test_non_finite_floats_round_trip() {
        let serde = HashTableSerDe::default();
        let table = float_table(&[f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.0, 0.5]);
        let back = serde
            .decode_from_slice(&serde.encode_to_vec(&table).unwrap())
            .unwrap();
        assert_eq!(back, table);
        assert_eq!(float_bits(&back), float_bits(&table));
        assert!(back.contains_key(&JoinKey::new(vec![Value::float64(f64::NAN)])));
    }

    proptest! {
        #[test]
        fn prop_floats_round_trip_bit_exact(bits in proptest::collection::vec(any::<u64>(), 1..32)) {
            let values: Vec<f64> = bits.iter().map(|b| f64::from_bits(*b)).collect();
            let table = float_table(&values);
            let serde = HashTableSerDe::default();
            let back = serde.decode_from_slice(&serde.encode_to_vec(&table).unwrap()).unwrap();
            prop_assert_eq!(float_bits(&back), float_bits(&table));
            prop_assert_eq!(back, table);
        }

        #[test]
        fn prop_round_trip_preserves_associations(
            rows in proptest::collection::vec((0i64..20, proptest::option::of(any::<i64>())), 0..64)
        ) {
            let mut builder = HashTableBuilder::new(vec![DataType::Int64], vec![DataType::Int64]);
            for (k, v) in &rows {
                builder
                    .add_row(JoinKey::new(vec![Value::int64(*k)]), Record::from_values(vec![Value::from(*v)]))
                    .unwrap();
            }
            let table = builder.build();
            let serde = HashTableSerDe::default();
            let back = serde.decode_from_slice(&serde.encode_to_vec(&table).unwrap()).unwrap();
            prop_assert_eq!(back, table);
        }
    }
}
