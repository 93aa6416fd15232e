//! Cache entry envelope and pluggable codecs.
//!
//! Every value the cache layer writes is wrapped in a [`CacheEntry`]. Entries
//! written for physical-TTL strategies carry no expiry; entries written for the
//! logical-expiration strategy carry the instant after which they are stale.
//!
//! A confirmed negative lookup is stored as the [`TOMBSTONE`]: the empty byte
//! string. Neither JSON nor MessagePack ever encodes a value to zero bytes, so
//! the tombstone cannot collide with a real entry.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{CacheError, CacheResult};

/// Sentinel payload marking "confirmed absent in the backing store".
pub const TOMBSTONE: &[u8] = b"";

/// A cached value plus optional logical expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<V> {
    /// The cached domain value.
    pub value: V,
    /// Logical expiry. `None` means freshness is governed by the store's TTL.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expire_at: Option<OffsetDateTime>,
}

impl<V> CacheEntry<V> {
    /// Entry whose freshness is governed by the physical TTL.
    pub fn new(value: V) -> Self {
        Self {
            value,
            expire_at: None,
        }
    }

    /// Entry that becomes logically stale at `expire_at`.
    pub fn with_expire_at(value: V, expire_at: OffsetDateTime) -> Self {
        Self {
            value,
            expire_at: Some(expire_at),
        }
    }

    /// Returns `true` once `now` has reached the logical expiry.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expire_at.is_some_and(|at| now >= at)
    }
}

/// Result of reading a key from the cache store.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    /// A real value is cached.
    Hit(CacheEntry<V>),
    /// A tombstone is cached: the backing store has no such record.
    Absent,
    /// Nothing is cached for the key.
    Miss,
}

/// Serialization format used for one key namespace.
pub trait Codec: Clone + Send + Sync + 'static {
    /// Encodes a value into the store's byte format.
    fn encode<T: Serialize>(&self, value: &T) -> CacheResult<Vec<u8>>;

    /// Decodes bytes produced by [`Codec::encode`].
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CacheResult<T>;
}

/// JSON codec (human-readable, default).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CacheError::codec(format!("json encode: {e}")))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CacheResult<T> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::codec(format!("json decode: {e}")))
    }
}

/// MessagePack codec (compact).
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl Codec for MsgPackCodec {
    fn encode<T: Serialize>(&self, value: &T) -> CacheResult<Vec<u8>> {
        rmp_serde::to_vec_named(value)
            .map_err(|e| CacheError::codec(format!("msgpack encode: {e}")))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CacheResult<T> {
        rmp_serde::from_slice(bytes).map_err(|e| CacheError::codec(format!("msgpack decode: {e}")))
    }
}

/// Encodes `value` in an envelope without copying it.
pub fn encode_entry<V: Serialize, C: Codec>(
    codec: &C,
    value: &V,
    expire_at: Option<OffsetDateTime>,
) -> CacheResult<Vec<u8>> {
    codec.encode(&CacheEntry { value, expire_at })
}

/// Turns a raw store reply into a [`Lookup`].
pub fn decode_lookup<V: DeserializeOwned, C: Codec>(
    codec: &C,
    raw: Option<Vec<u8>>,
) -> CacheResult<Lookup<V>> {
    match raw {
        None => Ok(Lookup::Miss),
        Some(bytes) if bytes.as_slice() == TOMBSTONE => Ok(Lookup::Absent),
        Some(bytes) => codec.decode(&bytes).map(Lookup::Hit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: i64,
        name: String,
        tags: Vec<String>,
        score: Option<f64>,
    }

    fn item() -> Item {
        Item {
            id: 42,
            name: "corner cafe".to_string(),
            tags: vec!["coffee".to_string(), "wifi".to_string()],
            score: Some(4.5),
        }
    }

    #[test]
    fn test_json_entry_round_trip() {
        let codec = JsonCodec;
        let plain = encode_entry(&codec, &item(), None).unwrap();
        let lookup: Lookup<Item> = decode_lookup(&codec, Some(plain)).unwrap();
        assert_eq!(lookup, Lookup::Hit(CacheEntry::new(item())));

        let at = datetime!(2030-01-02 03:04:05 UTC);
        let logical = encode_entry(&codec, &item(), Some(at)).unwrap();
        let lookup: Lookup<Item> = decode_lookup(&codec, Some(logical)).unwrap();
        assert_eq!(lookup, Lookup::Hit(CacheEntry::with_expire_at(item(), at)));
    }

    #[test]
    fn test_msgpack_entry_round_trip() {
        let codec = MsgPackCodec;
        let at = datetime!(2030-01-02 03:04:05.123456789 UTC);
        let bytes = encode_entry(&codec, &item(), Some(at)).unwrap();
        let decoded: CacheEntry<Item> = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, CacheEntry::with_expire_at(item(), at));
    }

    #[test]
    fn test_tombstone_and_miss_are_distinct() {
        let codec = JsonCodec;
        assert_eq!(
            decode_lookup::<Item, _>(&codec, Some(TOMBSTONE.to_vec())).unwrap(),
            Lookup::Absent
        );
        assert_eq!(decode_lookup::<Item, _>(&codec, None).unwrap(), Lookup::Miss);
    }

    #[test]
    fn test_no_value_encodes_to_tombstone() {
        // Smallest encodings of "empty" values are still non-empty.
        assert!(!JsonCodec.encode(&"").unwrap().is_empty());
        assert!(!MsgPackCodec.encode(&0u8).unwrap().is_empty());
        assert!(!MsgPackCodec.encode(&()).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_payload_is_codec_error() {
        let err = decode_lookup::<Item, _>(&JsonCodec, Some(b"{not json".to_vec())).unwrap_err();
        assert!(matches!(err, CacheError::Codec { .. }));
    }

    #[test]
    fn test_logical_expiry() {
        let at = datetime!(2024-05-01 12:00:00 UTC);
        let entry = CacheEntry::with_expire_at(1, at);
        assert!(!entry.is_expired(datetime!(2024-05-01 11:59:59 UTC)));
        assert!(entry.is_expired(at));
        assert!(!CacheEntry::new(1).is_expired(datetime!(2100-01-01 00:00:00 UTC)));
    }
}
