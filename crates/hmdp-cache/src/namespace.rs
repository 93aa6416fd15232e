//! Typed key namespaces.

use std::fmt::{self, Display};
use std::marker::PhantomData;
use std::time::Duration;

use crate::entry::{Codec, JsonCodec};

/// Default physical TTL / logical window of cached values (30 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Default TTL of tombstones (2 minutes).
pub const DEFAULT_NULL_TTL: Duration = Duration::from_secs(2 * 60);

/// Key prefix, TTL policy and codec for one kind of cached value.
///
/// A namespace is parameterised by the value type it stores, so every call
/// site decodes into the type it encoded without runtime type inspection.
///
/// ```ignore
/// let shops: Namespace<Shop> = Namespace::new("cache:shop:", "lock:shop:")
///     .with_ttl(Duration::from_secs(1800))
///     .with_null_ttl(Duration::from_secs(120));
/// assert_eq!(shops.key(&42), "cache:shop:42");
/// ```
pub struct Namespace<V, C = JsonCodec> {
    key_prefix: String,
    lock_prefix: String,
    ttl: Duration,
    null_ttl: Duration,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V> Namespace<V, JsonCodec> {
    /// Namespace using the JSON codec and default TTLs.
    pub fn new(key_prefix: impl Into<String>, lock_prefix: impl Into<String>) -> Self {
        Self::with_codec(key_prefix, lock_prefix, JsonCodec)
    }
}

impl<V, C: Codec> Namespace<V, C> {
    /// Namespace using a specific codec and default TTLs.
    pub fn with_codec(
        key_prefix: impl Into<String>,
        lock_prefix: impl Into<String>,
        codec: C,
    ) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            lock_prefix: lock_prefix.into(),
            ttl: DEFAULT_TTL,
            null_ttl: DEFAULT_NULL_TTL,
            codec,
            _value: PhantomData,
        }
    }

    /// Physical TTL for pass-through/mutex entries, logical window otherwise.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// TTL of tombstones written for ids the backing store does not have.
    #[must_use]
    pub fn with_null_ttl(mut self, null_ttl: Duration) -> Self {
        self.null_ttl = null_ttl;
        self
    }

    pub fn key(&self, id: &impl Display) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    pub fn lock_key(&self, id: &impl Display) -> String {
        format!("{}{}", self.lock_prefix, id)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn null_ttl(&self) -> Duration {
        self.null_ttl
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }
}

impl<V, C: Clone> Clone for Namespace<V, C> {
    fn clone(&self) -> Self {
        Self {
            key_prefix: self.key_prefix.clone(),
            lock_prefix: self.lock_prefix.clone(),
            ttl: self.ttl,
            null_ttl: self.null_ttl,
            codec: self.codec.clone(),
            _value: PhantomData,
        }
    }
}

impl<V, C> fmt::Debug for Namespace<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("key_prefix", &self.key_prefix)
            .field("lock_prefix", &self.lock_prefix)
            .field("ttl", &self.ttl)
            .field("null_ttl", &self.null_ttl)
            .field("value", &std::any::type_name::<V>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::MsgPackCodec;

    #[test]
    fn test_keys() {
        let ns: Namespace<String> = Namespace::new("cache:shop:", "lock:shop:");
        assert_eq!(ns.key(&42), "cache:shop:42");
        assert_eq!(ns.lock_key(&42), "lock:shop:42");
        assert_eq!(ns.ttl(), DEFAULT_TTL);
        assert_eq!(ns.null_ttl(), DEFAULT_NULL_TTL);
    }

    #[test]
    fn test_builder() {
        let ns: Namespace<u32, MsgPackCodec> =
            Namespace::with_codec("item:", "lock:item:", MsgPackCodec)
                .with_ttl(Duration::from_secs(5))
                .with_null_ttl(Duration::from_secs(1));
        assert_eq!(ns.ttl(), Duration::from_secs(5));
        assert_eq!(ns.null_ttl(), Duration::from_secs(1));
        assert!(format!("{ns:?}").contains("u32"));
    }
}
