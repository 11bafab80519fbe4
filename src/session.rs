//! # Client Session
//!
//! Per-connection scratch space for callers: the local and remote identities
//! of the conversation plus a byte-valued property bag for whatever the
//! caller derives along the way (salts, proofs, keys).
//!
//! The protocol layer never reads or writes a session on its own; it is the
//! caller's record of the exchange.

use std::collections::HashMap;

use zeroize::Zeroize;

/// Identity pair and property bag attached to one conversation
pub trait ClientSession {
    fn set_local_identity(&mut self, identity: u64);

    fn local_identity(&self) -> u64;

    fn set_remote_identity(&mut self, identity: u64);

    fn remote_identity(&self) -> u64;

    /// Store `value` under `key`, returning the previous value if any
    fn set_property(&mut self, key: &str, value: Vec<u8>) -> Option<Vec<u8>>;

    fn property(&self, key: &str) -> Option<&[u8]>;

    fn remove_property(&mut self, key: &str) -> Option<Vec<u8>>;

    /// Drop every property, keeping the identities
    fn clear_properties(&mut self);
}

/// In-memory [`ClientSession`]. Stored values are wiped by
/// [`clear_properties`](ClientSession::clear_properties) and on drop; a value
/// handed back by `set_property` or `remove_property` is the caller's to wipe.
#[derive(Debug, Default, Clone)]
pub struct MemorySession {
    local_identity: u64,
    remote_identity: u64,
    properties: HashMap<String, Vec<u8>>,
}

impl MemorySession {
    pub fn new(local_identity: u64, remote_identity: u64) -> Self {
        Self {
            local_identity,
            remote_identity,
            properties: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl ClientSession for MemorySession {
    fn set_local_identity(&mut self, identity: u64) {
        self.local_identity = identity;
    }

    fn local_identity(&self) -> u64 {
        self.local_identity
    }

    fn set_remote_identity(&mut self, identity: u64) {
        self.remote_identity = identity;
    }

    fn remote_identity(&self) -> u64 {
        self.remote_identity
    }

    fn set_property(&mut self, key: &str, value: Vec<u8>) -> Option<Vec<u8>> {
        self.properties.insert(key.to_string(), value)
    }

    fn property(&self, key: &str) -> Option<&[u8]> {
        self.properties.get(key).map(Vec::as_slice)
    }

    fn remove_property(&mut self, key: &str) -> Option<Vec<u8>> {
        self.properties.remove(key)
    }

    fn clear_properties(&mut self) {
        for value in self.properties.values_mut() {
            value.zeroize();
        }
        self.properties.clear();
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.clear_properties();
    }
}
