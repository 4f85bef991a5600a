//! In-memory key-value backend.
//!
//! Serves two purposes: deterministic quota behaviour in tests, and the
//! ephemeral fallback session used when durable storage is unavailable.

use std::collections::BTreeMap;

use crate::kv::{KvBackend, KvError};

pub struct MemoryKv {
    map: BTreeMap<String, String>,
    capacity_bytes: Option<usize>,
    available: bool,
}

impl MemoryKv {
    pub fn new(capacity_bytes: Option<usize>) -> Self {
        Self {
            map: BTreeMap::new(),
            capacity_bytes,
            available: true,
        }
    }

    /// A backend that refuses every access, modelling blocked storage
    /// (the private-browsing case).
    pub fn unavailable() -> Self {
        Self {
            map: BTreeMap::new(),
            capacity_bytes: None,
            available: false,
        }
    }

    fn check_available(&self) -> Result<(), KvError> {
        if self.available {
            Ok(())
        } else {
            Err(KvError::Unavailable("storage access is blocked".into()))
        }
    }

    fn used_bytes(&self, except_key: &str) -> usize {
        self.map
            .iter()
            .filter(|(k, _)| k.as_str() != except_key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new(None)
    }
}

impl KvBackend for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.check_available()?;
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        self.check_available()?;
        if let Some(cap) = self.capacity_bytes {
            if self.used_bytes(key) + key.len() + value.len() > cap {
                return Err(KvError::Full);
            }
        }
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KvError> {
        self.check_available()?;
        self.map.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, KvError> {
        self.check_available()?;
        Ok(self.map.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::probe;

    #[test]
    fn quota_and_replacement() {
        let mut kv = MemoryKv::new(Some(20));
        kv.set("k", "0123456789").unwrap();
        assert!(matches!(kv.set("j", "0123456789").unwrap_err(), KvError::Full));
        // Same key, same size: replacement fits.
        kv.set("k", "abcdefghij").unwrap();
    }

    #[test]
    fn unavailable_backend_fails_probe() {
        let mut kv = MemoryKv::unavailable();
        assert!(matches!(
            probe(&mut kv).unwrap_err(),
            KvError::Unavailable(_)
        ));
    }
}
