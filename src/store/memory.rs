use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::RwLock;

use super::{BundleFiles, BundlePaths, CaRepository, StoredCa};
use crate::error::{CertDeskError, Result};

/// Keeps CAs and serial ledgers in process memory. Bundles are not retained.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    cas: RwLock<BTreeMap<String, StoredCa>>,
    serials: RwLock<HashMap<String, HashSet<String>>>,
}

impl CaRepository for MemoryRepository {
    fn list_names(&self) -> Result<Vec<String>> {
        Ok(self.cas.read().keys().cloned().collect())
    }

    fn load(&self, name: &str) -> Result<Option<StoredCa>> {
        Ok(self.cas.read().get(name).cloned())
    }

    fn insert(&self, name: &str, ca: &StoredCa) -> Result<()> {
        let mut cas = self.cas.write();
        if cas.contains_key(name) {
            return Err(CertDeskError::AlreadyExists(name.to_string()));
        }
        cas.insert(name.to_string(), ca.clone());
        Ok(())
    }

    fn record_serial(&self, ca_name: &str, serial_hex: &str) -> Result<bool> {
        if !self.cas.read().contains_key(ca_name) {
            return Err(CertDeskError::NotFound(ca_name.to_string()));
        }
        Ok(self
            .serials
            .write()
            .entry(ca_name.to_string())
            .or_default()
            .insert(serial_hex.to_string()))
    }

    fn store_bundle(&self, _files: &BundleFiles<'_>) -> Result<Option<BundlePaths>> {
        Ok(None)
    }
}
