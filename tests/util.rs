#![allow(dead_code)]

use std::sync::Arc;

use certdesk::issuance::IssuanceService;
use certdesk::policy::CaPolicy;
use certdesk::store::{CaStore, FileRepository, MemoryRepository};
use tempfile::TempDir;

/// 4096-bit CA keys make every test slow; the layout under test is the same.
pub fn test_policy() -> CaPolicy {
    CaPolicy::builder().ca_key_bits(2048).build()
}

pub fn memory_store() -> Arc<CaStore<MemoryRepository>> {
    Arc::new(CaStore::new(MemoryRepository::default(), test_policy()))
}

pub fn file_store() -> (TempDir, Arc<CaStore<FileRepository>>) {
    let dir = TempDir::new().unwrap();
    let repository = FileRepository::open(dir.path()).unwrap();
    (dir, Arc::new(CaStore::new(repository, test_policy())))
}

pub fn file_service() -> (TempDir, IssuanceService<FileRepository>) {
    let (dir, store) = file_store();
    (dir, IssuanceService::new(store))
}
