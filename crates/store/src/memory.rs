//! In-memory store implementing the same traits as [`crate::SledStore`],
//! for tests and mock wiring.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;

use portal_common::eth::EthAddress;
use portal_registry::material::ValidatorKeyMaterial;

use crate::{
    sort_newest_first, ContractDirectory, RegistrationStore, StoreError, StoredRegistration,
};

#[derive(Default)]
pub struct MemoryStore {
    registrations: Mutex<HashMap<(Vec<u8>, u8), StoredRegistration>>,
    contracts: Mutex<BTreeSet<EthAddress>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistrationStore for MemoryStore {
    fn upsert(&self, material: &ValidatorKeyMaterial, timestamp: u64) -> Result<(), StoreError> {
        let key = (material.primary_pubkey.clone(), material.kind().tag());
        self.registrations
            .lock()
            .insert(key, StoredRegistration { material: material.clone(), timestamp });
        Ok(())
    }

    fn load_by_pubkey(&self, primary_pubkey: &[u8]) -> Result<Vec<StoredRegistration>, StoreError> {
        let mut out: Vec<StoredRegistration> = self
            .registrations
            .lock()
            .iter()
            .filter(|((pk, _), _)| pk == primary_pubkey)
            .map(|(_, record)| record.clone())
            .collect();
        sort_newest_first(&mut out);
        Ok(out)
    }

    fn load_by_operator(&self, operator: &[u8]) -> Result<Vec<StoredRegistration>, StoreError> {
        let mut out: Vec<StoredRegistration> = self
            .registrations
            .lock()
            .values()
            .filter(|record| record.material.operator == operator)
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        Ok(out)
    }
}

impl ContractDirectory for MemoryStore {
    fn insert(&self, address: &EthAddress) -> Result<bool, StoreError> {
        Ok(self.contracts.lock().insert(*address))
    }

    fn all(&self) -> Result<Vec<EthAddress>, StoreError> {
        Ok(self.contracts.lock().iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_registry::material::{
        RegistrationKind, OPERATOR_LEN, PRIMARY_PUBKEY_LEN, PRIMARY_SIGNATURE_LEN,
        SECONDARY_PUBKEY_LEN, SECONDARY_SIGNATURE_LEN,
    };

    fn material(seed: u8, contract: Option<u8>) -> ValidatorKeyMaterial {
        ValidatorKeyMaterial {
            primary_pubkey: vec![seed; PRIMARY_PUBKEY_LEN],
            secondary_pubkey: vec![seed; SECONDARY_PUBKEY_LEN],
            primary_signature: vec![seed; PRIMARY_SIGNATURE_LEN],
            secondary_signature: vec![seed; SECONDARY_SIGNATURE_LEN],
            operator: vec![seed; OPERATOR_LEN],
            contract: contract.map(|c| vec![c; OPERATOR_LEN]),
        }
    }

    #[test]
    fn test_last_write_wins_per_kind() {
        let store = MemoryStore::new();
        let m = material(1, None);
        store.upsert(&m, 1).unwrap();
        store.upsert(&m, 2).unwrap();
        store.upsert(&material(1, Some(2)), 3).unwrap();

        let records = store.load_by_pubkey(&m.primary_pubkey).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind(), RegistrationKind::Contract);
        assert_eq!(records[1].timestamp, 2);
    }

    #[test]
    fn test_contract_directory_idempotent() {
        let store = MemoryStore::new();
        let addr = [7u8; 20];
        assert!(ContractDirectory::insert(&store, &addr).unwrap());
        assert!(!ContractDirectory::insert(&store, &addr).unwrap());
        assert_eq!(ContractDirectory::all(&store).unwrap().len(), 1);
    }
}
