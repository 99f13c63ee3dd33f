//! sled-backed store.
//!
//! Layout:
//! - tree `registrations`: key `primary_pubkey(32) || kind_tag(1)`,
//!   value = bincode [`StoredRegistration`]
//! - tree `by_operator`: key `operator(20) || primary_pubkey(32) || kind_tag(1)`,
//!   empty value; a prefix scan over the operator yields its records
//! - tree `contracts`: key = 20-byte contract address, empty value

use std::path::Path;

use tracing::debug;

use portal_common::eth::EthAddress;
use portal_registry::material::{RegistrationKind, ValidatorKeyMaterial, PRIMARY_PUBKEY_LEN};

use crate::{
    sort_newest_first, ContractDirectory, RegistrationStore, StoreError, StoredRegistration,
};

pub struct SledStore {
    registrations: sled::Tree,
    by_operator: sled::Tree,
    contracts: sled::Tree,
    // kept alive for flush-on-drop
    _db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(SledStore {
            registrations: db.open_tree("registrations")?,
            by_operator: db.open_tree("by_operator")?,
            contracts: db.open_tree("contracts")?,
            _db: db,
        })
    }

    fn reg_key(primary_pubkey: &[u8], kind: RegistrationKind) -> Vec<u8> {
        let mut key = Vec::with_capacity(primary_pubkey.len() + 1);
        key.extend_from_slice(primary_pubkey);
        key.push(kind.tag());
        key
    }

    fn operator_key(operator: &[u8], primary_pubkey: &[u8], kind: RegistrationKind) -> Vec<u8> {
        let mut key = Vec::with_capacity(operator.len() + primary_pubkey.len() + 1);
        key.extend_from_slice(operator);
        key.extend_from_slice(primary_pubkey);
        key.push(kind.tag());
        key
    }

    fn decode(bytes: &[u8]) -> Result<StoredRegistration, StoreError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl RegistrationStore for SledStore {
    fn upsert(&self, material: &ValidatorKeyMaterial, timestamp: u64) -> Result<(), StoreError> {
        let kind = material.kind();
        let key = Self::reg_key(&material.primary_pubkey, kind);
        let record = StoredRegistration { material: material.clone(), timestamp };
        let encoded = bincode::serialize(&record)?;

        let previous = self.registrations.insert(key, encoded)?;

        // keep the operator index in step when a replacement changes the
        // funding wallet
        if let Some(old) = previous {
            let old = Self::decode(&old)?;
            if old.material.operator != material.operator {
                let stale =
                    Self::operator_key(&old.material.operator, &material.primary_pubkey, kind);
                self.by_operator.remove(stale)?;
            }
        }
        let op_key = Self::operator_key(&material.operator, &material.primary_pubkey, kind);
        self.by_operator.insert(op_key, &[])?;

        debug!(
            kind = kind.as_str(),
            pubkey = hex::encode(&material.primary_pubkey),
            "registration stored"
        );
        Ok(())
    }

    fn load_by_pubkey(&self, primary_pubkey: &[u8]) -> Result<Vec<StoredRegistration>, StoreError> {
        let mut out = Vec::with_capacity(2);
        for kind in [RegistrationKind::Solo, RegistrationKind::Contract] {
            if let Some(bytes) = self.registrations.get(Self::reg_key(primary_pubkey, kind))? {
                out.push(Self::decode(&bytes)?);
            }
        }
        sort_newest_first(&mut out);
        Ok(out)
    }

    fn load_by_operator(&self, operator: &[u8]) -> Result<Vec<StoredRegistration>, StoreError> {
        let mut out = Vec::new();
        for item in self.by_operator.scan_prefix(operator) {
            let (key, _) = item?;
            let suffix = &key[operator.len()..];
            if suffix.len() != PRIMARY_PUBKEY_LEN + 1 {
                continue;
            }
            let pubkey = &suffix[..PRIMARY_PUBKEY_LEN];
            let kind = match RegistrationKind::from_tag(suffix[PRIMARY_PUBKEY_LEN]) {
                Some(k) => k,
                None => continue,
            };
            if let Some(bytes) = self.registrations.get(Self::reg_key(pubkey, kind))? {
                out.push(Self::decode(&bytes)?);
            }
        }
        sort_newest_first(&mut out);
        Ok(out)
    }
}

impl ContractDirectory for SledStore {
    fn insert(&self, address: &EthAddress) -> Result<bool, StoreError> {
        Ok(self.contracts.insert(address, &[])?.is_none())
    }

    fn all(&self) -> Result<Vec<EthAddress>, StoreError> {
        let mut out = Vec::new();
        for item in self.contracts.iter() {
            let (key, _) = item?;
            if key.len() == 20 {
                let mut addr = [0u8; 20];
                addr.copy_from_slice(&key);
                out.push(addr);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_registry::material::{
        OPERATOR_LEN, PRIMARY_SIGNATURE_LEN, SECONDARY_PUBKEY_LEN, SECONDARY_SIGNATURE_LEN,
    };

    fn material(seed: u8, operator: u8, contract: Option<u8>) -> ValidatorKeyMaterial {
        ValidatorKeyMaterial {
            primary_pubkey: vec![seed; PRIMARY_PUBKEY_LEN],
            secondary_pubkey: vec![seed; SECONDARY_PUBKEY_LEN],
            primary_signature: vec![seed; PRIMARY_SIGNATURE_LEN],
            secondary_signature: vec![seed; SECONDARY_SIGNATURE_LEN],
            operator: vec![operator; OPERATOR_LEN],
            contract: contract.map(|c| vec![c; OPERATOR_LEN]),
        }
    }

    fn open_store() -> (SledStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SledStore::open(dir.path()).expect("open");
        (store, dir)
    }

    #[test]
    fn test_upsert_replaces_same_kind() {
        let (store, _dir) = open_store();
        let m = material(1, 9, None);
        store.upsert(&m, 100).unwrap();

        let mut replacement = m.clone();
        replacement.secondary_pubkey = vec![7; SECONDARY_PUBKEY_LEN];
        store.upsert(&replacement, 200).unwrap();

        let records = store.load_by_pubkey(&m.primary_pubkey).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, 200);
        assert_eq!(records[0].material.secondary_pubkey, replacement.secondary_pubkey);
    }

    #[test]
    fn test_solo_and_contract_slots_coexist() {
        let (store, _dir) = open_store();
        let solo = material(1, 9, None);
        let contract = material(1, 9, Some(3));
        store.upsert(&solo, 50).unwrap();
        store.upsert(&contract, 150).unwrap();

        let records = store.load_by_pubkey(&solo.primary_pubkey).unwrap();
        assert_eq!(records.len(), 2);
        // newest first
        assert_eq!(records[0].kind(), RegistrationKind::Contract);
        assert_eq!(records[0].timestamp, 150);
        assert_eq!(records[1].kind(), RegistrationKind::Solo);
    }

    #[test]
    fn test_load_by_operator_newest_first() {
        let (store, _dir) = open_store();
        store.upsert(&material(1, 9, None), 10).unwrap();
        store.upsert(&material(2, 9, None), 30).unwrap();
        store.upsert(&material(3, 9, Some(4)), 20).unwrap();
        store.upsert(&material(4, 8, None), 99).unwrap(); // other operator

        let records = store.load_by_operator(&[9u8; OPERATOR_LEN]).unwrap();
        let stamps: Vec<u64> = records.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![30, 20, 10]);
    }

    #[test]
    fn test_operator_index_follows_replacement() {
        let (store, _dir) = open_store();
        store.upsert(&material(1, 9, None), 10).unwrap();
        // same node, re-registered under a different funding wallet
        store.upsert(&material(1, 5, None), 20).unwrap();

        assert!(store.load_by_operator(&[9u8; OPERATOR_LEN]).unwrap().is_empty());
        let records = store.load_by_operator(&[5u8; OPERATOR_LEN]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, 20);
    }

    #[test]
    fn test_contract_directory_idempotent() {
        let (store, _dir) = open_store();
        let addr = [0xabu8; 20];
        assert!(ContractDirectory::insert(&store, &addr).unwrap());
        assert!(!ContractDirectory::insert(&store, &addr).unwrap());
        assert_eq!(ContractDirectory::all(&store).unwrap(), vec![addr]);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let m = material(1, 9, None);
        {
            let store = SledStore::open(dir.path()).expect("open");
            store.upsert(&m, 42).unwrap();
        }
        let store = SledStore::open(dir.path()).expect("reopen");
        let records = store.load_by_pubkey(&m.primary_pubkey).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, 42);
    }
}
