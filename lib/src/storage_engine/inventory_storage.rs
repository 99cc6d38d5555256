// lib/src/storage_engine/inventory_storage.rs
// The inventory is a singleton stored under a fixed key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sled::{transaction::ConflictableTransactionError, Db, Tree};
use uuid::Uuid;

use models::errors::{HospitalError, HospitalResult};
use models::medical::{Inventory, InventoryUpdate};

use crate::storage_engine::storage_utils::{decode, decode_tx, encode, encode_tx, map_tx_error};

const INVENTORY_KEY: &[u8] = b"current";

#[async_trait]
pub trait InventoryStorageEngine: Send + Sync + 'static {
    async fn get(&self) -> HospitalResult<Option<Inventory>>;
    /// Returns the stored inventory, storing `seed` first if there is none.
    /// Concurrent first reads all see the same record.
    async fn get_or_insert(&self, seed: Inventory) -> HospitalResult<Inventory>;
    /// Stores `inventory` only if none exists. Returns whether it was stored.
    async fn insert_if_absent(&self, inventory: &Inventory) -> HospitalResult<bool>;
    /// Applies a partial update to the stored inventory (seeding it first if
    /// missing). Nothing is written when the result is invalid.
    async fn update(&self, update: &InventoryUpdate, by: Uuid, now: DateTime<Utc>) -> HospitalResult<Inventory>;
}

/// Sled-backed implementation of the `InventoryStorageEngine` trait.
#[derive(Debug, Clone)]
pub struct SledInventoryStorage {
    tree: Tree,
}

impl SledInventoryStorage {
    pub fn new(db: &Db) -> HospitalResult<Self> {
        Ok(Self { tree: db.open_tree("inventory")? })
    }
}

#[async_trait]
impl InventoryStorageEngine for SledInventoryStorage {
    async fn get(&self) -> HospitalResult<Option<Inventory>> {
        match self.tree.get(INVENTORY_KEY)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_or_insert(&self, seed: Inventory) -> HospitalResult<Inventory> {
        let bytes = encode(&seed)?;
        match self.tree.compare_and_swap(INVENTORY_KEY, None as Option<&[u8]>, Some(bytes))? {
            Ok(()) => {
                info!("Seeded hospital inventory with default figures");
                Ok(seed)
            }
            Err(cas) => match cas.current {
                Some(current) => decode(&current),
                None => Err(HospitalError::StorageError("inventory vanished during seeding".to_string())),
            },
        }
    }

    async fn insert_if_absent(&self, inventory: &Inventory) -> HospitalResult<bool> {
        let bytes = encode(inventory)?;
        let swapped = self.tree.compare_and_swap(INVENTORY_KEY, None as Option<&[u8]>, Some(bytes))?;
        Ok(swapped.is_ok())
    }

    async fn update(&self, update: &InventoryUpdate, by: Uuid, now: DateTime<Utc>) -> HospitalResult<Inventory> {
        let updated = self
            .tree
            .transaction(|tree| {
                let mut inventory = match tree.get(INVENTORY_KEY)? {
                    Some(bytes) => decode_tx::<Inventory>(&bytes)?,
                    None => Inventory::seeded(now, None),
                };
                inventory
                    .apply(update, by, now)
                    .map_err(|e| ConflictableTransactionError::Abort(HospitalError::from(e)))?;
                tree.insert(INVENTORY_KEY, encode_tx(&inventory)?)?;
                Ok(inventory)
            })
            .map_err(map_tx_error)?;
        info!("Inventory updated by {}", by);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::open_temporary_db;

    #[tokio::test]
    async fn first_read_seeds_once() {
        let store = SledInventoryStorage::new(&open_temporary_db().unwrap()).unwrap();
        assert!(store.get().await.unwrap().is_none());

        let first = store.get_or_insert(Inventory::seeded(Utc::now(), None)).await.unwrap();
        let mut other_seed = Inventory::seeded(Utc::now(), None);
        other_seed.total_beds = 1;
        other_seed.occupied_beds = 0;
        let second = store.get_or_insert(other_seed).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.total_beds, 100);
    }

    #[tokio::test]
    async fn insert_if_absent_refuses_second_record() {
        let store = SledInventoryStorage::new(&open_temporary_db().unwrap()).unwrap();
        assert!(store.insert_if_absent(&Inventory::seeded(Utc::now(), None)).await.unwrap());
        assert!(!store.insert_if_absent(&Inventory::seeded(Utc::now(), None)).await.unwrap());
    }

    #[tokio::test]
    async fn invalid_update_writes_nothing() {
        let store = SledInventoryStorage::new(&open_temporary_db().unwrap()).unwrap();
        let seeded = store.get_or_insert(Inventory::seeded(Utc::now(), None)).await.unwrap();
        let bad = InventoryUpdate { occupied_beds: Some(101), ..Default::default() };
        assert!(matches!(
            store.update(&bad, Uuid::new_v4(), Utc::now()).await,
            Err(HospitalError::Validation(_))
        ));
        assert_eq!(store.get().await.unwrap(), Some(seeded));
    }

    #[tokio::test]
    async fn update_upserts_missing_inventory() {
        let store = SledInventoryStorage::new(&open_temporary_db().unwrap()).unwrap();
        let by = Uuid::new_v4();
        let update = InventoryUpdate { occupied_icu: Some(3), ..Default::default() };
        let inv = store.update(&update, by, Utc::now()).await.unwrap();
        assert_eq!(inv.occupied_icu, 3);
        assert_eq!(inv.total_icu, 20);
        assert_eq!(inv.last_updated_by, Some(by));
        assert_eq!(store.get().await.unwrap(), Some(inv));
    }
}
