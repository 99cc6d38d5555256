// lib/src/engine/inventory.rs
use std::sync::Arc;

use chrono::Utc;

use models::errors::{HospitalError, HospitalResult};
use models::medical::{Inventory, InventoryStats, InventoryUpdate, InventoryView};
use security::{authorize, Action, Caller, Resource};

use crate::storage_engine::InventoryStorageEngine;

const INITIAL_SETUP_NOTE: &str = "Initial inventory setup";

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn InventoryStorageEngine>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn InventoryStorageEngine>) -> Self {
        Self { store }
    }

    /// Current figures. The first read seeds the default inventory.
    pub async fn get(&self) -> HospitalResult<InventoryView> {
        let inventory = self.store.get_or_insert(Inventory::seeded(Utc::now(), None)).await?;
        Ok(inventory.view())
    }

    pub async fn update(&self, caller: &Caller, update: InventoryUpdate) -> HospitalResult<InventoryView> {
        authorize(caller, Action::UpdateInventory, Resource::None)?;
        let inventory = self.store.update(&update, caller.id, Utc::now()).await?;
        Ok(inventory.view())
    }

    /// Unlike `get`, never seeds.
    pub async fn stats(&self) -> HospitalResult<InventoryStats> {
        match self.store.get().await? {
            Some(inventory) => Ok(inventory.stats()),
            None => Err(HospitalError::NotFound("Inventory not found".to_string())),
        }
    }

    pub async fn initialize(&self, caller: &Caller) -> HospitalResult<InventoryView> {
        authorize(caller, Action::InitializeInventory, Resource::None)?;
        let mut inventory = Inventory::seeded(Utc::now(), Some(caller.id));
        inventory.notes = Some(INITIAL_SETUP_NOTE.to_string());
        if !self.store.insert_if_absent(&inventory).await? {
            return Err(HospitalError::invalid("Inventory already initialized"));
        }
        Ok(inventory.view())
    }
}
