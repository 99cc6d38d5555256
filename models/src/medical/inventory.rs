// models/src/medical/inventory.rs
// The hospital-wide capacity tracker. There is exactly one inventory record;
// storage creates it on first read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};

pub const MAX_NOTES_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub total_beds: u32,
    pub occupied_beds: u32,
    #[serde(rename = "totalICU")]
    pub total_icu: u32,
    #[serde(rename = "occupiedICU")]
    pub occupied_icu: u32,
    pub total_emergency_wards: u32,
    pub occupied_emergency_wards: u32,
    pub total_oxygen_cylinders: u32,
    pub in_use_oxygen_cylinders: u32,
    pub last_updated_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update. Unset counters keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUpdate {
    pub total_beds: Option<u32>,
    pub occupied_beds: Option<u32>,
    #[serde(rename = "totalICU")]
    pub total_icu: Option<u32>,
    #[serde(rename = "occupiedICU")]
    pub occupied_icu: Option<u32>,
    pub total_emergency_wards: Option<u32>,
    pub occupied_emergency_wards: Option<u32>,
    pub total_oxygen_cylinders: Option<u32>,
    pub in_use_oxygen_cylinders: Option<u32>,
    pub notes: Option<String>,
}

fn percentage(used: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (f64::from(used) / f64::from(total) * 10_000.0).round() / 100.0
}

impl Inventory {
    /// The figures a fresh installation starts from.
    pub fn seeded(now: DateTime<Utc>, by: Option<Uuid>) -> Self {
        Inventory {
            total_beds: 100,
            occupied_beds: 45,
            total_icu: 20,
            occupied_icu: 12,
            total_emergency_wards: 15,
            occupied_emergency_wards: 8,
            total_oxygen_cylinders: 50,
            in_use_oxygen_cylinders: 25,
            last_updated_by: by,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if self.occupied_beds > self.total_beds {
            return Err(ValidationError::ExceedsTotal("Occupied beds", "total beds"));
        }
        if self.occupied_icu > self.total_icu {
            return Err(ValidationError::ExceedsTotal("Occupied ICU", "total ICU"));
        }
        if self.occupied_emergency_wards > self.total_emergency_wards {
            return Err(ValidationError::ExceedsTotal("Occupied emergency wards", "total"));
        }
        if self.in_use_oxygen_cylinders > self.total_oxygen_cylinders {
            return Err(ValidationError::ExceedsTotal("Oxygen cylinders in use", "total"));
        }
        if self.notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
            return Err(ValidationError::TooLong { field: "Notes", max: MAX_NOTES_LEN });
        }
        Ok(())
    }

    /// Applies `update` on a copy and only commits it if the result is valid.
    pub fn apply(&mut self, update: &InventoryUpdate, by: Uuid, now: DateTime<Utc>) -> ValidationResult<()> {
        let mut next = self.clone();
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(v) = update.$field { next.$field = v; })*
            };
        }
        set!(
            total_beds,
            occupied_beds,
            total_icu,
            occupied_icu,
            total_emergency_wards,
            occupied_emergency_wards,
            total_oxygen_cylinders,
            in_use_oxygen_cylinders
        );
        if let Some(notes) = &update.notes {
            next.notes = Some(notes.clone());
        }
        next.validate()?;
        next.last_updated_by = Some(by);
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    pub fn stats(&self) -> InventoryStats {
        InventoryStats {
            beds: ResourceStats::new(self.total_beds, self.occupied_beds),
            icu: ResourceStats::new(self.total_icu, self.occupied_icu),
            emergency_wards: ResourceStats::new(self.total_emergency_wards, self.occupied_emergency_wards),
            oxygen_cylinders: OxygenStats {
                total: self.total_oxygen_cylinders,
                in_use: self.in_use_oxygen_cylinders,
                available: self.total_oxygen_cylinders.saturating_sub(self.in_use_oxygen_cylinders),
                usage_percentage: percentage(self.in_use_oxygen_cylinders, self.total_oxygen_cylinders),
            },
        }
    }

    /// The stored record plus derived availability and occupancy figures.
    pub fn view(&self) -> InventoryView {
        let stats = self.stats();
        InventoryView {
            available_beds: stats.beds.available,
            available_icu: stats.icu.available,
            available_emergency_wards: stats.emergency_wards.available,
            available_oxygen_cylinders: stats.oxygen_cylinders.available,
            bed_occupancy_percentage: stats.beds.occupancy_percentage,
            icu_occupancy_percentage: stats.icu.occupancy_percentage,
            emergency_ward_occupancy_percentage: stats.emergency_wards.occupancy_percentage,
            oxygen_cylinder_usage_percentage: stats.oxygen_cylinders.usage_percentage,
            inventory: self.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryView {
    #[serde(flatten)]
    pub inventory: Inventory,
    pub available_beds: u32,
    #[serde(rename = "availableICU")]
    pub available_icu: u32,
    pub available_emergency_wards: u32,
    pub available_oxygen_cylinders: u32,
    pub bed_occupancy_percentage: f64,
    pub icu_occupancy_percentage: f64,
    pub emergency_ward_occupancy_percentage: f64,
    pub oxygen_cylinder_usage_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStats {
    pub total: u32,
    pub occupied: u32,
    pub available: u32,
    pub occupancy_percentage: f64,
}

impl ResourceStats {
    fn new(total: u32, occupied: u32) -> Self {
        ResourceStats {
            total,
            occupied,
            available: total.saturating_sub(occupied),
            occupancy_percentage: percentage(occupied, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OxygenStats {
    pub total: u32,
    pub in_use: u32,
    pub available: u32,
    pub usage_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub beds: ResourceStats,
    pub icu: ResourceStats,
    pub emergency_wards: ResourceStats,
    pub oxygen_cylinders: OxygenStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_inventory_is_valid() {
        let inv = Inventory::seeded(Utc::now(), None);
        assert!(inv.validate().is_ok());
        let stats = inv.stats();
        assert_eq!(stats.beds.available, 55);
        assert_eq!(stats.beds.occupancy_percentage, 45.0);
        assert_eq!(stats.icu.occupancy_percentage, 60.0);
        assert_eq!(stats.oxygen_cylinders.usage_percentage, 50.0);
    }

    #[test]
    fn percentages_round_to_two_decimals_and_handle_zero_totals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 0), 0.0);
    }

    #[test]
    fn update_rejects_occupancy_above_total() {
        let mut inv = Inventory::seeded(Utc::now(), None);
        let before = inv.clone();
        let update = InventoryUpdate { occupied_icu: Some(21), ..Default::default() };
        let err = inv.apply(&update, Uuid::new_v4(), Utc::now()).unwrap_err();
        assert_eq!(err, ValidationError::ExceedsTotal("Occupied ICU", "total ICU"));
        assert_eq!(inv, before);
    }

    #[test]
    fn update_checks_against_new_totals() {
        let mut inv = Inventory::seeded(Utc::now(), None);
        let by = Uuid::new_v4();
        let update = InventoryUpdate { total_beds: Some(200), occupied_beds: Some(150), ..Default::default() };
        inv.apply(&update, by, Utc::now()).unwrap();
        assert_eq!(inv.occupied_beds, 150);
        assert_eq!(inv.last_updated_by, Some(by));

        let shrink = InventoryUpdate { total_beds: Some(100), ..Default::default() };
        assert!(inv.apply(&shrink, by, Utc::now()).is_err());
    }

    #[test]
    fn notes_are_capped() {
        let mut inv = Inventory::seeded(Utc::now(), None);
        let update = InventoryUpdate { notes: Some("n".repeat(501)), ..Default::default() };
        assert!(inv.apply(&update, Uuid::new_v4(), Utc::now()).is_err());
    }

    #[test]
    fn view_uses_wire_names() {
        let json = serde_json::to_value(Inventory::seeded(Utc::now(), None).view()).unwrap();
        assert_eq!(json["totalICU"], 20);
        assert_eq!(json["availableICU"], 8);
        assert_eq!(json["availableBeds"], 55);
        assert_eq!(json["inUseOxygenCylinders"], 25);
    }
}
