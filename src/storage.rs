//! Storage technologies (batteries, hot water tanks, ...).
use crate::carrier::CarrierID;
use crate::id::{define_id_getter, define_id_type};
use crate::units::{Capacity, Carbon, CarbonPerCapacity, Dimensionless, Money, MoneyPerCapacity};
use indexmap::IndexMap;
use std::rc::Rc;

define_id_type! {StorageID}

/// A map of [`StorageTechnology`]s, keyed by storage ID
pub type StorageMap = IndexMap<StorageID, Rc<StorageTechnology>>;

/// A candidate storage technology for a single carrier
#[derive(PartialEq, Debug, Clone)]
pub struct StorageTechnology {
    /// Unique identifier for the storage (e.g. "battery")
    pub id: StorageID,
    /// Text description
    pub description: String,
    /// The carrier which is stored
    pub carrier_id: CarrierID,
    /// Investment cost per unit of storage capacity
    pub capital_cost: MoneyPerCapacity,
    /// Investment cost incurred if the storage is installed at all
    pub fixed_cost: Money,
    /// Lifetime in years
    pub lifetime: u32,
    /// Fraction of charged energy which is stored
    pub charge_efficiency: Dimensionless,
    /// Fraction of withdrawn stored energy which is delivered
    pub discharge_efficiency: Dimensionless,
    /// Fraction of the stored energy lost in each time step
    pub standing_loss: Dimensionless,
    /// Maximum charge or discharge per time step, as a fraction of capacity
    pub max_charge_rate: Dimensionless,
    /// Maximum capacity which can be installed
    pub max_capacity: Capacity,
    /// Emissions embodied in each unit of capacity over the whole lifetime
    pub embodied_carbon: CarbonPerCapacity,
    /// Emissions embodied in an installation regardless of its size, over the whole lifetime
    pub fixed_embodied_carbon: Carbon,
}
define_id_getter! {StorageTechnology, StorageID}

/// Iterate over the storage technologies which store the given carrier
pub fn iter_storages_for_carrier<'a>(
    storages: &'a StorageMap,
    carrier_id: &'a CarrierID,
) -> impl Iterator<Item = &'a Rc<StorageTechnology>> {
    storages
        .values()
        .filter(move |storage| storage.carrier_id == *carrier_id)
}
