//! Energy carriers (electricity, heat, gas, ...) exchanged within the hub and with the grid.
use crate::id::{define_id_getter, define_id_type};
use crate::units::{CarbonPerEnergy, Dimensionless, MoneyPerEnergy};
use indexmap::IndexMap;
use std::rc::Rc;

define_id_type! {CarrierID}

/// A map of [`Carrier`]s, keyed by carrier ID
pub type CarrierMap = IndexMap<CarrierID, Rc<Carrier>>;

/// An energy carrier
#[derive(PartialEq, Debug, Clone)]
pub struct Carrier {
    /// Unique identifier for the carrier (e.g. "elec")
    pub id: CarrierID,
    /// Text description of carrier (e.g. "electricity")
    pub description: String,
    /// Price paid per unit imported from the grid, if the carrier can be imported
    pub import_price: Option<MoneyPerEnergy>,
    /// Price received per unit exported to the grid, if the carrier can be exported
    pub export_price: Option<MoneyPerEnergy>,
    /// Emissions per unit imported
    pub import_carbon_factor: CarbonPerEnergy,
    /// Emissions avoided elsewhere per unit exported
    pub export_carbon_factor: CarbonPerEnergy,
    /// Fraction of the energy delivered through the local network that reaches the demand
    pub network_efficiency: Dimensionless,
}
define_id_getter! {Carrier, CarrierID}

impl Carrier {
    /// Whether the carrier can be bought from the grid
    pub fn is_importable(&self) -> bool {
        self.import_price.is_some()
    }

    /// Whether the carrier can be sold to the grid
    pub fn is_exportable(&self) -> bool {
        self.export_price.is_some()
    }
}
