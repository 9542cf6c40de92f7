//! Conversion technologies: boilers, heat pumps, CHP units, solar collectors and the like.
use crate::carrier::CarrierID;
use crate::id::{define_id_getter, define_id_type};
use crate::units::{
    Capacity, Carbon, CarbonPerCapacity, CarbonPerEnergy, Dimensionless, Money,
    MoneyPerCapacity, MoneyPerEnergy,
};
use indexmap::IndexMap;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::rc::Rc;

define_id_type! {TechnologyID}

/// A map of [`ConversionTechnology`]s, keyed by technology ID
pub type TechnologyMap = IndexMap<TechnologyID, Rc<ConversionTechnology>>;

/// How the input of a technology is determined
#[derive(PartialEq, Eq, Copy, Clone, Debug, DeserializeLabeledStringEnum)]
pub enum TechnologyKind {
    /// Input can be chosen freely up to the installed capacity
    #[string = "dispatchable"]
    Dispatchable,
    /// Input is fixed by solar irradiance times the installed collector area
    #[string = "solar"]
    Solar,
}

/// A candidate conversion technology.
///
/// Capacity is rated on the input stream. Each unit of input produces `factor` units of every
/// carrier with a positive conversion factor and consumes `-factor` units of every carrier with a
/// negative one.
#[derive(PartialEq, Debug, Clone)]
pub struct ConversionTechnology {
    /// Unique identifier for the technology (e.g. "gas_boiler")
    pub id: TechnologyID,
    /// Text description
    pub description: String,
    /// Dispatchable or solar
    pub kind: TechnologyKind,
    /// Investment cost per unit of capacity
    pub capital_cost: MoneyPerCapacity,
    /// Investment cost incurred if the technology is installed at all
    pub fixed_cost: Money,
    /// Lifetime in years
    pub lifetime: u32,
    /// Cost per unit of input (e.g. fuel)
    pub operating_cost: MoneyPerEnergy,
    /// Emissions per unit of input
    pub carbon_factor: CarbonPerEnergy,
    /// Emissions embodied in each unit of capacity over the whole lifetime
    pub embodied_carbon: CarbonPerCapacity,
    /// Emissions embodied in an installation regardless of its size, over the whole lifetime
    pub fixed_embodied_carbon: Carbon,
    /// Minimum input, as a fraction of capacity, whenever the technology is running
    pub min_part_load: Dimensionless,
    /// Maximum capacity which can be installed
    pub max_capacity: Option<Capacity>,
    /// Conversion factors per carrier
    pub conversion_factors: IndexMap<CarrierID, Dimensionless>,
}
define_id_getter! {ConversionTechnology, TechnologyID}

impl ConversionTechnology {
    /// Whether this is a solar technology
    pub fn is_solar(&self) -> bool {
        self.kind == TechnologyKind::Solar
    }

    /// Whether on/off decisions need to be modelled
    pub fn has_part_load(&self) -> bool {
        !self.is_solar() && self.min_part_load.0 > 0.0
    }

    /// The conversion factor for the given carrier (zero if the carrier is not involved)
    pub fn factor(&self, carrier_id: &CarrierID) -> Dimensionless {
        self.conversion_factors
            .get(carrier_id)
            .copied()
            .unwrap_or(Dimensionless(0.0))
    }

    /// Iterate over carriers produced by this technology along with their factors
    pub fn iter_outputs(&self) -> impl Iterator<Item = (&CarrierID, Dimensionless)> {
        self.conversion_factors
            .iter()
            .filter(|(_, factor)| factor.0 > 0.0)
            .map(|(id, factor)| (id, *factor))
    }
}
