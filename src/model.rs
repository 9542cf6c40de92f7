//! The model represents the static input data provided by the user.
use crate::carrier::CarrierMap;
use crate::demand::DemandProfiles;
use crate::finance::annualised_cost;
use crate::horizon::{Horizon, TimeSeries};
use crate::retrofit::RetrofitMap;
use crate::storage::StorageMap;
use crate::technology::TechnologyMap;
use crate::units::{Dimensionless, EnergyPerCapacity, Money};
use std::path::PathBuf;

pub mod parameters;
pub use parameters::{ModelParameters, NetworkParameters, ObjectiveMode, SolverParameters};

/// Model definition
#[derive(Debug)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Days and time steps of the operational horizon
    pub horizon: Horizon,
    /// Energy carriers
    pub carriers: CarrierMap,
    /// Conversion technologies which could be installed
    pub technologies: TechnologyMap,
    /// Storage technologies which could be installed
    pub storages: StorageMap,
    /// Retrofit scenarios for the building envelope (may be empty)
    pub retrofits: RetrofitMap,
    /// Demand profiles
    pub demand: DemandProfiles,
    /// Solar irradiance, present iff there is a solar technology
    pub solar: Option<TimeSeries<EnergyPerCapacity>>,
}

impl Model {
    /// The discount rate used to annualise investments
    pub fn discount_rate(&self) -> Dimensionless {
        self.parameters.discount_rate
    }

    /// Annualised investment cost of the district network (zero if there is no network)
    pub fn network_annual_cost(&self) -> Money {
        self.parameters
            .network
            .as_ref()
            .map(|network| {
                annualised_cost(
                    network.cost_per_metre * Dimensionless(network.length),
                    network.lifetime,
                    self.discount_rate(),
                )
            })
            .unwrap_or_default()
    }

    /// Whether the model defines any retrofit scenarios
    pub fn has_retrofit_scenarios(&self) -> bool {
        !self.retrofits.is_empty()
    }
}
