//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::horizon::Resolution;
use crate::input::{check_non_negative, deserialise_proportion, input_err_msg, read_toml};
use crate::units::{Capacity, Dimensionless, Money};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::from($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_unit_param_default!(default_emissions_tolerance, Dimensionless, 0.01);
define_param_default!(default_steps_per_day, u32, 24);
define_param_default!(default_big_m, f64, 1e6);
define_param_default!(default_retrofit, bool, true);

/// Which objective(s) to optimise
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default, DeserializeLabeledStringEnum, clap::ValueEnum)]
pub enum ObjectiveMode {
    /// Minimise total annualised cost
    #[default]
    #[string = "cost"]
    #[value(name = "cost")]
    Cost,
    /// Minimise emissions, then cost at (nearly) minimal emissions
    #[string = "emissions"]
    #[value(name = "emissions")]
    Emissions,
    /// Trace the cost/emissions trade-off with an epsilon-constraint sweep
    #[string = "multi_objective"]
    #[value(name = "multi_objective")]
    MultiObjective,
}

/// Parameters for the district network connecting the buildings
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct NetworkParameters {
    /// Total length of the network in metres
    pub length: f64,
    /// Investment cost per metre
    pub cost_per_metre: Money,
    /// Lifetime of the network in years
    pub lifetime: u32,
}

/// Settings passed on to the MILP solver
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
pub struct SolverParameters {
    /// Maximum wall-clock time per solve, in seconds
    pub time_limit: Option<f64>,
    /// Relative MIP optimality gap
    pub mip_gap: Option<f64>,
}

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ModelParameters {
    /// How time is represented
    #[serde(default)]
    pub resolution: Resolution,
    /// Which objective(s) to optimise
    #[serde(default)]
    pub objective: ObjectiveMode,
    /// Number of intermediate Pareto points (multi-objective mode only)
    pub pareto_points: Option<u32>,
    /// Whether to choose between retrofit scenarios (if any are defined)
    #[serde(default = "default_retrofit")]
    pub retrofit: bool,
    /// Number of time steps per day
    #[serde(default = "default_steps_per_day")]
    pub steps_per_day: u32,
    /// Discount rate used to annualise investments
    #[serde(deserialize_with = "deserialise_proportion")]
    pub discount_rate: Dimensionless,
    /// Roof area available for solar collectors (unlimited if absent)
    pub roof_area: Option<Capacity>,
    /// Upper bound used to link continuous variables to binary ones.
    ///
    /// Should comfortably exceed any capacity or flow in the model.
    #[serde(default = "default_big_m")]
    pub big_m: f64,
    /// The smallest capacity a conversion technology can be installed with
    #[serde(default)]
    pub minimum_capacity: Capacity,
    /// Relative slack on minimal emissions when minimising cost afterwards
    #[serde(default = "default_emissions_tolerance")]
    pub emissions_tolerance: Dimensionless,
    /// The district network, if any
    pub network: Option<NetworkParameters>,
    /// Solver settings
    #[serde(default)]
    pub solver: SolverParameters,
}

/// Check that the `steps_per_day` parameter is valid
fn check_steps_per_day(value: u32) -> Result<()> {
    ensure!(value > 0, "steps_per_day cannot be zero");

    Ok(())
}

/// Check that the `big_m` parameter is valid
fn check_big_m(value: f64, minimum_capacity: Capacity) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "big_m must be a finite number greater than zero"
    );
    ensure!(
        minimum_capacity.0 < value,
        "minimum_capacity must be less than big_m"
    );

    Ok(())
}

/// Check that the solver parameters are valid
fn check_solver_parameters(solver: &SolverParameters) -> Result<()> {
    if let Some(time_limit) = solver.time_limit {
        ensure!(
            time_limit.is_finite() && time_limit >= 0.0,
            "solver.time_limit must be a finite number >= 0"
        );
    }
    if let Some(mip_gap) = solver.mip_gap {
        ensure!(
            (0.0..1.0).contains(&mip_gap),
            "solver.mip_gap must be >= 0 and < 1"
        );
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_steps_per_day(self.steps_per_day)?;
        check_big_m(self.big_m, self.minimum_capacity)?;
        check_non_negative("minimum_capacity", self.minimum_capacity.0)?;
        check_non_negative("emissions_tolerance", self.emissions_tolerance.0)?;
        if let Some(roof_area) = self.roof_area {
            check_non_negative("roof_area", roof_area.0)?;
        }
        if let Some(network) = &self.network {
            check_non_negative("network.length", network.length)?;
            check_non_negative("network.cost_per_metre", network.cost_per_metre.0)?;
        }
        check_solver_parameters(&self.solver)?;

        Ok(())
    }
}
