//! Code for formulating the hub design and operation problem as a MILP.
//!
//! A fresh problem is built for every solve. Columns are only ever created through a
//! [`VariableMap`], so the position of a key in the map is also the index of its column in the
//! solution.
use crate::carrier::CarrierID;
use crate::error::{EnergyHubError, Result};
use crate::finance::{
    annual_capital_cost, annual_embodied_carbon, annualised_carbon, annualised_cost,
};
use crate::horizon::{Resolution, StorageLink, TimeStep};
use crate::model::{Model, ModelParameters, ObjectiveMode};
use crate::retrofit::RetrofitID;
use crate::storage::StorageID;
use crate::technology::TechnologyID;
use crate::units::{Dimensionless, Money};
use highs::RowProblem as Problem;
use indexmap::IndexMap;
use std::fmt::Display;
use std::ops::RangeBounds;

pub mod constraints;
use constraints::add_constraints;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
pub type Variable = highs::Col;

/// The criterion minimised by a single solve
#[derive(PartialEq, Eq, Clone, Copy, Debug, derive_more::Display)]
pub enum Objective {
    /// Total annualised cost
    #[display("cost")]
    Cost,
    /// Total annual emissions
    #[display("emissions")]
    Emissions,
}

/// Options controlling how the problem is formulated
#[derive(PartialEq, Clone, Debug)]
pub struct BuildOptions {
    /// How time is represented
    pub resolution: Resolution,
    /// Which objective(s) to optimise
    pub objective: ObjectiveMode,
    /// Number of intermediate Pareto points
    pub pareto_points: Option<u32>,
    /// Whether to choose between retrofit scenarios
    pub retrofit: bool,
}

impl BuildOptions {
    /// Take the options from the model file
    pub fn from_parameters(parameters: &ModelParameters) -> Self {
        Self {
            resolution: parameters.resolution,
            objective: parameters.objective,
            pareto_points: parameters.pareto_points,
            retrofit: parameters.retrofit,
        }
    }

    /// Check that the options are consistent with each other and with the model
    pub fn validate(&self, model: &Model) -> Result<()> {
        match (self.objective, self.pareto_points) {
            (ObjectiveMode::MultiObjective, None) => {
                return Err(EnergyHubError::build(
                    "multi-objective optimisation requires the number of Pareto points",
                ));
            }
            (ObjectiveMode::MultiObjective, Some(0)) => {
                return Err(EnergyHubError::build(
                    "the number of Pareto points must be greater than zero",
                ));
            }
            (ObjectiveMode::Cost | ObjectiveMode::Emissions, Some(_)) => {
                return Err(EnergyHubError::build(format!(
                    "Pareto points were given, but the objective is {:?} rather than multi-objective",
                    self.objective
                )));
            }
            _ => {}
        }

        match self.resolution {
            Resolution::TypicalDaysContinuous if model.horizon.calendar.is_none() => {
                Err(EnergyHubError::build(
                    "continuous state of charge requires a calendar (calendar.csv)",
                ))
            }
            Resolution::FullYear
                if model
                    .horizon
                    .day_weights
                    .iter()
                    .any(|weight| *weight != Dimensionless(1.0)) =>
            {
                Err(EnergyHubError::build(
                    "full-year resolution requires every day to have a weight of 1",
                ))
            }
            _ => Ok(()),
        }
    }

    /// Whether the choice between retrofit scenarios is part of the problem
    pub fn retrofit_active(&self, model: &Model) -> bool {
        self.retrofit && model.has_retrofit_scenarios()
    }
}

/// Groups of decision variables
#[derive(
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum VariableFamily {
    /// Installed capacity of a conversion technology
    Capacity,
    /// Whether a conversion technology is installed
    Installed,
    /// Input flow of a conversion technology
    Input,
    /// Whether a technology with a minimum part load is running
    On,
    /// Energy imported from the grid
    Import,
    /// Energy exported to the grid
    Export,
    /// Installed capacity of a storage technology
    StorageCapacity,
    /// Whether a storage technology is installed
    StorageInstalled,
    /// Energy put into storage
    Charge,
    /// Energy taken out of storage
    Discharge,
    /// Energy held in storage at the end of a step
    StateOfCharge,
    /// Whether a retrofit scenario is selected
    Retrofit,
}

impl VariableFamily {
    /// Whether variables of this family are binary
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Self::Installed | Self::On | Self::StorageInstalled | Self::Retrofit
        )
    }

    /// The part of the cost breakdown which this family's cost contributes to
    pub fn cost_category(self) -> Option<CostCategory> {
        match self {
            Self::Capacity
            | Self::Installed
            | Self::StorageCapacity
            | Self::StorageInstalled
            | Self::Retrofit => Some(CostCategory::Investment),
            Self::Input | Self::Import => Some(CostCategory::Operating),
            Self::Export => Some(CostCategory::ExportIncome),
            Self::On | Self::Charge | Self::Discharge | Self::StateOfCharge => None,
        }
    }
}

/// Parts of the total cost
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum CostCategory {
    /// Annualised investment in equipment and retrofits
    Investment,
    /// Fuel, maintenance and grid imports
    Operating,
    /// Income from grid exports (has a negative cost coefficient)
    ExportIncome,
}

/// A key for a [`VariableMap`]
#[derive(Eq, PartialEq, Hash, Clone, Debug)]
pub enum VariableKey {
    /// See [`VariableFamily::Capacity`]
    Capacity(TechnologyID),
    /// See [`VariableFamily::Installed`]
    Installed(TechnologyID),
    /// See [`VariableFamily::Input`]
    Input(TechnologyID, TimeStep),
    /// See [`VariableFamily::On`]
    On(TechnologyID, TimeStep),
    /// See [`VariableFamily::Import`]
    Import(CarrierID, TimeStep),
    /// See [`VariableFamily::Export`]
    Export(CarrierID, TimeStep),
    /// See [`VariableFamily::StorageCapacity`]
    StorageCapacity(StorageID),
    /// See [`VariableFamily::StorageInstalled`]
    StorageInstalled(StorageID),
    /// See [`VariableFamily::Charge`]
    Charge(StorageID, TimeStep),
    /// See [`VariableFamily::Discharge`]
    Discharge(StorageID, TimeStep),
    /// State of charge at a SoC step (a calendar day in continuous mode)
    StateOfCharge(StorageID, TimeStep),
    /// See [`VariableFamily::Retrofit`]
    Retrofit(RetrofitID),
}

impl VariableKey {
    /// The family this variable belongs to
    pub fn family(&self) -> VariableFamily {
        match self {
            Self::Capacity(_) => VariableFamily::Capacity,
            Self::Installed(_) => VariableFamily::Installed,
            Self::Input(..) => VariableFamily::Input,
            Self::On(..) => VariableFamily::On,
            Self::Import(..) => VariableFamily::Import,
            Self::Export(..) => VariableFamily::Export,
            Self::StorageCapacity(_) => VariableFamily::StorageCapacity,
            Self::StorageInstalled(_) => VariableFamily::StorageInstalled,
            Self::Charge(..) => VariableFamily::Charge,
            Self::Discharge(..) => VariableFamily::Discharge,
            Self::StateOfCharge(..) => VariableFamily::StateOfCharge,
            Self::Retrofit(_) => VariableFamily::Retrofit,
        }
    }

    /// The ID of the technology, carrier, storage or scenario the variable refers to
    pub fn id(&self) -> &str {
        match self {
            Self::Capacity(id) | Self::Installed(id) | Self::Input(id, _) | Self::On(id, _) => {
                &id.0
            }
            Self::Import(id, _) | Self::Export(id, _) => &id.0,
            Self::StorageCapacity(id)
            | Self::StorageInstalled(id)
            | Self::Charge(id, _)
            | Self::Discharge(id, _)
            | Self::StateOfCharge(id, _) => &id.0,
            Self::Retrofit(id) => &id.0,
        }
    }

    /// The time step for operational variables
    pub fn time_step(&self) -> Option<TimeStep> {
        match self {
            Self::Input(_, ts)
            | Self::On(_, ts)
            | Self::Import(_, ts)
            | Self::Export(_, ts)
            | Self::Charge(_, ts)
            | Self::Discharge(_, ts)
            | Self::StateOfCharge(_, ts) => Some(*ts),
            Self::Capacity(_)
            | Self::Installed(_)
            | Self::StorageCapacity(_)
            | Self::StorageInstalled(_)
            | Self::Retrofit(_) => None,
        }
    }
}

impl Display for VariableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.time_step() {
            Some(ts) => write!(f, "{}[{},{ts}]", self.family(), self.id()),
            None => write!(f, "{}[{}]", self.family(), self.id()),
        }
    }
}

/// A column of the problem along with both of its objective coefficients
#[derive(Clone, Copy)]
pub struct VariableInfo {
    /// The column
    pub var: Variable,
    /// Contribution to total annualised cost per unit
    pub cost: f64,
    /// Contribution to annual emissions per unit
    pub carbon: f64,
}

/// A map for easy lookup of variables in the problem.
///
/// The entries are ordered (see [`IndexMap`]).
///
/// We use this data structure for two things:
///
/// 1. In order define constraints for the optimisation
/// 2. To keep track of the combination of parameters that each variable corresponds to, for when we
///    are reading the results of the optimisation.
#[derive(Default)]
pub struct VariableMap(IndexMap<VariableKey, VariableInfo>);

impl VariableMap {
    /// Add a column for `key`, using the coefficient which matches `objective`
    fn add(
        &mut self,
        problem: &mut Problem,
        objective: Objective,
        key: VariableKey,
        cost: f64,
        carbon: f64,
    ) {
        let coeff = match objective {
            Objective::Cost => cost,
            Objective::Emissions => carbon,
        };
        let var = if key.family().is_binary() {
            problem.add_integer_column(coeff, 0.0..=1.0)
        } else {
            problem.add_column(coeff, 0.0..)
        };

        let existing = self
            .0
            .insert(key, VariableInfo { var, cost, carbon })
            .is_some();
        assert!(!existing, "Duplicate entry for var");
    }

    /// Get the [`Variable`] corresponding to the given key.
    pub fn get(&self, key: &VariableKey) -> Variable {
        self.0
            .get(key)
            .expect("No variable found for given params")
            .var
    }

    /// Get the [`Variable`] corresponding to the given key, if there is one
    pub fn get_opt(&self, key: &VariableKey) -> Option<Variable> {
        self.0.get(key).map(|info| info.var)
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the problem has no variables
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of binary variables
    pub fn num_binaries(&self) -> usize {
        self.0.keys().filter(|key| key.family().is_binary()).count()
    }

    /// Iterate over the variables in column order
    pub fn iter(&self) -> impl Iterator<Item = (&VariableKey, &VariableInfo)> {
        self.0.iter()
    }

    /// Terms for the total annual emissions
    fn iter_carbon_terms(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        self.0
            .values()
            .filter(|info| info.carbon != 0.0)
            .map(|info| (info.var, info.carbon))
    }
}

/// Groups of constraints
#[derive(
    PartialEq, Eq, Hash, Clone, Copy, Debug, strum::Display, strum::EnumIter, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ConstraintFamily {
    /// Supply equals demand for each carrier and time step
    EnergyBalance,
    /// Input flows are limited by installed capacity
    Capacity,
    /// Solar input is irradiance times collector area
    SolarInput,
    /// Solar collectors fit on the roof
    RoofArea,
    /// Capacity can only be built if the technology is installed
    Installation,
    /// Running technologies operate above their minimum part load
    PartLoad,
    /// State-of-charge dynamics
    StorageBalance,
    /// Charge and discharge are limited by storage capacity
    StorageRate,
    /// State of charge and storage capacity limits
    StorageCapacity,
    /// Exactly one retrofit scenario is selected
    RetrofitSelection,
    /// Total emissions stay within a cap
    EmissionsCap,
}

/// The rows of the problem, counted by family
pub struct Rows {
    problem: Problem,
    counts: IndexMap<ConstraintFamily, usize>,
}

impl Rows {
    /// Add a constraint `bounds` on the sum of `terms`
    pub fn add<B, I>(&mut self, family: ConstraintFamily, bounds: B, terms: I)
    where
        B: RangeBounds<f64>,
        I: IntoIterator<Item = (Variable, f64)>,
    {
        self.problem.add_row(bounds, terms);
        *self.counts.entry(family).or_default() += 1;
    }
}

/// The state of a problem under construction.
///
/// Created afresh for every solve and consumed by [`ModelBuilder::finish`].
pub struct ModelBuilder<'a> {
    model: &'a Model,
    options: &'a BuildOptions,
    objective: Objective,
    storage_links: Vec<StorageLink>,
    rows: Rows,
    variables: VariableMap,
}

impl<'a> ModelBuilder<'a> {
    /// Start a new problem, checking the options first
    pub fn new(model: &'a Model, options: &'a BuildOptions, objective: Objective) -> Result<Self> {
        options.validate(model)?;
        let storage_links = model
            .horizon
            .storage_links(options.resolution)
            .ok_or_else(|| EnergyHubError::build("no storage links for this resolution"))?;

        Ok(Self {
            model,
            options,
            objective,
            storage_links,
            rows: Rows {
                problem: Problem::default(),
                counts: IndexMap::new(),
            },
            variables: VariableMap::default(),
        })
    }

    /// Add a column to the problem
    fn add_variable(&mut self, key: VariableKey, cost: f64, carbon: f64) {
        self.variables
            .add(&mut self.rows.problem, self.objective, key, cost, carbon);
    }

    /// Add all decision variables along with their cost and emission coefficients
    pub fn add_variables(&mut self) {
        let model = self.model;
        let horizon = &model.horizon;
        let discount_rate = model.discount_rate();
        let soc_steps = self.storage_links.iter().map(|link| link.soc).collect::<Vec<_>>();

        for technology in model.technologies.values() {
            let id = &technology.id;
            self.add_variable(
                VariableKey::Capacity(id.clone()),
                annual_capital_cost(technology.capital_cost, technology.lifetime, discount_rate).0,
                annual_embodied_carbon(technology.embodied_carbon, technology.lifetime).0,
            );
            self.add_variable(
                VariableKey::Installed(id.clone()),
                annualised_cost(technology.fixed_cost, technology.lifetime, discount_rate).0,
                annualised_carbon(technology.fixed_embodied_carbon, technology.lifetime).0,
            );

            for ts in horizon.iter() {
                let weight = horizon.weight(ts);
                self.add_variable(
                    VariableKey::Input(id.clone(), ts),
                    (technology.operating_cost * weight).0,
                    (technology.carbon_factor * weight).0,
                );
                if technology.has_part_load() {
                    self.add_variable(VariableKey::On(id.clone(), ts), 0.0, 0.0);
                }
            }
        }

        for carrier in model.carriers.values() {
            for ts in horizon.iter() {
                let weight = horizon.weight(ts);
                if let Some(price) = carrier.import_price {
                    self.add_variable(
                        VariableKey::Import(carrier.id.clone(), ts),
                        (price * weight).0,
                        (carrier.import_carbon_factor * weight).0,
                    );
                }
                if let Some(price) = carrier.export_price {
                    self.add_variable(
                        VariableKey::Export(carrier.id.clone(), ts),
                        -(price * weight).0,
                        -(carrier.export_carbon_factor * weight).0,
                    );
                }
            }
        }

        for storage in model.storages.values() {
            let id = &storage.id;
            self.add_variable(
                VariableKey::StorageCapacity(id.clone()),
                annual_capital_cost(storage.capital_cost, storage.lifetime, discount_rate).0,
                annual_embodied_carbon(storage.embodied_carbon, storage.lifetime).0,
            );
            self.add_variable(
                VariableKey::StorageInstalled(id.clone()),
                annualised_cost(storage.fixed_cost, storage.lifetime, discount_rate).0,
                annualised_carbon(storage.fixed_embodied_carbon, storage.lifetime).0,
            );
            for ts in horizon.iter() {
                self.add_variable(VariableKey::Charge(id.clone(), ts), 0.0, 0.0);
                self.add_variable(VariableKey::Discharge(id.clone(), ts), 0.0, 0.0);
            }
            for soc in soc_steps.iter().copied() {
                self.add_variable(VariableKey::StateOfCharge(id.clone(), soc), 0.0, 0.0);
            }
        }

        if self.options.retrofit_active(model) {
            for scenario in model.retrofits.values() {
                self.add_variable(
                    VariableKey::Retrofit(scenario.id.clone()),
                    annualised_cost(scenario.cost, scenario.lifetime, discount_rate).0,
                    annualised_carbon(scenario.embodied_carbon, scenario.lifetime).0,
                );
            }
        }
    }

    /// Add all constraint families, plus a cap on emissions if one is given
    pub fn add_constraints(&mut self, emissions_cap: Option<f64>) {
        add_constraints(
            &mut self.rows,
            &self.variables,
            self.model,
            self.options,
            &self.storage_links,
        );

        if let Some(cap) = emissions_cap {
            let terms = self.variables.iter_carbon_terms().collect::<Vec<_>>();
            self.rows.add(ConstraintFamily::EmissionsCap, ..=cap, terms);
        }
    }

    /// Finish building, discarding the builder state
    pub fn finish(self) -> BuiltModel {
        BuiltModel {
            problem: self.rows.problem,
            variables: self.variables,
            constraint_counts: self.rows.counts,
            objective: self.objective,
            network_cost: self.model.network_annual_cost(),
        }
    }
}

/// A problem ready to be passed to the solver
pub struct BuiltModel {
    /// The problem itself
    pub problem: Problem,
    /// The problem's columns
    pub variables: VariableMap,
    /// Number of rows per constraint family
    pub constraint_counts: IndexMap<ConstraintFamily, usize>,
    /// The criterion being minimised
    pub objective: Objective,
    /// Annualised network investment, a constant outside the problem
    pub network_cost: Money,
}

impl BuiltModel {
    /// Total number of rows
    pub fn num_constraints(&self) -> usize {
        self.constraint_counts.values().sum()
    }
}

/// Build the problem for a single solve.
///
/// # Arguments
///
/// * `model` - The model
/// * `options` - How to formulate the problem
/// * `objective` - The criterion to minimise
/// * `emissions_cap` - Upper limit on total annual emissions, if any
pub fn build_model(
    model: &Model,
    options: &BuildOptions,
    objective: Objective,
    emissions_cap: Option<f64>,
) -> Result<BuiltModel> {
    let mut builder = ModelBuilder::new(model, options, objective)?;
    builder.add_variables();
    builder.add_constraints(emissions_cap);

    Ok(builder.finish())
}
