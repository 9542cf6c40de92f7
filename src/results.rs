//! Code for mapping the values of an optimal solution back onto the model.
use crate::horizon::TimeStep;
use crate::model::Model;
use crate::optimisation::{CostCategory, VariableFamily, VariableKey};
use crate::solver::Solution;
use crate::units::{Carbon, Money};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Binary variables above this value are treated as set
const BINARY_THRESHOLD: f64 = 0.5;

/// The breakdown of the objectives for a single solution
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy, Default)]
pub struct ObjectiveSummary {
    /// Investment plus operating cost, minus export income
    pub total_cost: Money,
    /// Annualised investment in equipment, retrofits and the network
    pub investment_cost: Money,
    /// Annual fuel, maintenance and import costs
    pub operating_cost: Money,
    /// Annual income from exports
    pub export_income: Money,
    /// Annual emissions, including embodied emissions spread over equipment lifetimes
    pub total_carbon: Carbon,
}

/// A design decision: a capacity, an installation binary or the selected retrofit scenario
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct DesignRecord {
    /// Name of the variable family
    pub variable: String,
    /// The technology, storage or scenario
    pub id: String,
    /// The value of the variable
    pub value: f64,
}

/// The value of an operational quantity at a single time step
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct OperationRecord {
    /// Name of the quantity
    pub variable: String,
    /// The technology, carrier or storage (`technology:carrier` for outputs and consumption)
    pub id: String,
    /// The day (a calendar day for state of charge in continuous mode)
    pub day: u32,
    /// The step within the day
    pub time_step: u32,
    /// The value
    pub value: f64,
}

impl OperationRecord {
    fn new(variable: &str, id: impl Into<String>, ts: TimeStep, value: f64) -> Self {
        Self {
            variable: variable.into(),
            id: id.into(),
            day: ts.day,
            time_step: ts.step,
            value,
        }
    }
}

/// The value of any variable in the problem
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct VariableValue {
    /// Unique name of the variable, e.g. `input[boiler,1.3]`
    pub name: String,
    /// The variable family
    pub family: String,
    /// The technology, carrier, storage or scenario
    pub id: String,
    /// The day, for operational variables
    pub day: Option<u32>,
    /// The step within the day, for operational variables
    pub time_step: Option<u32>,
    /// The value
    pub value: f64,
}

impl VariableValue {
    fn new(key: &VariableKey, value: f64) -> Self {
        let ts = key.time_step();
        Self {
            name: key.to_string(),
            family: key.family().to_string(),
            id: key.id().into(),
            day: ts.map(|ts| ts.day),
            time_step: ts.map(|ts| ts.step),
            value,
        }
    }
}

/// Size of the problem along with the value of every variable
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ModelReport {
    /// The criterion which was minimised
    pub objective: String,
    /// The optimal objective value, including constant terms
    pub objective_value: f64,
    /// Number of variables
    pub num_variables: usize,
    /// Number of binary variables
    pub num_binaries: usize,
    /// Number of constraints
    pub num_constraints: usize,
    /// Number of constraints in each family
    pub constraints_by_family: IndexMap<String, usize>,
    /// The value of every variable, in column order
    pub variables: Vec<VariableValue>,
}

impl ModelReport {
    /// Iterate over the values of variables in a given family
    pub fn iter_family(&self, family: VariableFamily) -> impl Iterator<Item = &VariableValue> {
        let family = family.to_string();
        self.variables
            .iter()
            .filter(move |variable| variable.family == family)
    }
}

/// Everything extracted from one optimal solution
#[derive(Debug, PartialEq, Clone)]
pub struct HubResults {
    /// The objective breakdown
    pub objectives: ObjectiveSummary,
    /// Capacities, installations and the selected retrofit scenario
    pub design: Vec<DesignRecord>,
    /// Flows and states of charge over time
    pub operation: Vec<OperationRecord>,
    /// Problem size and raw variable values
    pub report: ModelReport,
}

impl HubResults {
    /// Get the value of a design variable, if present
    pub fn design_value(&self, family: VariableFamily, id: &str) -> Option<f64> {
        let family = family.to_string();
        self.design
            .iter()
            .find(|record| record.variable == family && record.id == id)
            .map(|record| record.value)
    }

    /// Iterate over operation records for a given variable and ID
    pub fn iter_operation<'a>(
        &'a self,
        variable: &'a str,
        id: &'a str,
    ) -> impl Iterator<Item = &'a OperationRecord> {
        self.operation
            .iter()
            .filter(move |record| record.variable == variable && record.id == id)
    }
}

/// Map an optimal solution onto the objective breakdown, design and operation tables.
///
/// # Arguments
///
/// * `model` - The model the solved problem was built from
/// * `solution` - The optimal solution
pub fn extract(model: &Model, solution: &Solution) -> HubResults {
    let mut objectives = ObjectiveSummary {
        investment_cost: solution.network_cost,
        ..ObjectiveSummary::default()
    };
    let mut design = Vec::new();
    let mut operation = Vec::new();
    let mut variables = Vec::new();

    for (key, info, value) in solution.iter() {
        let family = key.family();
        let cost = Money(info.cost * value);
        match family.cost_category() {
            Some(CostCategory::Investment) => objectives.investment_cost += cost,
            Some(CostCategory::Operating) => objectives.operating_cost += cost,
            Some(CostCategory::ExportIncome) => objectives.export_income -= cost,
            None => {}
        }
        objectives.total_carbon += Carbon(info.carbon * value);

        let variable: &str = family.into();
        match key {
            VariableKey::Capacity(_)
            | VariableKey::Installed(_)
            | VariableKey::StorageCapacity(_)
            | VariableKey::StorageInstalled(_) => design.push(DesignRecord {
                variable: variable.into(),
                id: key.id().into(),
                value,
            }),
            VariableKey::Retrofit(_) if value > BINARY_THRESHOLD => design.push(DesignRecord {
                variable: variable.into(),
                id: key.id().into(),
                value,
            }),
            VariableKey::Input(technology_id, ts) => {
                operation.push(OperationRecord::new(variable, key.id(), *ts, value));

                // Outputs and consumption of other carriers follow from the input
                if let Some(technology) = model.technologies.get(technology_id) {
                    for (carrier_id, factor) in &technology.conversion_factors {
                        let name = if factor.0 > 0.0 {
                            "output"
                        } else {
                            "consumption"
                        };
                        operation.push(OperationRecord::new(
                            name,
                            format!("{technology_id}:{carrier_id}"),
                            *ts,
                            factor.0.abs() * value,
                        ));
                    }
                }
            }
            VariableKey::Import(_, ts)
            | VariableKey::Export(_, ts)
            | VariableKey::Charge(_, ts)
            | VariableKey::Discharge(_, ts)
            | VariableKey::StateOfCharge(_, ts) => {
                operation.push(OperationRecord::new(variable, key.id(), *ts, value));
            }
            VariableKey::On(..) | VariableKey::Retrofit(_) => {}
        }

        variables.push(VariableValue::new(key, value));
    }

    objectives.total_cost =
        objectives.investment_cost + objectives.operating_cost - objectives.export_income;

    let report = ModelReport {
        objective: solution.objective.to_string(),
        objective_value: solution.objective_value(),
        num_variables: solution.variables.len(),
        num_binaries: solution.variables.num_binaries(),
        num_constraints: solution.constraint_counts.values().sum(),
        constraints_by_family: solution
            .constraint_counts
            .iter()
            .map(|(family, count)| (family.to_string(), *count))
            .collect(),
        variables,
    };

    HubResults {
        objectives,
        design,
        operation,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use crate::horizon::Resolution;
    use crate::model::{NetworkParameters, ObjectiveMode};
    use crate::optimisation::{BuildOptions, Objective, build_model};
    use crate::solver::{SolverOptions, solve};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn solve_model(model: &Model, objective: Objective) -> HubResults {
        let options = BuildOptions {
            resolution: Resolution::TypicalDays,
            objective: ObjectiveMode::Cost,
            pareto_points: None,
            retrofit: true,
        };
        let built = build_model(model, &options, objective, None).unwrap();
        let solution = solve(built, &SolverOptions::default(), "test")
            .unwrap()
            .into_optimal()
            .unwrap();
        extract(model, &solution)
    }

    #[rstest]
    fn test_extract_boiler(model: Model) {
        let results = solve_model(&model, Objective::Cost);

        let capacity = results
            .design_value(VariableFamily::Capacity, "boiler")
            .unwrap();
        assert_approx_eq!(f64, capacity, 10.0 / 0.9, epsilon = 1e-6);
        assert_approx_eq!(
            f64,
            results
                .design_value(VariableFamily::Installed, "boiler")
                .unwrap(),
            1.0,
            epsilon = 1e-6
        );

        // Heat output meets demand in every step
        let outputs = results.iter_operation("output", "boiler:heat").collect::<Vec<_>>();
        assert_eq!(outputs.len(), 6);
        for record in outputs {
            assert_approx_eq!(f64, record.value, 10.0, epsilon = 1e-6);
        }

        // Fuel for 365 days of 30 units of heat at 90% efficiency
        let objectives = &results.objectives;
        let fuel = 365.0 * 30.0 / 0.9;
        assert_approx_eq!(Money, objectives.operating_cost, Money(fuel * 0.06), epsilon = 1e-4);
        assert_approx_eq!(Carbon, objectives.total_carbon, Carbon(fuel * 0.2), epsilon = 1e-4);
        assert_approx_eq!(
            Money,
            objectives.total_cost,
            objectives.investment_cost + objectives.operating_cost - objectives.export_income
        );
        assert_approx_eq!(
            f64,
            results.report.objective_value,
            objectives.total_cost.0,
            epsilon = 1e-6
        );
        assert_eq!(results.report.objective, "cost");
        assert_eq!(results.report.num_binaries, 1);
        assert_eq!(
            results.report.iter_family(VariableFamily::Import).count(),
            6
        );
    }

    #[rstest]
    fn test_extract_network_cost(mut model: Model) {
        let without = solve_model(&model, Objective::Cost).objectives;

        model.parameters.network = Some(NetworkParameters {
            length: 100.0,
            cost_per_metre: Money(100.0),
            lifetime: 10,
        });
        let with = solve_model(&model, Objective::Cost).objectives;

        // The network is a constant, so only the investment cost changes
        assert_approx_eq!(Money, with.operating_cost, without.operating_cost, epsilon = 1e-4);
        assert_approx_eq!(
            Money,
            with.investment_cost - without.investment_cost,
            model.network_annual_cost(),
            epsilon = 1e-6
        );
    }
}
