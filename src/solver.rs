//! Passes built problems to the HiGHS solver and interprets the outcome.
use crate::error::{EnergyHubError, Result};
use crate::model::SolverParameters;
use crate::optimisation::{
    BuiltModel, ConstraintFamily, Objective, VariableInfo, VariableKey, VariableMap,
};
use crate::units::Money;
use highs::{HighsModelStatus, Sense};
use indexmap::IndexMap;
use log::{debug, log_enabled};

/// Settings for each solve
#[derive(PartialEq, Clone, Copy, Debug, Default)]
pub struct SolverOptions {
    /// Maximum wall-clock time per solve, in seconds
    pub time_limit: Option<f64>,
    /// Relative MIP optimality gap
    pub mip_gap: Option<f64>,
}

impl From<&SolverParameters> for SolverOptions {
    fn from(parameters: &SolverParameters) -> Self {
        Self {
            time_limit: parameters.time_limit,
            mip_gap: parameters.mip_gap,
        }
    }
}

/// The outcome of a solve, as far as we are concerned
#[derive(PartialEq, Eq, Clone, Debug, derive_more::Display)]
pub enum SolveStatus {
    /// An optimal solution was found
    #[display("optimal")]
    Optimal,
    /// The problem has no feasible solution
    #[display("infeasible")]
    Infeasible,
    /// The objective is unbounded (or the problem is infeasible or unbounded)
    #[display("unbounded")]
    Unbounded,
    /// The time limit was reached before optimality was proven
    #[display("time limit reached")]
    TimedOut,
    /// Any other solver status
    #[display("{_0}")]
    Other(String),
}

impl From<HighsModelStatus> for SolveStatus {
    fn from(status: HighsModelStatus) -> Self {
        match status {
            HighsModelStatus::Optimal => Self::Optimal,
            HighsModelStatus::Infeasible => Self::Infeasible,
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                Self::Unbounded
            }
            HighsModelStatus::ReachedTimeLimit => Self::TimedOut,
            status => Self::Other(format!("{status:?}")),
        }
    }
}

/// The values of an optimal solution along with the variables they belong to
pub struct Solution {
    /// The problem's columns
    pub variables: VariableMap,
    /// Number of rows per constraint family
    pub constraint_counts: IndexMap<ConstraintFamily, usize>,
    /// The criterion which was minimised
    pub objective: Objective,
    /// Annualised network investment, a constant outside the problem
    pub network_cost: Money,
    columns: Vec<f64>,
}

impl Solution {
    /// Iterate over the variables with their values, in column order
    pub fn iter(&self) -> impl Iterator<Item = (&VariableKey, &VariableInfo, f64)> {
        self.variables
            .iter()
            .zip(self.columns.iter().copied())
            .map(|((key, info), value)| (key, info, value))
    }

    /// The value of the objective, including constant terms
    pub fn objective_value(&self) -> f64 {
        match self.objective {
            Objective::Cost => {
                self.iter()
                    .map(|(_, info, value)| info.cost * value)
                    .sum::<f64>()
                    + self.network_cost.0
            }
            Objective::Emissions => self.iter().map(|(_, info, value)| info.carbon * value).sum(),
        }
    }
}

/// The status of a solve along with the solution.
///
/// Values are only available if the solve was optimal.
pub struct SolveResult {
    status: SolveStatus,
    stage: String,
    time_limit: Option<f64>,
    solution: Solution,
}

impl SolveResult {
    /// The status reported by the solver
    pub fn status(&self) -> &SolveStatus {
        &self.status
    }

    /// Whether the solve was optimal
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Get the value of a column, failing unless the solve was optimal and the column exists
    pub fn value(&self, column: usize) -> Result<f64> {
        self.check_optimal()?;
        let num_columns = self.solution.columns.len();
        self.solution.columns.get(column).copied().ok_or_else(|| {
            EnergyHubError::build(format!(
                "column {column} out of range for a problem with {num_columns} columns"
            ))
        })
    }

    /// Convert into the solution, failing unless the solve was optimal
    pub fn into_optimal(self) -> Result<Solution> {
        self.check_optimal()?;
        Ok(self.solution)
    }

    fn check_optimal(&self) -> Result<()> {
        match &self.status {
            SolveStatus::Optimal => Ok(()),
            SolveStatus::TimedOut => Err(EnergyHubError::Timeout {
                stage: self.stage.clone(),
                limit: self.time_limit.unwrap_or_default(),
            }),
            status => Err(EnergyHubError::Solver {
                stage: self.stage.clone(),
                status: status.to_string(),
            }),
        }
    }
}

/// Solve a built problem.
///
/// An error is only returned here if the solver refuses to run at all (e.g. the problem is
/// incoherent). Otherwise the status is reported in the [`SolveResult`].
///
/// # Arguments
///
/// * `built` - The problem to solve
/// * `options` - Solver settings
/// * `stage` - A description of this solve for error messages
pub fn solve(built: BuiltModel, options: &SolverOptions, stage: &str) -> Result<SolveResult> {
    let BuiltModel {
        problem,
        variables,
        constraint_counts,
        objective,
        network_cost,
    } = built;

    let mut highs_model = problem.optimise(Sense::Minimise);
    if !log_enabled!(log::Level::Debug) {
        highs_model.make_quiet();
    }
    if let Some(time_limit) = options.time_limit {
        highs_model.set_option("time_limit", time_limit);
    }
    if let Some(mip_gap) = options.mip_gap {
        highs_model.set_option("mip_rel_gap", mip_gap);
    }

    debug!("Solving {stage}");
    let solved = highs_model
        .try_solve()
        .map_err(|status| EnergyHubError::Solver {
            stage: stage.to_string(),
            status: format!("could not run solver: {status:?}"),
        })?;

    let status = SolveStatus::from(solved.status());
    let columns = if status == SolveStatus::Optimal {
        solved.get_solution().columns().to_vec()
    } else {
        Vec::new()
    };
    debug!("Solve for {stage} finished with status: {status}");

    Ok(SolveResult {
        status,
        stage: stage.to_string(),
        time_limit: options.time_limit,
        solution: Solution {
            variables,
            constraint_counts,
            objective,
            network_cost,
            columns,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use crate::horizon::Resolution;
    use crate::model::{Model, ObjectiveMode};
    use crate::optimisation::{BuildOptions, Objective, build_model};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn options() -> BuildOptions {
        BuildOptions {
            resolution: Resolution::TypicalDays,
            objective: ObjectiveMode::Cost,
            pareto_points: None,
            retrofit: true,
        }
    }

    #[rstest]
    fn test_solve_optimal(model: Model) {
        let built = build_model(&model, &options(), Objective::Cost, None).unwrap();
        let num_columns = built.variables.len();
        let result = solve(built, &SolverOptions::default(), "test").unwrap();
        assert!(result.is_optimal());
        assert!(result.value(0).unwrap() > 0.0);
        assert!(result.value(num_columns - 1).is_ok());
        let Err(err) = result.value(num_columns) else {
            panic!("Expected out-of-range column to be rejected");
        };
        assert!(matches!(err, EnergyHubError::Build(_)));
        assert!(err.to_string().ends_with(&format!(
            "column {num_columns} out of range for a problem with {num_columns} columns"
        )));
        let solution = result.into_optimal().unwrap();
        assert_eq!(solution.iter().count(), num_columns);

        // Heat demand of 10 in every step needs 10 / 0.9 of boiler capacity
        let (key, _, capacity) = solution.iter().next().unwrap();
        assert_eq!(*key, VariableKey::Capacity("boiler".into()));
        assert_approx_eq!(f64, capacity, 10.0 / 0.9, epsilon = 1e-6);
        assert!(solution.objective_value() > 0.0);
    }

    #[rstest]
    fn test_solve_infeasible(model: Model) {
        // The boiler is the only source of heat and it emits, so a zero cap is infeasible
        let built = build_model(&model, &options(), Objective::Cost, Some(0.0)).unwrap();
        let result = solve(built, &SolverOptions::default(), "capped").unwrap();
        // Presolve may not be able to tell infeasible from unbounded
        assert!(matches!(
            result.status(),
            SolveStatus::Infeasible | SolveStatus::Unbounded
        ));
        assert!(result.value(0).is_err());

        let Err(err) = result.into_optimal() else {
            panic!("Expected solve to fail");
        };
        assert!(matches!(err, EnergyHubError::Solver { .. }));
        assert!(err.to_string().starts_with("solver failed during capped: "));
    }

    #[test]
    fn test_timed_out_result() {
        let result = SolveResult {
            status: SolveStatus::TimedOut,
            stage: "cost minimisation".into(),
            time_limit: Some(0.0),
            solution: Solution {
                variables: VariableMap::default(),
                constraint_counts: IndexMap::new(),
                objective: Objective::Cost,
                network_cost: Money(0.0),
                columns: Vec::new(),
            },
        };
        assert!(matches!(
            result.into_optimal(),
            Err(EnergyHubError::Timeout { limit, .. }) if limit == 0.0
        ));
    }

    #[test]
    fn test_status_from_highs() {
        assert_eq!(
            SolveStatus::from(HighsModelStatus::UnboundedOrInfeasible),
            SolveStatus::Unbounded
        );
        assert_eq!(
            SolveStatus::from(HighsModelStatus::ReachedTimeLimit),
            SolveStatus::TimedOut
        );
        assert_eq!(SolveStatus::Other("Unknown".into()).to_string(), "Unknown");
    }
}
