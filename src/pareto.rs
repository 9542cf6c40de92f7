//! Runs the selected objective mode: a single solve, a lexicographic emissions solve or an
//! epsilon-constraint sweep between the cost-minimal and emissions-minimal designs.
use crate::error::{EnergyHubError, Result};
use crate::model::{Model, ObjectiveMode};
use crate::optimisation::{BuildOptions, Objective, build_model};
use crate::results::{HubResults, extract};
use crate::solver::{Solution, SolverOptions, solve};
use log::{info, warn};

/// Absolute slack added to emissions caps derived from a previous solve
const EMISSIONS_CAP_ABS_TOLERANCE: f64 = 1e-6;

/// The outcome of one point of a run
#[derive(Debug)]
pub struct ParetoPoint {
    /// Position in the sequence, from cost-minimal to emissions-minimal
    pub index: usize,
    /// A short description of the point, used in file names
    pub label: String,
    /// The cap on total emissions, if one was imposed
    pub emissions_cap: Option<f64>,
    /// The results, or why the solve failed
    pub outcome: Result<HubResults>,
}

impl ParetoPoint {
    fn new(
        index: usize,
        label: impl Into<String>,
        emissions_cap: Option<f64>,
        outcome: Result<HubResults>,
    ) -> Self {
        Self {
            index,
            label: label.into(),
            emissions_cap,
            outcome,
        }
    }
}

/// Builds and solves problems for a model with fixed options
struct Runner<'a> {
    model: &'a Model,
    options: &'a BuildOptions,
    solver: &'a SolverOptions,
}

impl Runner<'_> {
    /// Build and solve a single problem, failing unless the solution is optimal
    fn solve(
        &self,
        objective: Objective,
        emissions_cap: Option<f64>,
        stage: &str,
    ) -> Result<Solution> {
        info!("Running {stage}...");
        let built = build_model(self.model, self.options, objective, emissions_cap)?;
        solve(built, self.solver, stage)?.into_optimal()
    }

    /// Minimise cost, optionally subject to an emissions cap
    fn minimise_cost(&self, emissions_cap: Option<f64>, stage: &str) -> Result<HubResults> {
        let solution = self.solve(Objective::Cost, emissions_cap, stage)?;
        Ok(extract(self.model, &solution))
    }

    /// Minimise emissions, then minimise cost while keeping emissions within tolerance of the
    /// minimum.
    ///
    /// If `ceiling` is given, the cap on the second solve is no looser than it. Returns the cap
    /// imposed on the second solve along with its results.
    fn minimise_emissions(&self, ceiling: Option<f64>) -> Result<(f64, HubResults)> {
        let solution = self.solve(Objective::Emissions, None, "emissions minimisation")?;
        let min_carbon = solution.objective_value();
        info!("Minimal emissions: {min_carbon}");

        let tolerance = self.model.parameters.emissions_tolerance.0;
        let mut cap = tolerance_cap(min_carbon, tolerance);
        if let Some(ceiling) = ceiling {
            cap = cap.min(ceiling.max(min_carbon + EMISSIONS_CAP_ABS_TOLERANCE));
        }
        let results = self.minimise_cost(Some(cap), "cost minimisation at minimal emissions")?;

        Ok((cap, results))
    }
}

/// The loosest emissions cap within `tolerance` (relative) of `min_carbon`.
///
/// The cap is always at least [`EMISSIONS_CAP_ABS_TOLERANCE`] above the minimum, so that a solve
/// at the minimum is not made infeasible by numerical noise. Negative minima (from export
/// credits) are relaxed upwards too.
fn tolerance_cap(min_carbon: f64, tolerance: f64) -> f64 {
    min_carbon + (min_carbon.abs() * tolerance).max(EMISSIONS_CAP_ABS_TOLERANCE)
}

/// Caps for `num_points` intermediate points, evenly spaced between `lower` and
/// `upper` and ordered from loosest to tightest
fn intermediate_caps(lower: f64, upper: f64, num_points: u32) -> Vec<f64> {
    let step = ((upper - lower) / f64::from(num_points + 1)).max(0.0);
    (1..=num_points)
        .map(|k| lower + f64::from(num_points + 1 - k) * step)
        .collect()
}

/// Run the objective mode given in `options`.
///
/// Points are ordered from the cost-minimal to the emissions-minimal design. Failures at either
/// extreme abort the run, whereas a failure at an intermediate Pareto point is logged and stored in
/// that point.
///
/// # Arguments
///
/// * `model` - The model
/// * `options` - How to formulate the problem, including the objective mode
/// * `solver` - Solver settings
pub fn run_objective_mode(
    model: &Model,
    options: &BuildOptions,
    solver: &SolverOptions,
) -> Result<Vec<ParetoPoint>> {
    options.validate(model)?;
    let runner = Runner {
        model,
        options,
        solver,
    };

    match options.objective {
        ObjectiveMode::Cost => {
            let results = runner.minimise_cost(None, "cost minimisation")?;
            Ok(vec![ParetoPoint::new(0, "cost", None, Ok(results))])
        }
        ObjectiveMode::Emissions => {
            let (cap, results) = runner.minimise_emissions(None)?;
            Ok(vec![ParetoPoint::new(0, "emissions", Some(cap), Ok(results))])
        }
        ObjectiveMode::MultiObjective => {
            let num_points = options
                .pareto_points
                .ok_or_else(|| EnergyHubError::build("missing number of Pareto points"))?;
            run_pareto_sweep(&runner, num_points)
        }
    }
}

/// Run the epsilon-constraint sweep with `num_points` intermediate points.
///
/// Intermediate caps lie between the emissions of the cost-minimal design and the cap imposed on
/// the emissions-minimal design, so every point is at least as tight as the one before it.
fn run_pareto_sweep(runner: &Runner, num_points: u32) -> Result<Vec<ParetoPoint>> {
    let cost_min = runner.minimise_cost(None, "cost minimisation")?;
    let max_carbon = cost_min.objectives.total_carbon.0;
    let (min_cap, emissions_min) = runner.minimise_emissions(Some(max_carbon))?;
    info!("Sweeping emissions caps from {max_carbon} down to {min_cap}");

    let mut points = vec![ParetoPoint::new(0, "min_cost", None, Ok(cost_min))];
    points.extend(solve_intermediate_points(
        runner,
        &intermediate_caps(min_cap, max_carbon, num_points),
    ));
    points.push(ParetoPoint::new(
        num_points as usize + 1,
        "min_emissions",
        Some(min_cap),
        Ok(emissions_min),
    ));

    Ok(points)
}

/// Minimise cost under each of `caps` in turn.
///
/// A failed solve is logged and kept in its point rather than ending the sweep.
fn solve_intermediate_points(runner: &Runner, caps: &[f64]) -> Vec<ParetoPoint> {
    let num_points = caps.len();
    caps.iter()
        .enumerate()
        .map(|(i, &cap)| {
            let k = i + 1;
            let stage = format!("Pareto point {k} of {num_points}");
            let outcome = runner.minimise_cost(Some(cap), &stage);
            if let Err(err) = &outcome {
                warn!("{err}; continuing with remaining points");
            }

            ParetoPoint::new(k, format!("pareto_{k}"), Some(cap), outcome)
        })
        .collect()
}
