//! The command line interface for the energy hub optimiser.
use crate::horizon::Resolution;
use crate::input::load_model;
use crate::log;
use crate::model::{Model, ObjectiveMode};
use crate::optimisation::BuildOptions;
use crate::output::metadata::write_metadata;
use crate::output::{create_output_directory, get_output_dir, write_points};
use crate::pareto::{ParetoPoint, run_objective_mode};
use crate::settings::Settings;
use crate::solver::SolverOptions;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the energy hub optimiser.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write the model report and the value of every variable
    #[arg(long)]
    pub detailed_output: bool,
    /// Override the objective mode given in the model file
    #[arg(long, value_enum)]
    pub objective: Option<ObjectiveMode>,
    /// Override the temporal resolution given in the model file
    #[arg(long, value_enum)]
    pub resolution: Option<Resolution>,
    /// Override the number of intermediate Pareto points
    #[arg(long)]
    pub pareto_points: Option<u32>,
    /// Override the solver time limit per solve, in seconds
    #[arg(long)]
    pub time_limit: Option<f64>,
}

impl RunOpts {
    /// Combine the options in the model file with those given on the command line
    fn build_options(&self, model: &Model) -> BuildOptions {
        let mut options = BuildOptions::from_parameters(&model.parameters);
        if let Some(objective) = self.objective {
            options.objective = objective;
            if objective != ObjectiveMode::MultiObjective {
                // Pareto points from the model file only apply to multi-objective runs
                options.pareto_points = None;
            }
        }
        if let Some(resolution) = self.resolution {
            options.resolution = resolution;
        }
        if self.pareto_points.is_some() {
            options.pareto_points = self.pareto_points;
        }

        options
    }

    /// Combine the solver settings in the model file with those given on the command line
    fn solver_options(&self, model: &Model) -> SolverOptions {
        let mut options = SolverOptions::from(&model.parameters.solver);
        if self.time_limit.is_some() {
            options.time_limit = self.time_limit;
        }

        options
    }
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Optimise the design and operation of an energy hub.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ energyhub --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help in markdown format
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Handle the `run` command.
///
/// Intermediate Pareto points which fail are logged and listed in the output rather than aborting
/// the run.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // These settings can be overridden by command-line arguments
    let overwrite = opts.overwrite || settings.overwrite;
    let detailed_output = opts.detailed_output || settings.detailed_output;

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(model_path)?;
        &pathbuf
    };

    let overwritten = create_output_directory(output_path, overwrite).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;

    // Initialise program logger
    log::init(Some(settings.log_level.as_str()), Some(output_path))
        .context("Failed to initialise logging.")?;

    // Load the model to run
    let model = load_model(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwritten {
        warn!("Output folder will be overwritten");
    }

    let options = opts.build_options(&model);
    let solver = opts.solver_options(&model);
    write_metadata(output_path, model_path, &options, &solver)
        .context("Failed to save metadata.")?;

    let points = run_objective_mode(&model, &options, &solver)?;
    write_points(output_path, &points, detailed_output).context("Failed to write results.")?;
    log_summary(&points);

    Ok(())
}

/// Log the objectives of each point along with a count of failures
fn log_summary(points: &[ParetoPoint]) {
    let mut num_failed = 0;
    for point in points {
        match &point.outcome {
            Ok(results) => info!(
                "{}: total cost {}, total emissions {}",
                point.label, results.objectives.total_cost, results.objectives.total_carbon
            ),
            Err(_) => num_failed += 1,
        }
    }

    if num_failed > 0 {
        warn!(
            "{num_failed} of {} points could not be solved",
            points.len()
        );
    }
    info!("Optimisation complete!");
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(settings.log_level.as_str()), None).context("Failed to initialise logging.")?;

    // Load/validate the model, along with the options given in the model file
    let model = load_model(model_path).context("Failed to validate model.")?;
    BuildOptions::from_parameters(&model.parameters)
        .validate(&model)
        .context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use rstest::rstest;

    #[rstest]
    fn test_build_options_overrides(mut model: Model) {
        model.parameters.objective = ObjectiveMode::MultiObjective;
        model.parameters.pareto_points = Some(4);

        // Model file values are used by default
        let opts = RunOpts::default();
        let options = opts.build_options(&model);
        assert_eq!(options.objective, ObjectiveMode::MultiObjective);
        assert_eq!(options.pareto_points, Some(4));

        // Switching to a single objective drops the Pareto points
        let opts = RunOpts {
            objective: Some(ObjectiveMode::Cost),
            resolution: Some(Resolution::FullYear),
            ..RunOpts::default()
        };
        let options = opts.build_options(&model);
        assert_eq!(options.objective, ObjectiveMode::Cost);
        assert_eq!(options.pareto_points, None);
        assert_eq!(options.resolution, Resolution::FullYear);

        let opts = RunOpts {
            pareto_points: Some(2),
            ..RunOpts::default()
        };
        assert_eq!(opts.build_options(&model).pareto_points, Some(2));
    }

    #[rstest]
    fn test_solver_options_override(mut model: Model) {
        model.parameters.solver.time_limit = Some(60.0);
        model.parameters.solver.mip_gap = Some(0.01);
        let opts = RunOpts {
            time_limit: Some(5.0),
            ..RunOpts::default()
        };
        let solver = opts.solver_options(&model);
        assert_eq!(solver.time_limit, Some(5.0));
        assert_eq!(solver.mip_gap, Some(0.01));
    }
}
