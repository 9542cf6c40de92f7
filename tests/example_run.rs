//! Integration tests for the `example run` command.
use energyhub::cli::RunOpts;
use energyhub::cli::example::handle_example_run_command;
use energyhub::output::read_objectives;
use energyhub::settings::Settings;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

/// Run the multi-objective example and check every point is written
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("ENERGYHUB_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        ..RunOpts::default()
    };
    handle_example_run_command("retrofit_solar", &opts, Some(Settings::default())).unwrap();

    let contents = fs::read_to_string(tempdir.path().join("pareto_points.json")).unwrap();
    let points: Vec<Value> = serde_json::from_str(&contents).unwrap();
    let labels = points
        .iter()
        .map(|point| point["label"].as_str().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(
        labels,
        ["min_cost", "pareto_1", "pareto_2", "pareto_3", "min_emissions"]
    );

    // Every solved point has a row in the objectives table
    let num_optimal = points
        .iter()
        .filter(|point| point["status"] == "optimal")
        .count();
    assert_eq!(read_objectives(tempdir.path()).unwrap().len(), num_optimal);
}
