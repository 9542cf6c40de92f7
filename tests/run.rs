//! Integration tests for the `run` command.
use energyhub::cli::{RunOpts, handle_run_command};
use energyhub::output::{read_design, read_objectives, read_operation};
use energyhub::settings::Settings;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the example model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("ENERGYHUB_LOG_LEVEL", "off") };

    // Save results to non-existent directory to check that directory creation works
    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        detailed_output: true,
        ..RunOpts::default()
    };
    handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap();

    for file_name in [
        "objectives.csv",
        "design.csv",
        "operation.csv",
        "pareto_points.json",
        "metadata.toml",
        "report_cost.json",
    ] {
        assert!(output_dir.join(file_name).is_file(), "{file_name} missing");
    }
    assert!(output_dir.join("variables/cost/capacity.csv").is_file());

    let objectives = read_objectives(&output_dir).unwrap();
    assert_eq!(objectives.len(), 1);
    let row = &objectives[0];
    assert!(row.total_cost > 0.0);
    assert!(
        (row.total_cost - (row.investment_cost + row.operating_cost - row.export_income)).abs()
            < 1e-6
    );

    let design = read_design(&output_dir).unwrap();
    assert!(design.iter().any(|row| row.variable == "capacity"));
    let operation = read_operation(&output_dir).unwrap();
    assert!(operation.iter().all(|row| row.point == 0));

    // Second time will fail because the output directory is not empty
    let err = handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap_err();
    assert_eq!(
        err.chain().next().unwrap().to_string(),
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    );
}
