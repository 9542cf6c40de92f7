//! The module responsible for writing output data to disk.
use crate::optimisation::VariableFamily;
use crate::pareto::ParetoPoint;
use crate::results::{DesignRecord, HubResults, ObjectiveSummary, OperationRecord};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "energyhub_results";

/// The output file name for the objective breakdown
const OBJECTIVES_FILE_NAME: &str = "objectives.csv";

/// The output file name for design decisions
const DESIGN_FILE_NAME: &str = "design.csv";

/// The output file name for operation over time
const OPERATION_FILE_NAME: &str = "operation.csv";

/// The output file name for the list of per-point results
const PARETO_POINTS_FILE_NAME: &str = "pareto_points.json";

/// The folder for per-variable CSV files
const VARIABLES_DIRECTORY_NAME: &str = "variables";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory.
///
/// If the directory already exists and is not empty, it is only replaced if `allow_overwrite` is
/// true.
///
/// # Returns
///
/// True if an existing directory was overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let mut overwritten = false;
    if output_dir.is_dir() {
        let is_empty = fs::read_dir(output_dir)?.next().is_none();
        if !is_empty {
            ensure!(
                allow_overwrite,
                "Output folder {} already exists and is not empty. Use --overwrite to replace it.",
                output_dir.display()
            );
            fs::remove_dir_all(output_dir)?;
            overwritten = true;
        }
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwritten)
}

/// Represents a row in the objectives CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ObjectivesRow {
    /// Index of the point the row belongs to
    pub point: usize,
    /// See [`ObjectiveSummary::total_cost`]
    pub total_cost: f64,
    /// See [`ObjectiveSummary::investment_cost`]
    pub investment_cost: f64,
    /// See [`ObjectiveSummary::operating_cost`]
    pub operating_cost: f64,
    /// See [`ObjectiveSummary::export_income`]
    pub export_income: f64,
    /// See [`ObjectiveSummary::total_carbon`]
    pub total_carbon: f64,
}

impl ObjectivesRow {
    fn new(point: usize, objectives: &ObjectiveSummary) -> Self {
        Self {
            point,
            total_cost: objectives.total_cost.0,
            investment_cost: objectives.investment_cost.0,
            operating_cost: objectives.operating_cost.0,
            export_income: objectives.export_income.0,
            total_carbon: objectives.total_carbon.0,
        }
    }
}

/// Represents a row in the design CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct DesignRow {
    /// Index of the point the row belongs to
    pub point: usize,
    /// See [`DesignRecord::variable`]
    pub variable: String,
    /// See [`DesignRecord::id`]
    pub id: String,
    /// See [`DesignRecord::value`]
    pub value: f64,
}

impl DesignRow {
    fn new(point: usize, record: &DesignRecord) -> Self {
        Self {
            point,
            variable: record.variable.clone(),
            id: record.id.clone(),
            value: record.value,
        }
    }
}

/// Represents a row in the operation CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct OperationRow {
    /// Index of the point the row belongs to
    pub point: usize,
    /// See [`OperationRecord::variable`]
    pub variable: String,
    /// See [`OperationRecord::id`]
    pub id: String,
    /// See [`OperationRecord::day`]
    pub day: u32,
    /// See [`OperationRecord::time_step`]
    pub time_step: u32,
    /// See [`OperationRecord::value`]
    pub value: f64,
}

impl OperationRow {
    fn new(point: usize, record: &OperationRecord) -> Self {
        Self {
            point,
            variable: record.variable.clone(),
            id: record.id.clone(),
            day: record.day,
            time_step: record.time_step,
            value: record.value,
        }
    }
}

/// An object for writing the objectives, design and operation tables to file
pub struct DataWriter {
    objectives_writer: csv::Writer<File>,
    design_writer: csv::Writer<File>,
    operation_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            objectives_writer: new_writer(OBJECTIVES_FILE_NAME)?,
            design_writer: new_writer(DESIGN_FILE_NAME)?,
            operation_writer: new_writer(OPERATION_FILE_NAME)?,
        })
    }

    /// Write the results for one point to the CSV files
    pub fn write_results(&mut self, point: usize, results: &HubResults) -> Result<()> {
        self.objectives_writer
            .serialize(ObjectivesRow::new(point, &results.objectives))?;
        for record in &results.design {
            self.design_writer.serialize(DesignRow::new(point, record))?;
        }
        for record in &results.operation {
            self.operation_writer
                .serialize(OperationRow::new(point, record))?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.objectives_writer.flush()?;
        self.design_writer.flush()?;
        self.operation_writer.flush()?;

        Ok(())
    }
}

/// Read rows of type `T` back from a CSV file
fn read_rows<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let rows = csv::Reader::from_path(file_path)
        .with_context(|| format!("Could not open {}", file_path.display()))?
        .into_deserialize()
        .try_collect()
        .with_context(|| format!("Could not read {}", file_path.display()))?;

    Ok(rows)
}

/// Read the objectives table from an output folder
pub fn read_objectives(output_path: &Path) -> Result<Vec<ObjectivesRow>> {
    read_rows(&output_path.join(OBJECTIVES_FILE_NAME))
}

/// Read the design table from an output folder
pub fn read_design(output_path: &Path) -> Result<Vec<DesignRow>> {
    read_rows(&output_path.join(DESIGN_FILE_NAME))
}

/// Read the operation table from an output folder
pub fn read_operation(output_path: &Path) -> Result<Vec<OperationRow>> {
    read_rows(&output_path.join(OPERATION_FILE_NAME))
}

/// The entry for one point in the JSON list of results
#[derive(Serialize)]
struct PointSummary<'a> {
    index: usize,
    label: &'a str,
    emissions_cap: Option<f64>,
    status: &'static str,
    error: Option<String>,
    objectives: Option<&'a ObjectiveSummary>,
    design: Option<&'a [DesignRecord]>,
    operation: Option<&'a [OperationRecord]>,
}

impl<'a> PointSummary<'a> {
    fn new(point: &'a ParetoPoint) -> Self {
        let (status, error, results) = match &point.outcome {
            Ok(results) => ("optimal", None, Some(results)),
            Err(err) => ("failed", Some(err.to_string()), None),
        };

        Self {
            index: point.index,
            label: &point.label,
            emissions_cap: point.emissions_cap,
            status,
            error,
            objectives: results.map(|results| &results.objectives),
            design: results.map(|results| results.design.as_slice()),
            operation: results.map(|results| results.operation.as_slice()),
        }
    }
}

/// Write the list of per-point results to a JSON file
pub fn write_pareto_points(output_path: &Path, points: &[ParetoPoint]) -> Result<()> {
    let summaries = points.iter().map(PointSummary::new).collect_vec();
    let file_path = output_path.join(PARETO_POINTS_FILE_NAME);
    let writer = BufWriter::new(File::create(&file_path)?);
    serde_json::to_writer_pretty(writer, &summaries)
        .with_context(|| format!("Could not write {}", file_path.display()))?;

    Ok(())
}

/// Write the model report for a point and one CSV file per variable family
pub fn write_detailed_output(output_path: &Path, label: &str, results: &HubResults) -> Result<()> {
    let report_path = output_path.join(format!("report_{label}.json"));
    let writer = BufWriter::new(File::create(&report_path)?);
    serde_json::to_writer_pretty(writer, &results.report)
        .with_context(|| format!("Could not write {}", report_path.display()))?;

    let variables_path = output_path.join(VARIABLES_DIRECTORY_NAME).join(label);
    fs::create_dir_all(&variables_path)?;
    for family in VariableFamily::iter() {
        let mut values = results.report.iter_family(family).peekable();
        if values.peek().is_none() {
            continue;
        }

        let file_path = variables_path.join(format!("{family}.csv"));
        let mut writer = csv::Writer::from_path(&file_path)?;
        for value in values {
            writer.serialize(value)?;
        }
        writer.flush()?;
    }

    Ok(())
}

/// Write all outputs for the points of a run.
///
/// Failed points appear in the JSON list only.
pub fn write_points(output_path: &Path, points: &[ParetoPoint], detailed_output: bool) -> Result<()> {
    let mut writer = DataWriter::create(output_path)?;
    for point in points {
        let Ok(results) = &point.outcome else {
            continue;
        };

        writer.write_results(point.index, results)?;
        if detailed_output {
            write_detailed_output(output_path, &point.label, results)?;
        }
    }
    writer.flush()?;

    write_pareto_points(output_path, points)
}
