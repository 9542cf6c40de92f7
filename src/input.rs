//! Common routines for handling input data.
use crate::error::EnergyHubError;
use crate::model::{Model, ModelParameters};
use anyhow::{Context, Result, bail, ensure};
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

mod carrier;
use carrier::read_carriers;
mod demand;
use demand::{read_demand, read_solar_profile};
mod horizon;
use horizon::read_horizon;
mod retrofit;
use retrofit::read_retrofit_scenarios;
mod storage;
use storage::read_storage_technologies;
mod technology;
use technology::read_technologies;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// Returns an empty iterator if the file does not exist.
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    Ok(read_csv_internal(file_path)?.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read a value, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D, T>(deserialiser: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<f64>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(value.into())
}

/// Read a value, checking that it is > 0 and <= 1
pub fn deserialise_proportion_nonzero<'de, D, T>(deserialiser: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<f64>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(value > 0.0 && value <= 1.0) {
        Err(serde::de::Error::custom("Value must be > 0 and <= 1"))?;
    }

    Ok(value.into())
}

/// Check that a named quantity is a finite number which is not negative
pub fn check_non_negative(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number >= 0 (got {value})"
    );

    Ok(())
}

/// Format an error message to include the file path
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The fully validated [`Model`], or a [`EnergyHubError::Load`] naming the offending input.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model, EnergyHubError> {
    let model_dir = model_dir.as_ref();
    load_model_inner(model_dir).map_err(|source| EnergyHubError::Load {
        path: model_dir.to_path_buf(),
        source,
    })
}

fn load_model_inner(model_dir: &Path) -> Result<Model> {
    let parameters = ModelParameters::from_path(model_dir)?;
    let horizon = read_horizon(model_dir, parameters.steps_per_day)?;
    let carriers = read_carriers(model_dir)?;
    let technologies = read_technologies(model_dir, &carriers)?;
    let storages = read_storage_technologies(model_dir, &carriers)?;
    let retrofits = read_retrofit_scenarios(model_dir)?;
    let demand = read_demand(model_dir, &carriers, &retrofits, &horizon)?;

    let needs_solar = technologies.values().any(|tech| tech.is_solar());
    let solar = read_solar_profile(model_dir, &horizon, needs_solar)?;

    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        horizon,
        carriers,
        technologies,
        storages,
        retrofits,
        demand,
        solar,
    })
}
