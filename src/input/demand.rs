//! Code for reading demand and solar irradiance time series from CSV files.
use super::{check_non_negative, input_err_msg, read_csv, read_csv_optional};
use crate::carrier::{CarrierID, CarrierMap};
use crate::demand::DemandProfiles;
use crate::horizon::{Horizon, TimeSeries, TimeStep};
use crate::id::IDCollection;
use crate::retrofit::{RetrofitID, RetrofitMap};
use crate::units::{Energy, EnergyPerCapacity};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;
use std::path::Path;

const DEMAND_FILE_NAME: &str = "demand.csv";
const SOLAR_FILE_NAME: &str = "solar.csv";

/// A demand record retrieved from a CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct DemandRaw {
    carrier_id: String,
    retrofit_id: Option<String>,
    day: u32,
    time_step: u32,
    value: f64,
}

/// A solar irradiance record retrieved from a CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct SolarRaw {
    day: u32,
    time_step: u32,
    irradiance: f64,
}

/// Insert a value into a time series, checking it lies within the horizon and is not a duplicate
fn insert_value<T>(
    series: &mut TimeSeries<T>,
    horizon: &Horizon,
    time_step: TimeStep,
    value: T,
) -> Result<()> {
    ensure!(
        horizon.contains(time_step),
        "Time step {time_step} lies outside the horizon"
    );
    ensure!(
        series.insert(time_step, value).is_none(),
        "Duplicate entry for time step {time_step}"
    );

    Ok(())
}

/// Check that a time series covers the whole horizon
fn check_series_length<T>(series: &TimeSeries<T>, horizon: &Horizon, what: &str) -> Result<()> {
    ensure!(
        series.len() == horizon.len(),
        "Time series for {what} has {} entries, but the horizon has {} time steps",
        series.len(),
        horizon.len()
    );

    Ok(())
}

/// Read demand profiles from an iterator of raw records
fn read_demand_from_iter<I>(
    iter: I,
    carriers: &CarrierMap,
    retrofits: &RetrofitMap,
    horizon: &Horizon,
) -> Result<DemandProfiles>
where
    I: Iterator<Item = DemandRaw>,
{
    let mut series: IndexMap<(CarrierID, Option<RetrofitID>), TimeSeries<Energy>> =
        IndexMap::new();
    for raw in iter {
        let carrier_id: CarrierID = carriers.get_id_by_str(&raw.carrier_id)?;
        let scenario = match raw.retrofit_id.as_deref() {
            None | Some("") => {
                ensure!(
                    retrofits.is_empty(),
                    "Demand for {carrier_id} must specify a retrofit_id when retrofit scenarios \
                    are defined"
                );
                None
            }
            Some(id) => {
                ensure!(
                    !retrofits.is_empty(),
                    "Demand for {carrier_id} refers to retrofit scenario {id}, but no retrofit \
                    scenarios are defined"
                );
                Some(retrofits.get_id_by_str(id)?)
            }
        };
        check_non_negative("Demand", raw.value)?;

        let key = (carrier_id, scenario);
        insert_value(
            series.entry(key).or_default(),
            horizon,
            TimeStep::new(raw.day, raw.time_step),
            Energy(raw.value),
        )?;
    }

    let mut demand = DemandProfiles::default();
    for ((carrier_id, scenario), profile) in series {
        let what = match &scenario {
            Some(scenario) => format!("{carrier_id} demand in scenario {scenario}"),
            None => format!("{carrier_id} demand"),
        };
        check_series_length(&profile, horizon, &what)?;
        demand.insert(carrier_id, scenario, profile);
    }

    // Each carrier with demand needs a profile for every scenario
    for (carrier_id, profiles) in demand.iter() {
        for scenario in retrofits.keys() {
            ensure!(
                profiles.contains_key(&Some(scenario.clone())),
                "No {carrier_id} demand given for retrofit scenario {scenario}"
            );
        }
    }

    Ok(demand)
}

/// Read demand profiles from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `carriers` - Carriers known to the model
/// * `retrofits` - Retrofit scenarios known to the model
/// * `horizon` - The operational horizon which every profile must cover
pub fn read_demand(
    model_dir: &Path,
    carriers: &CarrierMap,
    retrofits: &RetrofitMap,
    horizon: &Horizon,
) -> Result<DemandProfiles> {
    let file_path = model_dir.join(DEMAND_FILE_NAME);
    read_demand_from_iter(read_csv(&file_path)?, carriers, retrofits, horizon)
        .with_context(|| input_err_msg(&file_path))
}

/// Read a solar irradiance profile from an iterator of raw records
fn read_solar_from_iter<I>(iter: I, horizon: &Horizon) -> Result<TimeSeries<EnergyPerCapacity>>
where
    I: Iterator<Item = SolarRaw>,
{
    let mut series = TimeSeries::new();
    for raw in iter {
        check_non_negative("Irradiance", raw.irradiance)?;
        insert_value(
            &mut series,
            horizon,
            TimeStep::new(raw.day, raw.time_step),
            EnergyPerCapacity(raw.irradiance),
        )?;
    }
    check_series_length(&series, horizon, "solar irradiance")?;

    Ok(series)
}

/// Read the solar irradiance profile from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `horizon` - The operational horizon
/// * `required` - Whether the model contains solar technologies
pub fn read_solar_profile(
    model_dir: &Path,
    horizon: &Horizon,
    required: bool,
) -> Result<Option<TimeSeries<EnergyPerCapacity>>> {
    let file_path = model_dir.join(SOLAR_FILE_NAME);
    if !file_path.exists() {
        ensure!(
            !required,
            "Solar technologies are defined but {} is missing",
            file_path.display()
        );
        return Ok(None);
    }

    if !required {
        warn!("Ignoring {} as no solar technologies are defined", file_path.display());
    }

    let series = read_solar_from_iter(read_csv_optional(&file_path)?, horizon)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(Some(series))
}
