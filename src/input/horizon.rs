//! Code for reading the days of the horizon and the calendar mapping from CSV files.
use super::{input_err_msg, read_csv, read_csv_optional};
use crate::horizon::Horizon;
use crate::units::Dimensionless;
use anyhow::{Context, Result, ensure};
use float_cmp::approx_eq;
use log::warn;
use serde::Deserialize;
use std::path::Path;

const DAYS_FILE_NAME: &str = "days.csv";
const CALENDAR_FILE_NAME: &str = "calendar.csv";

/// The number of days in a (non-leap) year
const DAYS_PER_YEAR: f64 = 365.0;

/// A day record retrieved from a CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct DayRaw {
    day: u32,
    weight: f64,
}

/// A calendar record retrieved from a CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct CalendarRaw {
    calendar_day: u32,
    day: u32,
}

/// Read day weights from an iterator of raw records.
///
/// Days must be numbered consecutively from 1.
fn read_day_weights_from_iter<I>(iter: I) -> Result<Vec<Dimensionless>>
where
    I: Iterator<Item = DayRaw>,
{
    let mut weights = Vec::new();
    for (expected, raw) in (1..).zip(iter) {
        ensure!(
            raw.day == expected,
            "Days must be numbered consecutively from 1 (expected day {expected}, found {})",
            raw.day
        );
        ensure!(
            raw.weight.is_finite() && raw.weight > 0.0,
            "Weight for day {} must be a finite number > 0",
            raw.day
        );
        weights.push(Dimensionless(raw.weight));
    }

    let total: f64 = weights.iter().map(|w| w.0).sum();
    if !approx_eq!(f64, total, DAYS_PER_YEAR, epsilon = 1e-6) {
        warn!("Day weights sum to {total} rather than {DAYS_PER_YEAR}");
    }

    Ok(weights)
}

/// Read the calendar mapping from an iterator of raw records
fn read_calendar_from_iter<I>(iter: I, num_days: u32) -> Result<Vec<u32>>
where
    I: Iterator<Item = CalendarRaw>,
{
    let mut calendar = Vec::new();
    for (expected, raw) in (1..).zip(iter) {
        ensure!(
            raw.calendar_day == expected,
            "Calendar days must be numbered consecutively from 1 (expected {expected}, found {})",
            raw.calendar_day
        );
        ensure!(
            (1..=num_days).contains(&raw.day),
            "Calendar day {} refers to unknown day {}",
            raw.calendar_day,
            raw.day
        );
        calendar.push(raw.day);
    }

    for day in 1..=num_days {
        if !calendar.contains(&day) {
            warn!("Day {day} does not appear in the calendar");
        }
    }

    Ok(calendar)
}

/// Read the horizon from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `steps_per_day` - Number of time steps in each day
pub fn read_horizon(model_dir: &Path, steps_per_day: u32) -> Result<Horizon> {
    let file_path = model_dir.join(DAYS_FILE_NAME);
    let day_weights =
        read_day_weights_from_iter(read_csv(&file_path)?).with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(CALENDAR_FILE_NAME);
    let calendar = if file_path.exists() {
        let num_days = u32::try_from(day_weights.len())?;
        let calendar = read_calendar_from_iter(read_csv_optional(&file_path)?, num_days)
            .with_context(|| input_err_msg(&file_path))?;
        ensure!(
            !calendar.is_empty(),
            "{}: calendar cannot be empty",
            input_err_msg(&file_path)
        );
        Some(calendar)
    } else {
        None
    };

    Ok(Horizon {
        steps_per_day,
        day_weights,
        calendar,
    })
}
