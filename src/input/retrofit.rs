//! Code for reading retrofit scenarios from a CSV file.
use super::{check_non_negative, input_err_msg, read_csv_optional};
use crate::id::collect_unique_by_id;
use crate::retrofit::{RetrofitID, RetrofitMap, RetrofitScenario};
use crate::units::{Carbon, Money};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const RETROFIT_FILE_NAME: &str = "retrofit_scenarios.csv";

/// A retrofit scenario record retrieved from a CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct RetrofitRaw {
    id: RetrofitID,
    #[serde(default)]
    description: String,
    cost: f64,
    lifetime: u32,
    #[serde(default)]
    embodied_carbon: Option<f64>,
}

/// Read retrofit scenarios from an iterator of raw records
fn read_retrofit_from_iter<I>(iter: I) -> Result<RetrofitMap>
where
    I: Iterator<Item = RetrofitRaw>,
{
    let mut scenarios = Vec::new();
    for raw in iter {
        check_non_negative("cost", raw.cost)
            .with_context(|| format!("Invalid cost for retrofit scenario {}", raw.id))?;
        let embodied_carbon = raw.embodied_carbon.unwrap_or(0.0);
        check_non_negative("embodied_carbon", embodied_carbon).with_context(|| {
            format!("Invalid embodied carbon for retrofit scenario {}", raw.id)
        })?;
        ensure!(
            raw.lifetime > 0,
            "Lifetime of retrofit scenario {} must be greater than zero",
            raw.id
        );
        scenarios.push(RetrofitScenario {
            id: raw.id,
            description: raw.description,
            cost: Money(raw.cost),
            lifetime: raw.lifetime,
            embodied_carbon: Carbon(embodied_carbon),
        });
    }

    Ok(collect_unique_by_id(scenarios)?
        .into_iter()
        .map(|(id, scenario)| (id, Rc::new(scenario)))
        .collect())
}

/// Read retrofit scenarios from the model directory.
///
/// The file is optional; without it demand is fixed.
pub fn read_retrofit_scenarios(model_dir: &Path) -> Result<RetrofitMap> {
    let file_path = model_dir.join(RETROFIT_FILE_NAME);
    read_retrofit_from_iter(read_csv_optional(&file_path)?)
        .with_context(|| input_err_msg(&file_path))
}
