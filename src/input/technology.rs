//! Code for reading conversion technologies and their conversion factors from CSV files.
use super::{check_non_negative, input_err_msg, read_csv};
use crate::carrier::{CarrierID, CarrierMap};
use crate::id::{IDCollection, collect_unique_by_id};
use crate::technology::{ConversionTechnology, TechnologyID, TechnologyKind, TechnologyMap};
use crate::units::{
    Capacity, Carbon, CarbonPerCapacity, CarbonPerEnergy, Dimensionless, Money, MoneyPerCapacity,
    MoneyPerEnergy,
};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const TECHNOLOGIES_FILE_NAME: &str = "conversion_technologies.csv";
const CONVERSION_FACTORS_FILE_NAME: &str = "conversion_factors.csv";

/// A technology record retrieved from a CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct TechnologyRaw {
    id: TechnologyID,
    #[serde(default)]
    description: String,
    kind: TechnologyKind,
    capital_cost: f64,
    fixed_cost: Option<f64>,
    lifetime: u32,
    operating_cost: Option<f64>,
    carbon_factor: Option<f64>,
    embodied_carbon: Option<f64>,
    #[serde(default)]
    fixed_embodied_carbon: Option<f64>,
    min_part_load: Option<f64>,
    max_capacity: Option<f64>,
}

/// A conversion factor record retrieved from a CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct ConversionFactorRaw {
    technology_id: String,
    carrier_id: String,
    factor: f64,
}

impl TechnologyRaw {
    /// Validate the record and convert it into a [`ConversionTechnology`] with no factors yet
    fn into_technology(self) -> Result<ConversionTechnology> {
        let fixed_cost = self.fixed_cost.unwrap_or(0.0);
        let operating_cost = self.operating_cost.unwrap_or(0.0);
        let carbon_factor = self.carbon_factor.unwrap_or(0.0);
        let embodied_carbon = self.embodied_carbon.unwrap_or(0.0);
        let fixed_embodied_carbon = self.fixed_embodied_carbon.unwrap_or(0.0);
        let min_part_load = self.min_part_load.unwrap_or(0.0);

        check_non_negative("capital_cost", self.capital_cost)?;
        check_non_negative("fixed_cost", fixed_cost)?;
        check_non_negative("operating_cost", operating_cost)?;
        check_non_negative("carbon_factor", carbon_factor)?;
        check_non_negative("embodied_carbon", embodied_carbon)?;
        check_non_negative("fixed_embodied_carbon", fixed_embodied_carbon)?;
        ensure!(self.lifetime > 0, "lifetime must be greater than zero");
        ensure!(
            (0.0..=1.0).contains(&min_part_load),
            "min_part_load must be between 0 and 1"
        );
        ensure!(
            self.kind == TechnologyKind::Dispatchable || min_part_load == 0.0,
            "min_part_load cannot be set for solar technologies"
        );
        if let Some(max_capacity) = self.max_capacity {
            check_non_negative("max_capacity", max_capacity)?;
        }

        Ok(ConversionTechnology {
            id: self.id,
            description: self.description,
            kind: self.kind,
            capital_cost: MoneyPerCapacity(self.capital_cost),
            fixed_cost: Money(fixed_cost),
            lifetime: self.lifetime,
            operating_cost: MoneyPerEnergy(operating_cost),
            carbon_factor: CarbonPerEnergy(carbon_factor),
            embodied_carbon: CarbonPerCapacity(embodied_carbon),
            fixed_embodied_carbon: Carbon(fixed_embodied_carbon),
            min_part_load: Dimensionless(min_part_load),
            max_capacity: self.max_capacity.map(Capacity),
            conversion_factors: IndexMap::new(),
        })
    }
}

/// Read technologies (without conversion factors) from an iterator of raw records
fn read_technologies_from_iter<I>(iter: I) -> Result<IndexMap<TechnologyID, ConversionTechnology>>
where
    I: Iterator<Item = TechnologyRaw>,
{
    let technologies = iter
        .map(|raw| {
            let id = raw.id.clone();
            raw.into_technology()
                .with_context(|| format!("Invalid parameters for technology {id}"))
        })
        .collect::<Result<Vec<_>>>()?;

    collect_unique_by_id(technologies)
}

/// Attach conversion factors to technologies
fn add_conversion_factors_from_iter<I>(
    iter: I,
    technologies: &mut IndexMap<TechnologyID, ConversionTechnology>,
    carriers: &CarrierMap,
) -> Result<()>
where
    I: Iterator<Item = ConversionFactorRaw>,
{
    for raw in iter {
        let technology_id = technologies.get_id_by_str(&raw.technology_id)?;
        let carrier_id: CarrierID = carriers.get_id_by_str(&raw.carrier_id)?;
        ensure!(
            raw.factor.is_finite() && raw.factor != 0.0,
            "Conversion factor for {technology_id} and {carrier_id} must be finite and non-zero"
        );

        let technology = &mut technologies[&technology_id];
        ensure!(
            technology
                .conversion_factors
                .insert(carrier_id.clone(), Dimensionless(raw.factor))
                .is_none(),
            "Duplicate conversion factor for {technology_id} and {carrier_id}"
        );
    }

    for technology in technologies.values() {
        ensure!(
            technology.iter_outputs().next().is_some(),
            "Technology {} has no output carrier",
            technology.id
        );
    }

    Ok(())
}

/// Read conversion technologies from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `carriers` - Carriers known to the model
pub fn read_technologies(model_dir: &Path, carriers: &CarrierMap) -> Result<TechnologyMap> {
    let file_path = model_dir.join(TECHNOLOGIES_FILE_NAME);
    let mut technologies = read_technologies_from_iter(read_csv(&file_path)?)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(CONVERSION_FACTORS_FILE_NAME);
    add_conversion_factors_from_iter(read_csv(&file_path)?, &mut technologies, carriers)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(technologies
        .into_iter()
        .map(|(id, technology)| (id, Rc::new(technology)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, carriers};
    use rstest::rstest;

    fn technology_raw(id: &str, kind: TechnologyKind) -> TechnologyRaw {
        TechnologyRaw {
            id: id.into(),
            description: String::new(),
            kind,
            capital_cost: 100.0,
            fixed_cost: None,
            lifetime: 20,
            operating_cost: Some(0.05),
            carbon_factor: None,
            embodied_carbon: None,
            fixed_embodied_carbon: None,
            min_part_load: None,
            max_capacity: None,
        }
    }

    fn factor(technology_id: &str, carrier_id: &str, factor: f64) -> ConversionFactorRaw {
        ConversionFactorRaw {
            technology_id: technology_id.into(),
            carrier_id: carrier_id.into(),
            factor,
        }
    }

    #[test]
    fn test_read_technologies_from_iter() {
        let technologies = read_technologies_from_iter(
            [technology_raw("boiler", TechnologyKind::Dispatchable)].into_iter(),
        )
        .unwrap();
        let boiler = &technologies["boiler"];
        assert_eq!(boiler.fixed_cost, Money(0.0));
        assert_eq!(boiler.operating_cost, MoneyPerEnergy(0.05));
        assert!(!boiler.has_part_load());
        assert_eq!(boiler.fixed_embodied_carbon, Carbon(0.0));

        let mut raw = technology_raw("pv", TechnologyKind::Solar);
        raw.min_part_load = Some(0.2);
        assert_error!(
            read_technologies_from_iter([raw].into_iter()),
            "Invalid parameters for technology pv"
        );

        let mut raw = technology_raw("boiler", TechnologyKind::Dispatchable);
        raw.lifetime = 0;
        assert!(read_technologies_from_iter([raw].into_iter()).is_err());

        let mut raw = technology_raw("chp", TechnologyKind::Dispatchable);
        raw.fixed_embodied_carbon = Some(800.0);
        let technologies = read_technologies_from_iter([raw].into_iter()).unwrap();
        assert_eq!(technologies["chp"].fixed_embodied_carbon, Carbon(800.0));

        let mut raw = technology_raw("chp", TechnologyKind::Dispatchable);
        raw.fixed_embodied_carbon = Some(-800.0);
        assert_error!(
            read_technologies_from_iter([raw].into_iter()),
            "Invalid parameters for technology chp"
        );
    }

    #[rstest]
    fn test_add_conversion_factors_from_iter(carriers: CarrierMap) {
        let mut technologies = read_technologies_from_iter(
            [technology_raw("heat_pump", TechnologyKind::Dispatchable)].into_iter(),
        )
        .unwrap();

        add_conversion_factors_from_iter(
            [factor("heat_pump", "elec", -1.0), factor("heat_pump", "heat", 3.2)].into_iter(),
            &mut technologies,
            &carriers,
        )
        .unwrap();
        let heat_pump = &technologies["heat_pump"];
        assert_eq!(heat_pump.factor(&"heat".into()), Dimensionless(3.2));
        assert_eq!(heat_pump.factor(&"elec".into()), Dimensionless(-1.0));
        assert_eq!(heat_pump.iter_outputs().count(), 1);
    }

    #[rstest]
    #[case(vec![factor("heat_pump", "elec", -1.0)], "Technology heat_pump has no output carrier")]
    #[case(vec![factor("heat_pump", "heat", 0.0)], "Conversion factor for heat_pump and heat must be finite and non-zero")]
    #[case(vec![factor("heat_pump", "gas", 1.0)], "Unknown ID gas found")]
    #[case(vec![factor("boiler", "heat", 1.0)], "Unknown ID boiler found")]
    #[case(
        vec![factor("heat_pump", "heat", 1.0), factor("heat_pump", "heat", 2.0)],
        "Duplicate conversion factor for heat_pump and heat"
    )]
    fn test_add_conversion_factors_invalid(
        carriers: CarrierMap,
        #[case] factors: Vec<ConversionFactorRaw>,
        #[case] msg: &str,
    ) {
        let mut technologies = read_technologies_from_iter(
            [technology_raw("heat_pump", TechnologyKind::Dispatchable)].into_iter(),
        )
        .unwrap();

        assert_error!(
            add_conversion_factors_from_iter(factors.into_iter(), &mut technologies, &carriers),
            msg
        );
    }
}
