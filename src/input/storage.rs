//! Code for reading storage technologies from a CSV file.
use super::{
    check_non_negative, deserialise_proportion, deserialise_proportion_nonzero, input_err_msg,
    read_csv_optional,
};
use crate::carrier::CarrierMap;
use crate::id::{IDCollection, collect_unique_by_id};
use crate::storage::{StorageID, StorageMap, StorageTechnology};
use crate::units::{Capacity, Carbon, CarbonPerCapacity, Dimensionless, Money, MoneyPerCapacity};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const STORAGE_FILE_NAME: &str = "storage_technologies.csv";

/// A storage record retrieved from a CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct StorageRaw {
    id: StorageID,
    #[serde(default)]
    description: String,
    carrier_id: String,
    capital_cost: f64,
    fixed_cost: Option<f64>,
    lifetime: u32,
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    charge_efficiency: Dimensionless,
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    discharge_efficiency: Dimensionless,
    #[serde(deserialize_with = "deserialise_proportion")]
    standing_loss: Dimensionless,
    max_charge_rate: f64,
    max_capacity: f64,
    embodied_carbon: Option<f64>,
    #[serde(default)]
    fixed_embodied_carbon: Option<f64>,
}

impl StorageRaw {
    /// Validate the record and convert it into a [`StorageTechnology`]
    fn into_storage(self, carriers: &CarrierMap) -> Result<StorageTechnology> {
        let carrier_id = carriers.get_id_by_str(&self.carrier_id)?;
        let fixed_cost = self.fixed_cost.unwrap_or(0.0);
        let embodied_carbon = self.embodied_carbon.unwrap_or(0.0);
        let fixed_embodied_carbon = self.fixed_embodied_carbon.unwrap_or(0.0);

        check_non_negative("capital_cost", self.capital_cost)?;
        check_non_negative("fixed_cost", fixed_cost)?;
        check_non_negative("max_capacity", self.max_capacity)?;
        check_non_negative("embodied_carbon", embodied_carbon)?;
        check_non_negative("fixed_embodied_carbon", fixed_embodied_carbon)?;
        ensure!(self.lifetime > 0, "lifetime must be greater than zero");
        ensure!(
            self.standing_loss.0 < 1.0,
            "standing_loss must be less than 1"
        );
        ensure!(
            self.max_charge_rate.is_finite() && self.max_charge_rate > 0.0,
            "max_charge_rate must be a finite number > 0"
        );

        Ok(StorageTechnology {
            id: self.id,
            description: self.description,
            carrier_id,
            capital_cost: MoneyPerCapacity(self.capital_cost),
            fixed_cost: Money(fixed_cost),
            lifetime: self.lifetime,
            charge_efficiency: self.charge_efficiency,
            discharge_efficiency: self.discharge_efficiency,
            standing_loss: self.standing_loss,
            max_charge_rate: Dimensionless(self.max_charge_rate),
            max_capacity: Capacity(self.max_capacity),
            embodied_carbon: CarbonPerCapacity(embodied_carbon),
            fixed_embodied_carbon: Carbon(fixed_embodied_carbon),
        })
    }
}

/// Read storage technologies from an iterator of raw records
fn read_storage_from_iter<I>(iter: I, carriers: &CarrierMap) -> Result<StorageMap>
where
    I: Iterator<Item = StorageRaw>,
{
    let storages = iter
        .map(|raw| {
            let id = raw.id.clone();
            raw.into_storage(carriers)
                .with_context(|| format!("Invalid parameters for storage {id}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(collect_unique_by_id(storages)?
        .into_iter()
        .map(|(id, storage)| (id, Rc::new(storage)))
        .collect())
}

/// Read storage technologies from the model directory.
///
/// The file is optional; without it the hub has no storage.
pub fn read_storage_technologies(model_dir: &Path, carriers: &CarrierMap) -> Result<StorageMap> {
    let file_path = model_dir.join(STORAGE_FILE_NAME);
    read_storage_from_iter(read_csv_optional(&file_path)?, carriers)
        .with_context(|| input_err_msg(&file_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::CarrierID;
    use crate::fixture::{assert_error, carriers};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[rstest]
    fn test_read_storage_technologies(carriers: CarrierMap) {
        let dir = tempdir().unwrap();
        assert!(
            read_storage_technologies(dir.path(), &carriers)
                .unwrap()
                .is_empty()
        );

        {
            let mut file = File::create(dir.path().join(STORAGE_FILE_NAME)).unwrap();
            writeln!(
                file,
                "id,carrier_id,capital_cost,fixed_cost,lifetime,charge_efficiency,\
discharge_efficiency,standing_loss,max_charge_rate,max_capacity,embodied_carbon
battery,elec,300,,15,0.95,0.95,0.001,0.5,100,
tank,heat,20,500,20,0.9,0.9,0.01,0.25,1000,10"
            )
            .unwrap();
        }

        let storages = read_storage_technologies(dir.path(), &carriers).unwrap();
        assert_eq!(storages.len(), 2);
        assert_eq!(storages["battery"].fixed_cost, Money(0.0));
        assert_eq!(storages["tank"].carrier_id, CarrierID::new("heat"));
        assert_eq!(storages["tank"].embodied_carbon, CarbonPerCapacity(10.0));
    }

    #[rstest]
    fn test_read_storage_unknown_carrier(carriers: CarrierMap) {
        let raw = StorageRaw {
            id: "h2".into(),
            description: String::new(),
            carrier_id: "hydrogen".into(),
            capital_cost: 1.0,
            fixed_cost: None,
            lifetime: 10,
            charge_efficiency: Dimensionless(0.8),
            discharge_efficiency: Dimensionless(0.8),
            standing_loss: Dimensionless(0.0),
            max_charge_rate: 1.0,
            max_capacity: 10.0,
            embodied_carbon: None,
            fixed_embodied_carbon: None,
        };
        assert_error!(
            read_storage_from_iter([raw].into_iter(), &carriers),
            "Invalid parameters for storage h2"
        );
    }
}
