//! Code for reading energy carriers from a CSV file.
use super::{check_non_negative, input_err_msg, read_csv};
use crate::carrier::{Carrier, CarrierID, CarrierMap};
use crate::id::collect_unique_by_id;
use crate::units::{CarbonPerEnergy, Dimensionless, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const CARRIERS_FILE_NAME: &str = "carriers.csv";

/// A carrier record retrieved from a CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct CarrierRaw {
    id: CarrierID,
    #[serde(default)]
    description: String,
    import_price: Option<f64>,
    export_price: Option<f64>,
    import_carbon_factor: Option<f64>,
    #[serde(default)]
    export_carbon_factor: Option<f64>,
    network_efficiency: Option<f64>,
}

impl CarrierRaw {
    /// Validate the record and convert it into a [`Carrier`]
    fn into_carrier(self) -> Result<Carrier> {
        if let Some(price) = self.import_price {
            check_non_negative("import_price", price)?;
        }
        if let Some(price) = self.export_price {
            check_non_negative("export_price", price)?;
        }
        let import_carbon_factor = self.import_carbon_factor.unwrap_or(0.0);
        check_non_negative("import_carbon_factor", import_carbon_factor)?;
        let export_carbon_factor = self.export_carbon_factor.unwrap_or(0.0);
        check_non_negative("export_carbon_factor", export_carbon_factor)?;
        ensure!(
            self.export_price.is_some() || export_carbon_factor == 0.0,
            "export_carbon_factor given, but the carrier cannot be exported"
        );

        // Buying from the grid and selling straight back must not pay off, in money or emissions
        if let (Some(import_price), Some(export_price)) = (self.import_price, self.export_price) {
            ensure!(
                export_price <= import_price,
                "export_price cannot be greater than import_price"
            );
            ensure!(
                export_carbon_factor <= import_carbon_factor,
                "export_carbon_factor cannot be greater than import_carbon_factor"
            );
        }

        // Empty means the network is lossless
        let network_efficiency = self.network_efficiency.unwrap_or(1.0);
        ensure!(
            network_efficiency > 0.0 && network_efficiency <= 1.0,
            "network_efficiency must be > 0 and <= 1"
        );

        Ok(Carrier {
            id: self.id,
            description: self.description,
            import_price: self.import_price.map(MoneyPerEnergy),
            export_price: self.export_price.map(MoneyPerEnergy),
            import_carbon_factor: CarbonPerEnergy(import_carbon_factor),
            export_carbon_factor: CarbonPerEnergy(export_carbon_factor),
            network_efficiency: Dimensionless(network_efficiency),
        })
    }
}

/// Read carriers from an iterator of raw records
fn read_carriers_from_iter<I>(iter: I) -> Result<CarrierMap>
where
    I: Iterator<Item = CarrierRaw>,
{
    let carriers = iter
        .map(|raw| {
            let id = raw.id.clone();
            raw.into_carrier()
                .with_context(|| format!("Invalid parameters for carrier {id}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(collect_unique_by_id(carriers)?
        .into_iter()
        .map(|(id, carrier)| (id, Rc::new(carrier)))
        .collect())
}

/// Read carriers from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_carriers(model_dir: &Path) -> Result<CarrierMap> {
    let file_path = model_dir.join(CARRIERS_FILE_NAME);
    let carriers_csv = read_csv(&file_path)?;
    read_carriers_from_iter(carriers_csv).with_context(|| input_err_msg(&file_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn carrier_raw(id: &str) -> CarrierRaw {
        CarrierRaw {
            id: id.into(),
            description: String::new(),
            import_price: Some(0.25),
            export_price: None,
            import_carbon_factor: Some(0.2),
            export_carbon_factor: None,
            network_efficiency: None,
        }
    }

    #[test]
    fn test_read_carriers_from_iter() {
        let carriers =
            read_carriers_from_iter([carrier_raw("elec"), carrier_raw("heat")].into_iter())
                .unwrap();
        assert_eq!(carriers.len(), 2);
        assert!(carriers["elec"].is_importable());
        assert!(!carriers["elec"].is_exportable());

        assert_error!(
            read_carriers_from_iter([carrier_raw("elec"), carrier_raw("elec")].into_iter()),
            "Duplicate ID found: elec"
        );

        let mut raw = carrier_raw("elec");
        raw.import_price = Some(-1.0);
        assert_error!(
            read_carriers_from_iter([raw].into_iter()),
            "Invalid parameters for carrier elec"
        );
    }

    #[rstest]
    #[case(Some(0.25), Some(0.3), None, "export_price cannot be greater than import_price")]
    #[case(Some(0.25), Some(0.05), Some(0.3), "export_carbon_factor cannot be greater than import_carbon_factor")]
    #[case(None, None, Some(0.1), "export_carbon_factor given, but the carrier cannot be exported")]
    #[case(Some(0.25), Some(0.05), Some(-0.1), "export_carbon_factor must be a finite number >= 0 (got -0.1)")]
    fn test_carrier_grid_exchange_invalid(
        #[case] import_price: Option<f64>,
        #[case] export_price: Option<f64>,
        #[case] export_carbon_factor: Option<f64>,
        #[case] msg: &str,
    ) {
        let raw = CarrierRaw {
            import_price,
            export_price,
            export_carbon_factor,
            ..carrier_raw("elec")
        };
        assert_error!(raw.into_carrier(), msg);
    }

    #[test]
    fn test_carrier_grid_exchange_valid() {
        // Selling at the buying price, with the full carbon credit, is allowed
        let raw = CarrierRaw {
            import_price: Some(0.25),
            export_price: Some(0.25),
            export_carbon_factor: Some(0.2),
            ..carrier_raw("elec")
        };
        let carrier = raw.into_carrier().unwrap();
        assert_eq!(carrier.export_carbon_factor, CarbonPerEnergy(0.2));

        // Export only
        let raw = CarrierRaw {
            import_price: None,
            export_price: Some(0.1),
            export_carbon_factor: Some(0.5),
            ..carrier_raw("elec")
        };
        assert!(raw.into_carrier().is_ok());
    }

    #[test]
    fn test_read_carriers() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(CARRIERS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "id,description,import_price,export_price,import_carbon_factor,network_efficiency
elec,Electricity,0.25,0.05,0.2,
heat,Heat,,,,0.9"
            )
            .unwrap();
        }

        let carriers = read_carriers(dir.path()).unwrap();
        assert_eq!(carriers["elec"].export_price, Some(MoneyPerEnergy(0.05)));
        assert_eq!(carriers["elec"].network_efficiency, Dimensionless(1.0));
        assert_eq!(carriers["heat"].import_price, None);
        assert_eq!(carriers["heat"].network_efficiency, Dimensionless(0.9));
        assert_eq!(carriers["heat"].import_carbon_factor, CarbonPerEnergy(0.0));
        assert_eq!(carriers["elec"].export_carbon_factor, CarbonPerEnergy(0.0));
    }
}
