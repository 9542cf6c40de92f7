//! Fixtures for tests

use crate::carrier::{Carrier, CarrierMap};
use crate::demand::DemandProfiles;
use crate::horizon::{Horizon, Resolution};
use crate::model::{Model, ModelParameters, ObjectiveMode, SolverParameters};
use crate::retrofit::{RetrofitMap, RetrofitScenario};
use crate::storage::{StorageMap, StorageTechnology};
use crate::technology::{ConversionTechnology, TechnologyKind, TechnologyMap};
use crate::units::{
    Capacity, Carbon, CarbonPerCapacity, CarbonPerEnergy, Dimensionless, Energy, Money,
    MoneyPerCapacity, MoneyPerEnergy,
};
use indexmap::indexmap;
use rstest::fixture;
use std::path::PathBuf;
use std::rc::Rc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Two typical days of three steps each
#[fixture]
pub fn horizon() -> Horizon {
    Horizon {
        steps_per_day: 3,
        day_weights: vec![Dimensionless(200.0), Dimensionless(165.0)],
        calendar: None,
    }
}

#[fixture]
pub fn carriers() -> CarrierMap {
    let elec = Carrier {
        id: "elec".into(),
        description: "Electricity".into(),
        import_price: Some(MoneyPerEnergy(0.25)),
        export_price: Some(MoneyPerEnergy(0.05)),
        import_carbon_factor: CarbonPerEnergy(0.4),
        export_carbon_factor: CarbonPerEnergy(0.0),
        network_efficiency: Dimensionless(1.0),
    };
    let heat = Carrier {
        id: "heat".into(),
        description: "Heat".into(),
        import_price: None,
        export_price: None,
        import_carbon_factor: CarbonPerEnergy(0.0),
        export_carbon_factor: CarbonPerEnergy(0.0),
        network_efficiency: Dimensionless(1.0),
    };

    indexmap! {
        elec.id.clone() => elec.into(),
        heat.id.clone() => heat.into(),
    }
}

#[fixture]
pub fn retrofits() -> RetrofitMap {
    let none = RetrofitScenario {
        id: "none".into(),
        description: "No retrofit".into(),
        cost: Money(0.0),
        lifetime: 30,
        embodied_carbon: Carbon(0.0),
    };
    let insulation = RetrofitScenario {
        id: "insulation".into(),
        description: "Wall insulation".into(),
        cost: Money(2000.0),
        lifetime: 30,
        embodied_carbon: Carbon(0.0),
    };

    indexmap! {
        none.id.clone() => none.into(),
        insulation.id.clone() => insulation.into(),
    }
}

/// A gas boiler producing 0.9 units of heat per unit of fuel
#[fixture]
pub fn boiler() -> ConversionTechnology {
    ConversionTechnology {
        id: "boiler".into(),
        description: "Gas boiler".into(),
        kind: TechnologyKind::Dispatchable,
        capital_cost: MoneyPerCapacity(100.0),
        fixed_cost: Money(0.0),
        lifetime: 20,
        operating_cost: MoneyPerEnergy(0.06),
        carbon_factor: CarbonPerEnergy(0.2),
        embodied_carbon: CarbonPerCapacity(0.0),
        fixed_embodied_carbon: Carbon(0.0),
        min_part_load: Dimensionless(0.0),
        max_capacity: None,
        conversion_factors: indexmap! { "heat".into() => Dimensionless(0.9) },
    }
}

/// A heat pump consuming electricity with a coefficient of performance of 3
#[fixture]
pub fn heat_pump() -> ConversionTechnology {
    ConversionTechnology {
        id: "heat_pump".into(),
        description: "Air source heat pump".into(),
        kind: TechnologyKind::Dispatchable,
        capital_cost: MoneyPerCapacity(900.0),
        fixed_cost: Money(500.0),
        lifetime: 20,
        operating_cost: MoneyPerEnergy(0.0),
        carbon_factor: CarbonPerEnergy(0.0),
        embodied_carbon: CarbonPerCapacity(0.0),
        fixed_embodied_carbon: Carbon(0.0),
        min_part_load: Dimensionless(0.0),
        max_capacity: Some(Capacity(50.0)),
        conversion_factors: indexmap! {
            "elec".into() => Dimensionless(-1.0),
            "heat".into() => Dimensionless(3.0),
        },
    }
}

#[fixture]
pub fn technologies(boiler: ConversionTechnology) -> TechnologyMap {
    indexmap! { boiler.id.clone() => boiler.into() }
}

/// A hot water tank
#[fixture]
pub fn tank() -> StorageTechnology {
    StorageTechnology {
        id: "tank".into(),
        description: "Hot water tank".into(),
        carrier_id: "heat".into(),
        capital_cost: MoneyPerCapacity(10.0),
        fixed_cost: Money(0.0),
        lifetime: 20,
        charge_efficiency: Dimensionless(0.95),
        discharge_efficiency: Dimensionless(0.95),
        standing_loss: Dimensionless(0.01),
        max_charge_rate: Dimensionless(0.5),
        max_capacity: Capacity(100.0),
        embodied_carbon: CarbonPerCapacity(0.0),
        fixed_embodied_carbon: Carbon(0.0),
    }
}

#[fixture]
pub fn parameters() -> ModelParameters {
    ModelParameters {
        resolution: Resolution::TypicalDays,
        objective: ObjectiveMode::Cost,
        pareto_points: None,
        retrofit: true,
        steps_per_day: 3,
        discount_rate: Dimensionless(0.05),
        roof_area: None,
        big_m: 1e6,
        minimum_capacity: Capacity(0.0),
        emissions_tolerance: Dimensionless(0.01),
        network: None,
        solver: SolverParameters::default(),
    }
}

/// Constant heat demand of 10 in every time step of the fixture horizon
#[fixture]
pub fn demand(horizon: Horizon) -> DemandProfiles {
    let mut demand = DemandProfiles::default();
    demand.insert(
        "heat".into(),
        None,
        horizon.iter().map(|ts| (ts, Energy(10.0))).collect(),
    );
    demand
}

/// A single-building hub with a boiler serving a constant heat demand
#[fixture]
pub fn model(
    parameters: ModelParameters,
    horizon: Horizon,
    carriers: CarrierMap,
    technologies: TechnologyMap,
    demand: DemandProfiles,
) -> Model {
    Model {
        model_path: PathBuf::from("/path/to/model"),
        parameters,
        horizon,
        carriers,
        technologies,
        storages: StorageMap::new(),
        retrofits: RetrofitMap::new(),
        demand,
        solar: None,
    }
}

/// Wrap a storage technology in a map
pub fn storage_map(storage: StorageTechnology) -> StorageMap {
    indexmap! { storage.id.clone() => Rc::new(storage) }
}
