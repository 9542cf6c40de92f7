//! Code for adding constraints to the hub optimisation problem.
use super::{BuildOptions, ConstraintFamily, Rows, VariableKey, VariableMap};
use crate::horizon::StorageLink;
use crate::model::Model;
use crate::storage::iter_storages_for_carrier;
use itertools::Itertools;
use std::iter;

/// Add all constraint families apart from the emissions cap.
///
/// # Arguments:
///
/// * `rows` - The rows of the problem
/// * `variables` - The variables in the problem
/// * `model` - The model
/// * `options` - How the problem is formulated
/// * `storage_links` - Predecessor and flow time step for each state-of-charge step
pub fn add_constraints(
    rows: &mut Rows,
    variables: &VariableMap,
    model: &Model,
    options: &BuildOptions,
    storage_links: &[StorageLink],
) {
    add_energy_balance_constraints(rows, variables, model, options);
    add_conversion_constraints(rows, variables, model);
    add_roof_area_constraint(rows, variables, model);
    add_storage_constraints(rows, variables, model, storage_links);

    if options.retrofit_active(model) {
        add_retrofit_selection_constraint(rows, variables, model);
    }
}

/// Add an energy balance for every carrier at every time step.
///
/// Production (positive conversion factors), imports and storage discharge must equal
/// consumption, exports, storage charge and demand (grossed up for network losses). When the
/// retrofit choice is active, demand depends on which scenario is selected, so each scenario's
/// demand appears on the left-hand side multiplied by its binary.
fn add_energy_balance_constraints(
    rows: &mut Rows,
    variables: &VariableMap,
    model: &Model,
    options: &BuildOptions,
) {
    let retrofit_active = options.retrofit_active(model);

    // Without the retrofit choice, the first scenario (if there is one) gives the demand
    let fixed_scenario = model.retrofits.keys().next();

    let mut terms = Vec::new();
    for carrier in model.carriers.values() {
        let efficiency = carrier.network_efficiency.0;
        for ts in model.horizon.iter() {
            for technology in model.technologies.values() {
                let factor = technology.factor(&carrier.id).0;
                if factor != 0.0 {
                    let input = variables.get(&VariableKey::Input(technology.id.clone(), ts));
                    terms.push((input, factor));
                }
            }

            if let Some(import) = variables.get_opt(&VariableKey::Import(carrier.id.clone(), ts)) {
                terms.push((import, 1.0));
            }
            if let Some(export) = variables.get_opt(&VariableKey::Export(carrier.id.clone(), ts)) {
                terms.push((export, -1.0));
            }

            for storage in iter_storages_for_carrier(&model.storages, &carrier.id) {
                let discharge = variables.get(&VariableKey::Discharge(storage.id.clone(), ts));
                let charge = variables.get(&VariableKey::Charge(storage.id.clone(), ts));
                terms.push((discharge, 1.0));
                terms.push((charge, -1.0));
            }

            let rhs = if retrofit_active {
                for scenario_id in model.retrofits.keys() {
                    let demand = model.demand.get(&carrier.id, Some(scenario_id), ts).0;
                    if demand != 0.0 {
                        let selected = variables.get(&VariableKey::Retrofit(scenario_id.clone()));
                        terms.push((selected, -demand / efficiency));
                    }
                }
                0.0
            } else {
                model.demand.get(&carrier.id, fixed_scenario, ts).0 / efficiency
            };

            rows.add(ConstraintFamily::EnergyBalance, rhs..=rhs, terms.drain(..));
        }
    }
}

/// Add capacity, solar input, installation and part load constraints for conversion technologies
fn add_conversion_constraints(rows: &mut Rows, variables: &VariableMap, model: &Model) {
    let parameters = &model.parameters;
    for technology in model.technologies.values() {
        let id = &technology.id;
        let capacity = variables.get(&VariableKey::Capacity(id.clone()));
        let installed = variables.get(&VariableKey::Installed(id.clone()));
        let big_m = technology
            .max_capacity
            .map_or(parameters.big_m, |max_capacity| max_capacity.0);

        // Capacity can only be nonzero if installed, and installations have a minimum size
        rows.add(
            ConstraintFamily::Installation,
            ..=0.0,
            [(capacity, 1.0), (installed, -big_m)],
        );
        if parameters.minimum_capacity.0 > 0.0 {
            rows.add(
                ConstraintFamily::Installation,
                0.0..,
                [(capacity, 1.0), (installed, -parameters.minimum_capacity.0)],
            );
        }

        for ts in model.horizon.iter() {
            let input = variables.get(&VariableKey::Input(id.clone(), ts));
            if technology.is_solar() {
                let irradiance = model
                    .solar
                    .as_ref()
                    .and_then(|solar| solar.get(&ts))
                    .map_or(0.0, |irradiance| irradiance.0);
                rows.add(
                    ConstraintFamily::SolarInput,
                    0.0..=0.0,
                    [(input, 1.0), (capacity, -irradiance)],
                );
            } else {
                rows.add(
                    ConstraintFamily::Capacity,
                    ..=0.0,
                    [(input, 1.0), (capacity, -1.0)],
                );
            }

            if technology.has_part_load() {
                // input <= M * on and input + M * (1 - on) >= min_part_load * capacity
                let on = variables.get(&VariableKey::On(id.clone(), ts));
                rows.add(ConstraintFamily::PartLoad, ..=0.0, [(input, 1.0), (on, -big_m)]);
                rows.add(
                    ConstraintFamily::PartLoad,
                    -big_m..,
                    [
                        (input, 1.0),
                        (capacity, -technology.min_part_load.0),
                        (on, -big_m),
                    ],
                );
            }
        }
    }
}

/// Limit the total area of solar collectors to the available roof area
fn add_roof_area_constraint(rows: &mut Rows, variables: &VariableMap, model: &Model) {
    let Some(roof_area) = model.parameters.roof_area else {
        return;
    };

    let terms = model
        .technologies
        .values()
        .filter(|technology| technology.is_solar())
        .map(|technology| (variables.get(&VariableKey::Capacity(technology.id.clone())), 1.0))
        .collect_vec();
    if !terms.is_empty() {
        rows.add(ConstraintFamily::RoofArea, ..=roof_area.0, terms);
    }
}

/// Add state-of-charge dynamics along with rate and capacity limits for storage technologies.
///
/// Which state-of-charge step follows which depends on the temporal resolution and is given by
/// `storage_links`.
fn add_storage_constraints(
    rows: &mut Rows,
    variables: &VariableMap,
    model: &Model,
    storage_links: &[StorageLink],
) {
    for storage in model.storages.values() {
        let id = &storage.id;
        let capacity = variables.get(&VariableKey::StorageCapacity(id.clone()));
        let installed = variables.get(&VariableKey::StorageInstalled(id.clone()));
        let max_capacity = storage.max_capacity.0.min(model.parameters.big_m);
        rows.add(
            ConstraintFamily::StorageCapacity,
            ..=0.0,
            [(capacity, 1.0), (installed, -max_capacity)],
        );
        let minimum_capacity = model.parameters.minimum_capacity.0;
        if minimum_capacity > 0.0 {
            rows.add(
                ConstraintFamily::StorageCapacity,
                0.0..,
                [(capacity, 1.0), (installed, -minimum_capacity)],
            );
        }

        let retention = 1.0 - storage.standing_loss.0;
        for link in storage_links {
            let soc = variables.get(&VariableKey::StateOfCharge(id.clone(), link.soc));
            let charge = variables.get(&VariableKey::Charge(id.clone(), link.flow));
            let discharge = variables.get(&VariableKey::Discharge(id.clone(), link.flow));
            let flow_terms = [
                (charge, -storage.charge_efficiency.0),
                (discharge, 1.0 / storage.discharge_efficiency.0),
            ];

            // soc[t] - retention * soc[prev] - eff_c * charge + discharge / eff_d = 0
            if link.previous == link.soc {
                // A cycle of one step is its own predecessor
                rows.add(
                    ConstraintFamily::StorageBalance,
                    0.0..=0.0,
                    iter::once((soc, 1.0 - retention)).chain(flow_terms),
                );
            } else {
                let previous =
                    variables.get(&VariableKey::StateOfCharge(id.clone(), link.previous));
                rows.add(
                    ConstraintFamily::StorageBalance,
                    0.0..=0.0,
                    [(soc, 1.0), (previous, -retention)]
                        .into_iter()
                        .chain(flow_terms),
                );
            }

            rows.add(
                ConstraintFamily::StorageCapacity,
                ..=0.0,
                [(soc, 1.0), (capacity, -1.0)],
            );
        }

        let rate = storage.max_charge_rate.0;
        for ts in model.horizon.iter() {
            let charge = variables.get(&VariableKey::Charge(id.clone(), ts));
            let discharge = variables.get(&VariableKey::Discharge(id.clone(), ts));
            rows.add(
                ConstraintFamily::StorageRate,
                ..=0.0,
                [(charge, 1.0), (capacity, -rate)],
            );
            rows.add(
                ConstraintFamily::StorageRate,
                ..=0.0,
                [(discharge, 1.0), (capacity, -rate)],
            );
        }
    }
}

/// Exactly one retrofit scenario must be selected
fn add_retrofit_selection_constraint(rows: &mut Rows, variables: &VariableMap, model: &Model) {
    let terms = model
        .retrofits
        .keys()
        .map(|id| (variables.get(&VariableKey::Retrofit(id.clone())), 1.0))
        .collect_vec();
    rows.add(ConstraintFamily::RetrofitSelection, 1.0..=1.0, terms);
}

#[cfg(test)]
mod tests {
    use super::super::{Objective, build_model};
    use super::*;
    use crate::fixture::{model, parameters, storage_map, tank};
    use crate::storage::StorageTechnology;
    use crate::horizon::Resolution;
    use crate::model::{Model, ModelParameters, ObjectiveMode};
    use crate::technology::{ConversionTechnology, TechnologyKind};
    use crate::units::{Capacity, Dimensionless, EnergyPerCapacity};
    use indexmap::indexmap;
    use rstest::rstest;

    fn options() -> BuildOptions {
        BuildOptions {
            resolution: Resolution::TypicalDays,
            objective: ObjectiveMode::Cost,
            pareto_points: None,
            retrofit: true,
        }
    }

    #[rstest]
    fn test_part_load_and_minimum_capacity(mut model: Model, parameters: ModelParameters) {
        let mut boiler = (*model.technologies["boiler"]).clone();
        boiler.min_part_load = Dimensionless(0.3);
        model.technologies.insert(boiler.id.clone(), boiler.into());
        model.parameters = ModelParameters {
            minimum_capacity: Capacity(2.0),
            ..parameters
        };

        let built = build_model(&model, &options(), Objective::Cost, None).unwrap();
        assert_eq!(built.constraint_counts[&ConstraintFamily::PartLoad], 2 * 6);
        assert_eq!(built.constraint_counts[&ConstraintFamily::Installation], 2);
        // Capacity + installed + 6 inputs + 6 on/off + 12 grid exchange columns
        assert_eq!(built.variables.len(), 26);
        assert_eq!(built.variables.num_binaries(), 7);
    }

    #[rstest]
    fn test_storage_minimum_capacity(
        mut model: Model,
        parameters: ModelParameters,
        tank: StorageTechnology,
    ) {
        model.storages = storage_map(tank);

        // Upper bound from installation plus one state-of-charge bound per step
        let built = build_model(&model, &options(), Objective::Cost, None).unwrap();
        assert_eq!(built.constraint_counts[&ConstraintFamily::StorageCapacity], 1 + 6);

        model.parameters = ModelParameters {
            minimum_capacity: Capacity(2.0),
            ..parameters
        };
        let built = build_model(&model, &options(), Objective::Cost, None).unwrap();
        assert_eq!(built.constraint_counts[&ConstraintFamily::StorageCapacity], 2 + 6);
    }

    #[rstest]
    fn test_solar_constraints(mut model: Model) {
        let collector = ConversionTechnology {
            id: "pv".into(),
            description: String::new(),
            kind: TechnologyKind::Solar,
            conversion_factors: indexmap! { "elec".into() => Dimensionless(0.18) },
            ..(*model.technologies["boiler"]).clone()
        };
        model
            .technologies
            .insert(collector.id.clone(), collector.into());
        model.solar = Some(
            model
                .horizon
                .iter()
                .map(|ts| (ts, EnergyPerCapacity(0.5)))
                .collect(),
        );

        let built = build_model(&model, &options(), Objective::Cost, None).unwrap();
        assert_eq!(built.constraint_counts[&ConstraintFamily::SolarInput], 6);
        assert_eq!(built.constraint_counts[&ConstraintFamily::Capacity], 6);
        assert!(
            !built
                .constraint_counts
                .contains_key(&ConstraintFamily::RoofArea)
        );

        model.parameters.roof_area = Some(Capacity(20.0));
        let built = build_model(&model, &options(), Objective::Cost, None).unwrap();
        assert_eq!(built.constraint_counts[&ConstraintFamily::RoofArea], 1);
    }
}
