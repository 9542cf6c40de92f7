//! Demand profiles for each carrier, optionally one per retrofit scenario.
use crate::carrier::CarrierID;
use crate::horizon::{Horizon, TimeSeries, TimeStep};
use crate::retrofit::RetrofitID;
use crate::units::Energy;
use indexmap::IndexMap;

/// Demand profiles keyed by carrier and then by retrofit scenario.
///
/// The scenario key is `None` for models without retrofit scenarios.
#[derive(PartialEq, Debug, Default, Clone)]
pub struct DemandProfiles(IndexMap<CarrierID, IndexMap<Option<RetrofitID>, TimeSeries<Energy>>>);

impl DemandProfiles {
    /// Add a profile, returning the previous one for the same carrier and scenario, if any
    pub fn insert(
        &mut self,
        carrier_id: CarrierID,
        scenario: Option<RetrofitID>,
        profile: TimeSeries<Energy>,
    ) -> Option<TimeSeries<Energy>> {
        self.0
            .entry(carrier_id)
            .or_default()
            .insert(scenario, profile)
    }

    /// Get the profile for the given carrier and scenario, if one is defined
    pub fn get_profile(
        &self,
        carrier_id: &CarrierID,
        scenario: Option<&RetrofitID>,
    ) -> Option<&TimeSeries<Energy>> {
        self.0.get(carrier_id)?.get(&scenario.cloned())
    }

    /// Get the demand in a single time step (zero if the carrier has no demand)
    pub fn get(
        &self,
        carrier_id: &CarrierID,
        scenario: Option<&RetrofitID>,
        time_step: TimeStep,
    ) -> Energy {
        self.get_profile(carrier_id, scenario)
            .and_then(|profile| profile.get(&time_step))
            .copied()
            .unwrap_or_default()
    }

    /// Whether any demand is defined for the carrier
    pub fn has_demand(&self, carrier_id: &CarrierID) -> bool {
        self.0.contains_key(carrier_id)
    }

    /// Iterate over the carriers with demand, along with their profiles per scenario
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&CarrierID, &IndexMap<Option<RetrofitID>, TimeSeries<Energy>>)> {
        self.0.iter()
    }

    /// Annual demand for the carrier and scenario, with each day scaled by its weight
    pub fn annual_total(
        &self,
        carrier_id: &CarrierID,
        scenario: Option<&RetrofitID>,
        horizon: &Horizon,
    ) -> Energy {
        horizon
            .iter()
            .map(|ts| self.get(carrier_id, scenario, ts) * horizon.weight(ts))
            .sum()
    }
}
