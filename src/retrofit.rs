//! Building retrofit scenarios. Exactly one scenario is selected and its demand profile applies.
use crate::id::{define_id_getter, define_id_type};
use crate::units::{Carbon, Money};
use indexmap::IndexMap;
use std::rc::Rc;

define_id_type! {RetrofitID}

/// A map of [`RetrofitScenario`]s, keyed by scenario ID
pub type RetrofitMap = IndexMap<RetrofitID, Rc<RetrofitScenario>>;

/// A discrete building upgrade option
#[derive(PartialEq, Debug, Clone)]
pub struct RetrofitScenario {
    /// Unique identifier for the scenario (e.g. "wall_insulation")
    pub id: RetrofitID,
    /// Text description
    pub description: String,
    /// Up-front cost of carrying out the retrofit
    pub cost: Money,
    /// Lifetime of the retrofit measures in years
    pub lifetime: u32,
    /// Emissions embodied in the retrofit materials over the whole lifetime
    pub embodied_carbon: Carbon,
}
define_id_getter! {RetrofitScenario, RetrofitID}
