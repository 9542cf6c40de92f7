//! Code for working with the operational horizon.
//!
//! The horizon is a sequence of days, each split into the same number of time steps. In
//! typical-day models each day carries a weight (the number of real days it represents) and an
//! optional calendar maps each chronological day of the year onto one of the typical days.
use crate::units::Dimensionless;
use indexmap::IndexMap;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::fmt::Display;

/// A series of values defined for every time step of the horizon
pub type TimeSeries<T> = IndexMap<TimeStep, T>;

/// A single time step, identified by day and step within the day (both 1-based)
#[derive(Hash, Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct TimeStep {
    /// The day (a typical day, or a calendar day for continuous state of charge)
    pub day: u32,
    /// The step within the day
    pub step: u32,
}

impl TimeStep {
    /// Create a new [`TimeStep`]
    pub fn new(day: u32, step: u32) -> Self {
        Self { day, step }
    }
}

impl Display for TimeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.day, self.step)
    }
}

/// How time is represented in the optimisation
#[derive(
    PartialEq, Eq, Copy, Clone, Debug, Default, DeserializeLabeledStringEnum, clap::ValueEnum,
)]
pub enum Resolution {
    /// Weighted typical days; storage cycles independently within each day
    #[default]
    #[string = "typical_days"]
    #[value(name = "typical_days")]
    TypicalDays,
    /// Every day of the year in order; storage carries over between consecutive days
    #[string = "full_year"]
    #[value(name = "full_year")]
    FullYear,
    /// Weighted typical days whose storage level is tracked across the whole calendar
    #[string = "typical_days_continuous"]
    #[value(name = "typical_days_continuous")]
    TypicalDaysContinuous,
}

/// Links one state-of-charge variable to its predecessor and to the flows that change it
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct StorageLink {
    /// The state-of-charge step being defined
    pub soc: TimeStep,
    /// The state-of-charge step immediately before `soc`
    pub previous: TimeStep,
    /// The operational time step whose charge and discharge apply
    pub flow: TimeStep,
}

/// Information about the days and time steps in the model
#[derive(PartialEq, Debug, Clone)]
pub struct Horizon {
    /// Number of time steps in each day
    pub steps_per_day: u32,
    /// The weight of each day, indexed from day 1
    pub day_weights: Vec<Dimensionless>,
    /// For each calendar day (indexed from 1), the typical day it is represented by
    pub calendar: Option<Vec<u32>>,
}

impl Horizon {
    /// Number of (typical) days
    pub fn num_days(&self) -> u32 {
        u32::try_from(self.day_weights.len()).unwrap_or(u32::MAX)
    }

    /// Total number of operational time steps
    pub fn len(&self) -> usize {
        self.day_weights.len() * self.steps_per_day as usize
    }

    /// Whether the horizon has no time steps
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over all operational time steps in chronological order
    pub fn iter(&self) -> impl Iterator<Item = TimeStep> + '_ {
        (1..=self.num_days()).flat_map(|day| self.iter_day(day))
    }

    /// Iterate over the time steps of a single day
    pub fn iter_day(&self, day: u32) -> impl Iterator<Item = TimeStep> + use<> {
        (1..=self.steps_per_day).map(move |step| TimeStep::new(day, step))
    }

    /// Whether the time step lies within the horizon
    pub fn contains(&self, time_step: TimeStep) -> bool {
        (1..=self.num_days()).contains(&time_step.day)
            && (1..=self.steps_per_day).contains(&time_step.step)
    }

    /// The weight of the day on which `time_step` falls
    pub fn weight(&self, time_step: TimeStep) -> Dimensionless {
        self.day_weights[(time_step.day - 1) as usize]
    }

    /// Sum of the weights of all days
    pub fn total_weight(&self) -> f64 {
        self.day_weights.iter().map(|w| w.0).sum()
    }

    /// Get the links for the storage balance under the given resolution.
    ///
    /// Returns `None` if continuous state of charge is requested but no calendar is defined.
    pub fn storage_links(&self, resolution: Resolution) -> Option<Vec<StorageLink>> {
        let links = match resolution {
            Resolution::TypicalDays => (1..=self.num_days())
                .flat_map(|day| cyclic_links(self.iter_day(day).collect(), |ts| ts))
                .collect(),
            Resolution::FullYear => cyclic_links(self.iter().collect(), |ts| ts),
            Resolution::TypicalDaysContinuous => {
                let calendar = self.calendar.as_ref()?;
                let num_calendar_days = u32::try_from(calendar.len()).ok()?;
                let soc_steps = (1..=num_calendar_days)
                    .flat_map(|day| self.iter_day(day))
                    .collect();
                cyclic_links(soc_steps, |ts| {
                    TimeStep::new(calendar[(ts.day - 1) as usize], ts.step)
                })
            }
        };

        Some(links)
    }
}

/// Chain `soc_steps` in order, wrapping the first step around to the last
fn cyclic_links<F>(soc_steps: Vec<TimeStep>, flow_of: F) -> Vec<StorageLink>
where
    F: Fn(TimeStep) -> TimeStep,
{
    let Some(&last) = soc_steps.last() else {
        return Vec::new();
    };

    let previous = std::iter::once(last).chain(soc_steps.iter().copied());
    soc_steps
        .iter()
        .zip(previous)
        .map(|(&soc, previous)| StorageLink {
            soc,
            previous,
            flow: flow_of(soc),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::horizon;
    use rstest::rstest;

    #[rstest]
    fn test_horizon_iter(horizon: Horizon) {
        assert_eq!(horizon.len(), 6);
        assert_eq!(horizon.iter().count(), 6);
        assert_eq!(horizon.iter().next(), Some(TimeStep::new(1, 1)));
        assert_eq!(horizon.iter().last(), Some(TimeStep::new(2, 3)));
        assert!(horizon.contains(TimeStep::new(2, 3)));
        assert!(!horizon.contains(TimeStep::new(3, 1)));
        assert!(!horizon.contains(TimeStep::new(1, 0)));
        assert_eq!(horizon.weight(TimeStep::new(2, 1)), Dimensionless(165.0));
        assert_eq!(horizon.total_weight(), 365.0);
    }

    #[rstest]
    fn test_storage_links_typical_days(horizon: Horizon) {
        let links = horizon.storage_links(Resolution::TypicalDays).unwrap();
        assert_eq!(links.len(), 6);

        // Each day wraps around on itself
        assert_eq!(links[0].soc, TimeStep::new(1, 1));
        assert_eq!(links[0].previous, TimeStep::new(1, 3));
        assert_eq!(links[3].soc, TimeStep::new(2, 1));
        assert_eq!(links[3].previous, TimeStep::new(2, 3));
        assert!(links.iter().all(|link| link.soc == link.flow));
    }

    #[rstest]
    fn test_storage_links_full_year(horizon: Horizon) {
        let links = horizon.storage_links(Resolution::FullYear).unwrap();

        // The first step of day 2 follows on from day 1 and the horizon wraps around
        assert_eq!(links[3].previous, TimeStep::new(1, 3));
        assert_eq!(links[0].previous, TimeStep::new(2, 3));
    }

    #[rstest]
    fn test_storage_links_continuous(mut horizon: Horizon) {
        assert!(
            horizon
                .storage_links(Resolution::TypicalDaysContinuous)
                .is_none()
        );

        horizon.calendar = Some(vec![1, 2, 2, 1]);
        let links = horizon
            .storage_links(Resolution::TypicalDaysContinuous)
            .unwrap();
        assert_eq!(links.len(), 12);
        assert_eq!(links[6].soc, TimeStep::new(3, 1));
        assert_eq!(links[6].previous, TimeStep::new(2, 3));
        assert_eq!(links[6].flow, TimeStep::new(2, 1));
        assert_eq!(links[11].flow, TimeStep::new(1, 3));
        assert_eq!(links[0].previous, TimeStep::new(4, 3));
    }

    #[test]
    fn test_time_step_display() {
        assert_eq!(TimeStep::new(3, 14).to_string(), "3.14");
    }
}
