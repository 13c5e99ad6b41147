//! Reconciliation: one hardware configuration from many requests.
//!
//! Pure functions over the requirements of the currently enabled requests.
//! Disabled or removed requests are never passed in, so they cannot influence
//! the result.
//!
//! # Location rules
//!
//! | Axis      | Aggregate                                               |
//! |-----------|---------------------------------------------------------|
//! | accuracy  | finest requested (maximum)                              |
//! | frequency | most frequent (minimum); `Significant` only if unanimous |
//! | activity  | maximum                                                 |
//! | distance  | minimum; every movement if any request leaves it unset  |
//!
//! Unset accuracy, frequency and activity values are skipped. The first
//! concrete value seeds the running aggregate; axes nobody sets fall back to
//! the defaults below.
//!
//! # Heading rule
//!
//! Minimum filter across enabled requests; an unset filter means "report
//! everything" and wins.

use crate::model::{Accuracy, ActivityType, HeadingFilter, UpdateFrequency};
use crate::request::LocationOptions;

/// Accuracy used when no enabled request sets one.
pub const DEFAULT_ACCURACY: Accuracy = Accuracy::Block;

/// Frequency used when no enabled request sets one.
pub const DEFAULT_FREQUENCY: UpdateFrequency = UpdateFrequency::Continuous;

/// Activity used when no enabled request sets one.
pub const DEFAULT_ACTIVITY: ActivityType = ActivityType::Other;

/// Which hardware monitoring mode a configuration calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringMode {
    /// Regular position updates.
    Continuous,
    /// Low-power significant-change monitoring.
    SignificantChanges,
}

/// Derived hardware configuration for position updates.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationConfig {
    /// Finest requested accuracy.
    pub accuracy: Accuracy,
    /// Most frequent requested cadence.
    pub frequency: UpdateFrequency,
    /// Highest requested activity type.
    pub activity: ActivityType,
    /// Smallest distance filter in meters; `None` reports every movement.
    pub distance_filter: Option<f64>,
    /// Whether updates continue while the app is in the background.
    pub allows_background_updates: bool,
}

impl LocationConfig {
    /// Monitoring mode implied by the aggregate frequency.
    pub fn mode(&self) -> MonitoringMode {
        match self.frequency {
            UpdateFrequency::Significant => MonitoringMode::SignificantChanges,
            UpdateFrequency::Continuous | UpdateFrequency::OneShot => MonitoringMode::Continuous,
        }
    }

    /// Desired accuracy in meters to hand to the hardware.
    pub fn desired_accuracy_meters(&self) -> f64 {
        self.accuracy.meters()
    }
}

/// Derive the location configuration for a set of enabled requests.
///
/// Returns `None` for an empty set, meaning all position monitoring stops.
pub fn derive_location_config<'a, I>(
    requests: I,
    allows_background_updates: bool,
) -> Option<LocationConfig>
where
    I: IntoIterator<Item = &'a LocationOptions>,
{
    let mut seen = false;
    let mut accuracy: Option<Accuracy> = None;
    let mut frequency: Option<UpdateFrequency> = None;
    let mut activity: Option<ActivityType> = None;
    let mut distance: Option<f64> = None;
    let mut every_movement = false;

    for options in requests {
        seen = true;

        if let Some(requested) = options.accuracy {
            accuracy = Some(accuracy.map_or(requested, |current| current.max(requested)));
        }
        if let Some(requested) = options.frequency {
            frequency = Some(frequency.map_or(requested, |current| current.min(requested)));
        }
        if let Some(requested) = options.activity {
            activity = Some(activity.map_or(requested, |current| current.max(requested)));
        }
        match options.distance_filter {
            Some(meters) => {
                distance = Some(distance.map_or(meters, |current| current.min(meters)));
            }
            None => every_movement = true,
        }
    }

    if !seen {
        return None;
    }

    Some(LocationConfig {
        accuracy: accuracy.unwrap_or(DEFAULT_ACCURACY),
        frequency: frequency.unwrap_or(DEFAULT_FREQUENCY),
        activity: activity.unwrap_or(DEFAULT_ACTIVITY),
        distance_filter: if every_movement { None } else { distance },
        allows_background_updates,
    })
}

/// Derive the heading filter for a set of enabled requests' filters.
///
/// Returns `None` for an empty set, meaning heading updates stop.
pub fn derive_heading_filter<I>(filters: I) -> Option<HeadingFilter>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut result: Option<HeadingFilter> = None;

    for filter in filters {
        let filter = match filter {
            Some(degrees) if degrees > 0.0 => HeadingFilter::Degrees(degrees),
            _ => HeadingFilter::All,
        };
        result = Some(match result {
            None => filter,
            Some(current) => {
                if filter.degrees() < current.degrees() {
                    filter
                } else {
                    current
                }
            }
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::ObserverRegistry;
    use crate::request::{LocationRequest, Request};
    use proptest::prelude::*;

    fn opts(accuracy: Accuracy, frequency: UpdateFrequency) -> LocationOptions {
        LocationOptions::new()
            .with_accuracy(accuracy)
            .with_frequency(frequency)
    }

    #[test]
    fn test_empty_set_stops_monitoring() {
        assert_eq!(derive_location_config(std::iter::empty(), false), None);
        assert_eq!(derive_heading_filter(std::iter::empty()), None);
    }

    #[test]
    fn test_continuous_beats_significant() {
        let best = opts(Accuracy::Navigation, UpdateFrequency::Continuous);
        let coarse = opts(Accuracy::City, UpdateFrequency::Significant);

        let config = derive_location_config([&best, &coarse], false).unwrap();
        assert_eq!(config.accuracy, Accuracy::Navigation);
        assert_eq!(config.frequency, UpdateFrequency::Continuous);
        assert_eq!(config.mode(), MonitoringMode::Continuous);
    }

    #[test]
    fn test_unanimous_significant_selects_significant_mode() {
        let a = opts(Accuracy::City, UpdateFrequency::Significant);
        let b = opts(Accuracy::Block, UpdateFrequency::Significant);

        let config = derive_location_config([&a, &b], false).unwrap();
        assert_eq!(config.frequency, UpdateFrequency::Significant);
        assert_eq!(config.mode(), MonitoringMode::SignificantChanges);
        assert_eq!(config.accuracy, Accuracy::Block);
    }

    #[test]
    fn test_unset_axes_do_not_dominate() {
        let unset = LocationOptions::new();
        let significant = LocationOptions::new().with_frequency(UpdateFrequency::Significant);
        let coarse = LocationOptions::new().with_accuracy(Accuracy::Country);

        let config = derive_location_config([&unset, &significant, &coarse], false).unwrap();
        assert_eq!(config.frequency, UpdateFrequency::Significant);
        assert_eq!(config.accuracy, Accuracy::Country);
        assert_eq!(config.activity, DEFAULT_ACTIVITY);
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let unset = LocationOptions::new();
        let config = derive_location_config([&unset], true).unwrap();

        assert_eq!(config.accuracy, DEFAULT_ACCURACY);
        assert_eq!(config.frequency, DEFAULT_FREQUENCY);
        assert_eq!(config.activity, DEFAULT_ACTIVITY);
        assert_eq!(config.distance_filter, None);
        assert!(config.allows_background_updates);
    }

    #[test]
    fn test_activity_takes_maximum() {
        let walk = LocationOptions::new().with_activity(ActivityType::Fitness);
        let drive = LocationOptions::new().with_activity(ActivityType::AutomotiveNavigation);

        let config = derive_location_config([&walk, &drive], false).unwrap();
        assert_eq!(config.activity, ActivityType::AutomotiveNavigation);
    }

    #[test]
    fn test_distance_filter_aggregation() {
        let far = LocationOptions::new().with_distance_filter(500.0);
        let near = LocationOptions::new().with_distance_filter(50.0);
        let every = LocationOptions::new();

        let config = derive_location_config([&far, &near], false).unwrap();
        assert_eq!(config.distance_filter, Some(50.0));

        let config = derive_location_config([&far, &near, &every], false).unwrap();
        assert_eq!(config.distance_filter, None);
    }

    #[test]
    fn test_one_shot_runs_continuous_mode() {
        let once = opts(Accuracy::House, UpdateFrequency::OneShot);
        let config = derive_location_config([&once], false).unwrap();
        assert_eq!(config.mode(), MonitoringMode::Continuous);
    }

    #[test]
    fn test_heading_unset_filter_reports_everything() {
        assert_eq!(
            derive_heading_filter([Some(5.0)]),
            Some(HeadingFilter::Degrees(5.0))
        );
        assert_eq!(
            derive_heading_filter([Some(5.0), None]),
            Some(HeadingFilter::All)
        );
        assert_eq!(
            derive_heading_filter([Some(10.0), Some(2.5)]),
            Some(HeadingFilter::Degrees(2.5))
        );
    }

    fn accuracy_strategy() -> impl Strategy<Value = Accuracy> {
        prop_oneof![
            Just(Accuracy::Any),
            Just(Accuracy::Country),
            Just(Accuracy::City),
            Just(Accuracy::Neighborhood),
            Just(Accuracy::Block),
            Just(Accuracy::House),
            Just(Accuracy::Room),
            Just(Accuracy::Navigation),
        ]
    }

    fn frequency_strategy() -> impl Strategy<Value = UpdateFrequency> {
        prop_oneof![
            Just(UpdateFrequency::Continuous),
            Just(UpdateFrequency::OneShot),
            Just(UpdateFrequency::Significant),
        ]
    }

    proptest! {
        #[test]
        fn prop_accuracy_is_finest_and_frequency_most_frequent(
            axes in prop::collection::vec((accuracy_strategy(), frequency_strategy()), 1..12)
        ) {
            let options: Vec<LocationOptions> =
                axes.iter().map(|(a, f)| opts(*a, *f)).collect();
            let config = derive_location_config(options.iter(), false).unwrap();

            let finest = axes.iter().map(|(a, _)| *a).max().unwrap();
            let most_frequent = axes.iter().map(|(_, f)| *f).min().unwrap();
            let all_significant = axes.iter().all(|(_, f)| *f == UpdateFrequency::Significant);

            prop_assert_eq!(config.accuracy, finest);
            prop_assert_eq!(config.frequency, most_frequent);
            prop_assert_eq!(
                config.mode() == MonitoringMode::SignificantChanges,
                all_significant
            );
        }

        #[test]
        fn prop_add_then_remove_restores_config(
            axes in prop::collection::vec((accuracy_strategy(), frequency_strategy()), 1..8),
            extra in (accuracy_strategy(), frequency_strategy()),
            distance in prop::option::of(1.0f64..500.0),
        ) {
            let mut registry = ObserverRegistry::new();
            for (a, f) in &axes {
                registry.add(Arc::new(LocationRequest::new(opts(*a, *f), |_| {}, |_| {})));
            }
            let derive = |registry: &ObserverRegistry<LocationRequest>| {
                derive_location_config(registry.enabled().map(|r| r.options()), false)
            };
            let before = derive(&registry);

            let mut extra_options = opts(extra.0, extra.1);
            extra_options.distance_filter = distance;
            let added = Arc::new(LocationRequest::new(extra_options, |_| {}, |_| {}));
            let id = added.id();
            prop_assert!(registry.add(added));
            prop_assert_eq!(registry.len(), axes.len() + 1);

            prop_assert!(registry.remove(id).is_some());
            prop_assert_eq!(derive(&registry), before);
        }

        #[test]
        fn prop_heading_filter_is_minimum(
            filters in prop::collection::vec(prop::option::of(0.5f64..90.0), 1..10)
        ) {
            let derived = derive_heading_filter(filters.iter().copied()).unwrap();
            if filters.iter().any(Option::is_none) {
                prop_assert_eq!(derived, HeadingFilter::All);
            } else {
                let min = filters.iter().flatten().fold(f64::MAX, |acc, d| acc.min(*d));
                prop_assert_eq!(derived, HeadingFilter::Degrees(min));
            }
        }
    }
}
