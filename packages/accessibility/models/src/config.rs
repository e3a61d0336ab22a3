//! Analysis configuration and its validation rules.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Gaussian decay constant giving a weight of 0.5 at 800 units.
pub const DEFAULT_DECAY_CONSTANT: f64 = 923_325.0;

/// Errors raised while validating an [`AccessConfig`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Unrecognized access point mode.
    #[error("Invalid access point mode '{value}': expected 'centroid' or 'entrance'")]
    InvalidMode {
        /// The rejected input.
        value: String,
    },

    /// Unrecognized catchment boundary rule.
    #[error("Invalid catchment boundary '{value}': expected 'inclusive' or 'exclusive'")]
    InvalidBoundary {
        /// The rejected input.
        value: String,
    },

    /// The catchment radius must be positive.
    #[error("Distance threshold must be positive, got {value}")]
    NonPositiveDistance {
        /// The rejected value.
        value: f64,
    },

    /// The minimum site area must be positive.
    #[error("Minimum site area must be positive, got {value}")]
    NonPositiveArea {
        /// The rejected value.
        value: f64,
    },

    /// A buffer or deduplication radius must be positive.
    #[error("{name} must be positive, got {value}")]
    NonPositiveRadius {
        /// Which setting.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The decay constant must be positive.
    #[error("Decay constant must be positive, got {value}")]
    NonPositiveDecay {
        /// The rejected value.
        value: f64,
    },

    /// A fraction setting fell outside `(0, 1]`.
    #[error("{name} must be in (0, 1], got {value}")]
    InvalidFraction {
        /// Which setting.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Negative population floor or network distance cutoff.
    #[error("{name} must not be negative, got {value}")]
    Negative {
        /// Which setting.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// How access points are derived from supply sites.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case", try_from = "String")]
#[strum(ascii_case_insensitive)]
pub enum AccessPointMode {
    /// One gate per site at its centroid.
    #[default]
    #[strum(to_string = "centroid", serialize = "centroids")]
    Centroid,
    /// Gates where the buffered site boundary crosses the road network.
    #[strum(to_string = "entrance", serialize = "entrances")]
    Entrance,
}

impl AccessPointMode {
    /// Parses a mode string, accepting `centroid(s)` and `entrance(s)` in any
    /// letter case.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMode`] for anything else.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        Self::from_str(value.trim()).map_err(|_| ConfigError::InvalidMode {
            value: value.to_string(),
        })
    }
}

impl TryFrom<String> for AccessPointMode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Whether an access point lying exactly on the catchment edge is inside.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case", try_from = "String")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CatchmentBoundary {
    /// `distance <= radius`.
    #[default]
    Inclusive,
    /// `distance < radius`.
    Exclusive,
}

impl CatchmentBoundary {
    /// Applies the rule to a planar distance.
    #[must_use]
    pub fn admits(self, distance: f64, radius: f64) -> bool {
        match self {
            Self::Inclusive => distance <= radius,
            Self::Exclusive => distance < radius,
        }
    }
}

impl TryFrom<String> for CatchmentBoundary {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(value.trim()).map_err(|_| ConfigError::InvalidBoundary { value })
    }
}

/// Tunable parameters of an accessibility run.
///
/// Every field has a default so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessConfig {
    /// Catchment radius around each demand unit, and the expansion applied
    /// to the administrative boundary before clipping parcels.
    pub distance_threshold: f64,
    /// Access point derivation mode.
    pub mode: AccessPointMode,
    /// Sites with area at or below this are discarded.
    pub min_site_area: f64,
    /// Buffer applied to each parcel piece for the merge proximity relation.
    pub merge_buffer: f64,
    /// Buffer applied to a site before crossing its boundary with roads.
    pub entrance_buffer: f64,
    /// Access points closer than this collapse to one representative.
    pub gate_dedup_radius: f64,
    /// Units below this population are dropped.
    pub min_population: f64,
    /// Units whose clipped area is at or below this fraction of the largest
    /// clipped area are dropped.
    pub min_area_fraction: f64,
    /// `v` in `exp(-d^2 / v)`.
    pub decay_constant: f64,
    /// Edge rule for the catchment containment test.
    pub catchment_boundary: CatchmentBoundary,
    /// Reachable pairs farther than this along the network are excluded
    /// from scoring.
    pub max_network_distance: Option<f64>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 800.0,
            mode: AccessPointMode::Centroid,
            min_site_area: 400.0,
            merge_buffer: 20.0,
            entrance_buffer: 20.0,
            gate_dedup_radius: 50.0,
            min_population: 10.0,
            min_area_fraction: 0.5,
            decay_constant: DEFAULT_DECAY_CONSTANT,
            catchment_boundary: CatchmentBoundary::Inclusive,
            max_network_distance: None,
        }
    }
}

impl AccessConfig {
    /// Decay constant for which the weight equals 0.5 at `distance`.
    #[must_use]
    pub fn decay_for_half_weight(distance: f64) -> f64 {
        distance * distance / std::f64::consts::LN_2
    }

    /// Checks every numeric setting.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_positive(self.distance_threshold) {
            return Err(ConfigError::NonPositiveDistance {
                value: self.distance_threshold,
            });
        }
        if !is_positive(self.min_site_area) {
            return Err(ConfigError::NonPositiveArea {
                value: self.min_site_area,
            });
        }
        for (name, value) in [
            ("Merge buffer", self.merge_buffer),
            ("Entrance buffer", self.entrance_buffer),
            ("Gate deduplication radius", self.gate_dedup_radius),
        ] {
            if !is_positive(value) {
                return Err(ConfigError::NonPositiveRadius { name, value });
            }
        }
        if !is_positive(self.decay_constant) {
            return Err(ConfigError::NonPositiveDecay {
                value: self.decay_constant,
            });
        }
        if !(is_positive(self.min_area_fraction) && self.min_area_fraction <= 1.0) {
            return Err(ConfigError::InvalidFraction {
                name: "Minimum area fraction",
                value: self.min_area_fraction,
            });
        }
        if !is_non_negative(self.min_population) {
            return Err(ConfigError::Negative {
                name: "Minimum population",
                value: self.min_population,
            });
        }
        if let Some(cutoff) = self.max_network_distance {
            if !is_non_negative(cutoff) {
                return Err(ConfigError::Negative {
                    name: "Maximum network distance",
                    value: cutoff,
                });
            }
        }
        Ok(())
    }
}

/// False for NaN.
fn is_positive(value: f64) -> bool {
    value > 0.0
}

/// False for NaN.
fn is_non_negative(value: f64) -> bool {
    value >= 0.0
}
