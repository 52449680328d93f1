use crate::core::bonding::{BondingCriteria, DEFAULT_BOND_TOLERANCE, DEFAULT_MIN_BOND_DISTANCE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DEDUP_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid value {value} for parameter '{name}': {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

/// Options for assembling molecules from an asymmetric unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildOptions {
    pub bonding: BondingCriteria,
    /// Grow molecules across cell boundaries instead of cutting them at the cell faces.
    pub pack_complete: bool,
    /// Per-axis fractional distance below which two images of one site coincide.
    pub dedup_tolerance: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            bonding: BondingCriteria::default(),
            pack_complete: false,
            dedup_tolerance: DEFAULT_DEDUP_TOLERANCE,
        }
    }
}

impl BuildOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerance = self.bonding.tolerance;
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "bond_tolerance",
                value: tolerance,
                reason: "must be a positive number",
            });
        }
        let floor = self.bonding.min_distance;
        if !(floor.is_finite() && floor >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "min_bond_distance",
                value: floor,
                reason: "must be non-negative",
            });
        }
        let dedup = self.dedup_tolerance;
        if !(dedup > 0.0 && dedup < 0.5) {
            return Err(ConfigError::InvalidParameter {
                name: "dedup_tolerance",
                value: dedup,
                reason: "must lie in (0, 0.5)",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// The matched atoms form exactly one whole molecule with the template's bonds.
    Exact,
    /// Every template node and edge is realised; the target may have more.
    #[default]
    Substructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchOptions {
    pub mode: MatchMode,
    /// Stop after this many matches; `0` means unlimited.
    pub max_matches: usize,
    /// Wall-clock budget per target; `None` means unlimited.
    pub time_budget: Option<Duration>,
    /// Keep only the first match for each distinct set of target atoms.
    pub unique: bool,
}

impl MatchOptions {
    pub fn with_mode(mode: MatchMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub build: BuildOptions,
    pub matching: MatchOptions,
    /// Skip targets that fail the element-count or fingerprint screen.
    pub prefilter: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            build: BuildOptions::default(),
            matching: MatchOptions::default(),
            prefilter: true,
        }
    }
}

#[derive(Default)]
pub struct SearchConfigBuilder {
    bond_tolerance: Option<f64>,
    min_bond_distance: Option<f64>,
    pack_complete: Option<bool>,
    dedup_tolerance: Option<f64>,
    mode: Option<MatchMode>,
    max_matches: Option<usize>,
    time_budget_ms: Option<u64>,
    unique: Option<bool>,
    prefilter: Option<bool>,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bond_tolerance(mut self, tolerance: f64) -> Self {
        self.bond_tolerance = Some(tolerance);
        self
    }
    pub fn min_bond_distance(mut self, distance: f64) -> Self {
        self.min_bond_distance = Some(distance);
        self
    }
    pub fn pack_complete(mut self, enabled: bool) -> Self {
        self.pack_complete = Some(enabled);
        self
    }
    pub fn dedup_tolerance(mut self, tolerance: f64) -> Self {
        self.dedup_tolerance = Some(tolerance);
        self
    }
    pub fn mode(mut self, mode: MatchMode) -> Self {
        self.mode = Some(mode);
        self
    }
    pub fn max_matches(mut self, n: usize) -> Self {
        self.max_matches = Some(n);
        self
    }
    /// `0` disables the budget.
    pub fn time_budget_ms(mut self, ms: u64) -> Self {
        self.time_budget_ms = Some(ms);
        self
    }
    pub fn unique(mut self, enabled: bool) -> Self {
        self.unique = Some(enabled);
        self
    }
    pub fn prefilter(mut self, enabled: bool) -> Self {
        self.prefilter = Some(enabled);
        self
    }

    pub fn build(self) -> Result<SearchConfig, ConfigError> {
        let build = BuildOptions {
            bonding: BondingCriteria {
                tolerance: self.bond_tolerance.unwrap_or(DEFAULT_BOND_TOLERANCE),
                min_distance: self.min_bond_distance.unwrap_or(DEFAULT_MIN_BOND_DISTANCE),
            },
            pack_complete: self.pack_complete.unwrap_or(false),
            dedup_tolerance: self.dedup_tolerance.unwrap_or(DEFAULT_DEDUP_TOLERANCE),
        };
        build.validate()?;

        let matching = MatchOptions {
            mode: self.mode.unwrap_or_default(),
            max_matches: self.max_matches.unwrap_or(0),
            time_budget: self
                .time_budget_ms
                .filter(|&ms| ms > 0)
                .map(Duration::from_millis),
            unique: self.unique.unwrap_or(false),
        };

        Ok(SearchConfig {
            build,
            matching,
            prefilter: self.prefilter.unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SearchConfigBuilder::new().build().unwrap();
        assert_eq!(config, SearchConfig::default());
        assert_eq!(config.build.bonding.tolerance, 1.15);
        assert_eq!(config.build.bonding.min_distance, 0.4);
        assert!(!config.build.pack_complete);
        assert_eq!(config.build.dedup_tolerance, 1e-3);
        assert_eq!(config.matching.mode, MatchMode::Substructure);
        assert_eq!(config.matching.max_matches, 0);
        assert_eq!(config.matching.time_budget, None);
    }

    #[test]
    fn builder_sets_every_field() {
        let config = SearchConfigBuilder::new()
            .bond_tolerance(1.3)
            .min_bond_distance(0.5)
            .pack_complete(true)
            .dedup_tolerance(0.01)
            .mode(MatchMode::Exact)
            .max_matches(10)
            .time_budget_ms(250)
            .unique(true)
            .prefilter(false)
            .build()
            .unwrap();
        assert_eq!(config.build.bonding.tolerance, 1.3);
        assert_eq!(config.build.bonding.min_distance, 0.5);
        assert!(config.build.pack_complete);
        assert_eq!(config.build.dedup_tolerance, 0.01);
        assert_eq!(config.matching.mode, MatchMode::Exact);
        assert_eq!(config.matching.max_matches, 10);
        assert_eq!(config.matching.time_budget, Some(Duration::from_millis(250)));
        assert!(config.matching.unique);
        assert!(!config.prefilter);
    }

    #[test]
    fn zero_time_budget_means_unlimited() {
        let config = SearchConfigBuilder::new().time_budget_ms(0).build().unwrap();
        assert_eq!(config.matching.time_budget, None);
    }

    #[test]
    fn rejects_non_positive_tolerance() {
        let err = SearchConfigBuilder::new().bond_tolerance(0.0).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                name: "bond_tolerance",
                ..
            }
        ));
    }

    #[test]
    fn every_config_error_names_its_parameter() {
        let err = SearchConfigBuilder::new().dedup_tolerance(0.6).build().unwrap_err();
        let ConfigError::InvalidParameter { name, value, .. } = err;
        assert_eq!(name, "dedup_tolerance");
        assert_eq!(value, 0.6);
    }

    #[test]
    fn rejects_out_of_range_dedup_tolerance() {
        assert!(SearchConfigBuilder::new().dedup_tolerance(0.6).build().is_err());
        assert!(SearchConfigBuilder::new().dedup_tolerance(-1.0).build().is_err());
    }
}
