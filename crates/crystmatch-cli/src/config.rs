use crate::cli::{AssemblyArgs, SearchArgs};
use crate::error::{CliError, Result};
use crystmatch::core::io::graph_format::parse_template;
use crystmatch::engine::conditions::{Anchor, Comparator, Condition, Measure};
use crystmatch::engine::config::{self as core_config, BuildOptions, MatchMode};
use crystmatch::engine::error::EngineError;
use crystmatch::workflows::search::Query;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialBuildConfig {
    bond_tolerance: Option<f64>,
    min_bond_distance: Option<f64>,
    pack_complete: Option<bool>,
    dedup_tolerance: Option<f64>,
}

impl PartialBuildConfig {
    /// Command-line values win over file values, which win over defaults.
    pub fn merge_with_cli(&self, args: &AssemblyArgs) -> Result<BuildOptions> {
        let mut options = BuildOptions::default();
        if let Some(tolerance) = args.bond_tolerance.or(self.bond_tolerance) {
            options.bonding.tolerance = tolerance;
        }
        if let Some(floor) = self.min_bond_distance {
            options.bonding.min_distance = floor;
        }
        if let Some(dedup) = self.dedup_tolerance {
            options.dedup_tolerance = dedup;
        }
        options.pack_complete = args.pack_complete || self.pack_complete.unwrap_or(false);
        options
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(options)
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialMatchConfig {
    mode: Option<MatchMode>,
    max_matches: Option<usize>,
    time_budget_ms: Option<u64>,
    unique: Option<bool>,
    prefilter: Option<bool>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct PackEntry {
    name: String,
    /// A graph in the integer interchange format.
    template: String,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum MeasureKind {
    Distance,
    Angle,
    PlaneAngle,
    CentroidDistance,
    MaxPlaneDeviation,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct ConditionEntry {
    name: String,
    measure: MeasureKind,
    /// `pack:node` references with 1-based nodes, as in the CSV header.
    anchors: Vec<String>,
    /// Number of anchors in the first set of a two-set measure.
    split: Option<usize>,
    at_most: Option<f64>,
    at_least: Option<f64>,
    between: Option<[f64; 2]>,
}

impl ConditionEntry {
    fn comparator(&self) -> Result<Comparator> {
        match (self.at_most, self.at_least, self.between) {
            (Some(max), None, None) => Ok(Comparator::AtMost(max)),
            (None, Some(min), None) => Ok(Comparator::AtLeast(min)),
            (None, None, Some([min, max])) => Ok(Comparator::Between(min, max)),
            _ => Err(CliError::Config(format!(
                "Condition '{}' needs exactly one of `at-most`, `at-least` or `between`",
                self.name
            ))),
        }
    }

    fn anchor(&self, reference: &str, packs: &[String]) -> Result<Anchor<usize>> {
        let invalid = || {
            CliError::Config(format!(
                "Condition '{}': anchor '{}' is not of the form `pack:node`",
                self.name, reference
            ))
        };
        let (pack_name, node) = reference.rsplit_once(':').ok_or_else(invalid)?;
        let node: usize = node.trim().parse().map_err(|_| invalid())?;
        let pack = packs
            .iter()
            .position(|p| p == pack_name.trim())
            .ok_or_else(|| {
                CliError::Config(format!(
                    "Condition '{}' refers to unknown pack '{}'",
                    self.name, pack_name
                ))
            })?;
        node.checked_sub(1)
            .map(|node| Anchor::new(pack, node))
            .ok_or_else(invalid)
    }

    fn into_condition(self, packs: &[String]) -> Result<Condition<usize>> {
        let comparator = self.comparator()?;
        let mut anchors = self
            .anchors
            .iter()
            .map(|reference| self.anchor(reference, packs))
            .collect::<Result<Vec<_>>>()?;

        let count = anchors.len();
        let needs = |what: String| {
            CliError::Config(format!(
                "Condition '{}' ({:?}) needs {what}, got {count} anchor(s)",
                self.name, self.measure
            ))
        };

        let measure = match self.measure {
            MeasureKind::Distance => match anchors.as_slice() {
                &[a, b] => Measure::Distance(a, b),
                _ => return Err(needs("2 anchors".to_string())),
            },
            MeasureKind::Angle => match anchors.as_slice() {
                &[a, b, c] => Measure::Angle(a, b, c),
                _ => return Err(needs("3 anchors".to_string())),
            },
            MeasureKind::PlaneAngle | MeasureKind::CentroidDistance => {
                let k = self.split.filter(|&k| k > 0 && k < count).ok_or_else(|| {
                    needs(format!("a `split` between 1 and {}", count.saturating_sub(1)))
                })?;
                let second = anchors.split_off(k);
                if self.measure == MeasureKind::PlaneAngle {
                    Measure::PlaneAngle(anchors, second)
                } else {
                    Measure::CentroidDistance(anchors, second)
                }
            }
            MeasureKind::MaxPlaneDeviation => Measure::MaxPlaneDeviation(anchors),
        };
        Ok(Condition::new(self.name, measure, comparator))
    }
}

/// A query file: search options, templates and the conditions over them.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialQueryConfig {
    build: Option<PartialBuildConfig>,
    search: Option<PartialMatchConfig>,
    #[serde(default)]
    packs: Vec<PackEntry>,
    #[serde(default)]
    conditions: Vec<ConditionEntry>,
}

impl PartialQueryConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading query from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(self, args: &SearchArgs) -> Result<(Query, core_config::SearchConfig)> {
        let build = self
            .build
            .unwrap_or_default()
            .merge_with_cli(&args.assembly)?;
        let search = self.search.unwrap_or_default();

        let mut builder = core_config::SearchConfigBuilder::new()
            .bond_tolerance(build.bonding.tolerance)
            .min_bond_distance(build.bonding.min_distance)
            .pack_complete(build.pack_complete)
            .dedup_tolerance(build.dedup_tolerance)
            .unique(args.unique || search.unique.unwrap_or(false))
            .prefilter(!args.no_prefilter && search.prefilter.unwrap_or(true));
        if let Some(mode) = args.mode.map(MatchMode::from).or(search.mode) {
            builder = builder.mode(mode);
        }
        if let Some(limit) = args.max_matches.or(search.max_matches) {
            builder = builder.max_matches(limit);
        }
        if let Some(ms) = args.time_budget_ms.or(search.time_budget_ms) {
            builder = builder.time_budget_ms(ms);
        }
        let config = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let query = Self::build_query(self.packs, self.conditions)?;
        Ok((query, config))
    }

    fn build_query(packs: Vec<PackEntry>, conditions: Vec<ConditionEntry>) -> Result<Query> {
        if packs.is_empty() {
            return Err(CliError::Config(
                "A query needs at least one `[[packs]]` entry".to_string(),
            ));
        }
        let names: Vec<String> = packs.iter().map(|p| p.name.clone()).collect();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(CliError::Config(format!("Pack name '{name}' is used twice")));
            }
        }

        let mut query = Query::new();
        for pack in packs {
            let template = parse_template(&pack.template).map_err(EngineError::from)?;
            query.add_pack(pack.name, template);
        }
        for condition in conditions {
            query.add_condition(condition.into_condition(&names)?);
        }
        query.validate()?;
        Ok(query)
    }
}
