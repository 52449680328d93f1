use super::assemble::Structure;
use crate::core::models::graph::Graph;
use crate::core::models::molecule::Molecule;
use crate::core::models::target::Target;
use crate::engine::conditions::{Condition, ConditionEngine, SolutionTable};
use crate::engine::config::SearchConfig;
use crate::engine::error::EngineError;
use crate::engine::matcher::profile::TargetProfile;
use crate::engine::matcher::{Match, MatchOutcome, MatchStatus, SubgraphMatcher};
use crate::engine::progress::{Progress, ProgressReporter};
use nalgebra::Point3;
use std::sync::atomic::AtomicBool;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct PackQuery {
    pub name: String,
    pub template: Graph,
}

/// Templates to match and conditions over them. Condition anchors refer to
/// packs by their index in [`Query::packs`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub packs: Vec<PackQuery>,
    pub conditions: Vec<Condition<usize>>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pack and returns the index conditions use to refer to it.
    pub fn add_pack(&mut self, name: impl Into<String>, template: Graph) -> usize {
        self.packs.push(PackQuery {
            name: name.into(),
            template,
        });
        self.packs.len() - 1
    }

    pub fn add_condition(&mut self, condition: Condition<usize>) {
        self.conditions.push(condition);
    }

    /// Checks templates and anchors before any target is touched.
    pub fn validate(&self) -> Result<(), EngineError> {
        for pack in &self.packs {
            pack.template.validate_template()?;
            pack.template.require_connected()?;
        }
        for condition in &self.conditions {
            if !condition.comparator.is_valid() {
                return Err(EngineError::InvalidCondition(format!(
                    "'{}' has an empty or undefined range",
                    condition.name
                )));
            }
            for anchor in condition.measure.anchors() {
                let pack = self.packs.get(anchor.pack).ok_or(EngineError::UnknownPack)?;
                if anchor.node >= pack.template.len() {
                    return Err(EngineError::InvalidAnchor {
                        node: anchor.node,
                        len: pack.template.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackReport {
    pub name: String,
    /// The target failed the pre-filter, so no search was run.
    pub screened_out: bool,
    pub outcome: MatchOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetReport {
    pub molecules: usize,
    pub atoms: usize,
    pub packs: Vec<PackReport>,
    pub tables: Vec<SolutionTable>,
}

impl TargetReport {
    pub fn screened_out(&self) -> bool {
        !self.packs.is_empty() && self.packs.iter().all(|p| p.screened_out)
    }

    /// `false` if any pack search was cut short; its tables are then partial.
    pub fn is_complete(&self) -> bool {
        self.packs.iter().all(|p| p.outcome.is_complete())
    }

    pub fn has_hits(&self) -> bool {
        self.tables.iter().any(|t| !t.is_empty())
    }
}

/// Outcome for one structure of a batch. Failures are kept per structure so
/// that one bad input does not abort the batch.
#[derive(Debug)]
pub struct SearchResult {
    pub name: String,
    pub report: Result<TargetReport, EngineError>,
}

/// Evaluates the query conditions over given per-pack match lists.
///
/// `matches[i]` holds the matches of `query.packs[i]`, and target atom `n`
/// of every match is located at `positions[n]`. Returns one table per group
/// of conditions sharing packs, then one table per unreferenced pack.
#[instrument(skip_all, name = "evaluate_predicates")]
pub fn evaluate_predicates(
    positions: &[Point3<f64>],
    query: &Query,
    matches: Vec<Vec<Match>>,
) -> Result<Vec<SolutionTable>, EngineError> {
    if matches.len() != query.packs.len() {
        return Err(EngineError::InvalidCondition(format!(
            "{} match list(s) given for {} pack(s)",
            matches.len(),
            query.packs.len()
        )));
    }

    let mut engine = ConditionEngine::new(positions.to_vec());
    let ids = query
        .packs
        .iter()
        .zip(matches)
        .map(|(pack, matches)| {
            engine.add_pack(pack.name.clone(), pack.template.clone(), matches)
        })
        .collect::<Result<Vec<_>, _>>()?;

    for condition in &query.conditions {
        let measure = condition
            .measure
            .try_map_packs(|&index| ids.get(index).copied().ok_or(EngineError::UnknownPack))?;
        engine.add_condition(Condition::new(
            condition.name.clone(),
            measure,
            condition.comparator,
        ))?;
    }

    let tables = engine.solve()?;
    debug!(
        tables = tables.len(),
        rows = tables.iter().map(SolutionTable::len).sum::<usize>(),
        "Conditions solved"
    );
    Ok(tables)
}

fn prepare_matchers<'q>(
    query: &'q Query,
    config: &SearchConfig,
) -> Result<Vec<SubgraphMatcher<'q>>, EngineError> {
    query.validate()?;
    query
        .packs
        .iter()
        .map(|pack| SubgraphMatcher::new(&pack.template, config.matching))
        .collect()
}

fn search_target(
    molecules: &[Molecule],
    query: &Query,
    matchers: &[SubgraphMatcher],
    prefilter: bool,
    stop: Option<&AtomicBool>,
) -> Result<TargetReport, EngineError> {
    let target = Target::from_molecules(molecules);
    let profile = TargetProfile::of(target.graph());

    let packs: Vec<PackReport> = query
        .packs
        .iter()
        .zip(matchers)
        .map(|(pack, matcher)| {
            if prefilter && !matcher.screen(&profile) {
                return PackReport {
                    name: pack.name.clone(),
                    screened_out: true,
                    outcome: MatchOutcome {
                        matches: Vec::new(),
                        status: MatchStatus::Complete,
                    },
                };
            }
            let outcome = matcher.find(target.graph(), stop);
            if let MatchStatus::Cancelled(reason) = outcome.status {
                debug!(pack = %pack.name, ?reason, "Match search ended early");
            }
            PackReport {
                name: pack.name.clone(),
                screened_out: false,
                outcome,
            }
        })
        .collect();

    let tables = if packs.iter().all(|p| p.screened_out) && !packs.is_empty() {
        Vec::new()
    } else {
        let matches = packs.iter().map(|p| p.outcome.matches.clone()).collect();
        evaluate_predicates(target.positions(), query, matches)?
    };

    Ok(TargetReport {
        molecules: molecules.len(),
        atoms: target.len(),
        packs,
        tables,
    })
}

/// Runs a query against one target made of the given molecules.
pub fn search_molecules(
    molecules: &[Molecule],
    query: &Query,
    config: &SearchConfig,
    stop: Option<&AtomicBool>,
) -> Result<TargetReport, EngineError> {
    let matchers = prepare_matchers(query, config)?;
    search_target(molecules, query, &matchers, config.prefilter, stop)
}

/// Builds every structure and runs the query against each, one target per
/// structure. Results keep the input order.
#[instrument(skip_all, name = "search_workflow")]
pub fn search(
    structures: &[Structure],
    query: &Query,
    config: &SearchConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<SearchResult>, EngineError> {
    config.build.validate()?;
    let matchers = prepare_matchers(query, config)?;
    info!(
        "Searching {} structure(s) for {} pack(s) under {} condition(s).",
        structures.len(),
        query.packs.len(),
        query.conditions.len()
    );

    reporter.report(Progress::PhaseStart { name: "Search" });
    reporter.report(Progress::TaskStart {
        total_steps: structures.len() as u64,
    });

    let process = |structure: &Structure| {
        let report = structure.build(&config.build).and_then(|molecules| {
            search_target(
                &molecules,
                query,
                &matchers,
                config.prefilter,
                reporter.stop_flag(),
            )
        });
        if let Err(e) = &report {
            warn!(structure = %structure.name, "Skipping structure: {e}");
        }
        reporter.report(Progress::TaskIncrement);
        SearchResult {
            name: structure.name.clone(),
            report,
        }
    };

    #[cfg(not(feature = "parallel"))]
    let iterator = structures.iter();

    #[cfg(feature = "parallel")]
    let iterator = structures.par_iter();

    let results: Vec<SearchResult> = iterator.map(process).collect();

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let hits = results
        .iter()
        .filter(|r| r.report.as_ref().is_ok_and(TargetReport::has_hits))
        .count();
    if reporter.stop_requested() {
        warn!("Search was stopped; results are partial.");
    }
    info!(
        "Search finished: {} of {} structure(s) have hits.",
        hits,
        results.len()
    );
    Ok(results)
}
