//! Two-pass conflation over every ingested batch.
//!
//! Deterministic and single-threaded: batches fold in priority order and
//! candidates are tried in slot order, so a rerun over the same input
//! produces byte-identical output.

use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::{ensure, Result};
use itertools::Itertools;
use serde::Serialize;

use crate::config::Config;
use crate::grid::SpatialIndex;
use crate::matching::{MatchKind, MatchPolicy};
use crate::merge::merge;
use crate::model::{Place, Source, SourceBatch};
use crate::utils::progress_bar;

/// Why a record was rejected before indexing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropReason {
    EmptyName,
    BadCoordinates,
}

impl DropReason {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::EmptyName => "empty-name",
            Self::BadCoordinates => "bad-coordinates",
        }
    }
}

/// Operator-facing accounting for one run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunStats {
    /// Records handed in, per source, before validation.
    pub inputs: BTreeMap<Source, usize>,
    /// Malformed records dropped before indexing, per reason.
    pub dropped: BTreeMap<DropReason, usize>,
    /// Records absorbed while folding batches together, per ladder rung.
    pub cross_merged: BTreeMap<MatchKind, usize>,
    /// Records absorbed by the rescan of the folded set, per ladder rung.
    pub intra_merged: BTreeMap<MatchKind, usize>,
    /// Places in the final catalog.
    pub unique: usize,
}

impl RunStats {
    pub fn input_total(&self) -> usize {
        self.inputs.values().sum()
    }

    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }

    pub fn merged_total(&self) -> usize {
        self.cross_merged.values().sum::<usize>() + self.intra_merged.values().sum::<usize>()
    }

    /// Markdown block for the operator report.
    pub fn render(&self) -> Result<String> {
        let mut md = String::new();
        writeln!(md, "## Statistics\n")?;
        for (source, n) in &self.inputs {
            writeln!(md, "- {n} in from {source}")?;
        }
        if self.dropped_total() > 0 {
            let reasons = self
                .dropped
                .iter()
                .map(|(reason, n)| format!("{} {n}", reason.slug()))
                .join(", ");
            writeln!(md, "- {} dropped as malformed ({reasons})", self.dropped_total())?;
        }
        for (label, merged) in [
            ("across sources", &self.cross_merged),
            ("within the result set", &self.intra_merged),
        ] {
            let total: usize = merged.values().sum();
            if merged.is_empty() {
                writeln!(md, "- 0 merged {label}")?;
            } else {
                let kinds = merged
                    .iter()
                    .map(|(kind, n)| format!("{} {n}", kind.slug()))
                    .join(", ");
                writeln!(md, "- {total} merged {label} ({kinds})")?;
            }
        }
        writeln!(md, "- {} unique places out", self.unique)?;
        let considered = self.input_total() - self.dropped_total();
        if considered > 0 {
            writeln!(
                md,
                "- {:.01}% conflated",
                self.merged_total() as f64 / considered as f64 * 100.0
            )?;
        }
        Ok(md)
    }
}

/// Outcome of one run: the conflated catalog plus its accounting.
#[derive(Debug)]
pub struct RunReport {
    pub places: Vec<Place>,
    pub stats: RunStats,
}

/// Conflate normalized batches into one deduplicated catalog.
///
/// Batches fold in ascending priority order (ties keep caller order), so
/// the highest-priority record of a duplicate cluster is the one kept.
/// Malformed records are dropped and counted rather than failing the
/// run; a run where nothing at all survives validation is an error.
pub fn run(mut batches: Vec<SourceBatch>, config: &Config) -> Result<RunReport> {
    config.validate()?;

    let mut stats = RunStats::default();
    let batch_count = batches.len();
    batches.sort_by_key(|x| x.priority);

    let mut valid: Vec<Vec<Place>> = Vec::new();
    for batch in batches {
        *stats.inputs.entry(batch.source).or_insert(0) += batch.records.len();
        let mut records = Vec::with_capacity(batch.records.len());
        for place in batch.records {
            let place = place.refine();
            match drop_reason(&place) {
                Some(reason) => *stats.dropped.entry(reason).or_insert(0) += 1,
                None => records.push(place),
            }
        }
        valid.push(records);
    }

    let total: usize = valid.iter().map(Vec::len).sum();
    ensure!(
        total > 0,
        "nothing to conflate: {} records in across {batch_count} batches, {} dropped as malformed",
        stats.input_total(),
        stats.dropped_total(),
    );

    let policy = MatchPolicy::new(config);
    let mut arena = Arena::with_capacity(total);

    eprintln!("Folding {total} records from {batch_count} batches...");
    stats.cross_merged = cross_pass(valid, &mut arena, &policy, config.cell_size_degrees);

    eprintln!("Rescanning {} kept records...", arena.places.len());
    stats.intra_merged = intra_pass(&mut arena, &policy, config.cell_size_degrees);

    let places = arena.survivors();
    stats.unique = places.len();

    Ok(RunReport { places, stats })
}

fn drop_reason(place: &Place) -> Option<DropReason> {
    if place.name.is_empty() {
        return Some(DropReason::EmptyName);
    }
    if !place.lat.is_finite()
        || !place.lon.is_finite()
        || !(-90.0..=90.0).contains(&place.lat)
        || !(-180.0..=180.0).contains(&place.lon)
    {
        return Some(DropReason::BadCoordinates);
    }
    None
}

/// Slot arena backing the candidate grid. A merge replaces the kept
/// slot's record in place and marks the absorbed slot in `redirect`
/// instead of splicing it out, so slot numbers held by the grid stay
/// stable for the whole pass.
struct Arena {
    places: Vec<Place>,
    redirect: Vec<Option<usize>>,
}

impl Arena {
    fn with_capacity(n: usize) -> Self {
        Self {
            places: Vec::with_capacity(n),
            redirect: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, place: Place) -> usize {
        self.places.push(place);
        self.redirect.push(None);
        self.places.len() - 1
    }

    fn survivors(self) -> Vec<Place> {
        self.places
            .into_iter()
            .zip(self.redirect)
            .filter_map(|(place, redirect)| redirect.is_none().then_some(place))
            .collect()
    }
}

/// First pass: fold batch after batch into the arena. Each record is
/// checked against everything already inserted (earlier batches and
/// earlier records of its own batch) before being inserted itself, so
/// the higher-priority side of a duplicate pair is always the one kept.
fn cross_pass(
    batches: Vec<Vec<Place>>,
    arena: &mut Arena,
    policy: &MatchPolicy,
    cell_size_degrees: f64,
) -> BTreeMap<MatchKind, usize> {
    let total: usize = batches.iter().map(Vec::len).sum();
    let mut index = SpatialIndex::new(cell_size_degrees);
    let mut merged = BTreeMap::new();

    let pb = progress_bar(total as u64);
    for records in batches {
        for place in records {
            let mut matched = None;
            for slot in index.candidates_near(place.point()) {
                if let Some(kind) = policy.evaluate(&arena.places[slot], &place) {
                    matched = Some((slot, kind));
                    break;
                }
            }
            match matched {
                Some((slot, kind)) => {
                    arena.places[slot] = merge(&arena.places[slot], &place);
                    *merged.entry(kind).or_insert(0) += 1;
                }
                None => {
                    let point = place.point();
                    let slot = arena.push(place);
                    index.insert(slot, point);
                }
            }
            pb.inc(1);
        }
    }
    pb.finish_and_clear();

    merged
}

/// Second pass: rescan the folded set against itself with a fresh grid.
/// First-match absorption stops at one slot per incoming record, so the
/// fold alone does not try every surviving pair; the rescan closes that
/// gap and makes the catalog stable under re-running.
fn intra_pass(
    arena: &mut Arena,
    policy: &MatchPolicy,
    cell_size_degrees: f64,
) -> BTreeMap<MatchKind, usize> {
    let mut index = SpatialIndex::new(cell_size_degrees);
    let mut merged = BTreeMap::new();

    let pb = progress_bar(arena.places.len() as u64);
    for i in 0..arena.places.len() {
        pb.inc(1);
        if arena.redirect[i].is_some() {
            continue;
        }
        let point = arena.places[i].point();
        let mut matched = None;
        for slot in index.candidates_near(point) {
            if let Some(kind) = policy.evaluate(&arena.places[slot], &arena.places[i]) {
                matched = Some((slot, kind));
                break;
            }
        }
        match matched {
            Some((slot, kind)) => {
                let combined = merge(&arena.places[slot], &arena.places[i]);
                arena.places[slot] = combined;
                arena.redirect[i] = Some(slot);
                *merged.entry(kind).or_insert(0) += 1;
            }
            None => index.insert(i, point),
        }
    }
    pb.finish_and_clear();

    merged
}
