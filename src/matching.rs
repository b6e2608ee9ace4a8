use serde::Serialize;

use crate::config::Config;
use crate::distance::haversine_meters;
use crate::model::Place;
use crate::names::{dice_coefficient, normalize};

/// Which rung of the ladder confirmed a pair, for the run statistics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchKind {
    Identity,
    ExactName,
    ContainedName,
    SimilarName,
}

impl MatchKind {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::ExactName => "exact-name",
            Self::ContainedName => "contained-name",
            Self::SimilarName => "similar-name",
        }
    }
}

/// Decides whether two records describe the same establishment.
///
/// Distance is a hard gate, then three name tests run strongest first
/// and the first success decides. This is deliberately a ladder rather
/// than a weighted score: a pair that fails every rung is not a match,
/// however close the individual signals came.
pub struct MatchPolicy {
    max_distance_meters: f64,
    containment_distance_meters: f64,
    name_similarity_threshold: f64,
}

impl MatchPolicy {
    pub fn new(config: &Config) -> Self {
        Self {
            max_distance_meters: config.max_distance_meters,
            containment_distance_meters: config.containment_distance_meters,
            name_similarity_threshold: config.name_similarity_threshold,
        }
    }

    pub fn evaluate(&self, a: &Place, b: &Place) -> Option<MatchKind> {
        if a.source == b.source && a.id == b.id {
            // the same upstream object seen twice, e.g. on a rescan of a
            // previously merged catalog; no other evidence needed
            return Some(MatchKind::Identity);
        }

        let d = haversine_meters(a.point(), b.point());
        if d > self.max_distance_meters {
            return None;
        }

        let na = normalize(&a.name);
        let nb = normalize(&b.name);
        if na.is_empty() || nb.is_empty() {
            // a name of pure punctuation leaves nothing to compare; treat
            // it as no evidence rather than letting two blanks equal each
            // other
            return None;
        }

        if na == nb {
            return Some(MatchKind::ExactName);
        }

        if na.contains(&nb) || nb.contains(&na) {
            // containment is weak evidence, so only very close pairs
            // qualify, and a far pair is not rescued by the similarity
            // score below ("Jollibee" sits inside every "Jollibee <mall>")
            if d <= self.containment_distance_meters {
                return Some(MatchKind::ContainedName);
            }
            return None;
        }

        if dice_coefficient(&na, &nb) >= self.name_similarity_threshold {
            return Some(MatchKind::SimilarName);
        }

        None
    }
}
