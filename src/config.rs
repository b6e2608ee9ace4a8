use std::fs::read_to_string;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Tunables for one conflation run, loadable from YAML. Missing keys fall
/// back to the defaults below; unknown keys are an error so a typo cannot
/// silently run with defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Grid cell edge in decimal degrees. Candidate lookup only reaches
    /// one cell beyond the query point, so one cell must cover
    /// `max_distance_meters`; the default 0.01 is roughly 1.1km of
    /// latitude, an order of magnitude over the default gate.
    pub cell_size_degrees: f64,
    /// Hard gate in metres. Pairs farther apart are never the same place,
    /// whatever their names say.
    pub max_distance_meters: f64,
    /// Tighter gate in metres for the contained-name rung, which is
    /// weaker evidence than equal names or a high similarity score.
    pub containment_distance_meters: f64,
    /// Minimum bigram Dice score for the fuzzy-name rung, in [0, 1].
    pub name_similarity_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cell_size_degrees: 0.01,
            max_distance_meters: 100.0,
            containment_distance_meters: 50.0,
            name_similarity_threshold: 0.6,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that cannot produce a meaningful run. NaN
    /// fails every comparison here, so it is caught along with the rest.
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size_degrees.is_finite() && self.cell_size_degrees > 0.0) {
            bail!(
                "cell-size-degrees must be a positive number, got {}",
                self.cell_size_degrees
            );
        }
        if !(self.max_distance_meters.is_finite() && self.max_distance_meters >= 0.0) {
            bail!(
                "max-distance-meters must be a non-negative number, got {}",
                self.max_distance_meters
            );
        }
        if !(self.containment_distance_meters.is_finite()
            && self.containment_distance_meters >= 0.0)
        {
            bail!(
                "containment-distance-meters must be a non-negative number, got {}",
                self.containment_distance_meters
            );
        }
        if self.containment_distance_meters > self.max_distance_meters {
            bail!(
                "containment-distance-meters ({}) must not exceed max-distance-meters ({})",
                self.containment_distance_meters,
                self.max_distance_meters
            );
        }
        if !(0.0..=1.0).contains(&self.name_similarity_threshold) {
            bail!(
                "name-similarity-threshold must be within [0, 1], got {}",
                self.name_similarity_threshold
            );
        }

        // the gate must fit inside one grid cell or nearby candidates can
        // land outside the 3x3 query block; 111,320 metres per degree of
        // latitude at the equator, and longitude degrees only get shorter
        let cell_meters = self.cell_size_degrees * 111_320.0;
        if self.max_distance_meters > cell_meters {
            bail!(
                "max-distance-meters ({}) exceeds one grid cell ({cell_meters:.0}m at the equator); raise cell-size-degrees",
                self.max_distance_meters
            );
        }

        Ok(())
    }
}
