use core::fmt;
use std::collections::BTreeSet;
use std::str::FromStr;

use anyhow::bail;
use geo::Point;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use typed_floats::tf64::NonNaN;

/// Where a record came from. `Merged` marks records re-ingested from a
/// previous conflation run; they arrive carrying their own provenance.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub enum Source {
    Osm,
    PlacesIndex,
    Ratings,
    Merged,
}

impl Source {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Osm => "osm",
            Self::PlacesIndex => "places-index",
            Self::Ratings => "ratings",
            Self::Merged => "merged",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "osm" => Self::Osm,
            "places-index" => Self::PlacesIndex,
            "ratings" => Self::Ratings,
            "merged" => Self::Merged,
            _ => bail!("Unknown source: {s}"),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub formatted: Option<String>,
    pub street: Option<String>,
    pub locality: Option<String>,
    pub city: Option<String>,
}

impl Address {
    fn is_empty(&self) -> bool {
        self.formatted.is_none()
            && self.street.is_none()
            && self.locality.is_none()
            && self.city.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
}

impl Contact {
    fn is_empty(&self) -> bool {
        self.phone.is_none() && self.website.is_none() && self.email.is_none()
    }
}

/// Yes/unknown feature flags. A source asserting a feature beats another
/// source's silence, so merging is a plain OR.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Amenities {
    pub delivery: bool,
    pub takeaway: bool,
    pub reservations: bool,
}

impl Amenities {
    pub fn union(self, other: Self) -> Self {
        Self {
            delivery: self.delivery || other.delivery,
            takeaway: self.takeaway || other.takeaway,
            reservations: self.reservations || other.reservations,
        }
    }
}

/// One establishment as reported by a single source, already normalized
/// to the shared schema by the per-source extractors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub source: Source,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub contact: Option<Contact>,
    #[serde(default)]
    pub cuisine_tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub opening_hours: Option<String>,
    #[serde(default)]
    pub amenities: Amenities,
    #[serde(default)]
    pub confidence: Option<NonNaN>,
    #[serde(default)]
    pub provenance: BTreeSet<Source>,
}

impl Place {
    pub fn new(id: &str, source: Source, name: &str, lat: f64, lon: f64) -> Self {
        Self {
            id: id.to_string(),
            source,
            name: name.to_string(),
            lat,
            lon,
            address: None,
            contact: None,
            cuisine_tags: Vec::new(),
            category: None,
            brand: None,
            opening_hours: None,
            amenities: Amenities::default(),
            confidence: None,
            provenance: BTreeSet::new(),
        }
    }

    /// x is longitude, y is latitude.
    pub fn point(&self) -> Point {
        Point::new(self.lon, self.lat)
    }

    /// Canonical in-engine form: strings are trimmed with blanks dropped to
    /// `None`, cuisine tags are lowercased and deduplicated keeping first
    /// occurrence, and provenance is seeded with the record's own source if
    /// the extractor left it empty.
    pub fn refine(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.category = tidy(self.category);
        self.brand = tidy(self.brand);
        self.opening_hours = tidy(self.opening_hours);
        self.cuisine_tags = self
            .cuisine_tags
            .into_iter()
            .map(|x| x.trim().to_lowercase())
            .filter(|x| !x.is_empty())
            .unique()
            .collect();
        self.address = self
            .address
            .map(|x| Address {
                formatted: tidy(x.formatted),
                street: tidy(x.street),
                locality: tidy(x.locality),
                city: tidy(x.city),
            })
            .filter(|x| !x.is_empty());
        self.contact = self
            .contact
            .map(|x| Contact {
                phone: tidy(x.phone),
                website: tidy(x.website),
                email: tidy(x.email),
            })
            .filter(|x| !x.is_empty());
        if self.provenance.is_empty() {
            self.provenance.insert(self.source);
        }
        self
    }
}

fn tidy(value: Option<String>) -> Option<String> {
    value
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
}

/// All records from one source, with the rank used to order insertion.
/// Lower priority goes first and wins merges.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceBatch {
    pub source: Source,
    pub priority: u32,
    pub records: Vec<Place>,
}

impl SourceBatch {
    pub fn new(source: Source, priority: u32, records: Vec<Place>) -> Self {
        Self {
            source,
            priority,
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_round_trip() {
        for source in [
            Source::Osm,
            Source::PlacesIndex,
            Source::Ratings,
            Source::Merged,
        ] {
            assert_eq!(source.slug().parse::<Source>().unwrap(), source);
        }
        assert!("overpass".parse::<Source>().is_err());
    }

    #[test]
    fn point_axes() {
        let place = Place::new("n1", Source::Osm, "Kiosk", -33.8568, 151.2153);
        assert_eq!(place.point().x(), 151.2153);
        assert_eq!(place.point().y(), -33.8568);
    }

    #[test]
    fn refine_drops_blanks() {
        let mut place = Place::new("n1", Source::Osm, "  Kiosk ", 1.0, 2.0);
        place.brand = Some("  ".to_string());
        place.category = Some(" cafe ".to_string());
        place.cuisine_tags = vec![
            "Coffee".to_string(),
            "coffee".to_string(),
            String::new(),
            "tea".to_string(),
        ];
        place.address = Some(Address {
            formatted: Some(String::new()),
            ..Address::default()
        });

        let place = place.refine();
        assert_eq!(place.name, "Kiosk");
        assert_eq!(place.brand, None);
        assert_eq!(place.category, Some("cafe".to_string()));
        assert_eq!(place.cuisine_tags, vec!["coffee", "tea"]);
        assert_eq!(place.address, None);
        assert_eq!(place.provenance, BTreeSet::from([Source::Osm]));
    }

    #[test]
    fn refine_keeps_existing_provenance() {
        let mut place = Place::new("m1", Source::Merged, "Kiosk", 1.0, 2.0);
        place.provenance = BTreeSet::from([Source::Osm, Source::Ratings]);
        let place = place.refine();
        assert_eq!(
            place.provenance,
            BTreeSet::from([Source::Osm, Source::Ratings])
        );
    }
}
