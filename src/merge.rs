use crate::model::{Address, Contact, Place};

/// Combine a confirmed duplicate pair into one record.
///
/// `kept` supplies the identity (id, source, coordinates) and wins every
/// field it has a value for; `absorbed` only fills gaps. The exceptions
/// are accumulative fields: cuisine tags are unioned keeping the kept
/// order, amenity flags are ORed, and provenance is the set union, so
/// absorbing the same record twice changes nothing. Inputs are not
/// mutated.
pub fn merge(kept: &Place, absorbed: &Place) -> Place {
    let mut provenance = kept.provenance.clone();
    provenance.extend(&absorbed.provenance);
    provenance.insert(kept.source);
    provenance.insert(absorbed.source);

    Place {
        id: kept.id.clone(),
        source: kept.source,
        name: if kept.name.is_empty() {
            absorbed.name.clone()
        } else {
            kept.name.clone()
        },
        lat: kept.lat,
        lon: kept.lon,
        address: merge_address(kept.address.as_ref(), absorbed.address.as_ref()),
        contact: merge_contact(kept.contact.as_ref(), absorbed.contact.as_ref()),
        cuisine_tags: union_tags(&kept.cuisine_tags, &absorbed.cuisine_tags),
        category: pick(&kept.category, &absorbed.category),
        brand: pick(&kept.brand, &absorbed.brand),
        opening_hours: pick(&kept.opening_hours, &absorbed.opening_hours),
        amenities: kept.amenities.union(absorbed.amenities),
        confidence: kept.confidence.or(absorbed.confidence),
        provenance,
    }
}

/// First filled value wins; a present-but-blank string does not count as
/// filled, so it cannot shadow real data from the other side.
fn pick(kept: &Option<String>, absorbed: &Option<String>) -> Option<String> {
    let filled = |x: &Option<String>| x.as_deref().is_some_and(|s| !s.is_empty());
    if filled(kept) {
        kept.clone()
    } else if filled(absorbed) {
        absorbed.clone()
    } else {
        None
    }
}

fn merge_address(kept: Option<&Address>, absorbed: Option<&Address>) -> Option<Address> {
    if kept.is_none() && absorbed.is_none() {
        return None;
    }
    let k = kept.cloned().unwrap_or_default();
    let a = absorbed.cloned().unwrap_or_default();
    Some(Address {
        formatted: pick(&k.formatted, &a.formatted),
        street: pick(&k.street, &a.street),
        locality: pick(&k.locality, &a.locality),
        city: pick(&k.city, &a.city),
    })
}

fn merge_contact(kept: Option<&Contact>, absorbed: Option<&Contact>) -> Option<Contact> {
    if kept.is_none() && absorbed.is_none() {
        return None;
    }
    let k = kept.cloned().unwrap_or_default();
    let a = absorbed.cloned().unwrap_or_default();
    Some(Contact {
        phone: pick(&k.phone, &a.phone),
        website: pick(&k.website, &a.website),
        email: pick(&k.email, &a.email),
    })
}

fn union_tags(kept: &[String], absorbed: &[String]) -> Vec<String> {
    let mut tags = kept.to_vec();
    for tag in absorbed {
        if !tags.iter().any(|x| x == tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use typed_floats::tf64::NonNaN;

    use super::*;
    use crate::model::{Amenities, Source};

    fn osm_place() -> Place {
        let mut place = Place::new("n1", Source::Osm, "Jollibee Makati", 14.5547, 121.0244);
        place.cuisine_tags = vec!["filipino".to_string(), "fast-food".to_string()];
        place.opening_hours = Some("Mo-Su 08:00-22:00".to_string());
        place.amenities.takeaway = true;
        place.refine()
    }

    fn places_place() -> Place {
        let mut place = Place::new("p9", Source::PlacesIndex, "Jollibee", 14.5549, 121.0246);
        place.cuisine_tags = vec!["fast-food".to_string(), "chicken".to_string()];
        place.contact = Some(Contact {
            phone: Some("+63 2 8123 4567".to_string()),
            ..Contact::default()
        });
        place.brand = Some("Jollibee".to_string());
        place.confidence = Some(NonNaN::new(0.92).unwrap());
        place.amenities.delivery = true;
        place.refine()
    }

    #[test]
    fn idempotent() {
        let place = places_place();
        assert_eq!(merge(&place, &place), place);
    }

    #[test]
    fn kept_wins_filled_fields() {
        let mut kept = osm_place();
        kept.category = Some("restaurant".to_string());
        let mut absorbed = places_place();
        absorbed.category = Some("fast_food".to_string());

        let merged = merge(&kept, &absorbed);
        assert_eq!(merged.id, "n1");
        assert_eq!(merged.source, Source::Osm);
        assert_eq!(merged.name, "Jollibee Makati");
        assert_eq!(merged.lat, 14.5547);
        assert_eq!(merged.lon, 121.0244);
        assert_eq!(merged.category, Some("restaurant".to_string()));
    }

    #[test]
    fn absorbed_fills_gaps() {
        let merged = merge(&osm_place(), &places_place());
        assert_eq!(merged.brand, Some("Jollibee".to_string()));
        assert_eq!(merged.opening_hours, Some("Mo-Su 08:00-22:00".to_string()));
        assert_eq!(
            merged.contact,
            Some(Contact {
                phone: Some("+63 2 8123 4567".to_string()),
                ..Contact::default()
            })
        );
        assert_eq!(merged.confidence, Some(NonNaN::new(0.92).unwrap()));
    }

    #[test]
    fn tags_union_keeps_kept_order() {
        let merged = merge(&osm_place(), &places_place());
        assert_eq!(merged.cuisine_tags, vec!["filipino", "fast-food", "chicken"]);
    }

    #[test]
    fn amenities_or_together() {
        let merged = merge(&osm_place(), &places_place());
        assert_eq!(
            merged.amenities,
            Amenities {
                delivery: true,
                takeaway: true,
                reservations: false,
            }
        );
    }

    #[test]
    fn provenance_unions() {
        let merged = merge(&osm_place(), &places_place());
        assert_eq!(
            merged.provenance,
            BTreeSet::from([Source::Osm, Source::PlacesIndex])
        );

        // merging a merged record keeps the accumulated set
        let rated = Place::new("r3", Source::Ratings, "Jollibee Makati", 14.5547, 121.0244);
        let again = merge(&merged, &rated.refine());
        assert_eq!(
            again.provenance,
            BTreeSet::from([Source::Osm, Source::PlacesIndex, Source::Ratings])
        );
    }

    #[test]
    fn blank_strings_do_not_shadow() {
        // a hand-built record that skipped refine()
        let mut kept = Place::new("n1", Source::Osm, "Kiosk", 1.0, 2.0);
        kept.brand = Some(String::new());
        let mut absorbed = Place::new("p1", Source::PlacesIndex, "Kiosk", 1.0, 2.0);
        absorbed.brand = Some("Krispy Kreme".to_string());

        let merged = merge(&kept, &absorbed);
        assert_eq!(merged.brand, Some("Krispy Kreme".to_string()));
    }
}
