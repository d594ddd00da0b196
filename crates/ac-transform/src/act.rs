//! Act transform (spec §4.3): maps a raw MusicBrainz blob to the canonical
//! act shape, minus `events`, `status`, and `updatedAt` (those three are
//! filled in later by the Enricher once events and upstream status are
//! known). Pure, deterministic, total over any blob that parses at all.

use std::collections::BTreeMap;

use ac_domain::model::{RECOGNISED_RELATION_TYPES, SOCIAL_PLATFORM_MARKERS};
use ac_upstream::raw::RawAct;

/// The canonical act shape, less the three fields the Enricher fills in.
#[derive(Debug, Clone, PartialEq)]
pub struct ActCore {
    pub id: String,
    pub name: String,
    pub country: Option<String>,
    pub region: Option<String>,
    pub disambiguation: Option<String>,
    pub ended: bool,
    pub relations: BTreeMap<String, String>,
    /// Upstream-supplied status, carried through for the status
    /// derivation step (spec §4.3).
    pub upstream_status: Option<String>,
}

pub fn transform_act(raw: &RawAct) -> ActCore {
    let ended = raw.life_span.end.as_deref().map(|s| !s.is_empty()).unwrap_or(false)
        || raw.life_span.ended.unwrap_or(false);

    let mut relations = BTreeMap::new();
    for rel in &raw.relations {
        match rel.rel_type.as_str() {
            "youtube" => {
                if !rel.ended.unwrap_or(false) {
                    relations.insert("youtube".to_owned(), rel.url.resource.clone());
                }
            }
            "social network" => {
                if let Some((_, key)) =
                    SOCIAL_PLATFORM_MARKERS.iter().find(|(marker, _)| rel.url.resource.contains(marker))
                {
                    relations.insert((*key).to_owned(), rel.url.resource.clone());
                }
            }
            other if RECOGNISED_RELATION_TYPES.contains(&other) => {
                relations.insert(other.to_owned(), rel.url.resource.clone());
            }
            _ => {}
        }
    }

    ActCore {
        id: raw.id.clone(),
        name: raw.name.clone(),
        country: raw.country.clone(),
        region: raw.region.clone(),
        disambiguation: raw.disambiguation.clone(),
        ended,
        relations,
        upstream_status: raw.status.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_upstream::raw::{LifeSpan, RawRelation, RawUrl};

    fn raw_with_relations(relations: Vec<RawRelation>) -> RawAct {
        RawAct {
            id: "a1".into(),
            name: "Alpha".into(),
            country: Some("DE".into()),
            region: None,
            disambiguation: None,
            status: Some("active".into()),
            life_span: LifeSpan::default(),
            relations,
        }
    }

    fn rel(rel_type: &str, url: &str, ended: Option<bool>) -> RawRelation {
        RawRelation { rel_type: rel_type.into(), url: RawUrl { resource: url.into() }, ended }
    }

    #[test]
    fn maps_basic_fields_verbatim() {
        let raw = raw_with_relations(vec![]);
        let core = transform_act(&raw);
        assert_eq!(core.id, "a1");
        assert_eq!(core.name, "Alpha");
        assert_eq!(core.country.as_deref(), Some("DE"));
        assert_eq!(core.upstream_status.as_deref(), Some("active"));
    }

    #[test]
    fn ended_true_when_life_span_end_present() {
        let mut raw = raw_with_relations(vec![]);
        raw.life_span.end = Some("2020".into());
        assert!(transform_act(&raw).ended);
    }

    #[test]
    fn ended_true_when_life_span_ended_flag_set() {
        let mut raw = raw_with_relations(vec![]);
        raw.life_span.ended = Some(true);
        assert!(transform_act(&raw).ended);
    }

    #[test]
    fn recognised_relation_types_are_retained() {
        let raw = raw_with_relations(vec![rel("wikidata", "https://wikidata.org/x", None)]);
        let core = transform_act(&raw);
        assert_eq!(core.relations.get("wikidata"), Some(&"https://wikidata.org/x".to_owned()));
    }

    #[test]
    fn unrecognised_relation_types_are_discarded() {
        let raw = raw_with_relations(vec![rel("official homepage", "https://example.com", None)]);
        assert!(transform_act(&raw).relations.is_empty());
    }

    #[test]
    fn youtube_relation_kept_only_when_not_ended() {
        let raw = raw_with_relations(vec![
            rel("youtube", "https://youtube.com/active", Some(false)),
        ]);
        assert_eq!(
            transform_act(&raw).relations.get("youtube"),
            Some(&"https://youtube.com/active".to_owned())
        );

        let raw_ended = raw_with_relations(vec![rel("youtube", "https://youtube.com/dead", Some(true))]);
        assert!(transform_act(&raw_ended).relations.get("youtube").is_none());
    }

    #[test]
    fn social_network_relation_mapped_by_url_marker() {
        let raw = raw_with_relations(vec![
            rel("social network", "https://twitter.com/band", None),
            rel("social network", "https://instagram.com/band", None),
            rel("social network", "https://example.com/band", None),
        ]);
        let core = transform_act(&raw);
        assert_eq!(core.relations.get("twitter"), Some(&"https://twitter.com/band".to_owned()));
        assert_eq!(core.relations.get("instagram"), Some(&"https://instagram.com/band".to_owned()));
        assert_eq!(core.relations.len(), 2);
    }

    #[test]
    fn duplicate_keys_last_write_wins() {
        let raw = raw_with_relations(vec![
            rel("wikidata", "https://wikidata.org/first", None),
            rel("wikidata", "https://wikidata.org/second", None),
        ]);
        assert_eq!(
            transform_act(&raw).relations.get("wikidata"),
            Some(&"https://wikidata.org/second".to_owned())
        );
    }
}
