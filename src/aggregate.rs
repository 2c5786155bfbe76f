use std::collections::BTreeMap;

use crate::config::LinkScheme;
use crate::models::{Doughnut, Record};

fn into_doughnut(groups: BTreeMap<String, Vec<u64>>, links: Option<&LinkScheme>) -> Doughnut {
    let mut doughnut = Doughnut::default();
    for (label, mut ids) in groups {
        doughnut.data.push(ids.len() as u64);
        if let Some(scheme) = links {
            ids.sort_unstable();
            doughnut.links.push(scheme.bug_list(&ids));
        }
        doughnut.labels.push(label);
    }
    doughnut
}

/// Groups records by `key_fn`, skipping records it maps to `None`.
///
/// Labels come out in lexicographic order, never by count.
pub fn aggregate<F>(records: &[Record], key_fn: F, links: Option<&LinkScheme>) -> Doughnut
where
    F: Fn(&Record) -> Option<String>,
{
    let mut groups: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    for record in records {
        if let Some(key) = key_fn(record) {
            groups.entry(key).or_default().push(record.id);
        }
    }
    into_doughnut(groups, links)
}

/// Doughnut over pre-seeded groups, so configured labels with no records
/// still show up with a zero count.
pub fn aggregate_seeded<F>(
    records: &[Record],
    seeds: &[String],
    key_fn: F,
    links: Option<&LinkScheme>,
) -> Doughnut
where
    F: Fn(&Record) -> String,
{
    let mut groups: BTreeMap<String, Vec<u64>> = seeds
        .iter()
        .map(|seed| (seed.clone(), Vec::new()))
        .collect();
    for record in records {
        groups.entry(key_fn(record)).or_default().push(record.id);
    }
    into_doughnut(groups, links)
}
