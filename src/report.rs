use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use chrono::{DateTime, NaiveDate, Utc};

use crate::aggregate::{aggregate, aggregate_seeded};
use crate::burndown::burndown;
use crate::config::{Breakdown, BreakdownField, ReportConfig};
use crate::history::{HistoryRules, ItemHistory};
use crate::models::{Record, ReportDocument, Snapshot, StatsView, Tables};
use crate::table::{project, DEFAULT_COLUMNS};

pub fn build_histories(
    config: &ReportConfig,
    snapshot: &Snapshot,
    milestone: &str,
) -> Vec<ItemHistory> {
    let rules = HistoryRules {
        resolved_statuses: &config.tracker.resolved_statuses,
        patch_mime_types: &config.tracker.patch_mime_types,
    };
    snapshot
        .records
        .iter()
        .filter(|record| record.milestone == milestone)
        .map(|record| rules.build(record, snapshot.activity.get(&record.id)))
        .collect()
}

fn status_breakdown_label(
    record: &Record,
    statuses: &[String],
    split_on_patch: &[String],
    patches: &HashMap<u64, bool>,
) -> Option<String> {
    if !statuses.contains(&record.status) {
        return None;
    }
    let patched = patches.get(&record.id).copied().unwrap_or(false);
    if patched && split_on_patch.contains(&record.status) {
        Some(format!("{} with patch", record.status))
    } else {
        Some(record.status.clone())
    }
}

fn breakdown_label(
    config: &ReportConfig,
    breakdown: &Breakdown,
    record: &Record,
) -> Option<String> {
    if !breakdown.includes(&record.milestone) {
        return None;
    }
    Some(match breakdown.field {
        BreakdownField::Status => record.status.clone(),
        BreakdownField::Assignee => record.assigned_to.clone(),
        BreakdownField::Component => config.simplify_component(&record.component),
    })
}

pub fn build_report(
    config: &ReportConfig,
    snapshot: &Snapshot,
    today: NaiveDate,
    generated_at: DateTime<Utc>,
) -> ReportDocument {
    let links = config.links();
    let links = links.as_ref();
    let records = &snapshot.records;
    let mut stats = BTreeMap::new();

    stats.insert(
        "status".to_string(),
        StatsView::Doughnut(aggregate(records, |r| Some(r.status.clone()), links)),
    );
    stats.insert(
        "assignees".to_string(),
        StatsView::Doughnut(aggregate(records, |r| Some(r.assigned_to.clone()), links)),
    );
    stats.insert(
        "milestones".to_string(),
        StatsView::Doughnut(aggregate_seeded(
            records,
            &config.milestones,
            |r| r.milestone.clone(),
            links,
        )),
    );
    stats.insert(
        "totalMilestones".to_string(),
        StatsView::Count(records.len() as u64),
    );
    stats.insert(
        "components".to_string(),
        StatsView::Doughnut(aggregate(
            records,
            |r| Some(config.simplify_component(&r.component)),
            links,
        )),
    );
    for group in &config.component_groups {
        if let Some(key) = &group.key {
            let view = aggregate(
                records,
                |r| {
                    let in_milestone =
                        group.milestone.as_ref().map_or(true, |m| m == &r.milestone);
                    (in_milestone && group.matches(&r.component)).then(|| r.component.clone())
                },
                links,
            );
            stats.insert(key.clone(), StatsView::Doughnut(view));
        }
    }
    for breakdown in &config.breakdowns {
        let view = aggregate(records, |r| breakdown_label(config, breakdown, r), links);
        stats.insert(breakdown.name.clone(), StatsView::Doughnut(view));
    }

    let mut histories: BTreeMap<&str, Vec<ItemHistory>> = BTreeMap::new();
    let milestones = config
        .burndowns
        .iter()
        .map(|b| b.milestone.as_str())
        .chain(config.status_breakdowns.iter().map(|s| s.milestone.as_str()));
    for milestone in milestones {
        histories
            .entry(milestone)
            .or_insert_with(|| build_histories(config, snapshot, milestone));
    }

    for breakdown in &config.status_breakdowns {
        let patches: HashMap<u64, bool> = histories
            .get(breakdown.milestone.as_str())
            .map(|items| items.iter().map(|h| (h.id, h.has_patch)).collect())
            .unwrap_or_default();
        let view = aggregate(
            records,
            |r| {
                if r.milestone != breakdown.milestone {
                    return None;
                }
                status_breakdown_label(r, &breakdown.statuses, &breakdown.split_on_patch, &patches)
            },
            links,
        );
        stats.insert(breakdown.name.clone(), StatsView::Doughnut(view));
    }

    for definition in &config.burndowns {
        let items = histories
            .get(definition.milestone.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let series = burndown(definition.start, definition.end, items, today, links);
        stats.insert(definition.name.clone(), StatsView::Burndown(series));
    }

    let mut tables = Tables::default();
    for milestone in &config.table_milestones {
        let selected = records.iter().filter(|r| &r.milestone == milestone);
        tables.milestones.insert(
            milestone.clone(),
            project(selected, &DEFAULT_COLUMNS, &config.milestone_header),
        );
    }

    ReportDocument {
        generated_at,
        stats,
        tables,
    }
}

fn fmt_optional(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn render_markdown(document: &ReportDocument) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Milestone Burndown Report");
    let _ = writeln!(output, "Generated at {}", document.generated_at.to_rfc3339());

    for (name, view) in &document.stats {
        match view {
            StatsView::Count(count) => {
                let _ = writeln!(output);
                let _ = writeln!(output, "## {name}");
                let _ = writeln!(output, "{count} records");
            }
            StatsView::Doughnut(doughnut) => {
                let _ = writeln!(output);
                let _ = writeln!(output, "## {name}");
                if doughnut.labels.is_empty() {
                    let _ = writeln!(output, "No records in this view.");
                }
                for (label, count) in doughnut.labels.iter().zip(&doughnut.data) {
                    let _ = writeln!(output, "- {label}: {count}");
                }
            }
            StatsView::Burndown(series) => {
                let _ = writeln!(output);
                let _ = writeln!(output, "## {name}");
                if series.labels.is_empty() {
                    let _ = writeln!(output, "No weeks in this range.");
                    continue;
                }
                let _ = writeln!(output, "| Week ending | Total | Unresolved | Forecast |");
                let _ = writeln!(output, "|---|---|---|---|");
                for (i, label) in series.labels.iter().enumerate() {
                    let _ = writeln!(
                        output,
                        "| {} | {} | {} | {} |",
                        label,
                        fmt_optional(series.totals[i]),
                        fmt_optional(series.unresolved[i]),
                        series.forecasted[i]
                    );
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Milestone Tables");
    if document.tables.milestones.is_empty() {
        let _ = writeln!(output, "No milestone tables configured.");
    }
    for (milestone, table) in &document.tables.milestones {
        let _ = writeln!(output, "- {}: {} records", milestone, table.rows.len());
    }

    output
}
