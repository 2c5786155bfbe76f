use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Everything the report builder needs, constructed once at start-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub tracker: TrackerConfig,
    /// Milestones always listed in the milestone breakdown, even when empty.
    pub milestones: Vec<String>,
    pub table_milestones: Vec<String>,
    /// Header of the milestone column in the milestone tables.
    pub milestone_header: String,
    pub burndowns: Vec<BurndownConfig>,
    pub status_breakdowns: Vec<StatusBreakdown>,
    pub breakdowns: Vec<Breakdown>,
    pub component_groups: Vec<ComponentGroup>,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Base URL used for drill-down links. Empty disables links.
    pub base_url: Option<String>,
    pub resolved_statuses: Vec<String>,
    pub patch_mime_types: Vec<String>,
    /// Records carrying this milestone are not part of the report.
    pub milestone_sentinel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurndownConfig {
    pub name: String,
    pub milestone: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub name: String,
    pub milestone: String,
    pub statuses: Vec<String>,
    #[serde(default)]
    pub split_on_patch: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakdownField {
    Status,
    Assignee,
    /// Component collapsed onto its group label.
    Component,
}

/// A doughnut over one record field, optionally limited to one milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breakdown {
    pub name: String,
    #[serde(default)]
    pub milestone: Option<String>,
    pub field: BreakdownField,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentGroup {
    pub label: String,
    /// When set, the report also carries a per-component view under this key.
    #[serde(default)]
    pub key: Option<String>,
    /// Limits the per-component view to one milestone.
    #[serde(default)]
    pub milestone: Option<String>,
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    pub poll_interval_ms: u64,
    pub max_wait_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LinkScheme {
    base_url: String,
}

impl LinkScheme {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Empty when there is nothing to list.
    pub fn bug_list(&self, ids: &[u64]) -> String {
        if ids.is_empty() {
            return String::new();
        }
        let ids: Vec<String> = ids.iter().map(u64::to_string).collect();
        format!("{}/buglist.cgi?bug_id={}", self.base_url, ids.join(","))
    }
}

impl Breakdown {
    pub fn includes(&self, milestone: &str) -> bool {
        self.milestone.as_deref().map_or(true, |m| m == milestone)
    }
}

impl ComponentGroup {
    pub fn matches(&self, component: &str) -> bool {
        self.names.iter().any(|name| name == component)
            || self
                .prefixes
                .iter()
                .any(|prefix| component.starts_with(prefix.as_str()))
    }
}

pub const OTHER_COMPONENTS: &str = "Others";

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)
            .map_err(|err| ReportError::Configuration(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for burndown in &self.burndowns {
            if burndown.start >= burndown.end {
                return Err(ReportError::Configuration(format!(
                    "burndown {} starts on {} but ends on {}",
                    burndown.name, burndown.start, burndown.end
                )));
            }
        }
        if self.refresh.interval_secs == 0 || self.refresh.poll_interval_ms == 0 {
            return Err(ReportError::Configuration(
                "refresh intervals must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn links(&self) -> Option<LinkScheme> {
        self.tracker
            .base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(LinkScheme::new)
    }

    /// Collapses a component name onto its group label.
    pub fn simplify_component(&self, component: &str) -> String {
        self.component_groups
            .iter()
            .find(|group| group.matches(component))
            .map(|group| group.label.clone())
            .unwrap_or_else(|| OTHER_COMPONENTS.to_string())
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: Some("https://bugzilla.mozilla.org".to_string()),
            resolved_statuses: strings(&["RESOLVED", "VERIFIED", "CLOSED"]),
            patch_mime_types: strings(&[
                "text/x-phabricator-request",
                "text/x-github-pull-request",
                "text/x-review-board-request",
            ]),
            milestone_sentinel: "---".to_string(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            poll_interval_ms: 100,
            max_wait_secs: 30,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            milestones: strings(&["M1", "M2", "M3", "?", "Future"]),
            table_milestones: strings(&["M2", "M3", "?", "Future"]),
            milestone_header: "Fission Milestone".to_string(),
            burndowns: vec![BurndownConfig {
                name: "burndown".to_string(),
                milestone: "M2".to_string(),
                start: NaiveDate::from_ymd_opt(2019, 2, 25).unwrap_or_default(),
                end: NaiveDate::from_ymd_opt(2019, 5, 6).unwrap_or_default(),
            }],
            status_breakdowns: vec![StatusBreakdown {
                name: "statusM2".to_string(),
                milestone: "M2".to_string(),
                statuses: strings(&["NEW", "ASSIGNED", "RESOLVED"]),
                split_on_patch: strings(&["RESOLVED"]),
            }],
            breakdowns: vec![
                Breakdown {
                    name: "componentsM2".to_string(),
                    milestone: Some("M2".to_string()),
                    field: BreakdownField::Component,
                },
                Breakdown {
                    name: "assigneesM2".to_string(),
                    milestone: Some("M2".to_string()),
                    field: BreakdownField::Assignee,
                },
            ],
            component_groups: vec![
                ComponentGroup {
                    label: "DOM".to_string(),
                    key: Some("dom".to_string()),
                    milestone: None,
                    prefixes: strings(&["DOM: "]),
                    names: strings(&["Document Navigation"]),
                },
                ComponentGroup {
                    label: "Networking".to_string(),
                    key: None,
                    milestone: None,
                    prefixes: strings(&["Networking"]),
                    names: vec![],
                },
                ComponentGroup {
                    label: "JavaScript".to_string(),
                    key: None,
                    milestone: None,
                    prefixes: strings(&["JavaScript"]),
                    names: vec![],
                },
                ComponentGroup {
                    label: "Graphics".to_string(),
                    key: None,
                    milestone: None,
                    prefixes: strings(&["Graphics", "Canvas"]),
                    names: vec![],
                },
            ],
            refresh: RefreshConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_fall_back_to_others() {
        let config = ReportConfig::default();
        assert_eq!(config.simplify_component("DOM: Events"), "DOM");
        assert_eq!(config.simplify_component("Document Navigation"), "DOM");
        assert_eq!(config.simplify_component("Networking: HTTP"), "Networking");
        assert_eq!(config.simplify_component("Document"), "Others");
        assert_eq!(config.simplify_component(""), "Others");
    }

    #[test]
    fn bug_list_links_join_ids() {
        let links = LinkScheme::new("https://bugzilla.example.org/");
        assert_eq!(
            links.bug_list(&[3, 10]),
            "https://bugzilla.example.org/buglist.cgi?bug_id=3,10"
        );
        assert_eq!(links.bug_list(&[]), "");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ReportConfig = toml::from_str(
            r#"
            milestones = ["M4"]

            [tracker]
            base_url = "https://tracker.example.org"

            [[burndowns]]
            name = "burndownM4"
            milestone = "M4"
            start = "2019-06-03"
            end = "2019-08-26"
            "#,
        )
        .unwrap();

        assert_eq!(config.milestones, vec!["M4".to_string()]);
        assert_eq!(config.burndowns.len(), 1);
        assert_eq!(config.burndowns[0].milestone, "M4");
        assert_eq!(config.tracker.milestone_sentinel, "---");
        assert_eq!(config.refresh.interval_secs, 300);
        assert_eq!(config.breakdowns.len(), 2);
        assert_eq!(config.milestone_header, "Fission Milestone");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn demo_config_parses() {
        let config: ReportConfig = toml::from_str(include_str!("../demos/burndown.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.burndowns.len(), 2);
        assert_eq!(config.component_groups[0].key.as_deref(), Some("dom"));
        assert_eq!(config.breakdowns.len(), 2);
        assert_eq!(config.breakdowns[1].field, BreakdownField::Assignee);
        assert!(config.breakdowns[1].includes("M3"));
        assert!(!config.breakdowns[1].includes("M2"));
        assert_eq!(config.milestone_header, "Fission Milestone");
        assert!(config.links().is_some());
    }

    #[test]
    fn rejects_inverted_burndown_range() {
        let mut config = ReportConfig::default();
        config.burndowns[0].end = config.burndowns[0].start;
        assert!(matches!(
            config.validate(),
            Err(ReportError::Configuration(_))
        ));
    }
}
