use chrono::{DateTime, Utc};

use crate::models::{Record, RecordActivity, TransitionEvent};

/// Resolution timeline of one record, sorted by timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemHistory {
    pub id: u64,
    pub has_patch: bool,
    events: Vec<TransitionEvent>,
}

impl ItemHistory {
    /// Seeds the unresolved creation event and sorts the rest.
    ///
    /// The sort is stable, so two events at the same instant keep the order
    /// the tracker reported them in.
    pub fn new(
        id: u64,
        created: DateTime<Utc>,
        transitions: impl IntoIterator<Item = TransitionEvent>,
    ) -> Self {
        let mut events = vec![TransitionEvent {
            at: created,
            resolved: false,
        }];
        events.extend(transitions);
        events.sort_by_key(|event| event.at);
        Self {
            id,
            has_patch: false,
            events,
        }
    }

    pub fn with_patch(mut self, has_patch: bool) -> Self {
        self.has_patch = has_patch;
        self
    }

    #[cfg(test)]
    pub fn events(&self) -> &[TransitionEvent] {
        &self.events
    }

    /// Resolved state as of `as_of`, or `None` when the history has no data
    /// that early.
    ///
    /// An event stamped exactly at `as_of` is already in effect.
    pub fn state_at(&self, as_of: DateTime<Utc>) -> Option<bool> {
        let idx = self.events.partition_point(|event| event.at < as_of);
        if idx == self.events.len() {
            return self.events.last().map(|event| event.resolved);
        }
        if self.events[idx].at == as_of {
            return Some(self.events[idx].resolved);
        }
        if idx == 0 {
            return None;
        }
        Some(self.events[idx - 1].resolved)
    }
}

/// Rules for turning a tracker change log into resolution transitions.
#[derive(Debug, Clone)]
pub struct HistoryRules<'a> {
    pub resolved_statuses: &'a [String],
    pub patch_mime_types: &'a [String],
}

impl HistoryRules<'_> {
    fn is_resolved(&self, status: &str) -> bool {
        self.resolved_statuses.iter().any(|s| s == status)
    }

    pub fn transitions(&self, activity: &RecordActivity) -> Vec<TransitionEvent> {
        let mut events = Vec::new();
        for change_set in &activity.history {
            for change in &change_set.changes {
                if change.field_name != "status" {
                    continue;
                }
                let entering = self.is_resolved(&change.added);
                let leaving = self.is_resolved(&change.removed);
                if entering != leaving {
                    events.push(TransitionEvent {
                        at: change_set.when,
                        resolved: entering,
                    });
                }
            }
        }
        events
    }

    pub fn has_patch(&self, activity: &RecordActivity) -> bool {
        activity.attachments.iter().any(|attachment| {
            !attachment.is_obsolete
                && self
                    .patch_mime_types
                    .iter()
                    .any(|mime| *mime == attachment.content_type)
        })
    }

    pub fn build(&self, record: &Record, activity: Option<&RecordActivity>) -> ItemHistory {
        match activity {
            Some(activity) => {
                ItemHistory::new(record.id, record.creation_time, self.transitions(activity))
                    .with_patch(self.has_patch(activity))
            }
            None => ItemHistory::new(record.id, record.creation_time, []),
        }
    }
}
