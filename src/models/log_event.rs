use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LogDetail;

/// One audit/log event: who performed an action, what type of action, against
/// which source, with per-category record counts attached as [`LogDetail`]
/// rows.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(default)]
    id: i32,
    /// The URL that caused the log event.
    pub source_url: Option<String>,
    pub comment: Option<String>,
    pub created: DateTime<Utc>,
    /// `YYYYMM` reporting/partition key. Always numeric once constructed.
    pub month: String,
    pub user_email: Option<String>,
    pub user_ip: Option<String>,
    /// Subsystem or caller that generated the event.
    pub source: Option<String>,
    pub log_event_type_id: i32,
    pub log_reason_type_id: Option<i32>,
    pub log_source_type_id: Option<i32>,
    /// Owned detail rows. Loaded by the db layer, not part of the row mapping.
    #[sqlx(skip)]
    #[serde(default)]
    pub log_details: HashSet<LogDetail>,
}

/// How a caller supplies detail rows: pre-built, or as a category-to-count
/// map converted at construction time. Never both.
#[derive(Debug, Clone)]
pub enum DetailSource {
    Details(HashSet<LogDetail>),
    RecordCounts(HashMap<String, i64>),
}

impl Default for DetailSource {
    fn default() -> Self {
        DetailSource::Details(HashSet::new())
    }
}

/// Input shape for a new [`LogEvent`]. Fields left at their defaults are
/// treated as absent; a missing or malformed `month` is resolved from the
/// clock by [`LogEvent::from_parts`].
#[derive(Debug, Clone, Default)]
pub struct NewLogEvent {
    pub source: Option<String>,
    pub log_event_type_id: i32,
    pub log_reason_type_id: Option<i32>,
    pub log_source_type_id: Option<i32>,
    pub user_email: Option<String>,
    pub user_ip: Option<String>,
    pub comment: Option<String>,
    pub month: Option<String>,
    pub source_url: Option<String>,
    pub details: DetailSource,
}

impl NewLogEvent {
    /// Event with a pre-built detail set and no secondary classification.
    pub fn with_details(
        source: &str,
        log_event_type_id: i32,
        user_email: &str,
        user_ip: &str,
        comment: &str,
        log_details: HashSet<LogDetail>,
    ) -> Self {
        Self {
            source: Some(source.to_string()),
            log_event_type_id,
            user_email: Some(user_email.to_string()),
            user_ip: Some(user_ip.to_string()),
            comment: Some(comment.to_string()),
            details: DetailSource::Details(log_details),
            ..Self::default()
        }
    }

    /// Event whose details are derived from a category-to-count map.
    pub fn with_record_counts(
        source: &str,
        log_event_type_id: i32,
        user_email: &str,
        user_ip: &str,
        comment: &str,
        record_counts: HashMap<String, i64>,
    ) -> Self {
        Self {
            source: Some(source.to_string()),
            log_event_type_id,
            user_email: Some(user_email.to_string()),
            user_ip: Some(user_ip.to_string()),
            comment: Some(comment.to_string()),
            details: DetailSource::RecordCounts(record_counts),
            ..Self::default()
        }
    }
}

impl LogEvent {
    /// Build an event stamped with the current wall clock.
    pub fn new(new: NewLogEvent) -> Self {
        Self::from_parts(new, Utc::now())
    }

    /// Build an event against an explicit clock reading. `now` supplies the
    /// `created` timestamp and the fallback month key.
    pub fn from_parts(new: NewLogEvent, now: DateTime<Utc>) -> Self {
        let log_details = match new.details {
            DetailSource::Details(details) => details,
            DetailSource::RecordCounts(counts) => {
                record_counts_to_details(new.log_event_type_id, &counts)
            }
        };

        Self {
            id: 0,
            source_url: new.source_url,
            comment: new.comment,
            created: now,
            month: normalize_month(new.month.as_deref(), now),
            user_email: new.user_email,
            user_ip: new.user_ip,
            source: new.source,
            log_event_type_id: new.log_event_type_id,
            log_reason_type_id: new.log_reason_type_id,
            log_source_type_id: new.log_source_type_id,
            log_details,
        }
    }

    /// Storage-assigned identifier; 0 until the event has been persisted.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: i32) {
        self.id = id;
    }
}

/// Convert a category-to-count map into detail rows for an event of the
/// given type. An empty map yields an empty set; the input is untouched.
pub fn record_counts_to_details(
    log_event_type_id: i32,
    record_counts: &HashMap<String, i64>,
) -> HashSet<LogDetail> {
    let entity_type = log_event_type_id.to_string();
    record_counts
        .iter()
        .map(|(record_type, count)| LogDetail::new(&entity_type, record_type, *count))
        .collect()
}

/// Resolve the month key: a supplied value is kept (trimmed) when it is more
/// than three characters and wholly numeric; anything else is replaced with
/// the `YYYYMM` of `now`. Malformed input is corrected, never reported.
fn normalize_month(month: Option<&str>, now: DateTime<Utc>) -> String {
    if let Some(raw) = month {
        let trimmed = raw.trim();
        if trimmed.len() > 3 && is_integer(trimmed) {
            return trimmed.to_string();
        }
        tracing::trace!("ignoring malformed month key {raw:?}");
    }
    now.format("%Y%m").to_string()
}

fn is_integer(s: &str) -> bool {
    s.parse::<i64>().is_ok()
}
