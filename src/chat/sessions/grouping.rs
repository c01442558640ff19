//! Date buckets for the session list.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::chat::sessions::history::SessionSummary;

/// Display label of the bucket for today.
pub const TODAY: &str = "Today";
/// Display label of the bucket for yesterday.
pub const YESTERDAY: &str = "Yesterday";
/// Display label of the bucket for the rest of the week.
pub const PREVIOUS_7_DAYS: &str = "Previous 7 Days";

/// Sessions grouped by last activity.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct SessionGroups {
    /// Updated on the current UTC date.
    #[serde(rename = "Today")]
    pub today: Vec<SessionSummary>,
    /// Updated on the previous UTC date.
    #[serde(rename = "Yesterday")]
    pub yesterday: Vec<SessionSummary>,
    /// Updated within the last seven days, before yesterday.
    #[serde(rename = "Previous 7 Days")]
    pub previous_7_days: Vec<SessionSummary>,
}

impl SessionGroups {
    /// Buckets in display order with their labels.
    pub fn buckets(&self) -> impl Iterator<Item = (&'static str, &[SessionSummary])> {
        [
            (TODAY, self.today.as_slice()),
            (YESTERDAY, self.yesterday.as_slice()),
            (PREVIOUS_7_DAYS, self.previous_7_days.as_slice()),
        ]
        .into_iter()
    }

    /// Most recent session in display order.
    #[must_use]
    pub fn most_recent(&self) -> Option<&SessionSummary> {
        self.buckets().find_map(|(_, sessions)| sessions.first())
    }

    /// Total number of grouped sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.today.len() + self.yesterday.len() + self.previous_7_days.len()
    }

    /// Whether no session is grouped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Put a freshly created session at the top of `Today`.
    pub fn prepend_today(&mut self, session: SessionSummary) {
        self.today.insert(0, session);
    }
}

/// Group sessions by `updated_at` relative to `now`.
///
/// Calendar dates are compared in UTC. `Previous 7 Days` covers
/// `[now - 7 days, now - 1 day)` for sessions not already in `Today` or
/// `Yesterday`; anything else is left out. Input order is kept within a
/// bucket.
#[must_use]
pub fn group_by_date(sessions: &[SessionSummary], now: DateTime<Utc>) -> SessionGroups {
    let today = now.date_naive();
    let one_day_ago = now - Duration::days(1);
    let yesterday = one_day_ago.date_naive();
    let week_start = now - Duration::days(7);

    let mut groups = SessionGroups::default();
    for session in sessions {
        let updated = session.updated_at;
        let date = updated.date_naive();

        if date == today {
            groups.today.push(session.clone());
        } else if date == yesterday {
            groups.yesterday.push(session.clone());
        } else if updated >= week_start && updated < one_day_ago {
            groups.previous_7_days.push(session.clone());
        }
    }

    groups
}
