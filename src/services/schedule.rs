//! Schedule intake: the weekly availability grid and preference submission.
//!
//! DESIGN
//! ======
//! The grid is 8 periods by 7 days. Submissions store every cell, selected
//! or not, together with the period's clock times, so a stored document can
//! be read without knowing this timetable.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::auth::Identity;
use crate::store::{DocumentStore, FieldValue, Fields, StoreError};

pub const SCHEDULES_COLLECTION: &str = "schedules";
pub const MAX_COMMENT_CHARS: usize = 2000;

pub const PERIODS: [&str; 8] = ["1", "2", "3", "4", "5", "6", "7", "8"];
pub const DAYS: [&str; 7] = ["月", "火", "水", "木", "金", "土", "日"];
pub const START_TIMES: [&str; 8] = ["8:40", "10:10", "12:15", "13:45", "15:15", "18:00", "18:15", "19:45"];
pub const END_TIMES: [&str; 8] = ["9:55", "11:25", "13:30", "15:00", "16:45", "18:00", "19:30", "21:00"];

const FALLBACK_USER_NAME: &str = "ユーザー";

// =============================================================================
// GRID
// =============================================================================

/// Selected cells, indexed `[period][day]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleGrid([[bool; 7]; 8]);

/// One grid cell as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCell {
    pub period: String,
    pub day: String,
    pub is_selected: bool,
    pub start_time: String,
    pub end_time: String,
}

impl ScheduleGrid {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one cell. Out-of-range indices are ignored.
    pub fn toggle(&mut self, period: usize, day: usize) {
        if let Some(cell) = self.0.get_mut(period).and_then(|row| row.get_mut(day)) {
            *cell = !*cell;
        }
    }

    #[must_use]
    pub fn is_selected(&self, period: usize, day: usize) -> bool {
        self.0.get(period).and_then(|row| row.get(day)).copied().unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.0 = [[false; 7]; 8];
    }

    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.0.iter().flatten().filter(|c| **c).count()
    }

    /// All 56 cells, period-major.
    #[must_use]
    pub fn cells(&self) -> Vec<ScheduleCell> {
        self.0
            .iter()
            .enumerate()
            .flat_map(|(p, row)| {
                row.iter().enumerate().map(move |(d, &is_selected)| ScheduleCell {
                    period: PERIODS[p].to_owned(),
                    day: DAYS[d].to_owned(),
                    is_selected,
                    start_time: START_TIMES[p].to_owned(),
                    end_time: END_TIMES[p].to_owned(),
                })
            })
            .collect()
    }
}

// =============================================================================
// FORM
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    #[default]
    #[serde(rename = "週1回")]
    OncePerWeek,
    #[serde(rename = "週2回")]
    TwicePerWeek,
    #[serde(rename = "試験官")]
    Examiner,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleForm {
    pub grid: ScheduleGrid,
    pub frequency: Frequency,
    pub comment: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Store a submission for `identity` and return the new document id.
///
/// # Errors
///
/// `Validation` for an over-long comment, `Store` when the write fails.
pub async fn submit(store: &dyn DocumentStore, identity: &Identity, form: &ScheduleForm) -> Result<String, ScheduleError> {
    if form.comment.chars().count() > MAX_COMMENT_CHARS {
        return Err(ScheduleError::Validation(format!("comment must be at most {MAX_COMMENT_CHARS} characters")));
    }

    let mut fields = Fields::new();
    fields.insert("userId".into(), json!(identity.uid).into());
    fields.insert("userEmail".into(), json!(identity.email).into());
    fields.insert("userName".into(), json!(user_name(identity)).into());
    fields.insert("scheduleData".into(), serde_json::to_value(form.grid.cells()).map_err(StoreError::from)?.into());
    fields.insert("frequency".into(), serde_json::to_value(form.frequency).map_err(StoreError::from)?.into());
    fields.insert("comment".into(), json!(form.comment).into());
    fields.insert("createdAt".into(), FieldValue::ServerTimestamp);
    fields.insert("updatedAt".into(), FieldValue::ServerTimestamp);

    let id = store.add_document(SCHEDULES_COLLECTION, fields).await?;
    info!(uid = %identity.uid, %id, selected = form.grid.selected_count(), "schedule submitted");
    Ok(id)
}

fn user_name(identity: &Identity) -> &str {
    identity
        .display_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or_else(|| identity.email.as_deref().filter(|e| !e.is_empty()))
        .unwrap_or(FALLBACK_USER_NAME)
}

#[cfg(test)]
#[path = "schedule_test.rs"]
mod tests;
