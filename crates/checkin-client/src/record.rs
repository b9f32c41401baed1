//! Submission records and their identity key

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Timestamp format written into records
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Trim and lowercase an email for identity comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim a month id for identity comparison (case is preserved)
pub fn normalize_month_id(month_id: &str) -> String {
    month_id.trim().to_string()
}

/// (normalized email, month id) pair identifying one monthly submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeKey {
    pub email: String,
    pub month_id: String,
}

impl CompositeKey {
    pub fn new(email: &str, month_id: &str) -> Self {
        Self {
            email: normalize_email(email),
            month_id: normalize_month_id(month_id),
        }
    }

    /// Flat string form used by key/value caches
    pub fn cache_key(&self) -> String {
        format!("checkin:{}:{}", self.email, self.month_id)
    }
}

impl std::fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.email, self.month_id)
    }
}

/// Calendar month a submission belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthStamp {
    date: NaiveDate,
}

impl MonthStamp {
    /// Month containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self { date }
    }

    /// Current local month
    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// `YYYY-MM`
    pub fn id(&self) -> String {
        format!("{:04}-{:02}", self.date.year(), self.date.month())
    }

    /// Display label, e.g. `May 2024`
    pub fn name(&self) -> String {
        self.date.format("%B %Y").to_string()
    }
}

/// One monthly feedback record
///
/// Built once by the caller and handed to the client by reference.
/// Serializes with the camelCase field names the ledger endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub email: String,
    /// Completion percentage
    pub completion: f64,
    pub bugs: u32,
    pub satisfaction: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_evaluation: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    /// Human-readable, not used for ordering
    pub timestamp: String,
    pub month_id: String,
    pub month_name: String,
}

impl SubmissionRecord {
    /// Start a record for `email` in `month`, stamped with the local time
    pub fn new(email: impl Into<String>, month: MonthStamp) -> Self {
        Self {
            email: email.into(),
            completion: 0.0,
            bugs: 0,
            satisfaction: 0.0,
            self_evaluation: None,
            comments: None,
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            month_id: month.id(),
            month_name: month.name(),
        }
    }

    pub fn with_completion(mut self, completion: f64) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_bugs(mut self, bugs: u32) -> Self {
        self.bugs = bugs;
        self
    }

    pub fn with_satisfaction(mut self, satisfaction: f64) -> Self {
        self.satisfaction = satisfaction;
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn with_self_evaluation(mut self, text: impl Into<String>) -> Self {
        self.self_evaluation = Some(text.into());
        self
    }

    /// Override the month id verbatim (no formatting applied)
    pub fn with_month_id(mut self, month_id: impl Into<String>) -> Self {
        self.month_id = month_id.into();
        self
    }

    /// Identity of this record for duplicate checks
    pub fn key(&self) -> CompositeKey {
        CompositeKey::new(&self.email, &self.month_id)
    }
}
