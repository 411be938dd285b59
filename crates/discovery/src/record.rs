//! Discovery records and the NDJSON line format.

use {
    serde::{Deserialize, Serialize},
    url::Url,
};

/// One facility or provider found in a result feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    pub name: String,
    pub category: Option<String>,
    /// Star rating, 0.0 to 5.0.
    pub rating: Option<f64>,
    pub review_count: Option<u64>,
    pub address: Option<String>,
    pub phone: Option<String>,
    /// Free-text open/closed indicator.
    pub hours_status: Option<String>,
    pub website: Option<Url>,
    pub review_snippet: Option<String>,
    /// The query variant that produced this record.
    pub search_query: String,
}

impl DiscoveryRecord {
    /// A record is worth emitting only with a name and at least one way to
    /// locate or contact the place.
    pub fn passes_gate(&self) -> bool {
        !self.name.trim().is_empty()
            && (self.category.is_some() || self.address.is_some() || self.phone.is_some())
    }
}

/// One line of the discovery stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamLine {
    Record(DiscoveryRecord),
    /// `{"success": false, "error": ...}`
    Failure { success: bool, error: String },
    /// `{"done": true, "count": ...}`, the final line of a completed run.
    Done { done: bool, count: u64 },
}

impl StreamLine {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
        }
    }

    pub fn done(count: u64) -> Self {
        Self::Done { done: true, count }
    }

    /// Serialize as one newline-terminated JSON object.
    pub fn to_ndjson(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "success": false, "error": format!("serialization failed: {e}") })
                .to_string()
        });
        line.push('\n');
        line
    }
}
