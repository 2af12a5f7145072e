//! Core data types: questions and user profiles

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// An interview question, either from the static catalog or user-authored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Opaque identity; time-derived (millisecond timestamp) for custom
    /// entries so newer ids order after older ones
    pub id: String,

    /// Question text; immutable after creation except explicit user edits
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Lazily populated expert answer; append-only per id, cleared only
    /// when the owning question is deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_answer: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_custom: bool,
}

impl Question {
    /// Build a static catalog entry
    #[must_use]
    pub fn catalog(id: &str, text: &str, category: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            category: Some(category.to_string()),
            cached_answer: None,
            is_custom: false,
        }
    }

    /// Build a new user-authored question with a fresh time-derived id
    #[must_use]
    pub fn custom(text: &str) -> Self {
        Self {
            id: Utc::now().timestamp_millis().to_string(),
            text: text.to_string(),
            category: Some("Custom".to_string()),
            cached_answer: None,
            is_custom: true,
        }
    }
}

/// Numeric creation order for custom ids; non-numeric ids sort oldest
#[must_use]
pub fn creation_order(id: &str) -> i64 {
    id.parse().unwrap_or(0)
}

/// An authenticated user as exposed by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_ids_are_time_ordered() {
        let a = Question::custom("first");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = Question::custom("second");
        assert!(creation_order(&b.id) > creation_order(&a.id));
    }

    #[test]
    fn catalog_entries_are_not_custom() {
        let q = Question::catalog("1", "What is a closure?", "JavaScript");
        assert!(!q.is_custom);
        assert_eq!(q.category.as_deref(), Some("JavaScript"));
    }

    #[test]
    fn non_numeric_ids_sort_oldest() {
        assert_eq!(creation_order("y1"), 0);
        assert!(creation_order("1700000000000") > creation_order("r2"));
    }
}
