//! Knowledge table entry types.
//!
//! Two independent tables feed the resolver: a keyword→template table and
//! a curated question/answer table. Both are loaded whole from storage and
//! consumed read-only by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A keyword rule: exact or whole-word match on the inbound message,
/// answered with a template that may reference org-profile placeholders
/// such as `{companyName}` or `{phone}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordEntry {
    /// Stored lowercase; keys are unique case-insensitively.
    pub keyword: String,

    /// The reply template with `{placeholder}` tokens.
    pub response: String,
}

/// A curated question/answer pair.
///
/// `id` is positive and unique, assigned `max(existing) + 1` when the
/// caller does not supply one. The `attributedTo` field keeps its legacy
/// storage alias so existing data files load unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaEntry {
    pub id: u64,

    pub question: String,

    pub answer: String,

    /// Who answered; rendered as an attribution line under the reply.
    #[serde(
        rename = "attributedTo",
        alias = "ustadz",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub attributed_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Comma-separated tags, matched by substring containment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    /// Source link, appended on its own line when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(
        rename = "createdAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(
        rename = "updatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl QaEntry {
    /// The trimmed, lowercased tags longer than three characters —
    /// the only ones that participate in containment matching.
    pub fn qualifying_tags(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| t.len() > 3)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qa_entry_reads_legacy_attribution_field() {
        let json = r#"{"id":1,"question":"q","answer":"a","ustadz":"Ust. Ahmad"}"#;
        let entry: QaEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.attributed_to.as_deref(), Some("Ust. Ahmad"));
    }

    #[test]
    fn qa_entry_writes_spec_attribution_field() {
        let entry = QaEntry {
            id: 1,
            question: "q".into(),
            answer: "a".into(),
            attributed_to: Some("Ust. Ahmad".into()),
            category: None,
            tags: None,
            url: None,
            created_at: None,
            updated_at: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("attributedTo"));
        assert!(!json.contains("ustadz"));
    }

    #[test]
    fn qualifying_tags_filter_short_and_trim() {
        let entry = QaEntry {
            id: 1,
            question: "q".into(),
            answer: "a".into(),
            attributed_to: None,
            category: None,
            tags: Some(" Zakat , ab, infaq sedekah ".into()),
            url: None,
            created_at: None,
            updated_at: None,
        };
        let tags = entry.qualifying_tags();
        assert_eq!(tags, vec!["zakat".to_string(), "infaq sedekah".to_string()]);
    }

    #[test]
    fn qualifying_tags_empty_when_absent() {
        let entry = QaEntry {
            id: 1,
            question: "q".into(),
            answer: "a".into(),
            attributed_to: None,
            category: None,
            tags: None,
            url: None,
            created_at: None,
            updated_at: None,
        };
        assert!(entry.qualifying_tags().is_empty());
    }
}
