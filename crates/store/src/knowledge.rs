//! Knowledge store — the keyword→template table and the question/answer
//! table, plus the two lookup algorithms the resolver runs against a
//! read-only snapshot.

use std::path::{Path, PathBuf};

use balas_core::error::StoreError;
use balas_core::knowledge::{KeywordEntry, QaEntry};
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

/// Similarity threshold for the token-overlap pass.
const QA_SIMILARITY_THRESHOLD: f64 = 0.6;

/// Tokens this short never participate in similarity or tag matching.
const MIN_TOKEN_LEN: usize = 4;

/// Both knowledge tables backed by their JSON documents
/// (`knowledge.json` and `qa-database.json`).
pub struct KnowledgeStore {
    keywords_path: PathBuf,
    qa_path: PathBuf,
    keywords: RwLock<Vec<KeywordEntry>>,
    qa: RwLock<Vec<QaEntry>>,
}

/// Pre-2.x keyword file layout: parallel keyword list + response map.
/// Still accepted on load so old installs migrate transparently.
#[derive(Deserialize)]
struct LegacyKeywordFile {
    keywords: Vec<String>,
    responses: std::collections::HashMap<String, String>,
}

impl KnowledgeStore {
    /// Open both tables under the given data directory.
    pub fn open(data_dir: &Path) -> Self {
        let keywords_path = data_dir.join("knowledge.json");
        let qa_path = data_dir.join("qa-database.json");

        let keywords = Self::load_keywords(&keywords_path);
        let qa: Vec<QaEntry> = crate::read_json(&qa_path).unwrap_or_default();
        debug!(
            keywords = keywords.len(),
            qa = qa.len(),
            "Knowledge store loaded"
        );

        Self {
            keywords_path,
            qa_path,
            keywords: RwLock::new(keywords),
            qa: RwLock::new(qa),
        }
    }

    fn load_keywords(path: &Path) -> Vec<KeywordEntry> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Vec::new();
        };

        if let Ok(entries) = serde_json::from_str::<Vec<KeywordEntry>>(&content) {
            return entries;
        }

        // Legacy object layout
        if let Ok(legacy) = serde_json::from_str::<LegacyKeywordFile>(&content) {
            return legacy
                .keywords
                .into_iter()
                .filter_map(|k| {
                    legacy.responses.get(&k).map(|r| KeywordEntry {
                        keyword: k.clone(),
                        response: r.clone(),
                    })
                })
                .collect();
        }

        tracing::warn!(path = %path.display(), "Malformed keyword file, starting empty");
        Vec::new()
    }

    /// A read-only copy of both tables for the resolver.
    pub async fn snapshot(&self) -> KnowledgeTables {
        KnowledgeTables {
            keywords: self.keywords.read().await.clone(),
            qa: self.qa.read().await.clone(),
        }
    }

    pub async fn list_keywords(&self) -> Vec<KeywordEntry> {
        self.keywords.read().await.clone()
    }

    pub async fn list_qa(&self) -> Vec<QaEntry> {
        self.qa.read().await.clone()
    }

    /// Insert or replace a keyword rule. Keys are stored lowercase and
    /// are unique case-insensitively; the last write wins.
    ///
    /// Returns `true` when an existing rule was replaced.
    pub async fn upsert_keyword(&self, keyword: &str, response: &str) -> Result<bool, StoreError> {
        let key = keyword.trim().to_lowercase();
        let response = response.trim();
        if key.is_empty() || response.is_empty() {
            return Err(StoreError::Validation(
                "keyword and response must not be empty".into(),
            ));
        }

        let mut keywords = self.keywords.write().await;
        let updated = if let Some(idx) = keywords
            .iter()
            .position(|e| e.keyword.to_lowercase() == key)
        {
            keywords[idx].response = response.to_string();
            true
        } else {
            keywords.push(KeywordEntry {
                keyword: key,
                response: response.to_string(),
            });
            false
        };

        crate::write_json(&self.keywords_path, &*keywords)?;
        Ok(updated)
    }

    /// Remove a keyword rule (case-insensitive). Returns whether one
    /// was removed; removing a missing key is not an error.
    pub async fn remove_keyword(&self, keyword: &str) -> Result<bool, StoreError> {
        let key = keyword.trim().to_lowercase();
        let mut keywords = self.keywords.write().await;
        let before = keywords.len();
        keywords.retain(|e| e.keyword.to_lowercase() != key);
        let removed = keywords.len() < before;
        if removed {
            crate::write_json(&self.keywords_path, &*keywords)?;
        }
        Ok(removed)
    }

    /// Insert or update a QA entry.
    ///
    /// Id semantics: no id → assigned `max(existing) + 1`; an existing
    /// id → that entry is overwritten in place (update); a novel
    /// explicit id → inserted carrying that id, not renumbered.
    ///
    /// Returns the stored entry and whether it replaced an existing one.
    pub async fn upsert_qa(&self, new: NewQaEntry) -> Result<(QaEntry, bool), StoreError> {
        if new.question.trim().is_empty() || new.answer.trim().is_empty() {
            return Err(StoreError::Validation(
                "question and answer must not be empty".into(),
            ));
        }

        let mut qa = self.qa.write().await;
        let now = Utc::now();

        let existing_idx = new.id.and_then(|id| qa.iter().position(|e| e.id == id));
        let (entry, updated) = match (new.id, existing_idx) {
            (Some(id), Some(idx)) => {
                let created_at = qa[idx].created_at;
                qa[idx] = QaEntry {
                    id,
                    question: new.question,
                    answer: new.answer,
                    attributed_to: new.attributed_to,
                    category: new.category,
                    tags: new.tags,
                    url: new.url,
                    created_at,
                    updated_at: Some(now),
                };
                (qa[idx].clone(), true)
            }
            (id, _) => {
                let id =
                    id.unwrap_or_else(|| qa.iter().map(|e| e.id).max().unwrap_or(0) + 1);
                let entry = QaEntry {
                    id,
                    question: new.question,
                    answer: new.answer,
                    attributed_to: new.attributed_to,
                    category: new.category,
                    tags: new.tags,
                    url: new.url,
                    created_at: Some(now),
                    updated_at: None,
                };
                qa.push(entry.clone());
                (entry, false)
            }
        };

        crate::write_json(&self.qa_path, &*qa)?;
        Ok((entry, updated))
    }

    // Module-internal access for the bulk importer, which batches row
    // application under one lock and one flush.
    pub(crate) fn keywords_mut(&self) -> &RwLock<Vec<KeywordEntry>> {
        &self.keywords
    }

    pub(crate) fn qa_mut(&self) -> &RwLock<Vec<QaEntry>> {
        &self.qa
    }

    pub(crate) fn keywords_path(&self) -> &Path {
        &self.keywords_path
    }

    pub(crate) fn qa_path(&self) -> &Path {
        &self.qa_path
    }

    /// Remove a QA entry by id. Removing a missing id is not an error.
    pub async fn remove_qa(&self, id: u64) -> Result<bool, StoreError> {
        let mut qa = self.qa.write().await;
        let before = qa.len();
        qa.retain(|e| e.id != id);
        let removed = qa.len() < before;
        if removed {
            crate::write_json(&self.qa_path, &*qa)?;
        }
        Ok(removed)
    }
}

/// A read-only snapshot of both knowledge tables, with the lookup
/// algorithms the resolver runs.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeTables {
    pub keywords: Vec<KeywordEntry>,
    pub qa: Vec<QaEntry>,
}

impl KnowledgeTables {
    /// Two-pass keyword lookup.
    ///
    /// Pass 1: case-insensitive exact equality between the whole trimmed
    /// message and a stored keyword. Pass 2: case-insensitive whole-word
    /// containment — the keyword must appear bounded by word boundaries,
    /// so `info` matches "minta info dong" but not "informasi". First
    /// match wins; table order breaks ties.
    pub fn find_keyword(&self, message: &str) -> Option<&KeywordEntry> {
        let trimmed = message.trim().to_lowercase();

        if let Some(hit) = self
            .keywords
            .iter()
            .find(|e| e.keyword.to_lowercase() == trimmed)
        {
            return Some(hit);
        }

        self.keywords.iter().find(|e| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(&e.keyword));
            Regex::new(&pattern)
                .map(|re| re.is_match(message))
                .unwrap_or(false)
        })
    }

    /// Three-pass QA lookup, evaluated per entry in table order; the
    /// first entry to pass any check wins.
    ///
    /// 1. Case-insensitive exact equality with the question.
    /// 2. Any qualifying tag (trimmed, lowercased, longer than three
    ///    characters) contained in the message.
    /// 3. Token-overlap similarity above [`QA_SIMILARITY_THRESHOLD`]:
    ///    whitespace tokens longer than three characters,
    ///    `matches / max(|message|, |question|)`. Empty token sets never
    ///    match.
    pub fn find_qa(&self, message: &str) -> Option<&QaEntry> {
        let msg_lower = message.trim().to_lowercase();
        let msg_tokens: Vec<&str> = qualifying_tokens(&msg_lower);

        for entry in &self.qa {
            let q_lower = entry.question.to_lowercase();

            if q_lower == msg_lower {
                return Some(entry);
            }

            if entry
                .qualifying_tags()
                .iter()
                .any(|tag| msg_lower.contains(tag.as_str()))
            {
                return Some(entry);
            }

            let q_tokens = qualifying_tokens(&q_lower);
            let denominator = msg_tokens.len().max(q_tokens.len());
            if denominator == 0 {
                continue;
            }
            let matches = msg_tokens.iter().filter(|w| q_tokens.contains(*w)).count();
            if matches as f64 / denominator as f64 > QA_SIMILARITY_THRESHOLD {
                return Some(entry);
            }
        }

        None
    }
}

fn qualifying_tokens(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .filter(|w| w.len() >= MIN_TOKEN_LEN)
        .collect()
}

/// Input for [`KnowledgeStore::upsert_qa`]. Mirrors the control-surface
/// payload, including the legacy attribution alias.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewQaEntry {
    #[serde(default)]
    pub id: Option<u64>,
    pub question: String,
    pub answer: String,
    #[serde(rename = "attributedTo", alias = "ustadz", default)]
    pub attributed_to: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}
