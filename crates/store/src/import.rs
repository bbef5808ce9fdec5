//! CSV bulk import for the knowledge tables.
//!
//! Column headers are matched against an explicit ordered list of
//! accepted aliases per logical field (the original data sets use both
//! English and Indonesian headers). Aliases are resolved once per import
//! from the header row, never per row. Rows with missing required fields
//! are reported individually; valid rows are still applied, under a
//! single lock and a single flush.

use balas_core::error::StoreError;
use balas_core::knowledge::{KeywordEntry, QaEntry};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::knowledge::KnowledgeStore;

// Accepted header aliases, in resolution order.
const KEYWORD_ALIASES: &[&str] = &["keyword", "kata"];
const RESPONSE_ALIASES: &[&str] = &["response", "jawaban"];
const QA_ID_ALIASES: &[&str] = &["id"];
const QA_QUESTION_ALIASES: &[&str] = &["question", "pertanyaan"];
const QA_ANSWER_ALIASES: &[&str] = &["answer", "jawaban"];
const QA_ATTRIBUTION_ALIASES: &[&str] = &["attributed_to", "attributedto", "ustadz"];
const QA_CATEGORY_ALIASES: &[&str] = &["category", "kategori"];
const QA_TAGS_ALIASES: &[&str] = &["tags"];
const QA_URL_ALIASES: &[&str] = &["url"];

/// Outcome of one bulk import.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub updated: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Find the index of the first header matching any alias,
/// case-insensitively.
fn resolve_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(alias))
    })
}

fn required_column(
    headers: &csv::StringRecord,
    aliases: &[&str],
) -> Result<usize, StoreError> {
    resolve_column(headers, aliases).ok_or_else(|| {
        StoreError::Import(format!(
            "missing required column (accepted headers: {})",
            aliases.join(", ")
        ))
    })
}

fn cell<'r>(record: &'r csv::StringRecord, column: Option<usize>) -> &'r str {
    column
        .and_then(|idx| record.get(idx))
        .map(str::trim)
        .unwrap_or("")
}

impl KnowledgeStore {
    /// Bulk-import keyword rules from CSV bytes.
    pub async fn import_keywords_csv(&self, data: &[u8]) -> Result<ImportReport, StoreError> {
        let mut reader = csv::Reader::from_reader(data);
        let headers = reader
            .headers()
            .map_err(|e| StoreError::Import(format!("unreadable header row: {e}")))?
            .clone();

        let keyword_col = required_column(&headers, KEYWORD_ALIASES)?;
        let response_col = required_column(&headers, RESPONSE_ALIASES)?;

        let mut report = ImportReport::default();
        let mut rows: Vec<(String, String)> = Vec::new();

        for (index, record) in reader.records().enumerate() {
            let line = index + 2; // line 1 is the header
            match record {
                Err(e) => report.errors.push(format!("row {line}: {e}")),
                Ok(record) => {
                    let keyword = cell(&record, Some(keyword_col));
                    let response = cell(&record, Some(response_col));
                    if keyword.is_empty() || response.is_empty() {
                        report
                            .errors
                            .push(format!("row {line}: empty keyword or response"));
                        continue;
                    }
                    rows.push((keyword.to_lowercase(), response.to_string()));
                }
            }
        }

        if rows.is_empty() && report.errors.is_empty() {
            return Err(StoreError::Import("file contains no data rows".into()));
        }

        let mut keywords = self.keywords_mut().write().await;
        for (key, response) in rows {
            match keywords.iter().position(|e| e.keyword.to_lowercase() == key) {
                Some(idx) => {
                    keywords[idx].response = response;
                    report.updated += 1;
                }
                None => {
                    keywords.push(KeywordEntry {
                        keyword: key,
                        response,
                    });
                    report.imported += 1;
                }
            }
        }
        crate::write_json(self.keywords_path(), &*keywords)?;

        info!(
            imported = report.imported,
            updated = report.updated,
            errors = report.errors.len(),
            "Keyword import applied"
        );
        Ok(report)
    }

    /// Bulk-import QA entries from CSV bytes, with the same id semantics
    /// as single upserts: explicit existing id updates in place, explicit
    /// novel id inserts as-is, absent id auto-assigns `max + 1`.
    pub async fn import_qa_csv(&self, data: &[u8]) -> Result<ImportReport, StoreError> {
        let mut reader = csv::Reader::from_reader(data);
        let headers = reader
            .headers()
            .map_err(|e| StoreError::Import(format!("unreadable header row: {e}")))?
            .clone();

        let question_col = required_column(&headers, QA_QUESTION_ALIASES)?;
        let answer_col = required_column(&headers, QA_ANSWER_ALIASES)?;
        let id_col = resolve_column(&headers, QA_ID_ALIASES);
        let attribution_col = resolve_column(&headers, QA_ATTRIBUTION_ALIASES);
        let category_col = resolve_column(&headers, QA_CATEGORY_ALIASES);
        let tags_col = resolve_column(&headers, QA_TAGS_ALIASES);
        let url_col = resolve_column(&headers, QA_URL_ALIASES);

        struct Row {
            id: Option<u64>,
            question: String,
            answer: String,
            attributed_to: Option<String>,
            category: Option<String>,
            tags: Option<String>,
            url: Option<String>,
        }

        let mut report = ImportReport::default();
        let mut rows: Vec<Row> = Vec::new();

        for (index, record) in reader.records().enumerate() {
            let line = index + 2;
            let record = match record {
                Err(e) => {
                    report.errors.push(format!("row {line}: {e}"));
                    continue;
                }
                Ok(record) => record,
            };

            let question = cell(&record, Some(question_col));
            let answer = cell(&record, Some(answer_col));
            if question.is_empty() || answer.is_empty() {
                report
                    .errors
                    .push(format!("row {line}: empty question or answer"));
                continue;
            }

            let id = match cell(&record, id_col) {
                "" => None,
                raw => match raw.parse::<u64>() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        report.errors.push(format!("row {line}: invalid id '{raw}'"));
                        continue;
                    }
                },
            };

            let optional = |col: Option<usize>| {
                let value = cell(&record, col);
                (!value.is_empty()).then(|| value.to_string())
            };

            rows.push(Row {
                id,
                question: question.to_string(),
                answer: answer.to_string(),
                attributed_to: optional(attribution_col),
                category: optional(category_col),
                tags: optional(tags_col),
                url: optional(url_col),
            });
        }

        if rows.is_empty() && report.errors.is_empty() {
            return Err(StoreError::Import("file contains no data rows".into()));
        }

        let mut qa = self.qa_mut().write().await;
        let now = Utc::now();
        for row in rows {
            let existing_idx = row.id.and_then(|id| qa.iter().position(|e| e.id == id));
            match existing_idx {
                Some(idx) => {
                    let id = qa[idx].id;
                    let created_at = qa[idx].created_at;
                    qa[idx] = QaEntry {
                        id,
                        question: row.question,
                        answer: row.answer,
                        attributed_to: row.attributed_to,
                        category: row.category,
                        tags: row.tags,
                        url: row.url,
                        created_at,
                        updated_at: Some(now),
                    };
                    report.updated += 1;
                }
                None => {
                    let id = row
                        .id
                        .unwrap_or_else(|| qa.iter().map(|e| e.id).max().unwrap_or(0) + 1);
                    qa.push(QaEntry {
                        id,
                        question: row.question,
                        answer: row.answer,
                        attributed_to: row.attributed_to,
                        category: row.category,
                        tags: row.tags,
                        url: row.url,
                        created_at: Some(now),
                        updated_at: None,
                    });
                    report.imported += 1;
                }
            }
        }
        crate::write_json(self.qa_path(), &*qa)?;

        info!(
            imported = report.imported,
            updated = report.updated,
            errors = report.errors.len(),
            "QA import applied"
        );
        Ok(report)
    }
}
