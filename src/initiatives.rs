//! Per-chunk extraction protocol.
//!
//! For every chunk the [`Extractor`] renders the prompt, calls the
//! [`ExtractionEngine`], and turns the raw reply into typed
//! [`InitiativeRecord`]s:
//!
//! ```text
//! raw reply ─▶ strip ``` fences ─▶ serde_json::Value ─▶ per-object map
//!           ─▶ defaults + category normalization ─▶ InitiativeRecord
//! ```
//!
//! Failures never escape a chunk. A malformed reply or an engine error is
//! logged and the chunk contributes zero records; invalid objects inside a
//! valid reply are dropped one by one.

use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::llm::ExtractionEngine;
use crate::models::{Category, DocumentMetadata, InitiativeRecord, RecordError, TextChunk};
use crate::prompt;

/// Raw-response prefix kept in logs when a reply cannot be parsed.
const RAW_LOG_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON array or object, got {0}")]
    UnexpectedShape(&'static str),
}

/// Drives the extraction engine over the chunks of a document.
pub struct Extractor {
    engine: Box<dyn ExtractionEngine>,
    delay: Duration,
}

impl Extractor {
    pub fn new(engine: Box<dyn ExtractionEngine>, delay: Duration) -> Self {
        Self { engine, delay }
    }

    pub fn from_config(engine: Box<dyn ExtractionEngine>, config: &ExtractionConfig) -> Self {
        Self::new(engine, Duration::from_millis(config.delay_ms))
    }

    pub fn model_name(&self) -> &str {
        self.engine.model_name()
    }

    /// Extract initiatives from one chunk of text. Never fails; problems are
    /// logged and yield an empty result.
    pub async fn extract_chunk(
        &self,
        text: &str,
        metadata: &DocumentMetadata,
    ) -> Vec<InitiativeRecord> {
        let prompt = prompt::render(metadata, text);
        debug!(prompt_len = prompt.len(), "invoking extraction engine");

        let raw = match self.engine.invoke(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, company = %metadata.company_name, "extraction engine call failed");
                return Vec::new();
            }
        };

        match parse_response(&raw, metadata) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "failed to parse extraction response");
                warn!(response = %truncate(&raw, RAW_LOG_LIMIT), "raw extraction response");
                Vec::new()
            }
        }
    }

    /// Extract initiatives from the chunks of a document, in chunk order.
    ///
    /// Only the first `max_chunks` chunks are sent when a cap is given.
    /// Consecutive engine calls are separated by the configured delay.
    /// Records are concatenated as returned; no deduplication is done.
    pub async fn extract_document(
        &self,
        chunks: &[TextChunk],
        metadata: &DocumentMetadata,
        max_chunks: Option<usize>,
    ) -> Vec<InitiativeRecord> {
        let selected = match max_chunks {
            Some(n) => &chunks[..n.min(chunks.len())],
            None => chunks,
        };
        let total = selected.len();

        info!(
            chunks = total,
            company = %metadata.company_name,
            year = %metadata.year,
            "extracting initiatives"
        );

        let mut all = Vec::new();
        for (i, chunk) in selected.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let found = self.extract_chunk(&chunk.text, metadata).await;
            if !found.is_empty() {
                info!("chunk {}/{}: {} initiative(s)", i + 1, total, found.len());
            } else {
                debug!("chunk {}/{}: no initiatives", i + 1, total);
            }
            all.extend(found);
        }

        info!(total = all.len(), "document extraction finished");
        all
    }
}

/// Remove a surrounding Markdown code fence, with or without a `json` tag.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse an engine reply into validated records.
///
/// A single object is treated as a one-element array. Elements that are not
/// objects, or whose `Initiative` is empty, are dropped.
pub fn parse_response(
    raw: &str,
    metadata: &DocumentMetadata,
) -> Result<Vec<InitiativeRecord>, ResponseError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;

    let items = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        Value::Null => return Err(ResponseError::UnexpectedShape("null")),
        Value::Bool(_) => return Err(ResponseError::UnexpectedShape("a boolean")),
        Value::Number(_) => return Err(ResponseError::UnexpectedShape("a number")),
        Value::String(_) => return Err(ResponseError::UnexpectedShape("a string")),
    };

    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match record_from_value(item, metadata) {
            Ok(record) => records.push(record),
            Err(RecordError::EmptyInitiative) => {
                debug!(index = idx, "dropping initiative with empty description");
            }
            Err(e) => warn!(index = idx, error = %e, "dropping malformed initiative"),
        }
    }
    Ok(records)
}

/// Map one JSON element onto an [`InitiativeRecord`], applying defaults.
pub fn record_from_value(
    value: &Value,
    metadata: &DocumentMetadata,
) -> Result<InitiativeRecord, RecordError> {
    let obj = value.as_object().ok_or(RecordError::NotAnObject)?;

    let mut company_name = text_field(obj, "CompanyName");
    if company_name.is_empty() {
        company_name = metadata.company_name.clone();
    }
    let mut year_mentioned = text_field(obj, "YearMentioned");
    if year_mentioned.is_empty() {
        year_mentioned = metadata.year.clone();
    }

    let record = InitiativeRecord {
        company_name,
        category: Category::normalize(&text_field(obj, "Category")),
        initiative: text_field(obj, "Initiative"),
        technology_used: text_field(obj, "TechnologyUsed"),
        department: optional_field(obj, "Department"),
        year_mentioned,
        expected_impact: optional_field(obj, "ExpectedImpact"),
        digital_investment: optional_field(obj, "DigitalInvestment"),
    };
    record.validate()?;

    if !record.category.is_canonical() {
        debug!(category = %record.category, "keeping unrecognized category label");
    }
    Ok(record)
}

/// Read a field as text. Scalars are stringified, string arrays are joined,
/// and anything else (missing, null, nested objects) reads as empty.
fn text_field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

fn optional_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    Some(text_field(obj, key)).filter(|s| !s.is_empty())
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_text;
    use crate::models::ReportType;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned replies in order and records the prompts it saw.
    struct ScriptedEngine {
        replies: Mutex<VecDeque<Result<String, String>>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedEngine {
        fn new(replies: Vec<Result<&str, &str>>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let prompts = Arc::new(Mutex::new(Vec::new()));
            let engine = Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                prompts: prompts.clone(),
            };
            (engine, prompts)
        }
    }

    #[async_trait]
    impl ExtractionEngine for ScriptedEngine {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn invoke(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(e)) => Err(anyhow!(e)),
                None => Ok("[]".to_string()),
            }
        }
    }

    fn acme() -> DocumentMetadata {
        DocumentMetadata {
            company_name: "Acme Corp".to_string(),
            report_type: ReportType::AnnualReport,
            year: "2023".to_string(),
            filename: "Acme Corp - Annual Report 2023.pdf".to_string(),
        }
    }

    fn extractor(replies: Vec<Result<&str, &str>>) -> (Extractor, Arc<Mutex<Vec<String>>>) {
        let (engine, prompts) = ScriptedEngine::new(replies);
        (Extractor::new(Box::new(engine), Duration::ZERO), prompts)
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  [1, 2]  "), "[1, 2]");
        assert_eq!(strip_code_fence("```json\n[]"), "[]");
    }

    #[test]
    fn test_fenced_response_applies_defaults() {
        let raw = "```json\n[{\"CompanyName\":\"\",\"Category\":\"cloud migration\",\"Initiative\":\"Moved ERP to cloud\",\"TechnologyUsed\":\"AWS\",\"YearMentioned\":\"\"}]\n```";
        let records = parse_response(raw, &acme()).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.company_name, "Acme Corp");
        assert_eq!(r.category, Category::DigitalInfrastructure);
        assert_eq!(r.category.as_str(), "Digital Infrastructure");
        assert_eq!(r.year_mentioned, "2023");
        assert_eq!(r.initiative, "Moved ERP to cloud");
        assert_eq!(r.technology_used, "AWS");
        assert_eq!(r.department, None);
    }

    #[test]
    fn test_single_object_coerced_to_list() {
        let raw = r#"{"Category":"Cybersecurity","Initiative":"Rolled out MFA","TechnologyUsed":"Okta"}"#;
        let records = parse_response(raw, &acme()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, Category::Cybersecurity);
    }

    #[test]
    fn test_empty_initiative_discarded() {
        let raw = r#"[
            {"Category":"ESG Tech","Initiative":"Solar-powered data centre","TechnologyUsed":"PV"},
            {"Category":"ESG Tech","Initiative":"   ","TechnologyUsed":"PV"},
            {"Category":"ESG Tech","TechnologyUsed":"PV"},
            "not an object"
        ]"#;
        let records = parse_response(raw, &acme()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].initiative, "Solar-powered data centre");
    }

    #[test]
    fn test_non_string_values_are_stringified() {
        let raw = r#"[{"CompanyName":"Acme","Category":"AI & Automation","Initiative":"Invoice RPA","TechnologyUsed":["UiPath","Azure"],"YearMentioned":2024,"DigitalInvestment":1500000,"Department":null}]"#;
        let r = &parse_response(raw, &acme()).unwrap()[0];
        assert_eq!(r.company_name, "Acme");
        assert_eq!(r.technology_used, "UiPath, Azure");
        assert_eq!(r.year_mentioned, "2024");
        assert_eq!(r.digital_investment.as_deref(), Some("1500000"));
        assert_eq!(r.department, None);
    }

    #[test]
    fn test_unknown_category_passes_through() {
        let raw = r#"[{"Category":"Workforce","Initiative":"Digital skills academy","TechnologyUsed":"LMS"}]"#;
        let r = &parse_response(raw, &acme()).unwrap()[0];
        assert_eq!(r.category, Category::Unrecognized("Workforce".to_string()));
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(
            parse_response("Sorry, I cannot help with that.", &acme()),
            Err(ResponseError::Json(_))
        ));
        assert!(matches!(
            parse_response("42", &acme()),
            Err(ResponseError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_empty_array_yields_nothing() {
        assert!(parse_response("[]", &acme()).unwrap().is_empty());
    }

    #[test]
    fn test_truncate_respects_chars() {
        assert_eq!(truncate("ééé", 2), "éé");
        assert_eq!(truncate("ab", 5), "ab");
    }

    #[tokio::test]
    async fn test_extract_chunk_sends_rendered_prompt() {
        let (ex, prompts) = extractor(vec![Ok(
            r#"[{"Category":"Customer Experience","Initiative":"Launched mobile app","TechnologyUsed":"Flutter"}]"#,
        )]);
        let records = ex.extract_chunk("We launched an app.", &acme()).await;
        assert_eq!(records.len(), 1);
        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Company Name: Acme Corp"));
        assert!(prompts[0].contains("We launched an app."));
    }

    #[tokio::test]
    async fn test_extract_chunk_survives_bad_reply_and_engine_error() {
        let (ex, _) = extractor(vec![Ok("not json at all"), Err("connection reset")]);
        assert!(ex.extract_chunk("a", &acme()).await.is_empty());
        assert!(ex.extract_chunk("b", &acme()).await.is_empty());
    }

    #[tokio::test]
    async fn test_extract_document_concatenates_in_order_and_tolerates_failures() {
        let (ex, prompts) = extractor(vec![
            Ok(r#"[{"Category":"Cybersecurity","Initiative":"first","TechnologyUsed":"x"}]"#),
            Err("timeout"),
            Ok(r#"[{"Category":"Cybersecurity","Initiative":"second","TechnologyUsed":"x"},
                   {"Category":"Cybersecurity","Initiative":"first","TechnologyUsed":"x"}]"#),
        ]);
        let text = "a".repeat(250);
        let chunks = chunk_text(&text, 100, 10).unwrap();
        assert_eq!(chunks.len(), 3);

        let records = ex.extract_document(&chunks, &acme(), None).await;
        let names: Vec<&str> = records.iter().map(|r| r.initiative.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "first"]);
        assert_eq!(prompts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_extract_document_respects_max_chunks() {
        let (ex, prompts) = extractor(vec![]);
        let text = "a".repeat(1000);
        let chunks = chunk_text(&text, 100, 10).unwrap();
        ex.extract_document(&chunks, &acme(), Some(2)).await;
        assert_eq!(prompts.lock().unwrap().len(), 2);

        let (ex, prompts) = extractor(vec![]);
        ex.extract_document(&chunks, &acme(), Some(500)).await;
        assert_eq!(prompts.lock().unwrap().len(), chunks.len());
    }
}
