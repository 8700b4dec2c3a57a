//! Core data models used throughout the index.
//!
//! These types represent the document metadata, chunks, extracted
//! initiatives, and persisted rows that flow through the pipeline.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Kind of corporate report, derived from the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportType {
    #[serde(rename = "Annual Report")]
    AnnualReport,
    #[serde(rename = "Corporate Governance Report")]
    CorporateGovernanceReport,
    #[serde(rename = "Sustainability Report")]
    SustainabilityReport,
    Other,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::AnnualReport => "Annual Report",
            ReportType::CorporateGovernanceReport => "Corporate Governance Report",
            ReportType::SustainabilityReport => "Sustainability Report",
            ReportType::Other => "Other",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts about a document known before its text is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub company_name: String,
    pub report_type: ReportType,
    /// Four-digit year, or empty when the filename carries none.
    pub year: String,
    pub filename: String,
}

impl DocumentMetadata {
    /// Year as stored in the `reports` table; unknown years map to 0.
    pub fn report_year(&self) -> i64 {
        self.year.parse().unwrap_or(0)
    }
}

/// A window of a document's text, sized for one extraction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub sequence_index: usize,
    /// Byte offset of the untrimmed window start in the source text.
    pub start: usize,
    /// Byte offset one past the untrimmed window end.
    pub end: usize,
}

/// Classification label of an initiative.
///
/// Labels that match neither a canonical name nor any keyword are kept
/// verbatim in [`Category::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Category {
    DigitalInfrastructure,
    AiAndAutomation,
    Cybersecurity,
    CustomerExperience,
    EsgTech,
    Unrecognized(String),
}

/// Canonical categories in keyword-matching priority order.
pub const CANONICAL_CATEGORIES: [Category; 5] = [
    Category::DigitalInfrastructure,
    Category::AiAndAutomation,
    Category::Cybersecurity,
    Category::CustomerExperience,
    Category::EsgTech,
];

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::DigitalInfrastructure => "Digital Infrastructure",
            Category::AiAndAutomation => "AI & Automation",
            Category::Cybersecurity => "Cybersecurity",
            Category::CustomerExperience => "Customer Experience",
            Category::EsgTech => "ESG Tech",
            Category::Unrecognized(label) => label,
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Category::DigitalInfrastructure => &["infrastructure", "erp", "cloud", "it upgrade"],
            Category::AiAndAutomation => &["ai", "automation", "analytics", "rpa", "blockchain"],
            Category::Cybersecurity => &["security", "cyber", "protection", "compliance"],
            Category::CustomerExperience => &["customer", "ecommerce", "mobile", "chatbot"],
            Category::EsgTech => &["esg", "sustainability", "green", "environment"],
            Category::Unrecognized(_) => &[],
        }
    }

    /// Map a free-form label onto a category.
    ///
    /// Exact canonical names are kept. Otherwise the first category (in
    /// [`CANONICAL_CATEGORIES`] order) with a keyword contained in the
    /// lowercased label wins. Keywords match as substrings, so "ai" also
    /// hits words like "maintain".
    pub fn normalize(label: &str) -> Category {
        if let Some(exact) = CANONICAL_CATEGORIES.iter().find(|c| c.as_str() == label) {
            return exact.clone();
        }

        let lower = label.to_lowercase();
        CANONICAL_CATEGORIES
            .iter()
            .find(|c| c.keywords().iter().any(|kw| lower.contains(kw)))
            .cloned()
            .unwrap_or_else(|| Category::Unrecognized(label.to_string()))
    }

    pub fn is_canonical(&self) -> bool {
        !matches!(self, Category::Unrecognized(_))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

/// Why a raw or typed initiative was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("initiative entry is not a JSON object")]
    NotAnObject,
    #[error("initiative description is empty")]
    EmptyInitiative,
}

/// One digital-transformation initiative extracted from report text.
///
/// Serializes with the field names the extraction engine is asked to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiativeRecord {
    pub company_name: String,
    pub category: Category,
    pub initiative: String,
    pub technology_used: String,
    pub department: Option<String>,
    pub year_mentioned: String,
    pub expected_impact: Option<String>,
    pub digital_investment: Option<String>,
}

impl InitiativeRecord {
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.initiative.trim().is_empty() {
            return Err(RecordError::EmptyInitiative);
        }
        Ok(())
    }
}

/// Initiative row as stored in `digital_initiatives`.
#[derive(Debug, Clone, Serialize)]
pub struct Initiative {
    pub id: i64,
    pub report_id: i64,
    pub company_name: String,
    pub category: String,
    pub initiative: String,
    pub technology_used: Option<String>,
    pub department: Option<String>,
    pub year_mentioned: Option<String>,
    pub expected_impact: Option<String>,
    pub digital_investment: Option<String>,
    pub extracted_at: String,
}

/// A label with its row count, used in statistics breakdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

/// Aggregate view over the whole store.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_companies: i64,
    pub total_reports: i64,
    pub total_initiatives: i64,
    pub by_category: Vec<NamedCount>,
    pub by_year: Vec<NamedCount>,
    pub top_companies: Vec<NamedCount>,
}

/// Per-company report and initiative counts.
#[derive(Debug, Clone, Serialize)]
pub struct CompanySummary {
    pub company_name: String,
    pub reports: i64,
    pub initiatives: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_category_unchanged() {
        for c in CANONICAL_CATEGORIES.iter() {
            assert_eq!(&Category::normalize(c.as_str()), c);
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for label in ["cloud migration", "RPA bots", "green data centre", "Payroll"] {
            let once = Category::normalize(label);
            let twice = Category::normalize(once.as_str());
            assert_eq!(once, twice, "label {:?}", label);
        }
    }

    #[test]
    fn test_keyword_mapping() {
        assert_eq!(
            Category::normalize("Cloud ERP upgrade"),
            Category::DigitalInfrastructure
        );
        assert_eq!(
            Category::normalize("cloud migration"),
            Category::DigitalInfrastructure
        );
        assert_eq!(Category::normalize("RPA"), Category::AiAndAutomation);
        assert_eq!(
            Category::normalize("Data Protection"),
            Category::Cybersecurity
        );
        assert_eq!(
            Category::normalize("Mobile banking app"),
            Category::CustomerExperience
        );
        assert_eq!(Category::normalize("Green IT"), Category::EsgTech);
    }

    #[test]
    fn test_keyword_priority_order() {
        // Both "cloud" (infrastructure) and "security" match; infrastructure wins.
        assert_eq!(
            Category::normalize("cloud security"),
            Category::DigitalInfrastructure
        );
    }

    #[test]
    fn test_unmatched_label_passes_through() {
        let c = Category::normalize("Workforce Upskilling");
        assert_eq!(c, Category::Unrecognized("Workforce Upskilling".to_string()));
        assert_eq!(c.as_str(), "Workforce Upskilling");
        assert!(!c.is_canonical());
    }

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&Category::AiAndAutomation).unwrap();
        assert_eq!(json, "\"AI & Automation\"");
    }

    #[test]
    fn test_report_year_defaults_to_zero() {
        let meta = DocumentMetadata {
            company_name: "Acme".into(),
            report_type: ReportType::Other,
            year: String::new(),
            filename: "acme.pdf".into(),
        };
        assert_eq!(meta.report_year(), 0);
    }

    #[test]
    fn test_empty_initiative_invalid() {
        let record = InitiativeRecord {
            company_name: "Acme".into(),
            category: Category::Cybersecurity,
            initiative: "   ".into(),
            technology_used: String::new(),
            department: None,
            year_mentioned: "2023".into(),
            expected_impact: None,
            digital_investment: None,
        };
        assert_eq!(record.validate(), Err(RecordError::EmptyInitiative));
    }
}
