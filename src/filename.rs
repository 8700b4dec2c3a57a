//! Filename metadata parser.
//!
//! Report files are conventionally named like
//! `Acme Corp - Annual Report 2023.pdf` or `Acme_Sustainability Report_2024.pdf`.
//! [`parse`] recovers the company, report type, and year from such names.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{DocumentMetadata, ReportType};

/// Years recognised in filenames.
pub const SUPPORTED_YEARS: [u16; 4] = [2022, 2023, 2024, 2025];

/// Report-type keywords in priority order.
const REPORT_TYPE_KEYWORDS: [(ReportType, &[&str]); 3] = [
    (ReportType::AnnualReport, &["Annual Report", "Annual_Report"]),
    (
        ReportType::CorporateGovernanceReport,
        &["Corporate Governance", "CG Report"],
    ),
    (ReportType::SustainabilityReport, &["Sustainability", "ESG"]),
];

/// Phrases stripped from the filename when deriving the company name.
const REPORT_PHRASES: [&str; 8] = [
    "Annual Report",
    "Annual_Report",
    "Corporate Governance Report",
    "Corporate_Governance_Report",
    "CG Report",
    "Sustainability Report",
    "Sustainability_Report",
    "ESG Report",
];

const STRIPPED_EXTENSIONS: [&str; 2] = [".pdf", ".txt"];

static RE_YEAR: Lazy<Regex> = Lazy::new(|| {
    let alternatives: Vec<String> = SUPPORTED_YEARS.iter().map(|y| y.to_string()).collect();
    Regex::new(&format!("({})", alternatives.join("|"))).expect("year pattern is valid")
});

static RE_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_\s]+").expect("separator pattern is valid"));

/// Derive [`DocumentMetadata`] from a bare filename. Never fails; fields
/// that cannot be recovered are left empty (or [`ReportType::Other`]).
/// A name with no company part uses the whole stem as the company.
pub fn parse(filename: &str) -> DocumentMetadata {
    let year = RE_YEAR
        .find(filename)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let report_type = REPORT_TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| filename.contains(kw)))
        .map(|(rt, _)| *rt)
        .unwrap_or(ReportType::Other);

    let mut name_part = strip_extension(filename).to_string();
    if !year.is_empty() {
        name_part = name_part.replace(&year, "");
    }
    for phrase in REPORT_PHRASES {
        name_part = name_part.replace(phrase, "");
    }
    let mut company_name = collapse_separators(&name_part);
    // Nothing left once the year and report phrases are gone: keep the stem.
    if company_name.is_empty() {
        company_name = collapse_separators(strip_extension(filename));
    }

    DocumentMetadata {
        company_name,
        report_type,
        year,
        filename: filename.to_string(),
    }
}

fn collapse_separators(s: &str) -> String {
    RE_SEPARATORS.replace_all(s, " ").trim().to_string()
}

fn strip_extension(filename: &str) -> &str {
    let lower = filename.to_ascii_lowercase();
    STRIPPED_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &filename[..filename.len() - ext.len()])
        .unwrap_or(filename)
}
