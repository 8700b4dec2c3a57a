//! Extraction prompt template.

use crate::models::DocumentMetadata;

const INSTRUCTIONS: &str = r#"You are a research analyst specializing in digital economy transformation.
Analyze the following excerpt from a company's corporate report. Identify and extract all relevant digital transformation efforts under these key areas:

1. Digital Infrastructure – ERP systems, cloud migration, IT upgrades, digital tools
2. AI & Automation – AI/ML, analytics, RPA, blockchain, IoT
3. Cybersecurity – IT security, data protection, governance, compliance
4. Customer Experience – E-commerce, mobile platforms, chatbots, digital marketing
5. ESG Tech – Green IT, sustainability tech, social/environmental platforms

Extract real initiatives, not generic statements. Focus on what the company did, what technology was used, and why.

IMPORTANT INSTRUCTIONS:
- Only extract SPECIFIC, CONCRETE initiatives with actual implementation details
- Skip generic statements like "we are committed to digital transformation"
- Look for: specific systems named, technologies deployed, projects completed, platforms launched
- Extract technology names, vendor names, system names when mentioned
- Include financial figures if mentioned (investments, budgets, savings)
- If no specific initiatives are found, return an empty JSON array: []"#;

const FIELDS: &str = r#"Return the output as a valid JSON array of objects. Each object should have these fields:
- CompanyName: string
- Category: string (must be one of: "Digital Infrastructure", "AI & Automation", "Cybersecurity", "Customer Experience", "ESG Tech")
- Initiative: string (specific description of what was done)
- TechnologyUsed: string (specific tech, platform, or system)
- Department: string (optional, which department/unit)
- YearMentioned: string (the year, usually {year})
- ExpectedImpact: string (optional, outcomes or benefits)
- DigitalInvestment: string (optional, budget or investment amount)"#;

const CLOSING: &str = "Return ONLY a valid JSON array, no additional text or explanation:";

/// Render the extraction prompt for one chunk of a document.
pub fn render(metadata: &DocumentMetadata, chunk_text: &str) -> String {
    let mut prompt = String::with_capacity(INSTRUCTIONS.len() + chunk_text.len() + 1024);

    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\n");

    prompt.push_str(&format!("Company Name: {}\n", metadata.company_name));
    prompt.push_str(&format!("Report Year: {}\n", metadata.year));
    prompt.push_str(&format!("Report Type: {}\n\n", metadata.report_type));

    prompt.push_str(&FIELDS.replace("{year}", &metadata.year));
    prompt.push_str("\n\n");

    prompt.push_str("Text:\n");
    prompt.push_str(chunk_text);
    prompt.push_str("\n\n");

    prompt.push_str(CLOSING);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportType;

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            company_name: "Acme Corp".to_string(),
            report_type: ReportType::AnnualReport,
            year: "2023".to_string(),
            filename: "Acme Corp - Annual Report 2023.pdf".to_string(),
        }
    }

    #[test]
    fn test_prompt_embeds_document_context() {
        let prompt = render(&metadata(), "We migrated our ERP to SAP S/4HANA.");
        assert!(prompt.contains("Company Name: Acme Corp"));
        assert!(prompt.contains("Report Year: 2023"));
        assert!(prompt.contains("Report Type: Annual Report"));
        assert!(prompt.contains("the year, usually 2023"));
        assert!(prompt.contains("Text:\nWe migrated our ERP to SAP S/4HANA.\n"));
    }

    #[test]
    fn test_prompt_demands_json_array_only() {
        let prompt = render(&metadata(), "text");
        assert!(prompt.contains("return an empty JSON array: []"));
        assert!(prompt.trim_end().ends_with("no additional text or explanation:"));
        for field in [
            "CompanyName",
            "Category",
            "Initiative",
            "TechnologyUsed",
            "Department",
            "YearMentioned",
            "ExpectedImpact",
            "DigitalInvestment",
        ] {
            assert!(prompt.contains(&format!("- {}:", field)), "missing {}", field);
        }
    }
}
