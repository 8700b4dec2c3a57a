//! Read-only query commands over the initiative store.

use anyhow::Result;

use crate::config::Config;
use crate::models::{Category, CompanySummary, Initiative};
use crate::store::Store;

/// Which slice of the store `ide query` prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    Company(String),
    /// Free-form labels are normalized the same way extracted ones are.
    Category(String),
    Year(String),
}

pub async fn run_query(config: &Config, kind: &QueryKind) -> Result<()> {
    let store = Store::open(config).await?;

    let output = match kind {
        QueryKind::Company(name) => {
            let rows = store.initiatives_by_company(name).await?;
            render_by_company(name, &rows)
        }
        QueryKind::Category(label) => {
            let category = Category::normalize(label.trim());
            let rows = store.initiatives_by_category(category.as_str()).await?;
            render_by_category(category.as_str(), &rows)
        }
        QueryKind::Year(year) => {
            let rows = store.initiatives_by_year(year).await?;
            render_by_year(year, &rows)
        }
    };
    print!("{}", output);

    store.close().await;
    Ok(())
}

pub async fn run_companies(config: &Config) -> Result<()> {
    let store = Store::open(config).await?;
    let companies = store.list_companies().await?;
    print!("{}", render_companies(&companies));
    store.close().await;
    Ok(())
}

fn header(title: &str, count: usize) -> String {
    format!(
        "{rule}\n{title}\n{rule}\nTotal initiatives: {count}\n\n",
        rule = "=".repeat(80),
        title = title,
        count = count
    )
}

fn render_by_company(company: &str, rows: &[Initiative]) -> String {
    let mut out = header(&format!("INITIATIVES FOR: {}", company), rows.len());
    for row in rows {
        out.push_str(&format!("Category:   {}\n", row.category));
        out.push_str(&format!("Year:       {}\n", display(&row.year_mentioned)));
        out.push_str(&format!("Initiative: {}\n", row.initiative));
        out.push_str(&format!("Technology: {}\n", display(&row.technology_used)));
        if let Some(department) = &row.department {
            out.push_str(&format!("Department: {}\n", department));
        }
        if let Some(impact) = &row.expected_impact {
            out.push_str(&format!("Impact:     {}\n", impact));
        }
        if let Some(investment) = &row.digital_investment {
            out.push_str(&format!("Investment: {}\n", investment));
        }
        out.push_str(&format!("{}\n", "-".repeat(80)));
    }
    out
}

fn render_by_category(category: &str, rows: &[Initiative]) -> String {
    let mut out = header(&format!("INITIATIVES IN CATEGORY: {}", category), rows.len());
    for (company, group) in group_by(rows, |r| r.company_name.as_str()) {
        out.push_str(&format!("{} ({} initiatives)\n", company, group.len()));
        out.push_str(&format!("{}\n", "-".repeat(80)));
        for row in group {
            out.push_str(&format!("  • {}\n", row.initiative));
            out.push_str(&format!("    Technology: {}\n", display(&row.technology_used)));
            out.push_str(&format!("    Year: {}\n", display(&row.year_mentioned)));
        }
        out.push('\n');
    }
    out
}

fn render_by_year(year: &str, rows: &[Initiative]) -> String {
    let mut out = header(&format!("INITIATIVES IN YEAR: {}", year), rows.len());
    for (category, group) in group_by(rows, |r| r.category.as_str()) {
        out.push_str(&format!("{} ({} initiatives)\n", category, group.len()));
        out.push_str(&format!("{}\n", "-".repeat(80)));
        for row in group {
            out.push_str(&format!("  • [{}] {}\n", row.company_name, row.initiative));
        }
        out.push('\n');
    }
    out
}

fn render_companies(companies: &[CompanySummary]) -> String {
    let mut out = format!("  {:<40} {:>8} {:>12}\n", "COMPANY", "REPORTS", "INITIATIVES");
    out.push_str(&format!("  {}\n", "-".repeat(62)));
    for c in companies {
        out.push_str(&format!(
            "  {:<40} {:>8} {:>12}\n",
            c.company_name, c.reports, c.initiatives
        ));
    }
    out
}

/// Group rows by key, keeping first-seen key order and row order.
fn group_by<'a, F>(rows: &'a [Initiative], key: F) -> Vec<(&'a str, Vec<&'a Initiative>)>
where
    F: Fn(&'a Initiative) -> &'a str,
{
    let mut groups: Vec<(&'a str, Vec<&'a Initiative>)> = Vec::new();
    for row in rows {
        let k = key(row);
        match groups.iter_mut().find(|(g, _)| *g == k) {
            Some((_, members)) => members.push(row),
            None => groups.push((k, vec![row])),
        }
    }
    groups
}

fn display(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}
