//! Schema creation for the initiative store.
//!
//! Every statement is `IF NOT EXISTS`, so this runs on each open.

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Create companies table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS companies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_name TEXT UNIQUE NOT NULL,
            industry TEXT,
            stock_code TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create reports table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL,
            report_type TEXT NOT NULL,
            report_year INTEGER NOT NULL,
            filename TEXT NOT NULL,
            file_path TEXT,
            processed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (company_id) REFERENCES companies(id),
            UNIQUE(company_id, report_type, report_year)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create digital_initiatives table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS digital_initiatives (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            report_id INTEGER NOT NULL,
            company_name TEXT NOT NULL,
            category TEXT NOT NULL,
            initiative TEXT NOT NULL,
            technology_used TEXT,
            department TEXT,
            year_mentioned TEXT,
            expected_impact TEXT,
            digital_investment TEXT,
            extracted_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (report_id) REFERENCES reports(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_initiatives_company ON digital_initiatives(company_name)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_initiatives_category ON digital_initiatives(category)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_initiatives_year ON digital_initiatives(year_mentioned)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reports_company_year ON reports(company_id, report_year)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
