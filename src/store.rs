//! The initiative store: companies, their reports, and extracted initiatives.
//!
//! ```text
//! companies 1 ──▶ * reports 1 ──▶ * digital_initiatives
//! ```
//!
//! A [`Store`] owns a single-connection pool. Opening it runs the schema
//! migrations, so every handle sees a complete schema. Each insert commits
//! on its own; nothing spans documents.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::{
    CompanySummary, Initiative, InitiativeRecord, NamedCount, ReportType, Statistics,
};

/// Size of the `top_companies` list in [`Statistics`].
const TOP_COMPANIES: i64 = 10;

const INITIATIVE_COLUMNS: &str = "id, report_id, company_name, category, initiative, \
     technology_used, department, year_mentioned, expected_impact, digital_investment, \
     CAST(extracted_at AS TEXT) AS extracted_at";

pub struct Store {
    pool: SqlitePool,
    path: PathBuf,
}

impl Store {
    pub async fn open(config: &Config) -> Result<Self> {
        Self::open_path(&config.db.path).await
    }

    pub async fn open_path(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Id of the company with this name, inserting it on first sight.
    pub async fn get_or_create_company(&self, company_name: &str) -> Result<i64> {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM companies WHERE company_name = ?")
                .bind(company_name)
                .fetch_optional(&self.pool)
                .await?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let result = sqlx::query("INSERT INTO companies (company_name) VALUES (?)")
            .bind(company_name)
            .execute(&self.pool)
            .await?;
        debug!(company = company_name, id = result.last_insert_rowid(), "created company");
        Ok(result.last_insert_rowid())
    }

    /// Id of the report for `(company, type, year)`, inserting it if absent.
    ///
    /// The first filename recorded for a report is kept; later calls with a
    /// different filename resolve to the same row without changing it.
    pub async fn get_or_create_report(
        &self,
        company_id: i64,
        report_type: ReportType,
        report_year: i64,
        filename: &str,
        file_path: Option<&str>,
    ) -> Result<i64> {
        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM reports WHERE company_id = ? AND report_type = ? AND report_year = ?",
        )
        .bind(company_id)
        .bind(report_type.as_str())
        .bind(report_year)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO reports (company_id, report_type, report_year, filename, file_path, processed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(company_id)
        .bind(report_type.as_str())
        .bind(report_year)
        .bind(filename)
        .bind(file_path)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Insert the records under `report_id` and return how many were stored.
    ///
    /// Invalid records and failing rows are logged and skipped.
    pub async fn insert_initiatives(
        &self,
        report_id: i64,
        records: &[InitiativeRecord],
    ) -> Result<usize> {
        let extracted_at = now_timestamp();
        let mut inserted = 0;

        for record in records {
            if let Err(e) = record.validate() {
                warn!(error = %e, company = %record.company_name, "skipping invalid initiative");
                continue;
            }

            let result = sqlx::query(
                r#"
                INSERT INTO digital_initiatives (
                    report_id, company_name, category, initiative, technology_used,
                    department, year_mentioned, expected_impact, digital_investment, extracted_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(report_id)
            .bind(&record.company_name)
            .bind(record.category.as_str())
            .bind(&record.initiative)
            .bind(non_empty(&record.technology_used))
            .bind(record.department.as_deref())
            .bind(non_empty(&record.year_mentioned))
            .bind(record.expected_impact.as_deref())
            .bind(record.digital_investment.as_deref())
            .bind(&extracted_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => inserted += 1,
                Err(e) => warn!(error = %e, initiative = %record.initiative, "failed to insert initiative"),
            }
        }

        Ok(inserted)
    }

    pub async fn initiatives_by_company(&self, company_name: &str) -> Result<Vec<Initiative>> {
        self.fetch_initiatives(
            "WHERE company_name = ? ORDER BY year_mentioned DESC, category ASC, id ASC",
            Some(company_name),
        )
        .await
    }

    pub async fn initiatives_by_category(&self, category: &str) -> Result<Vec<Initiative>> {
        self.fetch_initiatives(
            "WHERE category = ? ORDER BY year_mentioned DESC, company_name ASC, id ASC",
            Some(category),
        )
        .await
    }

    pub async fn initiatives_by_year(&self, year: &str) -> Result<Vec<Initiative>> {
        self.fetch_initiatives(
            "WHERE year_mentioned = ? ORDER BY company_name ASC, category ASC, id ASC",
            Some(year),
        )
        .await
    }

    pub async fn all_initiatives(&self) -> Result<Vec<Initiative>> {
        self.fetch_initiatives(
            "ORDER BY company_name ASC, year_mentioned DESC, category ASC, id ASC",
            None,
        )
        .await
    }

    async fn fetch_initiatives(&self, clause: &str, param: Option<&str>) -> Result<Vec<Initiative>> {
        let sql = format!(
            "SELECT {} FROM digital_initiatives {}",
            INITIATIVE_COLUMNS, clause
        );
        let mut query = sqlx::query(&sql);
        if let Some(value) = param {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_initiative).collect())
    }

    /// Every company with its report and initiative counts, busiest first.
    pub async fn list_companies(&self) -> Result<Vec<CompanySummary>> {
        let rows = sqlx::query(
            r#"
            SELECT
                c.company_name,
                COUNT(DISTINCT r.id) AS reports,
                COUNT(di.id) AS initiatives
            FROM companies c
            LEFT JOIN reports r ON r.company_id = c.id
            LEFT JOIN digital_initiatives di ON di.report_id = r.id
            GROUP BY c.id
            ORDER BY initiatives DESC, c.company_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CompanySummary {
                company_name: row.get("company_name"),
                reports: row.get("reports"),
                initiatives: row.get("initiatives"),
            })
            .collect())
    }

    /// Totals and breakdowns, computed fresh on every call.
    pub async fn get_statistics(&self) -> Result<Statistics> {
        let total_companies: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies")
            .fetch_one(&self.pool)
            .await?;
        let total_reports: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
            .fetch_one(&self.pool)
            .await?;
        let total_initiatives: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM digital_initiatives")
                .fetch_one(&self.pool)
                .await?;

        let by_category = self
            .named_counts(
                r#"
                SELECT category AS name, COUNT(*) AS count
                FROM digital_initiatives
                GROUP BY category
                ORDER BY count DESC, name ASC
                "#,
            )
            .await?;

        let by_year = self
            .named_counts(
                r#"
                SELECT year_mentioned AS name, COUNT(*) AS count
                FROM digital_initiatives
                WHERE year_mentioned IS NOT NULL AND year_mentioned != ''
                GROUP BY year_mentioned
                ORDER BY name DESC
                "#,
            )
            .await?;

        let top_companies = self
            .named_counts(&format!(
                r#"
                SELECT company_name AS name, COUNT(*) AS count
                FROM digital_initiatives
                GROUP BY company_name
                ORDER BY count DESC, name ASC
                LIMIT {}
                "#,
                TOP_COMPANIES
            ))
            .await?;

        Ok(Statistics {
            total_companies,
            total_reports,
            total_initiatives,
            by_category,
            by_year,
            top_companies,
        })
    }

    async fn named_counts(&self, sql: &str) -> Result<Vec<NamedCount>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| NamedCount {
                name: row.get("name"),
                count: row.get("count"),
            })
            .collect())
    }
}

fn row_to_initiative(row: &SqliteRow) -> Initiative {
    Initiative {
        id: row.get("id"),
        report_id: row.get("report_id"),
        company_name: row.get("company_name"),
        category: row.get("category"),
        initiative: row.get("initiative"),
        technology_used: row.get("technology_used"),
        department: row.get("department"),
        year_mentioned: row.get("year_mentioned"),
        expected_impact: row.get("expected_impact"),
        digital_investment: row.get("digital_investment"),
        extracted_at: row
            .get::<Option<String>, _>("extracted_at")
            .unwrap_or_default(),
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
