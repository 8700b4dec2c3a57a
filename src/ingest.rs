//! Processing pipeline orchestration.
//!
//! Coordinates the full run: scan → filename metadata → page text →
//! chunking → extraction → storage → JSON output. JSON output is the
//! per-document files, the consolidated file and a database export. Documents are handled
//! strictly one after another; a failure inside one document is logged and
//! the run moves on.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::export::collect_export;
use crate::extract::extract_pages;
use crate::filename;
use crate::initiatives::Extractor;
use crate::models::{DocumentMetadata, InitiativeRecord, ReportType};
use crate::progress::{NoProgress, ProgressEvent, ProgressReporter};
use crate::scan::{scan_reports, ReportFile};
use crate::store::Store;

/// Per-run knobs, usually taken from the CLI on top of [`Config`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Chunk cap per document. `None` sends every chunk.
    pub max_chunks: Option<usize>,
    pub write_json: bool,
    /// Scan and chunk only: no engine calls, no writes.
    pub dry_run: bool,
    /// Maximum number of documents to handle.
    pub limit: Option<usize>,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_chunks: config.extraction.max_chunks(),
            write_json: config.output.write_json,
            dry_run: false,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub documents_found: usize,
    pub documents_processed: usize,
    pub documents_skipped: usize,
    pub chunks_processed: usize,
    pub initiatives_extracted: usize,
    pub initiatives_inserted: usize,
}

/// What happened to one document.
#[derive(Debug)]
pub enum DocumentOutcome {
    Processed {
        metadata: DocumentMetadata,
        chunks: usize,
        records: Vec<InitiativeRecord>,
        inserted: usize,
    },
    Skipped {
        reason: String,
    },
}

/// A record as written to the consolidated output, tagged with its source.
#[derive(Serialize)]
struct SourcedInitiative<'a> {
    #[serde(flatten)]
    record: &'a InitiativeRecord,
    source_file: &'a str,
    report_type: ReportType,
}

#[derive(Serialize)]
struct ConsolidatedMetadata<'a> {
    total_initiatives: usize,
    total_documents: usize,
    extraction_date: String,
    model: &'a str,
}

#[derive(Serialize)]
struct ConsolidatedOutput<'a> {
    metadata: ConsolidatedMetadata<'a>,
    initiatives: Vec<SourcedInitiative<'a>>,
}

pub struct Pipeline<'a> {
    config: &'a Config,
    store: &'a Store,
    extractor: &'a Extractor,
    progress: Box<dyn ProgressReporter>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, store: &'a Store, extractor: &'a Extractor) -> Self {
        Self {
            config,
            store,
            extractor,
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Process every report in the data directory.
    ///
    /// With `options.dry_run` set this is [`dry_run`]: the engine is never
    /// called and nothing is written.
    pub async fn run(&self, options: &RunOptions) -> Result<RunSummary> {
        if options.dry_run {
            return dry_run(self.config, options).await;
        }

        self.progress.report(ProgressEvent::Discovering {
            data_dir: self.config.input.data_dir.display().to_string(),
        });
        let mut files = scan_reports(&self.config.input)?;
        let mut summary = RunSummary {
            documents_found: files.len(),
            ..RunSummary::default()
        };
        if let Some(limit) = options.limit {
            files.truncate(limit);
        }
        info!(found = summary.documents_found, selected = files.len(), "scanned data directory");

        // (source filename, report type, records) per processed document
        let mut collected: Vec<(String, ReportType, Vec<InitiativeRecord>)> = Vec::new();
        let total = files.len() as u64;

        for (i, file) in files.iter().enumerate() {
            self.progress.report(ProgressEvent::Document {
                n: i as u64 + 1,
                total,
                filename: file.filename.clone(),
            });

            match self.process_document(file, options).await? {
                DocumentOutcome::Processed {
                    metadata,
                    chunks,
                    records,
                    inserted,
                } => {
                    summary.documents_processed += 1;
                    summary.chunks_processed += chunks;
                    summary.initiatives_extracted += records.len();
                    summary.initiatives_inserted += inserted;
                    self.progress.report(ProgressEvent::DocumentDone {
                        filename: file.filename.clone(),
                        chunks: chunks as u64,
                        initiatives: records.len() as u64,
                    });
                    collected.push((metadata.filename, metadata.report_type, records));
                }
                DocumentOutcome::Skipped { reason } => {
                    summary.documents_skipped += 1;
                    self.progress.report(ProgressEvent::DocumentSkipped {
                        filename: file.filename.clone(),
                        reason,
                    });
                }
            }
        }

        if options.write_json && summary.initiatives_extracted > 0 {
            match write_consolidated(
                &self.config.output.dir,
                &collected,
                summary.documents_processed,
                self.extractor.model_name(),
            ) {
                Ok(path) => info!(path = %path.display(), "saved consolidated results"),
                Err(e) => warn!("could not write consolidated results: {:#}", e),
            }
        }

        if options.write_json {
            match write_database_export(&self.config.output.dir, self.store).await {
                Ok(path) => info!(path = %path.display(), "saved database export"),
                Err(e) => warn!("could not write database export: {:#}", e),
            }
        }

        Ok(summary)
    }

    /// Run one document through the pipeline.
    ///
    /// Returns `Err` only for failures that should stop the run, such as a
    /// store error. Unreadable documents come back as
    /// [`DocumentOutcome::Skipped`].
    pub async fn process_document(
        &self,
        file: &ReportFile,
        options: &RunOptions,
    ) -> Result<DocumentOutcome> {
        let metadata = filename::parse(&file.filename);
        info!(
            company = %metadata.company_name,
            report_type = %metadata.report_type,
            year = %metadata.year,
            "processing {}",
            file.filename
        );

        let text = match read_full_text(file).await {
            Ok(text) => text,
            Err(reason) => {
                warn!(file = %file.filename, "{}", reason);
                return Ok(DocumentOutcome::Skipped { reason });
            }
        };

        let chunking = &self.config.chunking;
        let chunks = chunk_text(&text, chunking.chunk_size, chunking.overlap)?;
        let chunk_count = options
            .max_chunks
            .map_or(chunks.len(), |cap| cap.min(chunks.len()));

        let records = self
            .extractor
            .extract_document(&chunks, &metadata, options.max_chunks)
            .await;

        let mut inserted = 0;
        if !records.is_empty() {
            inserted = self.persist(file, &metadata, &records).await?;
            if options.write_json {
                // Rows are already committed; a failed output file only loses the copy.
                match write_document_json(&self.config.output.dir, &metadata, &records) {
                    Ok(path) => info!(path = %path.display(), "saved document results"),
                    Err(e) => {
                        warn!(file = %file.filename, "could not write document results: {:#}", e)
                    }
                }
            }
        }

        Ok(DocumentOutcome::Processed {
            metadata,
            chunks: chunk_count,
            records,
            inserted,
        })
    }

    async fn persist(
        &self,
        file: &ReportFile,
        metadata: &DocumentMetadata,
        records: &[InitiativeRecord],
    ) -> Result<usize> {
        let company_id = self
            .store
            .get_or_create_company(&metadata.company_name)
            .await?;
        let file_path = file.path.display().to_string();
        let report_id = self
            .store
            .get_or_create_report(
                company_id,
                metadata.report_type,
                metadata.report_year(),
                &metadata.filename,
                Some(&file_path),
            )
            .await?;
        let inserted = self.store.insert_initiatives(report_id, records).await?;
        info!(inserted, report_id, "stored initiatives");
        Ok(inserted)
    }
}

/// Scan and chunk without calling the engine or touching the store.
pub async fn dry_run(config: &Config, options: &RunOptions) -> Result<RunSummary> {
    let mut files = scan_reports(&config.input)?;
    let mut summary = RunSummary {
        documents_found: files.len(),
        ..RunSummary::default()
    };
    if let Some(limit) = options.limit {
        files.truncate(limit);
    }

    for file in &files {
        let text = match read_full_text(file).await {
            Ok(text) => text,
            Err(reason) => {
                warn!(file = %file.filename, "{}", reason);
                summary.documents_skipped += 1;
                continue;
            }
        };
        let chunks = chunk_text(&text, config.chunking.chunk_size, config.chunking.overlap)?;
        summary.documents_processed += 1;
        summary.chunks_processed += options
            .max_chunks
            .map_or(chunks.len(), |cap| cap.min(chunks.len()));
    }

    Ok(summary)
}

/// Full page-marked text of a report, or the reason it has none.
async fn read_full_text(file: &ReportFile) -> std::result::Result<String, String> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|e| format!("could not read file: {}", e))?;
    let pages = extract_pages(&bytes, file.content_type)
        .map_err(|e| format!("text extraction failed: {}", e))?;
    let text = pages.full_text();
    if text.is_empty() {
        return Err("no extractable text".to_string());
    }
    Ok(text)
}

/// `{company}_{year}_{Report_Type}.json`
pub fn document_output_name(metadata: &DocumentMetadata) -> String {
    format!(
        "{}_{}_{}.json",
        metadata.company_name,
        metadata.year,
        metadata.report_type.as_str().replace(' ', "_")
    )
}

fn write_document_json(
    dir: &Path,
    metadata: &DocumentMetadata,
    records: &[InitiativeRecord],
) -> Result<PathBuf> {
    let path = dir.join(document_output_name(metadata));
    write_json(&path, &records)?;
    Ok(path)
}

fn write_consolidated(
    dir: &Path,
    collected: &[(String, ReportType, Vec<InitiativeRecord>)],
    total_documents: usize,
    model: &str,
) -> Result<PathBuf> {
    let now = chrono::Local::now();
    let initiatives: Vec<SourcedInitiative<'_>> = collected
        .iter()
        .flat_map(|(source_file, report_type, records)| {
            records.iter().map(move |record| SourcedInitiative {
                record,
                source_file,
                report_type: *report_type,
            })
        })
        .collect();

    let output = ConsolidatedOutput {
        metadata: ConsolidatedMetadata {
            total_initiatives: initiatives.len(),
            total_documents,
            extraction_date: now.to_rfc3339(),
            model,
        },
        initiatives,
    };

    let path = dir.join(format!("all_initiatives_{}.json", now.format("%Y%m%d_%H%M%S")));
    write_json(&path, &output)?;
    Ok(path)
}

/// Snapshot of the whole store next to the run's other outputs.
async fn write_database_export(dir: &Path, store: &Store) -> Result<PathBuf> {
    let data = collect_export(store).await?;
    let path = dir.join(format!(
        "database_export_{}.json",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ));
    write_json(&path, &data)?;
    Ok(path)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
