//! Run progress reporting.
//!
//! Reports observable progress during `ide process` so users see which
//! report is being read, how many are left, and what each one yielded.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a processing run.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Walking the data directory. Total unknown.
    Discovering { data_dir: String },
    /// Starting document `n` of `total`.
    Document { n: u64, total: u64, filename: String },
    /// A document finished, with what it produced.
    DocumentDone {
        filename: String,
        chunks: u64,
        initiatives: u64,
    },
    /// A document was skipped without extraction.
    DocumentSkipped { filename: String, reason: String },
}

/// Reports run progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "process  [3 / 12]  Acme Annual Report 2023.pdf".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Discovering { data_dir } => {
                format!("process  scanning {}...\n", data_dir)
            }
            ProgressEvent::Document { n, total, filename } => {
                format!(
                    "process  [{} / {}]  {}\n",
                    format_number(*n),
                    format_number(*total),
                    filename
                )
            }
            ProgressEvent::DocumentDone {
                filename,
                chunks,
                initiatives,
            } => format!(
                "process  done  {}  ({} chunks, {} initiatives)\n",
                filename,
                format_number(*chunks),
                format_number(*initiatives)
            ),
            ProgressEvent::DocumentSkipped { filename, reason } => {
                format!("process  skipped  {}  ({})\n", filename, reason)
            }
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn to_json(event: &ProgressEvent) -> serde_json::Value {
        match event {
            ProgressEvent::Discovering { data_dir } => serde_json::json!({
                "event": "progress",
                "phase": "discovering",
                "data_dir": data_dir
            }),
            ProgressEvent::Document { n, total, filename } => serde_json::json!({
                "event": "progress",
                "phase": "document",
                "n": n,
                "total": total,
                "filename": filename
            }),
            ProgressEvent::DocumentDone {
                filename,
                chunks,
                initiatives,
            } => serde_json::json!({
                "event": "progress",
                "phase": "done",
                "filename": filename,
                "chunks": chunks,
                "initiatives": initiatives
            }),
            ProgressEvent::DocumentSkipped { filename, reason } => serde_json::json!({
                "event": "progress",
                "phase": "skipped",
                "filename": filename,
                "reason": reason
            }),
        }
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(line) = serde_json::to_string(&Self::to_json(&event)) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn json_event_shape() {
        let v = JsonProgress::to_json(&ProgressEvent::DocumentDone {
            filename: "a.pdf".into(),
            chunks: 3,
            initiatives: 7,
        });
        assert_eq!(v["phase"], "done");
        assert_eq!(v["chunks"], 3);
        assert_eq!(v["initiatives"], 7);
    }
}
