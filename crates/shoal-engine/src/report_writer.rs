//! Step callback that appends each step report to a JSON-lines file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use shoal_core::runner::StepCallback;
use shoal_core::step::{SimulationState, StepSummary};
use tracing::{debug, warn};

use crate::error::EngineError;

/// Name of the report file inside the output directory.
pub const REPORT_FILE: &str = "reports.jsonl";

/// Writes one JSON line per step report.
///
/// The first write failure is kept and later steps are skipped; the
/// engine surfaces it through [`finish`](Self::finish).
pub struct JsonlReportWriter<W: Write> {
    out: W,
    lines: u64,
    failure: Option<EngineError>,
}

impl JsonlReportWriter<BufWriter<File>> {
    /// Create `<directory>/reports.jsonl`, creating the directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the directory or file cannot be
    /// created.
    pub fn create(directory: &Path) -> Result<(Self, PathBuf), EngineError> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(REPORT_FILE);
        let file = File::create(&path)?;
        Ok((Self::new(BufWriter::new(file)), path))
    }
}

impl<W: Write> JsonlReportWriter<W> {
    /// Wrap an arbitrary writer.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            lines: 0,
            failure: None,
        }
    }

    fn write_summary(&mut self, summary: &StepSummary) -> Result<(), EngineError> {
        let Some(report) = &summary.report else {
            return Ok(());
        };
        let line = report.to_json_line()?;
        writeln!(self.out, "{line}")?;
        self.lines = self.lines.saturating_add(1);
        Ok(())
    }

    /// Flush and return the writer and the number of lines written.
    ///
    /// # Errors
    ///
    /// Returns the first write failure seen during the run, or the flush
    /// failure.
    pub fn finish(mut self) -> Result<(W, u64), EngineError> {
        if let Some(failure) = self.failure.take() {
            return Err(failure);
        }
        self.out.flush()?;
        Ok((self.out, self.lines))
    }
}

impl<W: Write> StepCallback for JsonlReportWriter<W> {
    fn on_step(&mut self, summary: &StepSummary, _state: &SimulationState) {
        if self.failure.is_some() {
            return;
        }
        match self.write_summary(summary) {
            Ok(()) => debug!(step = summary.step, lines = self.lines, "Report written"),
            Err(err) => {
                warn!(step = summary.step, error = %err, "Report writing failed, skipping remaining reports");
                self.failure = Some(err);
            }
        }
    }
}
