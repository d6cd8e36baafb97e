//! Run accounting.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// How far a fetched record got through enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// No asset: missing/unaccepted URL, download or upload failure
    AssetSkipped,
    /// Asset stored, embedding could not be generated
    EmbedFailed,
    /// Embedding generated, index upsert failed
    IndexFailed,
    /// Asset stored and embedding indexed
    Indexed,
}

/// Counters for one enrichment run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// Identifiers returned by the listing
    pub listed: usize,
    /// Repeated identifiers dropped from the listing
    pub duplicates: usize,
    /// Identifiers actually scheduled for fetch
    pub scheduled: usize,
    pub fetched: usize,
    pub fetch_failed: usize,
    pub assets_persisted: usize,
    pub assets_skipped: usize,
    pub embedded: usize,
    pub embed_failed: usize,
    pub indexed: usize,
    pub index_failed: usize,
    pub manifest_entries: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStats {
    pub fn start() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Tally one enriched record.
    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::AssetSkipped => self.assets_skipped += 1,
            RecordOutcome::EmbedFailed => {
                self.assets_persisted += 1;
                self.embed_failed += 1;
            }
            RecordOutcome::IndexFailed => {
                self.assets_persisted += 1;
                self.embedded += 1;
                self.index_failed += 1;
            }
            RecordOutcome::Indexed => {
                self.assets_persisted += 1;
                self.embedded += 1;
                self.indexed += 1;
            }
        }
    }

    /// Wall-clock run time, once finished
    pub fn elapsed_ms(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Listed:            {}", self.listed)?;
        if self.duplicates > 0 {
            writeln!(f, "Duplicates:        {}", self.duplicates)?;
        }
        writeln!(f, "Fetched:           {} ({} failed)", self.fetched, self.fetch_failed)?;
        writeln!(
            f,
            "Assets persisted:  {} ({} skipped)",
            self.assets_persisted, self.assets_skipped
        )?;
        writeln!(f, "Embedded:          {} ({} failed)", self.embedded, self.embed_failed)?;
        writeln!(f, "Indexed:           {} ({} failed)", self.indexed, self.index_failed)?;
        write!(f, "Manifest entries:  {}", self.manifest_entries)?;
        if let Some(ms) = self.elapsed_ms() {
            write!(f, "\nElapsed:           {:.1}s", ms as f64 / 1000.0)?;
        }
        Ok(())
    }
}
