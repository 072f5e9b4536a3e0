//! # Prompt Feedback Synthesizer
//!
//! Folds operator ("admin") feedback on a support assistant's answers back
//! into the assistant's system prompt.
//!
//! The system prompt is a semi-structured document with two numbered
//! sections: supervisor feedback (`F1.`, `F2.`, ...) and FAQ pairs
//! (`Q1.` followed by a `답변:` line). Each run:
//!
//! - **Parses** the prompt into prefix, feedback body, FAQ body and suffix
//! - **Extracts** numbered entries with a line scanner
//! - **Keeps** the first `K` entries of each section as the curated baseline
//! - **Synthesizes** new entries from negative feedback, oldest first,
//!   skipping anything whose normalized text is already present
//! - **Reconstructs** the prompt, leaving prefix and suffix byte-identical
//!
//! Running twice with the same feedback produces the same document.
//!
//! ## Example
//!
//! ```rust,ignore
//! use prompt_feedback_synthesizer::*;
//! use chrono::Utc;
//!
//! let format = DocumentFormat::default();
//! let records = vec![
//!     FeedbackRecord::new("req-1", Verdict::Bad, Utc::now())
//!         .with_feedback_text("Tone too formal"),
//! ];
//!
//! let updated = synthesize(&current_prompt, &records, &format)?;
//! ```

pub mod baseline;
pub mod error;
pub mod extractor;
pub mod ingestion;
pub mod parser;
pub mod reconstructor;
pub mod schema;
pub mod store;
pub mod synthesizer;
pub mod updater;
pub mod utils;

#[cfg(feature = "http")]
pub mod config;

pub use baseline::{BaselineSet, SignatureSet};
pub use error::{PromptSyncError, Result};
pub use extractor::{extract_entries, EntryExtractor};
pub use ingestion::*;
pub use parser::{parse_document, Regions};
pub use reconstructor::{reconstruct, render_section};
pub use schema::*;
pub use store::*;
pub use synthesizer::{EntrySynthesizer, SectionReport, SynthesizedSet};
pub use updater::{DocumentLocks, PromptUpdater, RetryPolicy, UpdateOutcome};

#[cfg(feature = "http")]
pub use config::RemoteConfig;

use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Per-section counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub feedback: SectionReport,
    pub faq: SectionReport,
    pub eligible_records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub text: String,
    pub report: SynthesisReport,
}

pub struct PromptSynthesizer<'f> {
    format: &'f DocumentFormat,
}

impl<'f> PromptSynthesizer<'f> {
    pub fn new(format: &'f DocumentFormat) -> Self {
        Self { format }
    }

    pub fn synthesize(&self, document: &str, records: &[FeedbackRecord]) -> Result<String> {
        Ok(self.synthesize_with_report(document, records)?.text)
    }

    /// Runs the whole pipeline. Fails with [`PromptSyncError::Structure`]
    /// before producing any output if a section anchor is missing.
    pub fn synthesize_with_report(
        &self,
        document: &str,
        records: &[FeedbackRecord],
    ) -> Result<Synthesis> {
        self.format.validate()?;

        let regions = parse_document(document, self.format)?;

        let eligible_records = records.iter().filter(|r| r.is_eligible()).count();
        debug!(
            "Synthesizing from {} records ({} eligible)",
            records.len(),
            eligible_records
        );

        let (feedback_baseline, feedback_new) = self.section(&regions, EntryKind::Feedback, records);
        let (faq_baseline, faq_new) = self.section(&regions, EntryKind::Faq, records);

        let feedback_entries: Vec<&Entry> = feedback_baseline
            .entries()
            .iter()
            .chain(feedback_new.entries())
            .collect();
        let faq_entries: Vec<&Entry> = faq_baseline
            .entries()
            .iter()
            .chain(faq_new.entries())
            .collect();

        let text = reconstruct(&regions, self.format, &feedback_entries, &faq_entries);

        let report = SynthesisReport {
            feedback: section_report(&feedback_baseline, &feedback_new),
            faq: section_report(&faq_baseline, &faq_new),
            eligible_records,
        };

        info!(
            "Prompt synthesized: {} feedback entries ({} new), {} FAQ entries ({} new), {} -> {} bytes",
            report.feedback.total(),
            report.feedback.synthesized,
            report.faq.total(),
            report.faq.synthesized,
            document.len(),
            text.len()
        );

        Ok(Synthesis { text, report })
    }

    fn section(
        &self,
        regions: &Regions<'_>,
        kind: EntryKind,
        records: &[FeedbackRecord],
    ) -> (BaselineSet, SynthesizedSet) {
        let entries = extract_entries(kind, regions.body(kind), self.format);
        let baseline = BaselineSet::split(entries, self.format.section(kind).baseline_cutoff);
        let synthesized = EntrySynthesizer::new(kind, self.format).synthesize(&baseline, records);
        (baseline, synthesized)
    }
}

fn section_report(baseline: &BaselineSet, synthesized: &SynthesizedSet) -> SectionReport {
    SectionReport {
        baseline: baseline.len(),
        discarded: baseline.discarded(),
        synthesized: synthesized.len(),
        skipped_duplicates: synthesized.skipped_duplicates(),
    }
}

/// Produces the updated prompt text. Pure: no I/O, no shared state.
pub fn synthesize(
    document: &str,
    records: &[FeedbackRecord],
    format: &DocumentFormat,
) -> Result<String> {
    PromptSynthesizer::new(format).synthesize(document, records)
}

pub fn synthesize_with_report(
    document: &str,
    records: &[FeedbackRecord],
    format: &DocumentFormat,
) -> Result<Synthesis> {
    PromptSynthesizer::new(format).synthesize_with_report(document, records)
}
