use crate::baseline::{BaselineSet, SignatureSet};
use crate::schema::{DocumentFormat, Entry, EntryKind, FeedbackRecord};
use crate::utils::{faq_signature, feedback_signature, preview};
use log::debug;
use serde::{Deserialize, Serialize};

/// Counts for one section of a synthesis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionReport {
    pub baseline: usize,
    /// Entries past the cutoff that were dropped before rebuilding
    pub discarded: usize,
    pub synthesized: usize,
    /// Candidates whose signature was already present
    pub skipped_duplicates: usize,
}

impl SectionReport {
    pub fn total(&self) -> usize {
        self.baseline + self.synthesized
    }
}

/// Entries generated from feedback records in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesizedSet {
    entries: Vec<Entry>,
    skipped_duplicates: usize,
}

impl SynthesizedSet {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn skipped_duplicates(&self) -> usize {
        self.skipped_duplicates
    }
}

// A record reduced to what one section needs.
struct Candidate<'r> {
    record: &'r FeedbackRecord,
    signature: String,
    text: String,
}

pub struct EntrySynthesizer<'f> {
    kind: EntryKind,
    answer_marker: &'f str,
}

impl<'f> EntrySynthesizer<'f> {
    pub fn new(kind: EntryKind, format: &'f DocumentFormat) -> Self {
        Self {
            kind,
            answer_marker: &format.answer_marker,
        }
    }

    /// Builds entries for every new candidate, oldest first, numbered from
    /// `baseline.next_index()`.
    pub fn synthesize(&self, baseline: &BaselineSet, records: &[FeedbackRecord]) -> SynthesizedSet {
        let mut seen: SignatureSet = baseline.seen_signatures();
        let mut next_index = baseline.next_index();
        let mut output = SynthesizedSet::default();

        for candidate in self.candidates(records) {
            if !seen.insert(&candidate.signature) {
                debug!(
                    "Skipping duplicate {} candidate from {}: {}",
                    self.kind.section_name(),
                    candidate.record.request_id,
                    preview(&candidate.text, 50)
                );
                output.skipped_duplicates += 1;
                continue;
            }

            let body = format!("{}{}. {}", self.kind.label(), next_index, candidate.text);
            debug!(
                "Added {}{} from {}",
                self.kind.label(),
                next_index,
                candidate.record.request_id
            );
            output
                .entries
                .push(Entry::new(next_index, self.kind, body, candidate.signature));
            next_index += 1;
        }

        output
    }

    fn candidates<'r>(&self, records: &'r [FeedbackRecord]) -> Vec<Candidate<'r>> {
        let mut candidates: Vec<Candidate<'r>> = records
            .iter()
            .filter(|r| r.is_eligible())
            .filter_map(|r| self.candidate(r))
            .collect();

        // Stable sort, so equal keys keep their input order.
        candidates.sort_by(|a, b| {
            a.record
                .created_at
                .cmp(&b.record.created_at)
                .then_with(|| a.record.request_id.cmp(&b.record.request_id))
        });
        candidates
    }

    fn candidate<'r>(&self, record: &'r FeedbackRecord) -> Option<Candidate<'r>> {
        match self.kind {
            EntryKind::Feedback => {
                let text = non_blank(record.feedback_text.as_deref())?;
                Some(Candidate {
                    record,
                    signature: feedback_signature(text),
                    text: text.to_string(),
                })
            }
            EntryKind::Faq => {
                let answer = non_blank(record.corrected_response.as_deref())?;
                let question = non_blank(record.original_user_message.as_deref())?;
                Some(Candidate {
                    record,
                    signature: faq_signature(question, answer),
                    text: format!("{}\n{} {}", question, self.answer_marker, answer),
                })
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
