use crate::schema::Entry;
use crate::utils::preview;
use log::debug;
use std::collections::HashSet;

/// The hand-curated leading entries of a section, kept verbatim and in
/// parse order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineSet {
    entries: Vec<Entry>,
    discarded: usize,
}

impl BaselineSet {
    /// Keeps `entries[..cutoff]`. Entries past the cutoff are last run's
    /// generated output and are dropped, never merged.
    pub fn split(mut entries: Vec<Entry>, cutoff: usize) -> Self {
        let keep = cutoff.min(entries.len());
        let legacy = entries.split_off(keep);

        for entry in &legacy {
            debug!(
                "Discarding previously generated entry #{}: {}",
                entry.index(),
                preview(entry.body(), 50)
            );
        }

        Self {
            entries,
            discarded: legacy.len(),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries past the cutoff that were dropped.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// First label number available to generated entries.
    pub fn next_index(&self) -> usize {
        self.entries.len() + 1
    }

    /// Seeds a signature set with every baseline signature.
    pub fn seen_signatures(&self) -> SignatureSet {
        let mut seen = SignatureSet::default();
        for entry in &self.entries {
            seen.insert(entry.signature());
        }
        seen
    }
}

/// Normalized signatures already present in a section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureSet {
    signatures: HashSet<String>,
}

impl SignatureSet {
    pub fn contains(&self, signature: &str) -> bool {
        self.signatures.contains(signature)
    }

    /// Returns `false` if the signature was already present.
    pub fn insert(&mut self, signature: &str) -> bool {
        if self.signatures.contains(signature) {
            return false;
        }
        self.signatures.insert(signature.to_string())
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::extract_entries;
    use crate::schema::{DocumentFormat, EntryKind};

    fn entries(count: usize) -> Vec<Entry> {
        let body: String = (1..=count)
            .map(|i| format!("F{}. item {}\n", i, i))
            .collect();
        extract_entries(EntryKind::Feedback, &body, &DocumentFormat::default())
    }

    #[test]
    fn test_split_keeps_leading_entries() {
        let baseline = BaselineSet::split(entries(6), 4);
        assert_eq!(baseline.len(), 4);
        assert_eq!(baseline.discarded(), 2);
        assert_eq!(baseline.next_index(), 5);
        assert_eq!(baseline.entries()[3].body(), "F4. item 4");
    }

    #[test]
    fn test_short_baseline_numbers_densely() {
        let baseline = BaselineSet::split(entries(2), 4);
        assert_eq!(baseline.len(), 2);
        assert_eq!(baseline.discarded(), 0);
        assert_eq!(baseline.next_index(), 3);
    }

    #[test]
    fn test_baseline_duplicates_are_kept() {
        let body = "F1. same\nF2.   same\n";
        let extracted = extract_entries(EntryKind::Feedback, body, &DocumentFormat::default());
        let baseline = BaselineSet::split(extracted, 4);
        assert_eq!(baseline.len(), 2);

        let seen = baseline.seen_signatures();
        assert_eq!(seen.len(), 1);
        assert!(seen.contains("same"));
    }

    #[test]
    fn test_signature_set_insert_reports_new() {
        let mut seen = SignatureSet::default();
        assert!(seen.insert("a"));
        assert!(!seen.insert("a"));
        assert!(seen.contains("a"));
        assert!(!seen.contains("b"));
    }
}
