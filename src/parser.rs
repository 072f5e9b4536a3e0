use crate::error::{PromptSyncError, Result};
use crate::schema::{DocumentFormat, EntryKind};
use log::debug;

/// The four spans of a prompt document. Concatenating them in order yields
/// the original text exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions<'a> {
    /// Everything before the feedback anchor
    pub prefix: &'a str,
    /// From the feedback anchor up to the FAQ anchor
    pub feedback_body: &'a str,
    /// From the FAQ anchor up to the next section (or end of text)
    pub faq_body: &'a str,
    /// Everything from the section after FAQ onward
    pub suffix: &'a str,
}

impl<'a> Regions<'a> {
    pub fn body(&self, kind: EntryKind) -> &'a str {
        match kind {
            EntryKind::Feedback => self.feedback_body,
            EntryKind::Faq => self.faq_body,
        }
    }
}

pub fn parse_document<'a>(text: &'a str, format: &DocumentFormat) -> Result<Regions<'a>> {
    let feedback_start =
        text.find(&format.feedback.anchor)
            .ok_or_else(|| PromptSyncError::Structure {
                section: EntryKind::Feedback.section_name(),
                anchor: format.feedback.anchor.clone(),
            })?;

    let search_from = feedback_start + format.feedback.anchor.len();
    let faq_start = text[search_from..]
        .find(&format.faq.anchor)
        .map(|offset| search_from + offset)
        .ok_or_else(|| PromptSyncError::Structure {
            section: EntryKind::Faq.section_name(),
            anchor: format.faq.anchor.clone(),
        })?;

    // Entry text may quote section tokens, so the next section is only
    // looked for at a line start past the FAQ trailing note.
    let faq_content_start = faq_start + format.faq.anchor.len();
    let end_search_start = format
        .faq
        .note_markers
        .iter()
        .filter(|marker| !marker.is_empty())
        .filter_map(|marker| find_at_line_start(text, faq_content_start, marker))
        .min()
        .map(|note_start| match text[note_start..].find('\n') {
            Some(offset) => note_start + offset + 1,
            None => text.len(),
        })
        .unwrap_or(faq_content_start);

    // First marker in priority order wins, not the earliest position.
    let faq_end = format
        .section_end_markers
        .iter()
        .filter(|marker| !marker.is_empty())
        .find_map(|marker| find_at_line_start(text, end_search_start, marker))
        .unwrap_or(text.len());

    debug!(
        "Section boundaries: feedback={} faq={} faq_end={} total={}",
        feedback_start,
        faq_start,
        faq_end,
        text.len()
    );

    Ok(Regions {
        prefix: &text[..feedback_start],
        feedback_body: &text[feedback_start..faq_start],
        faq_body: &text[faq_start..faq_end],
        suffix: &text[faq_end..],
    })
}

/// Byte offset of the first occurrence of `needle` at or after `from` that
/// begins a line.
fn find_at_line_start(text: &str, from: usize, needle: &str) -> Option<usize> {
    text[from..]
        .match_indices(needle)
        .map(|(offset, _)| from + offset)
        .find(|&pos| pos == 0 || text[..pos].ends_with('\n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format() -> DocumentFormat {
        DocumentFormat::default()
    }

    #[test]
    fn test_regions_concatenate_to_original() {
        let text = "intro\n🟦 [4. 관리자 피드백 (Supervisor Feedback)]\nF1. a\n\n🟦 [5. FAQ(High Priority FAQ)]\nQ1. q\n답변: a\n\n🟦 [6. 기타]\nrest";
        let regions = parse_document(text, &format()).unwrap();
        assert_eq!(regions.prefix, "intro\n");
        assert!(regions.feedback_body.starts_with("🟦 [4."));
        assert!(regions.faq_body.starts_with("🟦 [5."));
        assert_eq!(regions.suffix, "🟦 [6. 기타]\nrest");
        let rebuilt = [
            regions.prefix,
            regions.feedback_body,
            regions.faq_body,
            regions.suffix,
        ]
        .concat();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_missing_feedback_anchor_is_structure_error() {
        let text = "no sections here\n🟦 [5. FAQ\nQ1. q\n답변: a";
        let err = parse_document(text, &format()).unwrap_err();
        assert!(matches!(
            err,
            PromptSyncError::Structure {
                section: "feedback",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_faq_anchor_is_structure_error() {
        let text = "🟦 [4. 관리자 피드백\nF1. a\n";
        let err = parse_document(text, &format()).unwrap_err();
        assert!(matches!(err, PromptSyncError::Structure { section: "faq", .. }));
    }

    #[test]
    fn test_faq_anchor_before_feedback_is_not_accepted() {
        let text = "🟦 [5. FAQ\nQ1. q\n답변: a\n🟦 [4. 관리자 피드백\nF1. a\n";
        assert!(parse_document(text, &format()).unwrap_err().is_structure_error());
    }

    #[test]
    fn test_faq_runs_to_end_without_next_section() {
        let text = "🟦 [4. 관리자 피드백\nF1. a\n🟦 [5. FAQ\nQ1. q\n답변: a\n";
        let regions = parse_document(text, &format()).unwrap();
        assert_eq!(regions.suffix, "");
        assert!(regions.faq_body.ends_with("답변: a\n"));
    }

    #[test]
    fn test_section_marker_priority() {
        let text =
            "🟦 [4. 관리자 피드백\nF1. a\n🟦 [5. FAQ\nQ1. q\n답변: a\n**중요: note\n🟦 [6. policy\n";
        let regions = parse_document(text, &format()).unwrap();
        assert_eq!(regions.suffix, "🟦 [6. policy\n");
        assert!(regions.faq_body.contains("**중요: note"));

        let text = "🟦 [4. 관리자 피드백\nF1. a\n🟦 [5. FAQ\nQ1. q\n답변: a\n**중요: note\n";
        let regions = parse_document(text, &format()).unwrap();
        assert_eq!(regions.suffix, "**중요: note\n");
    }

    #[test]
    fn test_end_marker_inside_entry_text_is_ignored() {
        let text = "🟦 [4. 관리자 피드백\nF1. a\n\n🟦 [5. FAQ\nQ1. 준비물?\n답변: **중요:** 신분증\n\n[FAQ Q1~Q1의 답변]\n\n**중요: 끝\n";
        let regions = parse_document(text, &format()).unwrap();
        assert_eq!(regions.suffix, "**중요: 끝\n");
        assert!(regions.faq_body.ends_with("[FAQ Q1~Q1의 답변]\n\n"));
    }

    #[test]
    fn test_end_marker_line_before_note_stays_in_faq() {
        let text = "🟦 [4. 관리자 피드백\nF1. a\n🟦 [5. FAQ\nQ1. q\n답변: 첫 줄\n**중요: 둘째 줄\n\n[FAQ Q1~Q1의 답변]\n\n🟦 [6. 기타\n";
        let regions = parse_document(text, &format()).unwrap();
        assert_eq!(regions.suffix, "🟦 [6. 기타\n");
        assert!(regions.faq_body.contains("**중요: 둘째 줄"));
    }
}
