use crate::schema::{DocumentFormat, Entry, EntryKind, SectionFormat};
use crate::utils::{entry_label_pattern, faq_signature, feedback_signature, preview, strip_label};
use log::{debug, warn};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Before the first numbered line; header lines and blanks are ignored
    Preamble,
    /// Accumulating the lines of an open entry
    InEntry,
    /// A trailing note was seen; the rest of the body is not entries
    Done,
}

/// Line-oriented scanner that turns a section body into numbered entries.
pub struct EntryExtractor<'f> {
    kind: EntryKind,
    section: &'f SectionFormat,
    answer_marker: Option<&'f str>,
    label_pattern: Regex,
}

impl<'f> EntryExtractor<'f> {
    pub fn new(kind: EntryKind, format: &'f DocumentFormat) -> Self {
        let answer_marker = match kind {
            EntryKind::Feedback => None,
            EntryKind::Faq => Some(format.answer_marker.as_str()),
        };
        Self {
            kind,
            section: format.section(kind),
            answer_marker,
            label_pattern: entry_label_pattern(kind.label()),
        }
    }

    pub fn extract(&self, body: &str) -> Vec<Entry> {
        let mut entries = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut state = ScanState::Preamble;

        for line in body.lines() {
            if state == ScanState::Done {
                break;
            }

            if self.is_note(line) {
                self.flush(&mut current, &mut entries);
                state = ScanState::Done;
                continue;
            }

            if self.is_boilerplate(line) {
                continue;
            }

            if self.label_pattern.is_match(line) {
                self.flush(&mut current, &mut entries);
                current.push(line);
                state = ScanState::InEntry;
                continue;
            }

            if state == ScanState::InEntry {
                current.push(line);
            }
        }

        self.flush(&mut current, &mut entries);

        debug!(
            "Extracted {} {} entries",
            entries.len(),
            self.kind.section_name()
        );
        entries
    }

    fn is_note(&self, line: &str) -> bool {
        self.section
            .note_markers
            .iter()
            .any(|m| !m.is_empty() && line.contains(m.as_str()))
    }

    fn is_boilerplate(&self, line: &str) -> bool {
        line.contains(self.section.anchor.as_str())
            || self
                .section
                .boilerplate_markers
                .iter()
                .any(|m| !m.is_empty() && line.contains(m.as_str()))
    }

    fn flush(&self, lines: &mut Vec<&str>, entries: &mut Vec<Entry>) {
        if lines.is_empty() {
            return;
        }
        let body = lines.join("\n").trim().to_string();
        lines.clear();

        let signature = match self.signature_of(&body) {
            Some(signature) => signature,
            None => {
                warn!(
                    "Dropping malformed {} entry without answer line: {}",
                    self.kind.section_name(),
                    preview(&body, 60)
                );
                return;
            }
        };

        entries.push(Entry::new(entries.len() + 1, self.kind, body, signature));
    }

    /// Returns `None` for FAQ entries that have no answer line.
    fn signature_of(&self, body: &str) -> Option<String> {
        let marker = match self.answer_marker {
            None => return Some(feedback_signature(strip_label(&self.label_pattern, body))),
            Some(marker) => marker,
        };

        let lines: Vec<&str> = body.lines().collect();
        let answer_at = lines
            .iter()
            .skip(1)
            .position(|l| l.starts_with(marker))
            .map(|i| i + 1)?;

        let question = lines[..answer_at].join("\n");
        let question = strip_label(&self.label_pattern, &question);
        let answer = lines[answer_at..].join("\n");
        let answer = answer[marker.len()..].trim_start();

        Some(faq_signature(question, answer))
    }
}

/// Extracts the entries of one section body with the given format.
pub fn extract_entries(kind: EntryKind, body: &str, format: &DocumentFormat) -> Vec<Entry> {
    EntryExtractor::new(kind, format).extract(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEEDBACK_BODY: &str = "🟦 [4. 관리자 피드백 (Supervisor Feedback)]
(운영자가 수시로 항목을 추가/수정하여 챗봇의 응답 성향을 조정함. 항상 최우선 적용)

F1. 항상 존댓말을 사용할 것

F2. 가격 문의는
상담원 연결을 안내할 것
F3. Keep answers short

(이 항목은 운영 중 지속적으로 추가·수정될 수 있습니다.)

F9. after the note is ignored
";

    #[test]
    fn test_extracts_feedback_entries_in_order() {
        let format = DocumentFormat::default();
        let entries = extract_entries(EntryKind::Feedback, FEEDBACK_BODY, &format);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].body(), "F1. 항상 존댓말을 사용할 것");
        assert_eq!(entries[1].body(), "F2. 가격 문의는\n상담원 연결을 안내할 것");
        assert_eq!(entries[1].signature(), "가격 문의는 상담원 연결을 안내할 것");
        assert_eq!(entries[2].body(), "F3. Keep answers short");
        assert_eq!(
            entries.iter().map(|e| e.index()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_lines_before_first_entry_are_ignored() {
        let format = DocumentFormat::default();
        let body = "🟦 [4. 관리자 피드백\nstray text\n\nF1. first\n";
        let entries = extract_entries(EntryKind::Feedback, body, &format);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].body(), "F1. first");
    }

    #[test]
    fn test_faq_entries_require_answer_line() {
        let format = DocumentFormat::default();
        let body = "🟦 [5. FAQ(High Priority FAQ)]
(질문이 일치하거나 유사할 때)

Q1. 영업시간이 어떻게 되나요?
답변: 평일 9시부터 6시까지입니다.

Q2. 답이 없는 질문

Q3. 환불은
어떻게 하나요?
답변: 마이페이지에서
신청하세요.

[FAQ Q1~Q3의 답변 스타일]
";
        let entries = extract_entries(EntryKind::Faq, body, &format);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].body().starts_with("Q1."));
        assert!(entries[1].body().starts_with("Q3."));
        assert_eq!(entries[1].index(), 2);
        assert_eq!(
            entries[1].signature(),
            faq_signature("환불은 어떻게 하나요?", "마이페이지에서 신청하세요.")
        );
    }

    #[test]
    fn test_answer_marker_on_label_line_does_not_count() {
        let format = DocumentFormat::default();
        let body = "Q1. 답변: is part of the question\n";
        assert!(extract_entries(EntryKind::Faq, body, &format).is_empty());
    }

    #[test]
    fn test_empty_body_yields_no_entries() {
        let format = DocumentFormat::default();
        assert!(extract_entries(EntryKind::Feedback, "", &format).is_empty());
        assert!(extract_entries(
            EntryKind::Faq,
            "🟦 [5. FAQ\n\n[FAQ의 답변 스타일·구성·톤을 100% 따라야 하며]\n\n",
            &format
        )
        .is_empty());
    }
}
