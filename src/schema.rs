use crate::error::{PromptSyncError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Good,
    Bad,
}

/// One operator verdict on a bot answer, joined with the user message that
/// triggered the answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackRecord {
    pub request_id: String,
    pub verdict: Verdict,
    /// Free-text guidance for the supervisor feedback section
    #[serde(default)]
    pub feedback_text: Option<String>,
    /// The answer the bot should have given
    #[serde(default)]
    pub corrected_response: Option<String>,
    /// The user message the corrected answer responds to
    #[serde(default)]
    pub original_user_message: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Operators can keep a record without letting it reach the prompt
    #[serde(default = "default_prompt_apply")]
    pub prompt_apply: bool,
}

fn default_prompt_apply() -> bool {
    true
}

impl FeedbackRecord {
    pub fn new(request_id: impl Into<String>, verdict: Verdict, created_at: DateTime<Utc>) -> Self {
        Self {
            request_id: request_id.into(),
            verdict,
            feedback_text: None,
            corrected_response: None,
            original_user_message: None,
            created_at,
            prompt_apply: true,
        }
    }

    pub fn with_feedback_text(mut self, text: impl Into<String>) -> Self {
        self.feedback_text = Some(text.into());
        self
    }

    pub fn with_correction(
        mut self,
        user_message: impl Into<String>,
        corrected_response: impl Into<String>,
    ) -> Self {
        self.original_user_message = Some(user_message.into());
        self.corrected_response = Some(corrected_response.into());
        self
    }

    /// Only negative feedback flagged for the prompt drives synthesis.
    pub fn is_eligible(&self) -> bool {
        self.verdict == Verdict::Bad && self.prompt_apply
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Feedback,
    Faq,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Feedback => "F",
            EntryKind::Faq => "Q",
        }
    }

    pub fn section_name(&self) -> &'static str {
        match self {
            EntryKind::Feedback => "feedback",
            EntryKind::Faq => "faq",
        }
    }
}

/// A numbered item of the feedback or FAQ section.
///
/// `body` is the complete entry text including its `F<n>.`/`Q<n>.` label
/// line, trimmed. `signature` is the normalized key used for dedup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    index: usize,
    kind: EntryKind,
    body: String,
    signature: String,
}

impl Entry {
    pub(crate) fn new(index: usize, kind: EntryKind, body: String, signature: String) -> Self {
        Self {
            index,
            kind,
            body,
            signature,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }
}

/// Layout of one numbered section of the prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionFormat {
    /// Literal token that marks where the section starts
    pub anchor: String,
    /// Header text written in front of the entries; must start with `anchor`
    pub header: String,
    /// Lines containing any of these are header boilerplate
    #[serde(default)]
    pub boilerplate_markers: Vec<String>,
    /// A line containing any of these ends the entry list
    #[serde(default)]
    pub note_markers: Vec<String>,
    /// Note written after the entries. `{count}` is replaced by the entry count.
    pub trailing_note: String,
    /// Note written instead when the section has no entries
    pub empty_trailing_note: String,
    /// Number of leading entries that are curated by hand
    pub baseline_cutoff: usize,
}

impl SectionFormat {
    pub fn render_trailing_note(&self, count: usize) -> String {
        if count == 0 {
            self.empty_trailing_note.clone()
        } else {
            self.trailing_note.replace("{count}", &count.to_string())
        }
    }
}

/// Literal tokens and policies of the prompt document.
///
/// The defaults are the tokens of the deployed prompt. Changing them breaks
/// round-tripping of documents that were written with the old tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentFormat {
    pub feedback: SectionFormat,
    pub faq: SectionFormat,
    /// Prefix of the answer line of a FAQ entry
    pub answer_marker: String,
    /// Markers that end the FAQ section, in priority order
    pub section_end_markers: Vec<String>,
}

impl Default for DocumentFormat {
    fn default() -> Self {
        Self {
            feedback: SectionFormat {
                anchor: "🟦 [4. 관리자 피드백".to_string(),
                header: "🟦 [4. 관리자 피드백 (Supervisor Feedback)]\n(운영자가 수시로 항목을 추가/수정하여 챗봇의 응답 성향을 조정함. 항상 최우선 적용)\n\n".to_string(),
                boilerplate_markers: vec!["(운영자가 수시로".to_string()],
                note_markers: vec!["(이 항목은 운영 중 지속적으로".to_string()],
                trailing_note: "(이 항목은 운영 중 지속적으로 추가·수정될 수 있습니다.)".to_string(),
                empty_trailing_note: "(이 항목은 운영 중 지속적으로 추가·수정될 수 있습니다.)".to_string(),
                baseline_cutoff: 4,
            },
            faq: SectionFormat {
                anchor: "🟦 [5. FAQ".to_string(),
                header: "🟦 [5. FAQ(High Priority FAQ)]\n(질문이 일치하거나 유사할 때 반드시 아래 스타일, 어투, 패턴, 길이, 문장구성까지 따라 작성)\n\n".to_string(),
                boilerplate_markers: vec!["(질문이 일치하거나".to_string()],
                note_markers: vec!["[FAQ Q1~Q".to_string(), "[FAQ의 답변".to_string()],
                trailing_note: "[FAQ Q1~Q{count}의 답변 스타일·구성·톤을 100% 따라야 하며, 답변 우선순위는 ①관리자 피드백 → ②FAQ → ③기타 정책 순으로 엄격히 적용]".to_string(),
                empty_trailing_note: "[FAQ의 답변 스타일·구성·톤을 100% 따라야 하며, 답변 우선순위는 ①관리자 피드백 → ②FAQ → ③기타 정책 순으로 엄격히 적용]".to_string(),
                baseline_cutoff: 4,
            },
            answer_marker: "답변:".to_string(),
            section_end_markers: vec!["🟦 [6.".to_string(), "**중요:".to_string()],
        }
    }
}

impl DocumentFormat {
    pub fn section(&self, kind: EntryKind) -> &SectionFormat {
        match kind {
            EntryKind::Feedback => &self.feedback,
            EntryKind::Faq => &self.faq,
        }
    }

    pub fn with_cutoffs(mut self, feedback_cutoff: usize, faq_cutoff: usize) -> Self {
        self.feedback.baseline_cutoff = feedback_cutoff;
        self.faq.baseline_cutoff = faq_cutoff;
        self
    }

    /// Loads a format from TOML. Omitted top-level keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let format: DocumentFormat =
            toml::from_str(source).map_err(|e| PromptSyncError::Config(e.to_string()))?;
        format.validate()?;
        Ok(format)
    }

    /// Rejects formats whose output could not be parsed again.
    pub fn validate(&self) -> Result<()> {
        for kind in [EntryKind::Feedback, EntryKind::Faq] {
            let section = self.section(kind);
            if section.anchor.trim().is_empty() {
                return Err(PromptSyncError::InvalidFormat(format!(
                    "{} anchor is empty",
                    kind.section_name()
                )));
            }
            if !section.header.starts_with(&section.anchor) {
                return Err(PromptSyncError::InvalidFormat(format!(
                    "{} header does not start with its anchor '{}'",
                    kind.section_name(),
                    section.anchor
                )));
            }
            if !section
                .note_markers
                .iter()
                .any(|m| section.render_trailing_note(1).contains(m.as_str()))
            {
                return Err(PromptSyncError::InvalidFormat(format!(
                    "{} trailing note is not recognised by any note marker",
                    kind.section_name()
                )));
            }
        }

        if self.feedback.anchor == self.faq.anchor {
            return Err(PromptSyncError::InvalidFormat(
                "feedback and FAQ anchors must differ".to_string(),
            ));
        }

        if !self.faq.trailing_note.contains("{count}") {
            return Err(PromptSyncError::InvalidFormat(
                "FAQ trailing note must contain '{count}'".to_string(),
            ));
        }

        if self.answer_marker.trim().is_empty() {
            return Err(PromptSyncError::InvalidFormat(
                "answer marker is empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_format_is_valid() {
        assert!(DocumentFormat::default().validate().is_ok());
    }

    #[test]
    fn test_faq_note_interpolates_count() {
        let format = DocumentFormat::default();
        let note = format.faq.render_trailing_note(7);
        assert!(note.starts_with("[FAQ Q1~Q7의"));
        assert_eq!(
            format.faq.render_trailing_note(0),
            format.faq.empty_trailing_note
        );
    }

    #[test]
    fn test_header_must_start_with_anchor() {
        let mut format = DocumentFormat::default();
        format.feedback.header = "Feedback\n\n".to_string();
        assert!(matches!(
            format.validate(),
            Err(PromptSyncError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_from_toml_overrides_cutoffs() {
        let source = r###"
answer_marker = "A:"
section_end_markers = ["## Policies"]

[feedback]
anchor = "## Feedback"
header = "## Feedback\n\n"
note_markers = ["(end of feedback)"]
trailing_note = "(end of feedback)"
empty_trailing_note = "(end of feedback)"
baseline_cutoff = 2

[faq]
anchor = "## FAQ"
header = "## FAQ\n\n"
note_markers = ["[FAQ 1-"]
trailing_note = "[FAQ 1-{count}]"
empty_trailing_note = "[FAQ 1-0]"
baseline_cutoff = 1
"###;
        let format = DocumentFormat::from_toml_str(source).unwrap();
        assert_eq!(format.feedback.baseline_cutoff, 2);
        assert_eq!(format.faq.baseline_cutoff, 1);
        assert_eq!(format.answer_marker, "A:");
        assert!(format.feedback.boilerplate_markers.is_empty());
    }

    #[test]
    fn test_record_eligibility() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let bad = FeedbackRecord::new("r1", Verdict::Bad, at);
        assert!(bad.is_eligible());

        let good = FeedbackRecord::new("r2", Verdict::Good, at);
        assert!(!good.is_eligible());

        let mut held_back = FeedbackRecord::new("r3", Verdict::Bad, at);
        held_back.prompt_apply = false;
        assert!(!held_back.is_eligible());
    }

    #[test]
    fn test_record_deserializes_without_apply_flag() {
        let json = r#"{
            "request_id": "abc",
            "verdict": "bad",
            "feedback_text": "Too long",
            "created_at": "2024-05-01T09:00:00Z"
        }"#;
        let record: FeedbackRecord = serde_json::from_str(json).unwrap();
        assert!(record.prompt_apply);
        assert_eq!(record.verdict, Verdict::Bad);
        assert_eq!(record.corrected_response, None);
    }
}
