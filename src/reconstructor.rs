use crate::parser::Regions;
use crate::schema::{DocumentFormat, Entry, SectionFormat};

/// Writes a section: header, entries separated by blank lines, then the
/// trailing note.
pub fn render_section<'e, I>(section: &SectionFormat, entries: I) -> String
where
    I: IntoIterator<Item = &'e Entry>,
{
    let bodies: Vec<&str> = entries.into_iter().map(|e| e.body()).collect();

    let mut out = String::with_capacity(section.header.len() + bodies.len() * 64);
    out.push_str(&section.header);
    if !bodies.is_empty() {
        out.push_str(&bodies.join("\n\n"));
        out.push_str("\n\n");
    }
    out.push_str(&section.render_trailing_note(bodies.len()));
    out.push_str("\n\n");
    out
}

/// Reassembles the document. `prefix` and `suffix` are copied verbatim;
/// only the two entry sections are rewritten.
pub fn reconstruct(
    regions: &Regions<'_>,
    format: &DocumentFormat,
    feedback_entries: &[&Entry],
    faq_entries: &[&Entry],
) -> String {
    let feedback = render_section(&format.feedback, feedback_entries.iter().copied());
    let faq = render_section(&format.faq, faq_entries.iter().copied());

    let mut out = String::with_capacity(
        regions.prefix.len() + feedback.len() + faq.len() + regions.suffix.len(),
    );
    out.push_str(regions.prefix);
    out.push_str(&feedback);
    out.push_str(&faq);
    out.push_str(regions.suffix);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::extract_entries;
    use crate::schema::EntryKind;

    #[test]
    fn test_render_empty_section_uses_empty_note() {
        let format = DocumentFormat::default();
        let rendered = render_section(&format.faq, std::iter::empty());
        assert_eq!(
            rendered,
            format!("{}{}\n\n", format.faq.header, format.faq.empty_trailing_note)
        );
    }

    #[test]
    fn test_render_faq_counts_entries() {
        let format = DocumentFormat::default();
        let entries = extract_entries(
            EntryKind::Faq,
            "Q1. a?\n답변: b\nQ2. c?\n답변: d\n",
            &format,
        );
        let rendered = render_section(&format.faq, &entries);
        assert!(rendered.contains("Q1. a?\n답변: b\n\nQ2. c?\n답변: d\n\n[FAQ Q1~Q2의"));
        assert!(rendered.ends_with("순으로 엄격히 적용]\n\n"));
    }

    #[test]
    fn test_reconstruct_keeps_prefix_and_suffix() {
        let format = DocumentFormat::default();
        let regions = Regions {
            prefix: "PREFIX\n",
            feedback_body: "ignored",
            faq_body: "ignored",
            suffix: "🟦 [6. SUFFIX]",
        };
        let text = reconstruct(&regions, &format, &[], &[]);
        assert!(text.starts_with("PREFIX\n🟦 [4. 관리자 피드백"));
        assert!(text.ends_with("\n\n🟦 [6. SUFFIX]"));
        assert!(!text.contains("ignored"));
    }
}
