use regex::Regex;

/// Separator between the question and answer halves of a FAQ signature.
pub const FAQ_SIGNATURE_SEPARATOR: char = '\u{1f}';

/// Collapses every run of whitespace (including newlines) into a single
/// space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds the pattern matching the first line of a numbered entry, e.g.
/// `^F\d+\.` for the label `F`.
pub fn entry_label_pattern(label: &str) -> Regex {
    Regex::new(&format!(r"^{}(\d+)\.", regex::escape(label)))
        .expect("escaped label always forms a valid pattern")
}

/// Removes a leading `F12.` style label and the whitespace after it.
pub fn strip_label<'a>(pattern: &Regex, line: &'a str) -> &'a str {
    match pattern.find(line) {
        Some(m) => line[m.end()..].trim_start(),
        None => line,
    }
}

pub fn feedback_signature(text: &str) -> String {
    normalize_whitespace(text)
}

pub fn faq_signature(question: &str, answer: &str) -> String {
    format!(
        "{}{}{}",
        normalize_whitespace(question),
        FAQ_SIGNATURE_SEPARATOR,
        normalize_whitespace(answer)
    )
}

/// Shortens text for log lines without splitting a character.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}
