//! Text cleanup and document assembly ahead of vectorization.

use crate::record::QuestionRecord;

const ACCENTED_LETTERS: [char; 7] = ['á', 'é', 'í', 'ó', 'ú', 'ñ', 'ü'];

fn is_kept(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || ACCENTED_LETTERS.contains(&c)
}

/// Lowercases, replaces every character outside the kept alphabet with a space
/// and collapses whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    let filtered: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if is_kept(c) { c } else { ' ' })
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Joins prompt, answers, feedbacks and general feedback with single spaces.
/// Empty parts are left out entirely.
pub fn assemble(record: &QuestionRecord) -> String {
    std::iter::once(record.text.as_str())
        .chain(record.answers.iter().map(String::as_str))
        .chain(record.feedbacks.iter().map(String::as_str))
        .chain(record.general_feedback.as_deref())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
