use once_cell::sync::Lazy;
use regex::Regex;

// Kept verbatim from the phrase list the spam wave actually used.
const SPAM_PHRASES: [&str; 8] = [
    "ищу помощников для онлайн-работы",
    "занятость: 1–3 часа в день",
    "занятость: 1-3 часа в день",
    "доход: от $",
    "опыт не требуется — всему обучаю",
    "опыт не требуется - всему обучаю",
    "онлайн-работа",
    "работа онлайн",
];

// Compiled once
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+|t\.me/\S+|www\.\S+").unwrap());

/// Pure spam heuristic over message text or caption. Absent or empty text is
/// never spam. Matching is case-insensitive: the text is lowercased once and
/// checked against the phrase list and the URL pattern.
pub fn is_spam(text: Option<&str>) -> bool {
    let text = match text {
        Some(t) if !t.is_empty() => t.to_lowercase(),
        _ => return false,
    };
    URL_RE.is_match(&text) || SPAM_PHRASES.iter().any(|p| text.contains(p))
}
