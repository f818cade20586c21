//! Cleanup applied to backend answers before they are shown or copied.
//!
//! Answers come back from a language model and carry markdown decoration and
//! typographic characters that do not render well in a terminal. The same
//! cleaned text is displayed and placed on the clipboard; the stored message
//! keeps the original.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static FENCED_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[\s\S]*?```").expect("valid regex"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("valid regex"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`(.*?)`").expect("valid regex"));
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").expect("valid regex"));
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*+][ \t]+").expect("valid regex"));
static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]+").expect("valid regex"));

static INVISIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{200B}-\x{200D}\x{2060}\x{FEFF}]").expect("valid regex"));
static DOUBLE_QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[“”„‟]").expect("valid regex"));
static SINGLE_QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[‘’‚‛]").expect("valid regex"));
static DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[‒–—―]").expect("valid regex"));

static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));
static SPACE_AROUND_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r" ?\n ?").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Normalize bot text for display and copy. Idempotent.
///
/// The passes are repeated until the text stops changing: removing one
/// marker can expose another (`- - item`). Every round that changes the text
/// either shortens it or swaps a tab or ellipsis for ASCII that no pass puts
/// back, so the loop ends.
pub fn sanitize(text: &str) -> String {
    let mut current = sanitize_once(text);
    loop {
        let next = sanitize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn sanitize_once(text: &str) -> String {
    let text = strip_markdown(text);
    let text = INVISIBLE.replace_all(&text, "");
    let text = normalize_punctuation(&text);
    let text = transliterate(&text);
    collapse_whitespace(&text)
}

fn strip_markdown(text: &str) -> String {
    let text = FENCED_CODE.replace_all(text, "");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = BULLET.replace_all(&text, "");
    NUMBERED.replace_all(&text, "").into_owned()
}

fn normalize_punctuation(text: &str) -> String {
    let text = DOUBLE_QUOTES.replace_all(text, "\"");
    let text = SINGLE_QUOTES.replace_all(&text, "'");
    let text = DASHES.replace_all(&text, "-");
    text.replace('…', "...")
}

/// ASCII stand-in for accented letters; `None` leaves the char alone
fn ascii_for(c: char) -> Option<char> {
    let mapped = match c {
        'á' | 'à' | 'ä' | 'â' | 'ā' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' | 'ē' => 'e',
        'í' | 'ì' | 'ï' | 'î' | 'ī' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'ō' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' | 'ū' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'Á' | 'À' | 'Ä' | 'Â' | 'Ā' | 'Ã' => 'A',
        'É' | 'È' | 'Ë' | 'Ê' | 'Ē' => 'E',
        'Í' | 'Ì' | 'Ï' | 'Î' | 'Ī' => 'I',
        'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Ō' | 'Õ' => 'O',
        'Ú' | 'Ù' | 'Ü' | 'Û' | 'Ū' => 'U',
        'Ñ' => 'N',
        'Ç' => 'C',
        _ => return None,
    };
    Some(mapped)
}

fn transliterate(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.chars().map(|c| ascii_for(c).unwrap_or(c)).collect())
}

fn collapse_whitespace(text: &str) -> String {
    let text = INLINE_SPACE.replace_all(text, " ");
    let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}
