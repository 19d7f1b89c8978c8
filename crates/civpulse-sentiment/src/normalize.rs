//! Text normalization ahead of scoring and categorization.

use std::sync::LazyLock;

use regex::Regex;

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^<>]+>").expect("valid html tag regex"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:https?://|www\.)\S+").expect("valid url regex"));
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\w+").expect("valid mention regex"));
/// Control and format characters (zero-width, bidi marks, BOM).
static INVISIBLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{Cc}\p{Cf}]").expect("valid invisible char regex"));

/// Punctuation used for markup (hashtags, emphasis, code, tables); replaced
/// by spaces so the surrounding words survive.
const MARKUP_CHARS: &[char] = &[
    '#', '*', '_', '~', '`', '<', '>', '[', ']', '{', '}', '|', '^', '\\',
];

/// Clean raw post text.
///
/// Lower-cases, drops HTML tags, URLs and `@mentions`, turns markup
/// punctuation into spaces and collapses whitespace. Hashtags keep their
/// word. Idempotent: `normalize(&normalize(t)) == normalize(t)`. Returns an
/// empty string when nothing survives.
#[must_use]
pub fn normalize(raw_text: &str) -> String {
    let visible = INVISIBLE_RE.replace_all(raw_text, " ");

    let text = HTML_TAG_RE.replace_all(&visible, " ").to_lowercase();
    let text = URL_RE.replace_all(&text, " ");
    let text = MENTION_RE.replace_all(&text, " ");
    let text: String = text
        .chars()
        .map(|c| if MARKUP_CHARS.contains(&c) { ' ' } else { c })
        .collect();

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashtag_keeps_word_without_marker() {
        assert_eq!(
            normalize("Digital India is amazing for rural banking! #DigitalIndia"),
            "digital india is amazing for rural banking! digitalindia"
        );
    }

    #[test]
    fn strips_urls_and_mentions() {
        assert_eq!(
            normalize("@PMOIndia see https://example.gov/x?y=1 and www.site.in now"),
            "see and now"
        );
    }

    #[test]
    fn strips_html_and_markup() {
        assert_eq!(
            normalize("<p>**Swachh** _Bharat_ works</p>"),
            "swachh bharat works"
        );
    }

    #[test]
    fn collapses_whitespace_and_invisible_chars() {
        assert_eq!(normalize("  UPI\u{200b}rocks\t\n\nfine  "), "upi rocks fine");
    }

    #[test]
    fn strips_bidi_and_format_marks() {
        let cleaned = normalize("Swachh\u{200e}Bharat \u{202b}works\u{202c}\u{200f} \u{00ad}ok");
        assert_eq!(cleaned, "swachh bharat works ok");
        assert!(cleaned.chars().all(|c| !c.is_control()));
    }

    #[test]
    fn empty_and_fully_stripped_inputs_are_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("@someone https://t.co/abc #"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "Digital India is amazing for rural banking! #DigitalIndia",
            "_www.example.com trailing",
            "foo@~bar baz",
            "x_@handle y",
            "<b>Bold</b>&nbsp;text <not closed",
            "HTTPS://UPPER.CASE/Path",
            "İstanbul ΣΊΣΥΦΟΣ",
            "tabs\tand\r\nlines \u{feff}",
            "a < b > c",
            "",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "input: {sample:?}");
        }
    }
}
