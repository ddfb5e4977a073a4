use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?]) +").expect("valid sentence regex"));

/// Best-effort cleanup of scraped lyrics for the text outputs.
///
/// Text is normalized to NFC so accented Portuguese and Spanish letters have
/// one representation. Whitespace inside a line collapses to single spaces,
/// and a sentence ending in `.`, `!` or `?` followed by more text starts a new
/// line. Blank source lines are stanza breaks: any run of them becomes exactly
/// one empty line, and leading or trailing ones are dropped. The sentence
/// split can break abbreviations or quoted dialogue; callers should not depend
/// on exact output.
pub fn format_lyrics(input: &str) -> String {
    let nfc: String = input.nfc().collect();
    let mut out = String::with_capacity(nfc.len());
    let mut stanza_break = false;

    for raw in nfc.lines() {
        let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            stanza_break = !out.is_empty();
            continue;
        }

        for verse in SENTENCE_END.replace_all(&line, "$1\n").split('\n') {
            let verse = verse.trim();
            if verse.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push_str(if stanza_break { "\n\n" } else { "\n" });
            }
            out.push_str(verse);
            stanza_break = false;
        }
    }

    out
}

/// Replace characters that are not allowed in file names on common
/// filesystems with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_lyrics_composes_accents() {
        // c + combining cedilla, a + combining tilde
        let decomposed = "Corac\u{0327}a\u{0303}o";
        assert_eq!(format_lyrics(decomposed), "Coração");
    }

    #[test]
    fn test_format_lyrics_keeps_one_break_between_stanzas() {
        let input = "\n\nprimeiro verso  \n segundo\tverso\n\n \n\t\nrefrão\n\n";
        assert_eq!(format_lyrics(input), "primeiro verso\nsegundo verso\n\nrefrão");
    }

    #[test]
    fn test_format_lyrics_trailing_punctuation_is_not_a_stanza() {
        assert_eq!(format_lyrics("Oh!  \nyeah"), "Oh!\nyeah");
    }

    #[test]
    fn test_format_lyrics_structure() {
        let raw = "  Look at the stars.   Look how they shine!\n\n\n\n\nAnd everything you do?  Yeah  ";
        let formatted = format_lyrics(raw);

        assert!(!formatted.is_empty());
        assert!(!formatted.contains("\n\n\n"));
        assert!(!formatted.starts_with('\n'));
        assert!(formatted.lines().all(|l| l == l.trim()));
        assert!(formatted.contains("Look at the stars.\nLook how they shine!"));
    }

    #[test]
    fn test_format_lyrics_never_triple_blank() {
        let inputs = [
            "a. b. c.\n\n\n\nd",
            "one! \n\n two? \n\n\n\n three.",
            "\n\n\nstart\n\n\n",
            "x.  \n  \n  \n y",
        ];
        for input in inputs {
            let out = format_lyrics(input);
            assert!(!out.is_empty(), "empty output for {input:?}");
            assert!(!out.contains("\n\n\n"), "triple newline in {out:?}");
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("AC/DC: Back in Black?"), "AC_DC_ Back in Black_");
        assert_eq!(sanitize_filename("  Yellow  "), "Yellow");
        assert_eq!(sanitize_filename("a\u{7}b"), "a_b");
        assert_eq!(sanitize_filename("   "), "untitled");
        assert_eq!(sanitize_filename(".."), "untitled");
    }
}
