//! Text canonicalization for loose equivalence checks
//!
//! Translator output is compared after dropping its presentation layer:
//! - NBSP becomes a plain space
//! - Unicode is composed to NFC
//! - Zero-width characters are removed
//! - Latin and Sinhala punctuation, quotes and brackets are removed
//! - Whitespace runs collapse to one space and the ends are trimmed
//!
//! The result is only meant for comparison, never for display.

use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Zero-width space, zero-width non-joiner, zero-width joiner, BOM.
pub const ZERO_WIDTH_CHARS: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Punctuation ignored when comparing translator output.
pub const PUNCTUATION_CHARS: &[char] = &[
    // Sentence punctuation
    '.', '?', '!', ',', ';', ':',
    // Quotes
    '"', '\'', '`', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}',
    // Brackets
    '(', ')', '{', '}', '[', ']', '<', '>',
    // Separators
    '|', '/', '\\',
    // Dashes: em, en, hyphen-minus
    '\u{2014}', '\u{2013}', '-',
    // Danda
    '\u{0964}',
];

static DEFAULT_NORMALIZER: Lazy<Normalizer> = Lazy::new(Normalizer::default);

/// Normalize text with the default discard table.
pub fn normalize(text: &str) -> String {
    DEFAULT_NORMALIZER.normalize(text).into_string()
}

/// Normalize optional text, treating `None` as empty.
pub fn normalize_opt(text: Option<&str>) -> String {
    normalize(text.unwrap_or_default())
}

/// Text that has been through a [`Normalizer`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CanonicalText(String);

impl CanonicalText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substring containment of `fragment` within this text.
    pub fn contains(&self, fragment: &CanonicalText) -> bool {
        self.0.contains(fragment.as_str())
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalizer holding the set of characters it discards.
#[derive(Debug, Clone)]
pub struct Normalizer {
    discarded: BTreeSet<char>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            discarded: ZERO_WIDTH_CHARS
                .iter()
                .chain(PUNCTUATION_CHARS)
                .copied()
                .collect(),
        }
    }
}

impl Normalizer {
    /// Extend the discard table, e.g. with another script's punctuation.
    pub fn with_discarded(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.discarded.extend(chars);
        self
    }

    /// Whether `c` is dropped by this normalizer.
    pub fn discards(&self, c: char) -> bool {
        self.discarded.contains(&c)
    }

    pub fn discarded(&self) -> impl Iterator<Item = char> + '_ {
        self.discarded.iter().copied()
    }

    pub fn normalize(&self, text: &str) -> CanonicalText {
        let composed: String = text
            .chars()
            .map(|c| if c == '\u{00A0}' { ' ' } else { c })
            .nfc()
            .collect();

        // Dropping a character can leave a base letter next to a combining
        // mark, so compose again to stay idempotent.
        let stripped = composed
            .chars()
            .filter(|c| !self.discards(*c))
            .nfc();

        let mut out = String::with_capacity(composed.len());
        let mut pending_space = false;
        for c in stripped {
            if c.is_whitespace() {
                pending_space = !out.is_empty();
                continue;
            }
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }

        CanonicalText(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("Hello, world!", "Hello world" ; "latin punctuation")]
    #[test_case("a\u{200B}b", "ab" ; "zero width space")]
    #[test_case("a\u{200C}b\u{200D}c\u{FEFF}", "abc" ; "joiners and bom")]
    #[test_case("a\u{00A0}b", "a b" ; "nbsp")]
    #[test_case("මම ගියා।", "මම ගියා" ; "sinhala danda")]
    #[test_case("  one\t\ttwo\n\nthree  ", "one two three" ; "whitespace runs")]
    #[test_case("\u{201C}quoted\u{201D} \u{2018}x\u{2019}", "quoted x" ; "curly quotes")]
    #[test_case("a \u{2014} b \u{2013} c-d", "a b cd" ; "dashes")]
    #[test_case("(x) [y] {z} <w> |v| /u\\", "x y z w v u" ; "brackets and separators")]
    #[test_case("", "" ; "empty")]
    #[test_case(" .,!? ", "" ; "only punctuation")]
    fn test_normalize_table(input: &str, expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn test_nfc_composes_decomposed_input() {
        assert_eq!(normalize("e\u{0301}"), "\u{00E9}");
        assert_eq!(normalize("e\u{0301}"), normalize("\u{00E9}"));
    }

    #[test]
    fn test_composes_across_removed_character() {
        let once = normalize("e.\u{0301}");
        assert_eq!(once, "\u{00E9}");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_greek_question_mark_is_punctuation_after_nfc() {
        // U+037E canonically decomposes to ';'
        assert_eq!(normalize("a\u{037E}"), "a");
    }

    #[test]
    fn test_multiline_sinhala_matches_flat_form() {
        assert_eq!(
            normalize("ඔයා අද free ද?\nහෙට 2.30pm meeting එකට එන්න."),
            normalize("ඔයා අද free ද? හෙට 230pm meeting එකට එන්න")
        );
    }

    #[test]
    fn test_normalize_opt_none_is_empty() {
        assert_eq!(normalize_opt(None), "");
        assert_eq!(normalize_opt(Some("x.")), "x");
    }

    #[test]
    fn test_extended_table() {
        let normalizer = Normalizer::default().with_discarded(['\u{0965}', '@']);
        assert!(normalizer.discards('\u{0965}'));
        assert_eq!(normalizer.normalize("මම @ ගියා\u{0965}").as_str(), "මම ගියා");
        // The default table is untouched.
        assert_eq!(normalize("a@b"), "a@b");
    }

    #[test]
    fn test_canonical_containment() {
        let n = Normalizer::default();
        let page = n.normalize("Singlish\nprefix මම ගෙදර ගියා suffix");
        assert!(page.contains(&n.normalize("මම ගෙදර ගියා.")));
        assert!(!page.contains(&n.normalize("මම ගෙදර ආවා")));
    }

    fn noisy_text() -> impl Strategy<Value = String> {
        let pieces = prop_oneof![
            Just("a"), Just("Z"), Just("9"), Just("e\u{0301}"), Just("\u{0301}"),
            Just("මම"), Just("ගෙදර"), Just("ක්\u{200D}ෂ"), Just("\u{0DCA}"),
            Just(" "), Just("\t"), Just("\n"), Just("\u{00A0}"), Just("\u{2003}"),
            Just("\u{200B}"), Just("\u{200C}"), Just("\u{FEFF}"),
            Just("."), Just("?"), Just("\u{0964}"), Just("\u{201C}"), Just("-"), Just("\u{037E}"),
        ];
        prop::collection::vec(pieces, 0..24).prop_map(|p| p.concat())
    }

    fn word() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![Just("a"), Just("b"), Just("මම"), Just("ගියා"), Just("e\u{0301}"), Just("!")],
            1..5,
        )
        .prop_map(|p| p.concat())
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(s in noisy_text()) {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_normalize_is_idempotent_for_any_string(s in any::<String>()) {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_extra_whitespace_between_words_is_ignored(
            words in prop::collection::vec(word(), 1..6),
            gaps in prop::collection::vec(prop_oneof![Just(" "), Just("  "), Just("\t"), Just("\n \t")], 6),
        ) {
            let single = words.join(" ");
            let mut spaced = String::from(gaps[0]);
            for (i, w) in words.iter().enumerate() {
                spaced.push_str(w);
                spaced.push_str(gaps[i + 1]);
            }
            prop_assert_eq!(normalize(&spaced), normalize(&single));
        }

        #[test]
        fn prop_output_has_no_discarded_or_unusual_spacing(s in noisy_text()) {
            let out = normalize(&s);
            prop_assert!(!out.starts_with(' ') && !out.ends_with(' '));
            prop_assert!(!out.contains("  "));
            prop_assert!(out.chars().all(|c| c == ' ' || !c.is_whitespace()));
            prop_assert!(!out.chars().any(|c| ZERO_WIDTH_CHARS.contains(&c) || PUNCTUATION_CHARS.contains(&c)));
        }
    }
}
