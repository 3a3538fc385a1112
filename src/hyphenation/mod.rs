//! Script-aware hyphenation.
//!
//! [`break_offsets`] is the single entry point used by layout: it trims
//! surrounding punctuation, honours explicit hyphens, dispatches to the
//! language engine registered for the word's script and optionally appends
//! unconditional fallback positions. It only proposes positions; deciding
//! whether a prefix fits is the line breaker's job.

pub mod codepoint;

mod affix;
mod english;
mod russian;

use codepoint::{
    decode_codepoints, detect_script, is_alphabetic, is_explicit_hyphen,
    trim_surrounding_punctuation, CodepointInfo, Script,
};

/// Minimum codepoints kept before a break.
pub const MIN_PREFIX_CP: usize = 2;
/// Minimum codepoints kept after a break.
pub const MIN_SUFFIX_CP: usize = 2;

pub(crate) fn affix_lengths_ok(index: usize, len: usize) -> bool {
    index >= MIN_PREFIX_CP && len.saturating_sub(index) >= MIN_SUFFIX_CP
}

/// Language rule engine, selected by script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LanguageHyphenator {
    English,
    Russian,
}

impl LanguageHyphenator {
    /// Every registered engine. `Script::Mixed` intentionally has none.
    pub const REGISTERED: [Self; 2] = [Self::English, Self::Russian];

    pub fn script(self) -> Script {
        match self {
            Self::English => Script::Latin,
            Self::Russian => Script::Cyrillic,
        }
    }

    pub fn for_script(script: Script) -> Option<Self> {
        Self::REGISTERED
            .into_iter()
            .find(|hyphenator| hyphenator.script() == script)
    }

    /// Sorted, unique codepoint indexes where `cps` may take a hyphen.
    pub fn break_indexes(self, cps: &[CodepointInfo]) -> Vec<usize> {
        match self {
            Self::English => english::break_indexes(cps),
            Self::Russian => russian::break_indexes(cps),
        }
    }
}

/// Byte offsets inside `word` where a hyphen plus line break may be inserted.
///
/// With `include_fallback`, every position leaving [`MIN_PREFIX_CP`] and
/// [`MIN_SUFFIX_CP`] codepoints on either side is offered as well, regardless
/// of linguistic legality.
pub fn break_offsets<W>(word: &W, include_fallback: bool) -> Vec<usize>
where
    W: AsRef<[u8]> + ?Sized,
{
    let bytes = word.as_ref();
    if bytes.is_empty() {
        return Vec::new();
    }
    let cps = decode_codepoints(bytes);
    if cps.len() < MIN_PREFIX_CP + MIN_SUFFIX_CP {
        return Vec::new();
    }

    let trimmed = trim_surrounding_punctuation(&cps);
    let mut offsets = Vec::with_capacity(cps.len());

    if let Some(offset) = explicit_hyphen_offset(trimmed) {
        offsets.push(offset);
    } else if trimmed.len() >= MIN_PREFIX_CP + MIN_SUFFIX_CP
        && trimmed.iter().all(|info| is_alphabetic(info.value))
    {
        if let Some(hyphenator) = LanguageHyphenator::for_script(detect_script(trimmed)) {
            offsets.extend(
                hyphenator
                    .break_indexes(trimmed)
                    .into_iter()
                    .filter_map(|idx| trimmed.get(idx).map(|info| info.byte_offset)),
            );
        }
    }

    if include_fallback {
        offsets.extend(
            (MIN_PREFIX_CP..=cps.len() - MIN_SUFFIX_CP).map(|idx| cps[idx].byte_offset),
        );
    }

    offsets.sort_unstable();
    offsets.dedup();
    offsets
}

/// Offset just after the first hyphen that sits between two letters.
fn explicit_hyphen_offset(cps: &[CodepointInfo]) -> Option<usize> {
    cps.windows(3).find_map(|window| {
        (is_explicit_hyphen(window[1].value)
            && is_alphabetic(window[0].value)
            && is_alphabetic(window[2].value))
        .then_some(window[2].byte_offset)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(word: &str, offset: usize) -> (&str, &str) {
        word.split_at(offset)
    }

    #[test]
    fn empty_and_short_words_have_no_offsets() {
        assert!(break_offsets("", true).is_empty());
        assert!(break_offsets("a", true).is_empty());
        assert!(break_offsets("cat", true).is_empty());
        assert!(break_offsets("кот", true).is_empty());
    }

    #[test]
    fn english_offsets_are_byte_offsets() {
        assert_eq!(break_offsets("hello", false), vec![3]);
    }

    #[test]
    fn cyrillic_offsets_land_on_char_boundaries() {
        let word = "привет";
        let offsets = break_offsets(word, false);
        assert_eq!(offsets, vec![6]);
        assert_eq!(split(word, 6), ("при", "вет"));
    }

    #[test]
    fn surrounding_punctuation_is_ignored() {
        let word = "\"hello,\"";
        let offsets = break_offsets(word, false);
        assert_eq!(offsets, vec![4]);
        assert_eq!(split(word, 4), ("\"hel", "lo,\""));
    }

    #[test]
    fn explicit_hyphen_overrides_rules() {
        let word = "well-known";
        assert_eq!(break_offsets(word, false), vec![5]);
        let word = "мать-и-мачеха";
        let offsets = break_offsets(word, false);
        assert_eq!(offsets.len(), 1);
        assert_eq!(split(word, offsets[0]).0, "мать-");
    }

    #[test]
    fn unicode_hyphen_counts_as_explicit() {
        let word = "self\u{2010}made";
        assert_eq!(break_offsets(word, false), vec![7]);
    }

    #[test]
    fn hyphen_not_between_letters_is_not_explicit() {
        assert!(break_offsets("-hello", false).is_empty());
        assert_eq!(break_offsets("12-34", false), Vec::<usize>::new());
    }

    #[test]
    fn non_alphabetic_words_only_get_fallback() {
        assert!(break_offsets("12345", false).is_empty());
        assert!(break_offsets("test123", false).is_empty());
        assert_eq!(break_offsets("12345", true), vec![2, 3]);
    }

    #[test]
    fn mixed_script_has_no_rule_offsets() {
        assert!(break_offsets("testтест", false).is_empty());
        assert!(!break_offsets("testтест", true).is_empty());
    }

    #[test]
    fn fallback_offsets_are_sorted_and_unique() {
        let offsets = break_offsets("bcdfghjkl", true);
        assert_eq!(offsets, (2..=7).collect::<Vec<_>>());
        let offsets = break_offsets("beautiful", true);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn malformed_utf8_never_stalls() {
        let bytes = [b'a', 0xFF, 0xFE, b'b', b'c', 0xC3];
        let offsets = break_offsets(&bytes[..], true);
        assert_eq!(offsets, vec![2, 3, 4]);
    }

    #[test]
    fn registry_covers_latin_and_cyrillic_only() {
        assert_eq!(
            LanguageHyphenator::for_script(Script::Latin),
            Some(LanguageHyphenator::English)
        );
        assert_eq!(
            LanguageHyphenator::for_script(Script::Cyrillic),
            Some(LanguageHyphenator::Russian)
        );
        assert_eq!(LanguageHyphenator::for_script(Script::Mixed), None);
    }

    #[test]
    fn split_recombines_to_original() {
        for word in ["beautiful", "привет", "teacher", "достопримечательность"] {
            for offset in break_offsets(word, false) {
                let (head, tail) = split(word, offset);
                assert!(!head.is_empty() && !tail.is_empty());
                assert_eq!(format!("{head}{tail}"), word);
            }
        }
    }
}
