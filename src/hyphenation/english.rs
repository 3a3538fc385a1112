//! English syllable and morphology rules for Latin-script words.

use super::affix::push_affix_breaks;
use super::codepoint::{
    is_latin_consonant, is_latin_letter, is_latin_vowel, segment_has, to_lower_latin,
    CodepointInfo,
};
use super::{affix_lengths_ok, MIN_PREFIX_CP, MIN_SUFFIX_CP};

const PREFIXES: [&[u8]; 20] = [
    b"anti", b"auto", b"counter", b"de", b"dis", b"hyper", b"inter", b"micro", b"mis", b"mono",
    b"multi", b"non", b"over", b"post", b"pre", b"pro", b"re", b"sub", b"super", b"trans",
];

const SUFFIXES: [&[u8]; 24] = [
    b"able", b"ible", b"ing", b"ings", b"ed", b"er", b"ers", b"est", b"ful", b"hood", b"less",
    b"lessly", b"ly", b"ment", b"ments", b"ness", b"ous", b"tion", b"sion", b"ward", b"wards",
    b"ship", b"ships", b"y",
];

const ONSET_DIGRAPHS: [[u8; 2]; 12] = [
    *b"ch", *b"sh", *b"th", *b"ph", *b"wh", *b"wr", *b"kn", *b"gn", *b"ps", *b"pt", *b"pn",
    *b"rh",
];

const ONSET_TRIGRAMS: [[u8; 3]; 14] = [
    *b"spl", *b"spr", *b"spw", *b"str", *b"stw", *b"sty", *b"skl", *b"skr", *b"skw", *b"scl",
    *b"scr", *b"sfr", *b"shr", *b"thr",
];

/// Lower-case ASCII letter for a Latin codepoint, `0` otherwise.
fn lower_char(cp: u32) -> u8 {
    if !is_latin_letter(cp) {
        return 0;
    }
    u8::try_from(to_lower_latin(cp)).unwrap_or(0)
}

fn is_approximant(c: u8) -> bool {
    matches!(c, b'l' | b'r' | b'w' | b'y')
}

fn is_stop(c: u8) -> bool {
    matches!(c, b'p' | b'b' | b't' | b'd' | b'k' | b'g' | b'c' | b'q')
}

fn is_fricative(c: u8) -> bool {
    matches!(c, b'f' | b'v' | b's' | b'z' | b'h' | b'x')
}

fn is_diphthong(first: u32, second: u32) -> bool {
    let (f, s) = (lower_char(first), lower_char(second));
    match f {
        b'a' => matches!(s, b'i' | b'y' | b'u'),
        b'e' => matches!(s, b'a' | b'e' | b'i' | b'o' | b'u' | b'y'),
        b'i' => matches!(s, b'e' | b'u' | b'a'),
        b'o' => matches!(s, b'a' | b'e' | b'i' | b'o' | b'u' | b'y'),
        b'u' => matches!(s, b'i' | b'a' | b'e'),
        _ => false,
    }
}

fn is_onset_bigram(first: u8, second: u8) -> bool {
    if ONSET_DIGRAPHS.contains(&[first, second]) {
        return true;
    }
    if (is_stop(first) || is_fricative(first)) && is_approximant(second) {
        return true;
    }
    if first == b's' && matches!(second, b'p' | b't' | b'k' | b'm' | b'n' | b'f' | b'l' | b'w' | b'c')
    {
        return true;
    }
    second == b'y' && is_latin_consonant(u32::from(first))
}

fn is_onset_trigram(first: u8, second: u8, third: u8) -> bool {
    ONSET_TRIGRAMS.contains(&[first, second, third])
}

fn cluster_is_valid_onset(cluster: &[CodepointInfo]) -> bool {
    let mut chars = [0u8; 3];
    if cluster.is_empty() || cluster.len() > chars.len() {
        return false;
    }
    for (slot, info) in chars.iter_mut().zip(cluster) {
        let ch = lower_char(info.value);
        if ch == 0 || (!is_latin_consonant(info.value) && ch != b'y') {
            return false;
        }
        *slot = ch;
    }
    match cluster.len() {
        1 => true,
        2 => is_onset_bigram(chars[0], chars[1]),
        _ => is_onset_trigram(chars[0], chars[1], chars[2]),
    }
}

/// Longest legal onset ending at `cluster_end`, defaulting to one consonant.
fn onset_len(cps: &[CodepointInfo], cluster_start: usize, cluster_end: usize) -> usize {
    let cluster_len = cluster_end - cluster_start;
    (1..=cluster_len.min(3))
        .rev()
        .find(|&len| cluster_is_valid_onset(&cps[cluster_end - len..cluster_end]))
        .unwrap_or(1)
}

fn next_to_apostrophe(cps: &[CodepointInfo], index: usize) -> bool {
    if index == 0 || index >= cps.len() {
        return false;
    }
    let apostrophe = u32::from(b'\'');
    cps[index - 1].value == apostrophe || cps[index].value == apostrophe
}

fn push_morphology_breaks(cps: &[CodepointInfo], out: &mut Vec<usize>) {
    let lower: Vec<u8> = cps.iter().map(|info| lower_char(info.value)).collect();
    let len = cps.len();
    push_affix_breaks(
        &lower,
        &PREFIXES,
        &SUFFIXES,
        |index| {
            affix_lengths_ok(index, len)
                && segment_has(cps, 0, index, is_latin_vowel)
                && segment_has(cps, index, len, is_latin_vowel)
                && !next_to_apostrophe(cps, index)
        },
        out,
    );
}

/// Codepoint indexes where an English word may take a hyphen.
pub(crate) fn break_indexes(cps: &[CodepointInfo]) -> Vec<usize> {
    let mut indexes = Vec::new();
    if cps.len() < MIN_PREFIX_CP + MIN_SUFFIX_CP {
        return indexes;
    }

    let vowels: Vec<usize> = cps
        .iter()
        .enumerate()
        .filter(|(_, info)| is_latin_vowel(info.value))
        .map(|(idx, _)| idx)
        .collect();

    for pair in vowels.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        let index = if right - left == 1 {
            if is_diphthong(cps[left].value, cps[right].value) {
                continue;
            }
            right
        } else {
            right - onset_len(cps, left + 1, right)
        };
        if affix_lengths_ok(index, cps.len()) && !next_to_apostrophe(cps, index) {
            indexes.push(index);
        }
    }

    push_morphology_breaks(cps, &mut indexes);

    indexes.sort_unstable();
    indexes.dedup();
    indexes
}
