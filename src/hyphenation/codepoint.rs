//! Codepoint decoding and script/letter classification.
//!
//! Everything here is a pure function over Unicode scalar values. Only the
//! Latin and Cyrillic alphabets are classified; any other scalar is neither a
//! letter nor a vowel for hyphenation purposes.

use smallvec::SmallVec;

/// One decoded scalar value and where its first byte sits in the source word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodepointInfo {
    /// Unicode scalar value (or the raw byte for a malformed lead byte).
    pub value: u32,
    /// Offset of the first encoded byte in the source buffer.
    pub byte_offset: usize,
}

/// Inline buffer sized for typical words; longer words spill to the heap.
pub type Codepoints = SmallVec<[CodepointInfo; 24]>;

/// Script detected for a word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    Cyrillic,
    /// Both alphabets, or no letters at all. No language rules apply.
    Mixed,
}

const SOFT_SIGN: u32 = 0x044C;
const HARD_SIGN: u32 = 0x044A;
const CYRILLIC_YO_UPPER: u32 = 0x0401;
const CYRILLIC_YO_LOWER: u32 = 0x0451;

/// Decode `bytes` into codepoints.
///
/// A lead byte that does not start a complete, well-formed sequence is taken
/// as a single scalar of its own byte value, so the scan always advances.
pub fn decode_codepoints(bytes: &[u8]) -> Codepoints {
    let mut out = Codepoints::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let (value, len) = decode_one(&bytes[pos..]);
        out.push(CodepointInfo {
            value,
            byte_offset: pos,
        });
        pos += len.max(1);
    }
    out
}

fn decode_one(bytes: &[u8]) -> (u32, usize) {
    let lead = bytes[0];
    let (len, initial) = match lead {
        0x00..=0x7F => return (u32::from(lead), 1),
        0xC2..=0xDF => (2, u32::from(lead & 0x1F)),
        0xE0..=0xEF => (3, u32::from(lead & 0x0F)),
        0xF0..=0xF4 => (4, u32::from(lead & 0x07)),
        _ => return (u32::from(lead), 1),
    };
    if bytes.len() < len {
        return (u32::from(lead), 1);
    }
    let mut value = initial;
    for &byte in &bytes[1..len] {
        if byte & 0xC0 != 0x80 {
            return (u32::from(lead), 1);
        }
        value = (value << 6) | u32::from(byte & 0x3F);
    }
    (value, len)
}

pub fn to_lower_latin(cp: u32) -> u32 {
    if (u32::from(b'A')..=u32::from(b'Z')).contains(&cp) {
        cp + 0x20
    } else {
        cp
    }
}

pub fn to_lower_cyrillic(cp: u32) -> u32 {
    match cp {
        0x0410..=0x042F => cp + 0x20,
        CYRILLIC_YO_UPPER => CYRILLIC_YO_LOWER,
        _ => cp,
    }
}

/// Lower-case a single scalar in whichever supported alphabet it belongs to.
pub fn to_lower(cp: u32) -> u32 {
    if is_latin_letter(cp) {
        to_lower_latin(cp)
    } else {
        to_lower_cyrillic(cp)
    }
}

pub fn is_latin_letter(cp: u32) -> bool {
    (u32::from(b'A')..=u32::from(b'Z')).contains(&cp)
        || (u32::from(b'a')..=u32::from(b'z')).contains(&cp)
}

pub fn is_latin_vowel(cp: u32) -> bool {
    matches!(
        char::from_u32(to_lower_latin(cp)),
        Some('a' | 'e' | 'i' | 'o' | 'u' | 'y')
    )
}

pub fn is_latin_consonant(cp: u32) -> bool {
    is_latin_letter(cp) && !is_latin_vowel(cp)
}

pub fn is_cyrillic_letter(cp: u32) -> bool {
    (0x0400..=0x052F).contains(&cp)
}

pub fn is_cyrillic_vowel(cp: u32) -> bool {
    matches!(
        to_lower_cyrillic(cp),
        0x0430 // а
            | 0x0435 // е
            | CYRILLIC_YO_LOWER // ё
            | 0x0438 // и
            | 0x043E // о
            | 0x0443 // у
            | 0x044B // ы
            | 0x044D // э
            | 0x044E // ю
            | 0x044F // я
    )
}

pub fn is_cyrillic_consonant(cp: u32) -> bool {
    is_cyrillic_letter(cp) && !is_cyrillic_vowel(cp)
}

/// `ь` or `ъ`, in either case.
pub fn is_soft_or_hard_sign(cp: u32) -> bool {
    matches!(to_lower_cyrillic(cp), SOFT_SIGN | HARD_SIGN)
}

pub fn is_alphabetic(cp: u32) -> bool {
    is_latin_letter(cp) || is_cyrillic_letter(cp)
}

pub fn is_vowel(cp: u32) -> bool {
    is_latin_vowel(cp) || is_cyrillic_vowel(cp)
}

pub fn is_punctuation(cp: u32) -> bool {
    let Some(ch) = char::from_u32(cp) else {
        return false;
    };
    matches!(
        ch,
        '.' | ','
            | '!'
            | '?'
            | ';'
            | ':'
            | '"'
            | '\''
            | '('
            | ')'
            | '['
            | ']'
            | '{'
            | '}'
            | '/'
            | '\u{00AB}' // «
            | '\u{00BB}' // »
            | '\u{2018}'
            | '\u{2019}'
            | '\u{201C}'
            | '\u{201D}'
            | '\u{203A}' // ›
            | '\u{2026}' // …
    )
}

/// Hyphen-minus or the Unicode hyphen.
pub fn is_explicit_hyphen(cp: u32) -> bool {
    cp == u32::from(b'-') || cp == 0x2010
}

fn is_trimmable(cp: u32) -> bool {
    is_punctuation(cp) || char::from_u32(cp).is_some_and(char::is_whitespace)
}

/// Strip leading/trailing punctuation and whitespace, keeping byte offsets.
pub fn trim_surrounding_punctuation(cps: &[CodepointInfo]) -> &[CodepointInfo] {
    let start = cps
        .iter()
        .position(|info| !is_trimmable(info.value))
        .unwrap_or(cps.len());
    let end = cps
        .iter()
        .rposition(|info| !is_trimmable(info.value))
        .map_or(start, |idx| idx + 1);
    &cps[start..end]
}

pub fn detect_script(cps: &[CodepointInfo]) -> Script {
    let mut has_latin = false;
    let mut has_cyrillic = false;
    for info in cps {
        if is_latin_letter(info.value) {
            has_latin = true;
        } else if is_cyrillic_letter(info.value) {
            has_cyrillic = true;
        }
    }
    match (has_latin, has_cyrillic) {
        (true, false) => Script::Latin,
        (false, true) => Script::Cyrillic,
        _ => Script::Mixed,
    }
}

/// True when any codepoint in `cps[start..end]` satisfies `pred`.
pub(crate) fn segment_has(
    cps: &[CodepointInfo],
    start: usize,
    end: usize,
    pred: fn(u32) -> bool,
) -> bool {
    let end = end.min(cps.len());
    start < end && cps[start..end].iter().any(|info| pred(info.value))
}
