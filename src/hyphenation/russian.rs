//! Russian syllable rules: sonority sequencing, doubled consonants and
//! derivational prefix/suffix tables.

use super::affix::push_affix_breaks;
use super::codepoint::{
    is_cyrillic_consonant, is_cyrillic_letter, is_cyrillic_vowel, is_soft_or_hard_sign,
    segment_has, to_lower_cyrillic, CodepointInfo,
};
use super::{affix_lengths_ok, MIN_PREFIX_CP, MIN_SUFFIX_CP};

/// Longest consonant cluster considered as a syllable onset.
const MAX_ONSET_LEN: usize = 4;

const PREFIXES: [&[char]; 12] = [
    &['б', 'е', 'з'],
    &['р', 'а', 'з'],
    &['п', 'о', 'д'],
    &['н', 'а', 'д'],
    &['п', 'е', 'р', 'е'],
    &['с', 'в', 'е', 'р', 'х'],
    &['м', 'е', 'ж'],
    &['с', 'у', 'п', 'е', 'р'],
    &['п', 'р', 'е', 'д'],
    &['с', 'а', 'м', 'о'],
    &['о', 'б', 'о'],
    &['п', 'р', 'о', 'т', 'и', 'в'],
];

const SUFFIXES: [&[char]; 12] = [
    &['н', 'о', 'с', 'т'],
    &['с', 'т', 'в', 'о'],
    &['е', 'н', 'и', 'е'],
    &['а', 'ц', 'и', 'я'],
    &['ч', 'и', 'к'],
    &['н', 'и', 'к'],
    &['т', 'е', 'л', 'ь'],
    &['с', 'к', 'и', 'й'],
    &['а', 'л', 'ь', 'н', 'ы', 'й'],
    &['и', 'з', 'м'],
    &['л', 'и', 'в', 'ы', 'й'],
    &['о', 'с', 'т', 'ь'],
];

fn lower(cp: u32) -> char {
    char::from_u32(to_lower_cyrillic(cp)).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn is_short_i(cp: u32) -> bool {
    lower(cp) == 'й'
}

fn is_yeru(cp: u32) -> bool {
    lower(cp) == 'ы'
}

/// `в`, `з`, `с`: may open a cluster against the sonority slope.
fn is_prefix_consonant(cp: u32) -> bool {
    matches!(lower(cp), 'в' | 'з' | 'с')
}

fn is_sibilant(cp: u32) -> bool {
    matches!(lower(cp), 'з' | 'с' | 'ж' | 'ш' | 'щ' | 'ч' | 'ц')
}

fn is_stop(cp: u32) -> bool {
    matches!(lower(cp), 'б' | 'г' | 'д' | 'п' | 'т' | 'к')
}

/// Sonority rank: stops 0, voiceless fricatives/affricates 1, voiced
/// fricatives 2, nasals 3, liquids and `й` 4.
fn sonority(cp: u32) -> u8 {
    match lower(cp) {
        'л' | 'р' | 'й' => 4,
        'м' | 'н' => 3,
        'в' | 'з' | 'ж' => 2,
        'ф' | 'с' | 'ш' | 'щ' | 'ч' | 'ц' | 'х' => 1,
        'б' | 'г' | 'д' | 'п' | 'т' | 'к' => 0,
        _ => 1,
    }
}

fn cluster_is_valid_onset(cluster: &[CodepointInfo]) -> bool {
    if cluster.is_empty() {
        return false;
    }
    if cluster
        .iter()
        .any(|info| !is_cyrillic_consonant(info.value) || is_soft_or_hard_sign(info.value))
    {
        return false;
    }
    cluster.windows(2).enumerate().all(|(pos, pair)| {
        let (current, next) = (pair[0].value, pair[1].value);
        if sonority(current) <= sonority(next) {
            return true;
        }
        let prefix_allowance = pos == 0 && is_prefix_consonant(current);
        let sibilant_allowance = is_sibilant(current) && is_stop(next);
        prefix_allowance || sibilant_allowance
    })
}

fn onset_len(cps: &[CodepointInfo], cluster_start: usize, cluster_end: usize) -> usize {
    let cluster_len = cluster_end - cluster_start;
    (1..=cluster_len.min(MAX_ONSET_LEN))
        .rev()
        .find(|&len| cluster_is_valid_onset(&cps[cluster_end - len..cluster_end]))
        .unwrap_or(1)
}

/// Index between the first doubled consonant pair inside the cluster.
fn doubled_consonant_split(
    cps: &[CodepointInfo],
    cluster_start: usize,
    cluster_end: usize,
) -> Option<usize> {
    (cluster_start..cluster_end.saturating_sub(1))
        .find(|&i| {
            let (left, right) = (cps[i].value, cps[i + 1].value);
            is_cyrillic_consonant(left)
                && lower(left) == lower(right)
                && !is_soft_or_hard_sign(right)
        })
        .map(|i| i + 1)
}

fn is_vowel_at(cps: &[CodepointInfo], index: usize) -> bool {
    cps.get(index)
        .is_some_and(|info| is_cyrillic_vowel(info.value))
}

fn is_doubled_pair_at(cps: &[CodepointInfo], index: usize) -> bool {
    match (cps.get(index), cps.get(index + 1)) {
        (Some(first), Some(second)) => {
            is_cyrillic_consonant(first.value)
                && is_cyrillic_consonant(second.value)
                && lower(first.value) == lower(second.value)
        }
        _ => false,
    }
}

/// A break directly before or after a vowel-flanked doubled consonant would
/// move the whole pair to one side.
fn strands_doubled_consonant(cps: &[CodepointInfo], index: usize) -> bool {
    let leading = is_doubled_pair_at(cps, index)
        && index > 0
        && is_vowel_at(cps, index - 1)
        && is_vowel_at(cps, index + 2);
    let trailing = index >= 2
        && is_doubled_pair_at(cps, index - 2)
        && index >= 3
        && is_vowel_at(cps, index - 3)
        && is_vowel_at(cps, index);
    leading || trailing
}

fn next_to_sign(cps: &[CodepointInfo], index: usize) -> bool {
    if index == 0 || index >= cps.len() {
        return false;
    }
    is_soft_or_hard_sign(cps[index - 1].value) || is_soft_or_hard_sign(cps[index].value)
}

fn break_allowed(cps: &[CodepointInfo], index: usize) -> bool {
    if index == 0 || index >= cps.len() || !affix_lengths_ok(index, cps.len()) {
        return false;
    }
    if !segment_has(cps, 0, index, is_cyrillic_vowel)
        || !segment_has(cps, index, cps.len(), is_cyrillic_vowel)
    {
        return false;
    }
    let head = cps[index].value;
    if is_soft_or_hard_sign(head) || is_short_i(head) || is_yeru(head) {
        return false;
    }
    !next_to_sign(cps, index) && !strands_doubled_consonant(cps, index)
}

fn push_morphology_breaks(cps: &[CodepointInfo], out: &mut Vec<usize>) {
    let lowered: Vec<char> = cps
        .iter()
        .map(|info| {
            if is_cyrillic_letter(info.value) {
                lower(info.value)
            } else {
                char::from_u32(info.value).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
        })
        .collect();
    push_affix_breaks(
        &lowered,
        &PREFIXES,
        &SUFFIXES,
        |index| break_allowed(cps, index),
        out,
    );
}

/// Codepoint indexes where a Russian word may take a hyphen.
pub(crate) fn break_indexes(cps: &[CodepointInfo]) -> Vec<usize> {
    let mut indexes = Vec::new();
    if cps.len() < MIN_PREFIX_CP + MIN_SUFFIX_CP {
        return indexes;
    }

    let vowels: Vec<usize> = cps
        .iter()
        .enumerate()
        .filter(|(_, info)| is_cyrillic_vowel(info.value))
        .map(|(idx, _)| idx)
        .collect();

    for pair in vowels.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        let index = if right - left == 1 {
            right
        } else {
            doubled_consonant_split(cps, left + 1, right)
                .unwrap_or_else(|| right - onset_len(cps, left + 1, right))
        };
        if break_allowed(cps, index) {
            indexes.push(index);
        }
    }

    push_morphology_breaks(cps, &mut indexes);

    indexes.sort_unstable();
    indexes.dedup();
    indexes
}
