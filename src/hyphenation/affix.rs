//! Prefix/suffix table matching shared by the language engines.

/// Push break indexes for every table prefix that starts `lower` and every
/// table suffix that ends it, subject to `allowed`.
///
/// Literals must be strictly shorter than the word to produce a break.
pub(crate) fn push_affix_breaks<T, A>(
    lower: &[T],
    prefixes: &[&[T]],
    suffixes: &[&[T]],
    mut allowed: A,
    out: &mut Vec<usize>,
) where
    T: PartialEq,
    A: FnMut(usize) -> bool,
{
    let len = lower.len();
    for prefix in prefixes {
        if prefix.is_empty() || prefix.len() >= len {
            continue;
        }
        if lower.starts_with(prefix) && allowed(prefix.len()) {
            out.push(prefix.len());
        }
    }
    for suffix in suffixes {
        if suffix.is_empty() || suffix.len() >= len {
            continue;
        }
        let index = len - suffix.len();
        if lower.ends_with(suffix) && allowed(index) {
            out.push(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_prefixes_and_suffixes() {
        let word = b"rebuilding";
        let mut out = Vec::new();
        let prefixes: [&[u8]; 2] = [b"re", b"rebuildingx"];
        let suffixes: [&[u8]; 2] = [b"ing", b"ed"];
        push_affix_breaks(&word[..], &prefixes, &suffixes, |_| true, &mut out);
        assert_eq!(out, vec![2, 7]);
    }

    #[test]
    fn whole_word_literal_is_not_a_break() {
        let word = b"ing";
        let mut out = Vec::new();
        let suffixes: [&[u8]; 1] = [b"ing"];
        push_affix_breaks(&word[..], &[], &suffixes, |_| true, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn predicate_filters_candidates() {
        let word = b"rebuilding";
        let mut out = Vec::new();
        let prefixes: [&[u8]; 1] = [b"re"];
        push_affix_breaks(&word[..], &prefixes, &[], |idx| idx > 2, &mut out);
        assert!(out.is_empty());
    }
}
