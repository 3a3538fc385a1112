//! Paragraph line breaking.
//!
//! Two policies, selected by [`LayoutConfig::hyphenation_enabled`]:
//!
//! - disabled: oversized words are force-split up front, then a
//!   minimal-raggedness dynamic program picks the breaks;
//! - enabled: greedy packing that asks the hyphenator for a split whenever
//!   the next word overflows the line.
//!
//! Finalized lines are removed from the front of the [`WordQueue`] and handed
//! to the caller's sink as [`LineRecord`]s.

use crate::hyphenation::{break_offsets, codepoint::is_explicit_hyphen};
use crate::line_record::{Alignment, LineRecord};
use crate::measure::{FontId, TextMeasurer};
use crate::text::{Word, WordQueue};

/// Hard cap on lines produced by one layout call.
pub const MAX_LINES_PER_PARAGRAPH: usize = 1000;

/// First-line indent marker (U+2003 EM SPACE), used when paragraphs are not
/// separated by extra vertical spacing.
pub const INDENT_MARKER: &str = "\u{2003}";

/// Line breaking configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Available line width in pixels.
    pub page_width: i32,
    pub font_id: FontId,
    pub hyphenation_enabled: bool,
    /// When `false`, the first word of each paragraph gets [`INDENT_MARKER`].
    pub extra_paragraph_spacing: bool,
    /// When `false`, the last computed line stays in the queue so more words
    /// can be appended before the next call.
    pub include_last_line: bool,
    pub max_lines: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 480,
            font_id: 0,
            hyphenation_enabled: false,
            extra_paragraph_spacing: true,
            include_last_line: true,
            max_lines: MAX_LINES_PER_PARAGRAPH,
        }
    }
}

impl LayoutConfig {
    /// Defaults for a given line width.
    pub fn for_width(page_width: i32) -> Self {
        Self {
            page_width,
            ..Self::default()
        }
    }
}

/// Chosen split of a word against an available width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HyphenSplit {
    /// Byte offset where the tail starts.
    pub byte_offset: usize,
    /// Width of the head including its trailing hyphen.
    pub prefix_width: i32,
    /// Whether a `-` must be appended (the head does not already end in one).
    pub append_hyphen: bool,
}

/// Line breaker bound to a measurer.
pub struct LineBreaker<'a, M: TextMeasurer + ?Sized> {
    config: LayoutConfig,
    measurer: &'a M,
}

impl<'a, M: TextMeasurer + ?Sized> LineBreaker<'a, M> {
    pub fn new(config: LayoutConfig, measurer: &'a M) -> Self {
        Self { config, measurer }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out `queue` and emit each finalized line to `on_line`.
    ///
    /// Returns the number of lines emitted. Emitted words are removed from the
    /// queue; anything left (the held-back last line, or words past the line
    /// cap) stays for the caller.
    pub fn layout_and_extract_lines<F>(&self, queue: &mut WordQueue, mut on_line: F) -> usize
    where
        F: FnMut(LineRecord),
    {
        if queue.is_empty() {
            return 0;
        }
        if !self.config.extra_paragraph_spacing {
            queue.apply_indent(INDENT_MARKER);
        }

        let page_width = self.config.page_width.max(0);
        let space_width = self.measurer.space_width(self.config.font_id).max(0);

        let (widths, breaks) = if self.config.hyphenation_enabled {
            self.greedy_breaks(queue, page_width, space_width)
        } else {
            let widths = self.presplit_word_widths(queue, page_width);
            let breaks = optimal_breaks(&widths, page_width, space_width, self.max_lines());
            (widths, breaks)
        };
        if breaks.len() >= self.max_lines() && breaks.last().is_some_and(|end| *end < widths.len())
        {
            log::warn!(
                "line cap reached ({} lines), {} words left unlaid",
                breaks.len(),
                widths.len() - breaks.last().copied().unwrap_or(0)
            );
        }

        let line_count = if self.config.include_last_line {
            breaks.len()
        } else {
            breaks.len().saturating_sub(1)
        };

        // A line cut off by the line cap still has words after it.
        let paragraph_complete = breaks.last() == Some(&widths.len());
        let alignment = queue.alignment();
        let mut start = 0usize;
        let mut emitted = 0usize;
        for (line_index, &end) in breaks.iter().take(line_count).enumerate() {
            let is_last_line = paragraph_complete && line_index + 1 == breaks.len();
            let words = queue.take_front(end - start);
            let line_widths = widths.get(start..end).unwrap_or(&[]);
            if let Some(record) =
                finalize_line(words, line_widths, page_width, space_width, alignment, is_last_line)
            {
                on_line(record);
                emitted += 1;
            }
            start = end;
        }
        emitted
    }

    /// Pick the widest head of `word` that fits `available_width` pixels.
    ///
    /// Candidates come from the hyphenator in ascending order; the scan keeps
    /// the latest one that fits and stops at the first that does not. A head
    /// already ending in an explicit hyphen is measured as-is; any other head
    /// needs room for an appended `-`.
    pub fn split_for_width(
        &self,
        word: &Word,
        available_width: i32,
        include_fallback: bool,
    ) -> Option<HyphenSplit> {
        if available_width <= 0 {
            return None;
        }
        let font_id = self.config.font_id;
        let hyphen_width = self.measurer.hyphen_width(font_id, word.style);
        let adjusted_width = available_width - hyphen_width;
        if adjusted_width <= 0 {
            return None;
        }

        let mut chosen = None;
        for offset in break_offsets(word.text.as_str(), include_fallback) {
            let Some(head) = word.text.get(..offset) else {
                continue;
            };
            let head_width = self.measurer.text_width(font_id, head, word.style);
            let ends_with_hyphen = head
                .chars()
                .next_back()
                .is_some_and(|ch| is_explicit_hyphen(u32::from(ch)));
            let (fits, prefix_width) = if ends_with_hyphen {
                (head_width <= available_width, head_width)
            } else {
                (head_width <= adjusted_width, head_width + hyphen_width)
            };
            if !fits {
                break;
            }
            chosen = Some(HyphenSplit {
                byte_offset: offset,
                prefix_width,
                append_hyphen: !ends_with_hyphen,
            });
        }
        chosen
    }

    fn max_lines(&self) -> usize {
        self.config.max_lines.max(1)
    }

    fn measure(&self, word: &Word) -> i32 {
        self.measurer
            .text_width(self.config.font_id, &word.text, word.style)
    }

    fn apply_split(&self, queue: &mut WordQueue, index: usize, split: HyphenSplit) -> bool {
        queue.split_word(index, split.byte_offset, split.append_hyphen)
    }

    /// Measure every word, force-splitting any word wider than the page so
    /// each surviving width fits on a line of its own. Tails are re-measured
    /// (and split again if still too wide).
    fn presplit_word_widths(&self, queue: &mut WordQueue, page_width: i32) -> Vec<i32> {
        let mut widths = Vec::with_capacity(queue.len());
        let mut index = 0usize;
        while let Some(word) = queue.get(index) {
            let width = self.measure(word);
            if width > page_width {
                if let Some(split) = self.split_for_width(word, page_width, true) {
                    if self.apply_split(queue, index, split) {
                        log::debug!("force split oversized word at byte {}", split.byte_offset);
                        widths.push(split.prefix_width);
                        index += 1;
                        continue;
                    }
                }
                log::warn!(
                    "word wider than page cannot be split ({}px > {}px)",
                    width,
                    page_width
                );
            }
            widths.push(width);
            index += 1;
        }
        widths
    }

    /// Greedy packing with on-demand hyphenation. Returns word widths and the
    /// exclusive end index of every line.
    fn greedy_breaks(
        &self,
        queue: &mut WordQueue,
        page_width: i32,
        space_width: i32,
    ) -> (Vec<i32>, Vec<usize>) {
        let mut widths: Vec<i32> = queue.iter().map(|word| self.measure(word)).collect();
        let mut breaks = Vec::with_capacity(widths.len().min(64));
        let max_lines = self.max_lines();
        let mut index = 0usize;

        while index < widths.len() && breaks.len() < max_lines {
            let mut line_width = 0i32;
            let mut words_on_line = 0usize;

            while index < widths.len() {
                let gap = if words_on_line == 0 { 0 } else { space_width };
                let projected = line_width + gap + widths[index];
                if projected <= page_width {
                    line_width = projected;
                    index += 1;
                    words_on_line += 1;
                    continue;
                }

                // An empty line must make progress: fall back to any split
                // position against the full width, or place the word whole.
                let line_is_empty = words_on_line == 0;
                let available = page_width - line_width - gap;
                let split = queue
                    .get(index)
                    .and_then(|word| self.split_for_width(word, available, line_is_empty));
                match split {
                    Some(split) if self.apply_split(queue, index, split) => {
                        if line_is_empty {
                            log::debug!("forced split at byte {}", split.byte_offset);
                        }
                        let tail_width = queue.get(index + 1).map_or(0, |word| self.measure(word));
                        widths[index] = split.prefix_width;
                        widths.insert(index + 1, tail_width);
                        index += 1;
                        words_on_line += 1;
                    }
                    _ if line_is_empty => {
                        log::warn!(
                            "unbreakable word overflows line ({}px > {}px)",
                            widths[index],
                            page_width
                        );
                        index += 1;
                        words_on_line += 1;
                    }
                    _ => {}
                }
                break;
            }

            breaks.push(index);
        }
        (widths, breaks)
    }
}

/// Minimal-raggedness breaks over `widths`.
///
/// `cost[i]` is the best total squared slack for words `i..`; a line ending at
/// the last word costs 0. A word wider than the page may only stand alone.
/// Returns exclusive line end indices.
pub fn optimal_breaks(
    widths: &[i32],
    page_width: i32,
    space_width: i32,
    max_lines: usize,
) -> Vec<usize> {
    let count = widths.len();
    if count == 0 {
        return Vec::new();
    }
    let page_width = i64::from(page_width);
    let space_width = i64::from(space_width);

    let mut cost = vec![0u64; count + 1];
    let mut line_end = vec![count; count];

    for start in (0..count).rev() {
        let mut best = u64::MAX;
        let mut best_end = start + 1;
        let mut line_width = -space_width;

        for end in start..count {
            line_width += i64::from(widths[end]) + space_width;
            let overflow = line_width > page_width;
            if overflow && end > start {
                break;
            }

            let candidate = if end + 1 == count {
                0
            } else {
                let slack = page_width - line_width;
                slack
                    .unsigned_abs()
                    .saturating_mul(slack.unsigned_abs())
                    .saturating_add(cost[end + 1])
            };
            if candidate < best {
                best = candidate;
                best_end = end + 1;
            }
            if overflow {
                break;
            }
        }

        cost[start] = best;
        line_end[start] = best_end;
    }

    let mut breaks = Vec::with_capacity(count.min(max_lines));
    let mut start = 0usize;
    while start < count && breaks.len() < max_lines {
        let end = line_end[start];
        breaks.push(end);
        start = end;
    }
    breaks
}

/// Total squared slack of `breaks`, excluding the last line.
pub fn raggedness(widths: &[i32], breaks: &[usize], page_width: i32, space_width: i32) -> u64 {
    let mut total = 0u64;
    let mut start = 0usize;
    for (idx, &end) in breaks.iter().enumerate() {
        if idx + 1 < breaks.len() {
            let line = line_width(widths.get(start..end).unwrap_or(&[]), space_width);
            let slack = i64::from(page_width) - line;
            total = total.saturating_add(slack.unsigned_abs().saturating_mul(slack.unsigned_abs()));
        }
        start = end;
    }
    total
}

/// Rendered width of words plus natural inter-word spaces.
pub fn line_width(widths: &[i32], space_width: i32) -> i64 {
    let words: i64 = widths.iter().map(|w| i64::from(*w)).sum();
    let gaps = widths.len().saturating_sub(1) as i64;
    words + gaps * i64::from(space_width)
}

/// Compute pen offsets for one line and build its record.
fn finalize_line(
    words: Vec<Word>,
    widths: &[i32],
    page_width: i32,
    space_width: i32,
    alignment: Alignment,
    is_last_line: bool,
) -> Option<LineRecord> {
    let word_count = words.len();
    if word_count == 0 || widths.len() != word_count {
        return None;
    }
    let gaps = (word_count - 1) as i32;
    let words_width: i32 = widths.iter().sum();
    let spare_space = page_width - words_width;
    let natural_slack = (spare_space - gaps * space_width).max(0);

    let justify = alignment == Alignment::Justified && !is_last_line && word_count >= 2;
    let (gap_base, gap_remainder) = if justify {
        let spare = spare_space.max(0);
        (spare / gaps, spare % gaps)
    } else {
        (space_width, 0)
    };

    let mut x = match alignment {
        Alignment::Right => natural_slack,
        Alignment::Center => natural_slack / 2,
        Alignment::Left | Alignment::Justified => 0,
    };

    let mut x_offsets = Vec::with_capacity(word_count);
    for (idx, width) in widths.iter().enumerate() {
        x_offsets.push(clamp_u16(x));
        let extra = i32::from((idx as i32) < gap_remainder);
        x += width + gap_base + extra;
    }

    let mut texts = Vec::with_capacity(word_count);
    let mut styles = Vec::with_capacity(word_count);
    for word in words {
        texts.push(word.text);
        styles.push(word.style);
    }
    match LineRecord::new(texts, x_offsets, styles, alignment) {
        Ok(record) => Some(record),
        Err(err) => {
            log::warn!("dropping malformed line: {}", err);
            None
        }
    }
}

fn clamp_u16(value: i32) -> u16 {
    u16::try_from(value.max(0)).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::FixedAdvanceMeasurer;
    use crate::text::FontStyle;

    const MEASURER: FixedAdvanceMeasurer = FixedAdvanceMeasurer::new(10, 5, 5);

    fn queue_of(text: &str, alignment: Alignment) -> WordQueue {
        let mut queue = WordQueue::new(alignment);
        queue.push_text(text, FontStyle::Regular);
        queue
    }

    fn config(page_width: i32, hyphenation_enabled: bool) -> LayoutConfig {
        LayoutConfig {
            hyphenation_enabled,
            ..LayoutConfig::for_width(page_width)
        }
    }

    fn run(config: LayoutConfig, queue: &mut WordQueue) -> Vec<LineRecord> {
        let breaker = LineBreaker::new(config, &MEASURER);
        let mut lines = Vec::new();
        breaker.layout_and_extract_lines(queue, |line| lines.push(line));
        lines
    }

    #[test]
    fn split_for_width_respects_hyphen_width() {
        let breaker = LineBreaker::new(LayoutConfig::default(), &MEASURER);
        let word = Word::new("hello", FontStyle::Regular);
        let split = breaker.split_for_width(&word, 35, false);
        assert_eq!(
            split,
            Some(HyphenSplit {
                byte_offset: 3,
                prefix_width: 35,
                append_hyphen: true,
            })
        );
        assert_eq!(breaker.split_for_width(&word, 34, false), None);
        assert_eq!(breaker.split_for_width(&word, 10, false), None);
        assert_eq!(breaker.split_for_width(&word, 10, true), None);
        assert_eq!(breaker.split_for_width(&word, 0, true), None);
    }

    #[test]
    fn split_for_width_keeps_widest_fitting_candidate() {
        let breaker = LineBreaker::new(LayoutConfig::default(), &MEASURER);
        let word = Word::new("abcdefgh", FontStyle::Regular);
        // Fallback candidates 2..=6; 55px leaves room for five letters.
        let split = breaker.split_for_width(&word, 55, true);
        assert_eq!(split.map(|s| s.byte_offset), Some(5));
    }

    #[test]
    fn explicit_hyphen_head_is_not_hyphenated_twice() {
        let breaker = LineBreaker::new(LayoutConfig::default(), &MEASURER);
        let word = Word::new("well-known", FontStyle::Regular);
        let split = breaker
            .split_for_width(&word, 45, false)
            .expect("explicit hyphen fits");
        assert_eq!(split.byte_offset, 5);
        assert_eq!(split.prefix_width, 45);
        assert!(!split.append_hyphen);
    }

    #[test]
    fn dp_layout_packs_and_justifies() {
        let mut queue = queue_of("aa bb cc dd", Alignment::Justified);
        let lines = run(config(50, false), &mut queue);
        assert!(queue.is_empty());
        let texts: Vec<String> = lines.iter().map(LineRecord::text).collect();
        assert_eq!(texts, vec!["aa bb", "cc dd"]);
        // First line stretched to the full width, last line natural spacing.
        assert_eq!(lines[0].x_offsets(), &[0, 30]);
        assert_eq!(lines[1].x_offsets(), &[0, 25]);
    }

    #[test]
    fn justified_remainder_goes_to_leading_gaps() {
        let mut queue = queue_of("a b c d e", Alignment::Justified);
        // Two lines; first has 4 words (40px), 23px spare over 3 gaps.
        let lines = run(config(63, false), &mut queue);
        assert_eq!(lines[0].words().len(), 4);
        assert_eq!(lines[0].x_offsets(), &[0, 18, 36, 53]);
    }

    #[test]
    fn right_and_center_offsets() {
        let mut queue = queue_of("ab cd", Alignment::Right);
        let lines = run(config(100, false), &mut queue);
        assert_eq!(lines[0].x_offsets(), &[55, 80]);

        let mut queue = queue_of("ab cd", Alignment::Center);
        let lines = run(config(100, false), &mut queue);
        assert_eq!(lines[0].x_offsets(), &[27, 52]);
    }

    #[test]
    fn indent_marker_prefixes_first_word_once() {
        let mut queue = queue_of("one two", Alignment::Left);
        let mut cfg = config(500, false);
        cfg.extra_paragraph_spacing = false;
        cfg.include_last_line = false;
        let lines = run(cfg, &mut queue);
        assert!(lines.is_empty());
        assert_eq!(queue.get(0).map(|w| w.text.as_str()), Some("\u{2003}one"));

        queue.push("three", FontStyle::Regular);
        cfg.include_last_line = true;
        let lines = run(cfg, &mut queue);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].words()[0], "\u{2003}one");
    }

    #[test]
    fn held_back_last_line_stays_queued() {
        let mut queue = queue_of("aa bb cc dd ee", Alignment::Left);
        let mut cfg = config(50, false);
        cfg.include_last_line = false;
        let lines = run(cfg, &mut queue);
        assert_eq!(lines.len(), 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get(0).map(|w| w.text.as_str()), Some("ee"));
    }

    #[test]
    fn dp_presplits_oversized_words() {
        let mut queue = queue_of("abcdefghijkl", Alignment::Left);
        let lines = run(config(60, false), &mut queue);
        let words: Vec<&str> = lines
            .iter()
            .flat_map(|line| line.words().iter().map(String::as_str))
            .collect();
        assert_eq!(words, vec!["abcde-", "fghij-", "kl"]);
        let rejoined: String = words.iter().map(|w| w.trim_end_matches('-')).collect();
        assert_eq!(rejoined, "abcdefghijkl");
    }

    #[test]
    fn greedy_hyphenates_overflowing_word() {
        let mut queue = queue_of("hi hello", Alignment::Left);
        // "hi" (20) + space (5) leaves 35px: exactly "hel-".
        let lines = run(config(60, true), &mut queue);
        let texts: Vec<String> = lines.iter().map(LineRecord::text).collect();
        assert_eq!(texts, vec!["hi hel-", "lo"]);
    }

    #[test]
    fn greedy_moves_word_when_no_split_fits() {
        let mut queue = queue_of("abc hello", Alignment::Left);
        let lines = run(config(60, true), &mut queue);
        let texts: Vec<String> = lines.iter().map(LineRecord::text).collect();
        assert_eq!(texts, vec!["abc", "hello"]);
    }

    #[test]
    fn greedy_forces_split_on_empty_line() {
        let mut queue = queue_of("bcdfghjklm", Alignment::Left);
        let lines = run(config(45, true), &mut queue);
        let texts: Vec<String> = lines.iter().map(LineRecord::text).collect();
        assert_eq!(texts, vec!["bcdf-", "ghjk-", "lm"]);
    }

    #[test]
    fn unbreakable_word_overflows_alone() {
        let mut queue = queue_of("abcd ef", Alignment::Left);
        let lines = run(config(20, true), &mut queue);
        let texts: Vec<String> = lines.iter().map(LineRecord::text).collect();
        assert_eq!(texts, vec!["abcd", "ef"]);
    }

    #[test]
    fn line_cap_stops_layout() {
        let mut queue = WordQueue::new(Alignment::Left);
        for _ in 0..20 {
            queue.push("word", FontStyle::Regular);
        }
        let mut cfg = config(40, true);
        cfg.max_lines = 5;
        let lines = run(cfg, &mut queue);
        assert_eq!(lines.len(), 5);
        assert_eq!(queue.len(), 15);
    }

    #[test]
    fn capped_final_line_is_still_justified() {
        let mut queue = WordQueue::new(Alignment::Justified);
        for _ in 0..10 {
            queue.push("ab", FontStyle::Regular);
        }
        let mut cfg = config(50, false);
        cfg.max_lines = 2;
        let lines = run(cfg, &mut queue);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].x_offsets(), &[0, 30]);
        assert_eq!(lines[1].x_offsets(), &[0, 30]);
        assert_eq!(queue.len(), 6);

        // The rest of the paragraph ends with a natural-spacing line.
        let lines = run(config(50, false), &mut queue);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].x_offsets(), &[0, 25]);
    }

    fn brute_force_min(widths: &[i32], page_width: i32, space_width: i32) -> u64 {
        let gaps = widths.len() - 1;
        let mut best = u64::MAX;
        for mask in 0u32..(1 << gaps) {
            let mut breaks: Vec<usize> = (0..gaps)
                .filter(|bit| mask & (1 << bit) != 0)
                .map(|bit| bit + 1)
                .collect();
            breaks.push(widths.len());
            let mut start = 0;
            let feasible = breaks.iter().all(|&end| {
                let ok = end - start == 1
                    || line_width(&widths[start..end], space_width) <= i64::from(page_width);
                start = end;
                ok
            });
            if feasible {
                best = best.min(raggedness(widths, &breaks, page_width, space_width));
            }
        }
        best
    }

    #[test]
    fn optimal_breaks_match_brute_force() {
        let mut seed = 0x2545_f491u32;
        for _ in 0..40 {
            let count = 2 + (seed % 9) as usize;
            let widths: Vec<i32> = (0..count)
                .map(|_| {
                    seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                    10 + ((seed >> 16) % 50) as i32
                })
                .collect();
            let breaks = optimal_breaks(&widths, 100, 5, MAX_LINES_PER_PARAGRAPH);
            assert_eq!(breaks.last(), Some(&widths.len()));
            let mut start = 0;
            for &end in &breaks {
                assert!(line_width(&widths[start..end], 5) <= 100);
                start = end;
            }
            assert_eq!(
                raggedness(&widths, &breaks, 100, 5),
                brute_force_min(&widths, 100, 5),
                "widths {:?}",
                widths
            );
        }
    }

    #[test]
    fn optimal_breaks_beat_greedy_fill() {
        // "aaa bb cc ddddd": greedy fill leaves 40px on the second line, the
        // optimum moves "bb" down for 30^2 + 10^2.
        let widths = [30, 20, 20, 50];
        let breaks = optimal_breaks(&widths, 60, 10, MAX_LINES_PER_PARAGRAPH);
        assert_eq!(breaks, vec![1, 3, 4]);
        assert_eq!(raggedness(&widths, &breaks, 60, 10), 1000);
        assert_eq!(raggedness(&widths, &[2, 3, 4], 60, 10), 1600);
    }

    #[test]
    fn empty_queue_emits_nothing() {
        let mut queue = WordQueue::new(Alignment::Left);
        assert!(run(config(100, true), &mut queue).is_empty());
        assert!(run(config(100, false), &mut queue).is_empty());
    }
}
