//! Styled words and the per-paragraph word queue consumed by layout.

use std::collections::VecDeque;

use crate::line_record::Alignment;

/// Inline font style attached to each word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    /// Stable on-disk code.
    pub fn code(self) -> u8 {
        match self {
            Self::Regular => 0,
            Self::Bold => 1,
            Self::Italic => 2,
            Self::BoldItalic => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Regular),
            1 => Some(Self::Bold),
            2 => Some(Self::Italic),
            3 => Some(Self::BoldItalic),
            _ => None,
        }
    }

    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (true, true) => Self::BoldItalic,
            (true, false) => Self::Bold,
            (false, true) => Self::Italic,
            (false, false) => Self::Regular,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, Self::Bold | Self::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, Self::Italic | Self::BoldItalic)
    }
}

/// One whitespace-delimited word and its style.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub style: FontStyle,
}

impl Word {
    pub fn new(text: impl Into<String>, style: FontStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Ordered words of one paragraph, consumed from the front by the line breaker.
///
/// Splitting replaces the word at an index with its head and inserts the tail
/// directly after it; nothing else is ever reordered. Empty words are refused
/// on push so every element seen by layout is non-empty.
#[derive(Clone, Debug, Default)]
pub struct WordQueue {
    words: VecDeque<Word>,
    alignment: Alignment,
    indent_applied: bool,
}

impl WordQueue {
    pub fn new(alignment: Alignment) -> Self {
        Self::with_capacity(alignment, 0)
    }

    pub fn with_capacity(alignment: Alignment, capacity: usize) -> Self {
        Self {
            words: VecDeque::with_capacity(capacity),
            alignment,
            indent_applied: false,
        }
    }

    /// Append a word. Returns `false` (and stores nothing) for empty text.
    pub fn push(&mut self, text: impl Into<String>, style: FontStyle) -> bool {
        let text = text.into();
        if text.is_empty() {
            return false;
        }
        self.words.push_back(Word { text, style });
        true
    }

    /// Split `text` on whitespace and append every word with `style`.
    pub fn push_text(&mut self, text: &str, style: FontStyle) -> usize {
        let before = self.words.len();
        for word in text.split_whitespace() {
            self.push(word, style);
        }
        self.words.len() - before
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = alignment;
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Word> {
        self.words.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Word> {
        self.words.iter()
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    /// Whether the first-line indent marker has already been added.
    pub fn indent_applied(&self) -> bool {
        self.indent_applied
    }

    /// Prefix the first word with `marker`, at most once per queue.
    pub(crate) fn apply_indent(&mut self, marker: &str) {
        if self.indent_applied {
            return;
        }
        if let Some(first) = self.words.front_mut() {
            first.text.insert_str(0, marker);
            self.indent_applied = true;
        }
    }

    /// Split the word at `index` at `byte_offset`.
    ///
    /// The head keeps its place (with `-` appended when `append_hyphen`), the
    /// tail is inserted right after it with the same style. Returns `false`
    /// without touching the queue when either half would be empty or the
    /// offset is not a char boundary.
    pub(crate) fn split_word(&mut self, index: usize, byte_offset: usize, append_hyphen: bool) -> bool {
        let Some(word) = self.words.get_mut(index) else {
            return false;
        };
        if byte_offset == 0 || byte_offset >= word.text.len() {
            return false;
        }
        if !word.text.is_char_boundary(byte_offset) {
            return false;
        }
        let tail = word.text.split_off(byte_offset);
        if append_hyphen {
            word.text.push('-');
        }
        let style = word.style;
        self.words.insert(index + 1, Word { text: tail, style });
        true
    }

    /// Remove and return the first `count` words.
    pub(crate) fn take_front(&mut self, count: usize) -> Vec<Word> {
        let count = count.min(self.words.len());
        self.words.drain(..count).collect()
    }
}

impl Extend<Word> for WordQueue {
    fn extend<T: IntoIterator<Item = Word>>(&mut self, iter: T) {
        for word in iter {
            self.push(word.text, word.style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(queue: &WordQueue) -> Vec<&str> {
        queue.iter().map(|word| word.text.as_str()).collect()
    }

    #[test]
    fn push_rejects_empty_words() {
        let mut queue = WordQueue::new(Alignment::Left);
        assert!(!queue.push("", FontStyle::Regular));
        assert!(queue.push("word", FontStyle::Bold));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn push_text_splits_on_whitespace() {
        let mut queue = WordQueue::new(Alignment::Left);
        assert_eq!(queue.push_text("  one two\tthree\n", FontStyle::Italic), 3);
        assert_eq!(texts(&queue), vec!["one", "two", "three"]);
        assert!(queue.iter().all(|word| word.style == FontStyle::Italic));
    }

    #[test]
    fn split_inserts_tail_after_head_with_same_style() {
        let mut queue = WordQueue::new(Alignment::Left);
        queue.push("a", FontStyle::Regular);
        queue.push("hello", FontStyle::Bold);
        queue.push("z", FontStyle::Regular);
        assert!(queue.split_word(1, 3, true));
        assert_eq!(texts(&queue), vec!["a", "hel-", "lo", "z"]);
        assert_eq!(queue.get(2).map(|w| w.style), Some(FontStyle::Bold));
    }

    #[test]
    fn split_refuses_degenerate_offsets() {
        let mut queue = WordQueue::new(Alignment::Left);
        queue.push("привет", FontStyle::Regular);
        assert!(!queue.split_word(0, 0, true));
        assert!(!queue.split_word(0, 12, true));
        assert!(!queue.split_word(0, 3, true));
        assert!(!queue.split_word(5, 2, true));
        assert_eq!(texts(&queue), vec!["привет"]);
    }

    #[test]
    fn indent_is_applied_once() {
        let mut queue = WordQueue::new(Alignment::Justified);
        queue.push("first", FontStyle::Regular);
        queue.apply_indent("\u{2003}");
        queue.apply_indent("\u{2003}");
        assert_eq!(texts(&queue), vec!["\u{2003}first"]);
        assert!(queue.indent_applied());
    }

    #[test]
    fn style_codes_are_stable() {
        for style in [
            FontStyle::Regular,
            FontStyle::Bold,
            FontStyle::Italic,
            FontStyle::BoldItalic,
        ] {
            assert_eq!(FontStyle::from_code(style.code()), Some(style));
            assert_eq!(FontStyle::from_flags(style.is_bold(), style.is_italic()), style);
        }
        assert_eq!(FontStyle::from_code(4), None);
    }
}
