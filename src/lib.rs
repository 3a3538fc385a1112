//! Script-aware hyphenation and line breaking for paginated e-ink readers.
//!
//! Words of one paragraph go into a [`WordQueue`]; a [`LineBreaker`] consumes
//! the queue against a page width and a [`TextMeasurer`], emitting positioned
//! [`LineRecord`]s. Hyphenation proposals come from [`hyphenation::break_offsets`]
//! (English and Russian rule engines plus an unconditional fallback).
//!
//! ```
//! use epub_reflow::{
//!     Alignment, FixedAdvanceMeasurer, FontStyle, LayoutConfig, LineBreaker, WordQueue,
//! };
//!
//! let mut queue = WordQueue::new(Alignment::Left);
//! queue.push_text("a beautiful paragraph", FontStyle::Regular);
//!
//! let measurer = FixedAdvanceMeasurer::default();
//! let config = LayoutConfig {
//!     hyphenation_enabled: true,
//!     ..LayoutConfig::for_width(100)
//! };
//! let mut lines = Vec::new();
//! LineBreaker::new(config, &measurer).layout_and_extract_lines(&mut queue, |line| {
//!     lines.push(line.text())
//! });
//! assert!(!lines.is_empty());
//! assert!(queue.is_empty());
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod hyphenation;
mod line_breaker;
mod line_record;
mod measure;
mod text;

pub use hyphenation::{break_offsets, LanguageHyphenator, MIN_PREFIX_CP, MIN_SUFFIX_CP};
pub use line_breaker::{
    line_width, optimal_breaks, raggedness, HyphenSplit, LayoutConfig, LineBreaker,
    INDENT_MARKER, MAX_LINES_PER_PARAGRAPH,
};
pub use line_record::{
    Alignment, LineRecord, LineRecordError, LINE_RECORD_VERSION, MAX_WORDS_PER_LINE,
    MAX_WORD_BYTES,
};
pub use measure::{FixedAdvanceMeasurer, FontId, TextMeasurer};
pub use text::{FontStyle, Word, WordQueue};
