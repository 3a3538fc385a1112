//! Paragraphs -> positioned lines -> pages for one section (chapter).

use std::collections::VecDeque;
use std::io::{Read, Write};

use epub_reflow::{
    Alignment, FontId, FontStyle, LayoutConfig, LineBreaker, LineRecord, LineRecordError,
    TextMeasurer, Word, WordQueue, MAX_LINES_PER_PARAGRAPH,
};
use serde::{Deserialize, Serialize};

/// Upper bound for lines in one stored page.
pub const MAX_LINES_PER_PAGE: usize = 512;

/// Section layout parameters. Every field is part of the cache key.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub font_id: FontId,
    /// Multiplier applied to `line_height_px`.
    pub line_compression: f32,
    pub margin_top: i32,
    pub margin_right: i32,
    pub margin_bottom: i32,
    pub margin_left: i32,
    /// Half a line of space after each paragraph instead of a first-line indent.
    pub extra_paragraph_spacing: bool,
    pub hyphenation_enabled: bool,
    pub viewport_width: i32,
    pub viewport_height: i32,
    pub line_height_px: i32,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            font_id: 0,
            line_compression: 1.0,
            margin_top: 8,
            margin_right: 10,
            margin_bottom: 24,
            margin_left: 10,
            extra_paragraph_spacing: true,
            hyphenation_enabled: false,
            viewport_width: 480,
            viewport_height: 800,
            line_height_px: 20,
        }
    }
}

impl SectionConfig {
    /// Defaults for a display size.
    pub fn for_display(width: i32, height: i32) -> Self {
        Self {
            viewport_width: width,
            viewport_height: height,
            ..Self::default()
        }
    }

    /// Usable line width between the horizontal margins.
    pub fn content_width(&self) -> i32 {
        (self.viewport_width - self.margin_left - self.margin_right).max(0)
    }

    /// Lowest y a line may end at.
    pub fn content_bottom(&self) -> i32 {
        self.viewport_height - self.margin_bottom
    }

    /// Effective line advance in pixels, at least 1.
    pub fn line_height(&self) -> i32 {
        let scaled = self.line_height_px as f32 * self.line_compression;
        if !scaled.is_finite() {
            return self.line_height_px.max(1);
        }
        (scaled.round() as i32).max(1)
    }

    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            page_width: self.content_width(),
            font_id: self.font_id,
            hyphenation_enabled: self.hyphenation_enabled,
            extra_paragraph_spacing: self.extra_paragraph_spacing,
            include_last_line: true,
            max_lines: MAX_LINES_PER_PARAGRAPH,
        }
    }
}

/// Words of one block element plus its alignment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub words: Vec<Word>,
    pub alignment: Alignment,
}

impl Paragraph {
    pub fn new(alignment: Alignment) -> Self {
        Self {
            words: Vec::with_capacity(16),
            alignment,
        }
    }

    /// Whitespace-split `text` into regular-style words.
    pub fn from_text(text: &str, alignment: Alignment) -> Self {
        let mut paragraph = Self::new(alignment);
        paragraph.push_text(text, FontStyle::Regular);
        paragraph
    }

    pub fn push_text(&mut self, text: &str, style: FontStyle) {
        self.words
            .extend(text.split_whitespace().map(|word| Word::new(word, style)));
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn into_queue(self) -> WordQueue {
        let mut queue = WordQueue::with_capacity(self.alignment, self.words.len());
        queue.extend(self.words);
        queue
    }
}

/// A line placed at an absolute y (top of the line box).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLine {
    pub y: i32,
    pub line: LineRecord,
}

/// One screen of positioned lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub lines: Vec<PageLine>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Encode as `u32` line count, then per line `i32` y and a line record entry.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), LineRecordError> {
        let count = self.lines.len();
        if count > MAX_LINES_PER_PAGE {
            return Err(LineRecordError::LimitExceeded {
                kind: "lines_per_page",
                actual: count,
                limit: MAX_LINES_PER_PAGE,
            });
        }
        writer.write_all(&(count as u32).to_le_bytes())?;
        for placed in &self.lines {
            writer.write_all(&placed.y.to_le_bytes())?;
            placed.line.write_to(&mut writer)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, LineRecordError> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        let count = u32::from_le_bytes(buf) as usize;
        if count > MAX_LINES_PER_PAGE {
            return Err(LineRecordError::LimitExceeded {
                kind: "lines_per_page",
                actual: count,
                limit: MAX_LINES_PER_PAGE,
            });
        }
        let mut lines = Vec::with_capacity(count);
        for _ in 0..count {
            reader.read_exact(&mut buf)?;
            let y = i32::from_le_bytes(buf);
            let line = LineRecord::read_from(&mut reader)?;
            lines.push(PageLine { y, line });
        }
        Ok(Self { lines })
    }
}

/// Incremental section layout.
///
/// Push paragraphs in reading order, drain completed pages as they appear,
/// then [`SectionBuilder::finish`] to flush the partially filled last page.
pub struct SectionBuilder<'m, M: TextMeasurer + ?Sized> {
    config: SectionConfig,
    breaker: LineBreaker<'m, M>,
    line_height: i32,
    current: Page,
    next_y: i32,
    ready: VecDeque<Page>,
    pages_emitted: usize,
}

impl<'m, M: TextMeasurer + ?Sized> SectionBuilder<'m, M> {
    pub fn new(config: SectionConfig, measurer: &'m M) -> Self {
        Self {
            breaker: LineBreaker::new(config.layout_config(), measurer),
            line_height: config.line_height(),
            current: Page::default(),
            next_y: config.margin_top,
            ready: VecDeque::with_capacity(2),
            pages_emitted: 0,
            config,
        }
    }

    pub fn config(&self) -> &SectionConfig {
        &self.config
    }

    /// Lay out one paragraph. Returns the number of lines it produced.
    pub fn push_paragraph(&mut self, paragraph: Paragraph) -> usize {
        if paragraph.is_empty() {
            return 0;
        }
        let mut queue = paragraph.into_queue();
        let mut placed = Vec::with_capacity(8);
        let lines = self
            .breaker
            .layout_and_extract_lines(&mut queue, |line| placed.push(line));
        for line in placed {
            self.place_line(line);
        }
        if self.config.extra_paragraph_spacing {
            self.next_y += self.line_height / 2;
        }
        lines
    }

    /// Hand every completed page to `on_page`, oldest first.
    pub fn drain_pages<F: FnMut(Page)>(&mut self, mut on_page: F) {
        while let Some(page) = self.ready.pop_front() {
            self.pages_emitted += 1;
            on_page(page);
        }
    }

    /// Flush the last page and return the section's total page count.
    pub fn finish<F: FnMut(Page)>(mut self, mut on_page: F) -> usize {
        if !self.current.is_empty() {
            let page = std::mem::take(&mut self.current);
            self.ready.push_back(page);
        }
        self.drain_pages(&mut on_page);
        self.pages_emitted
    }

    fn place_line(&mut self, line: LineRecord) {
        let page_full = self.current.lines.len() >= MAX_LINES_PER_PAGE;
        let past_bottom = self.next_y + self.line_height > self.config.content_bottom();
        if page_full || (past_bottom && !self.current.is_empty()) {
            let page = std::mem::take(&mut self.current);
            self.ready.push_back(page);
            self.next_y = self.config.margin_top;
        }
        self.current.lines.push(PageLine {
            y: self.next_y,
            line,
        });
        self.next_y += self.line_height;
    }
}

/// Lay out a whole section into memory.
pub fn layout_section<M, I>(config: SectionConfig, measurer: &M, paragraphs: I) -> Vec<Page>
where
    M: TextMeasurer + ?Sized,
    I: IntoIterator<Item = Paragraph>,
{
    let mut builder = SectionBuilder::new(config, measurer);
    let mut pages = Vec::with_capacity(4);
    for paragraph in paragraphs {
        builder.push_paragraph(paragraph);
        builder.drain_pages(|page| pages.push(page));
    }
    builder.finish(|page| pages.push(page));
    pages
}
