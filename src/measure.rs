//! Pixel measurement capability used by the line breaker.

use crate::text::FontStyle;

/// Backend-local font identifier.
pub type FontId = u32;

/// Text width provider.
///
/// Implementations must be deterministic for a given `(font_id, text, style)`:
/// layout caches are keyed on the font id and would go stale otherwise.
pub trait TextMeasurer {
    /// Advance width of `text` in pixels.
    fn text_width(&self, font_id: FontId, text: &str, style: FontStyle) -> i32;

    /// Natural inter-word space in pixels.
    fn space_width(&self, font_id: FontId) -> i32;

    /// Width of the `-` glyph appended to hyphenated prefixes.
    fn hyphen_width(&self, font_id: FontId, style: FontStyle) -> i32 {
        self.text_width(font_id, "-", style)
    }
}

impl<T: TextMeasurer + ?Sized> TextMeasurer for &T {
    fn text_width(&self, font_id: FontId, text: &str, style: FontStyle) -> i32 {
        (**self).text_width(font_id, text, style)
    }

    fn space_width(&self, font_id: FontId) -> i32 {
        (**self).space_width(font_id)
    }

    fn hyphen_width(&self, font_id: FontId, style: FontStyle) -> i32 {
        (**self).hyphen_width(font_id, style)
    }
}

/// Fixed-advance measurer: every codepoint costs `advance` pixels except `-`,
/// which costs `hyphen_advance`. Font id and style are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedAdvanceMeasurer {
    pub advance: i32,
    pub hyphen_advance: i32,
    pub space: i32,
}

impl FixedAdvanceMeasurer {
    pub const fn new(advance: i32, hyphen_advance: i32, space: i32) -> Self {
        Self {
            advance,
            hyphen_advance,
            space,
        }
    }
}

impl Default for FixedAdvanceMeasurer {
    fn default() -> Self {
        Self::new(10, 5, 5)
    }
}

impl TextMeasurer for FixedAdvanceMeasurer {
    fn text_width(&self, _font_id: FontId, text: &str, _style: FontStyle) -> i32 {
        text.chars().fold(0i32, |width, ch| {
            let advance = if ch == '-' {
                self.hyphen_advance
            } else {
                self.advance
            };
            width.saturating_add(advance)
        })
    }

    fn space_width(&self, _font_id: FontId) -> i32 {
        self.space
    }
}
