//! embedded-graphics text metrics and page drawing for `epub-reflow`.
//!
//! [`EgTextMeasurer`] gives the line breaker the same width model the device
//! draws with, and [`EgRenderer`] paints cached [`Page`]s onto a
//! `DrawTarget<Color = BinaryColor>`.

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

use embedded_graphics::{
    mono_font::{
        iso_8859_5::{
            FONT_10X20, FONT_6X13_BOLD, FONT_6X13_ITALIC, FONT_6X9, FONT_7X13_ITALIC, FONT_7X14,
            FONT_7X14_BOLD, FONT_8X13, FONT_8X13_BOLD, FONT_8X13_ITALIC, FONT_9X18,
            FONT_9X18_BOLD,
        },
        MonoFont, MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use epub_reflow::{FontStyle, TextMeasurer};
use epub_reflow_render::{Page, SectionConfig};
use std::borrow::Cow;
use std::sync::Arc;

/// Backend-local font identifier used for metrics and rasterization dispatch.
pub type FontId = u8;

/// Why a layout font request had to fall back to another face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontFallbackReason {
    UnknownFontId,
    UnsupportedWeightItalic,
}

/// Resolved font selection for a layout font id and word style.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontSelection {
    pub font_id: FontId,
    pub fallback_reason: Option<FontFallbackReason>,
}

/// Backend-provided metrics for a specific font id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontMetrics {
    pub char_width: i32,
    pub space_width: i32,
}

/// Font abstraction shared by measurement and drawing.
pub trait FontBackend {
    fn resolve_font(&self, layout_font: epub_reflow::FontId, style: FontStyle) -> FontSelection;
    fn metrics(&self, font_id: FontId) -> FontMetrics;
    fn draw_text_run<D>(
        &self,
        display: &mut D,
        font_id: FontId,
        text: &str,
        origin: Point,
    ) -> Result<i32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>;
}

/// `TextMeasurer` adapter backed by this crate's `FontBackend` metrics.
#[derive(Clone, Debug)]
pub struct EgTextMeasurer<B = MonoFontBackend> {
    backend: B,
}

impl EgTextMeasurer<MonoFontBackend> {
    /// Create a default measurer using the mono backend.
    pub fn new() -> Self {
        Self {
            backend: MonoFontBackend,
        }
    }

    /// Shared measurer trait object for section builders and cached books.
    pub fn shared() -> Arc<dyn TextMeasurer + Send + Sync> {
        Arc::new(Self::new())
    }
}

impl Default for EgTextMeasurer<MonoFontBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> EgTextMeasurer<B>
where
    B: FontBackend,
{
    /// Create a measurer using an explicit backend.
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }
}

impl<B> TextMeasurer for EgTextMeasurer<B>
where
    B: FontBackend,
{
    fn text_width(&self, font_id: epub_reflow::FontId, text: &str, style: FontStyle) -> i32 {
        let selection = self.backend.resolve_font(font_id, style);
        let metrics = self.backend.metrics(selection.font_id);

        let mut chars = 0i32;
        let mut spaces = 0i32;
        for ch in normalize_text_for_mono(text).chars() {
            if ch == ' ' {
                spaces += 1;
            } else {
                chars += 1;
            }
        }
        chars * metrics.char_width + spaces * metrics.space_width
    }

    fn space_width(&self, font_id: epub_reflow::FontId) -> i32 {
        let selection = self.backend.resolve_font(font_id, FontStyle::Regular);
        self.backend.metrics(selection.font_id).space_width
    }
}

/// Mono-font backend over the ISO 8859-5 tables (Latin and Cyrillic).
///
/// Layout font ids 0..=3 select a size bucket; the word style picks the face.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonoFontBackend;

impl MonoFontBackend {
    const SIZE_SMALL: FontId = 0;
    const SIZE_MEDIUM: FontId = 1;
    const SIZE_LARGE: FontId = 2;
    const SIZE_XL: FontId = 3;

    const VARIANT_REGULAR: FontId = 0;
    const VARIANT_ITALIC: FontId = 1;
    const VARIANT_BOLD: FontId = 2;
    const VARIANT_BOLD_ITALIC: FontId = 3;

    fn encode_font_id(size_bucket: FontId, variant: FontId) -> FontId {
        (size_bucket << 2) | (variant & 0x03)
    }

    fn decode_font_id(font_id: FontId) -> (FontId, FontId) {
        ((font_id >> 2) & 0x03, font_id & 0x03)
    }

    fn style_variant_for(style: FontStyle) -> FontId {
        match style {
            FontStyle::Regular => Self::VARIANT_REGULAR,
            FontStyle::Italic => Self::VARIANT_ITALIC,
            FontStyle::Bold => Self::VARIANT_BOLD,
            FontStyle::BoldItalic => Self::VARIANT_BOLD_ITALIC,
        }
    }

    fn font_for(font_id: FontId) -> (&'static MonoFont<'static>, Option<FontFallbackReason>) {
        let (size_bucket, variant) = Self::decode_font_id(font_id);
        match (size_bucket, variant) {
            (Self::SIZE_SMALL, Self::VARIANT_REGULAR) => (&FONT_6X9, None),
            (Self::SIZE_SMALL, Self::VARIANT_ITALIC) => (&FONT_6X13_ITALIC, None),
            (Self::SIZE_SMALL, Self::VARIANT_BOLD) => (&FONT_6X13_BOLD, None),
            (Self::SIZE_SMALL, Self::VARIANT_BOLD_ITALIC) => (
                &FONT_6X13_BOLD,
                Some(FontFallbackReason::UnsupportedWeightItalic),
            ),
            (Self::SIZE_MEDIUM, Self::VARIANT_REGULAR) => (&FONT_7X14, None),
            (Self::SIZE_MEDIUM, Self::VARIANT_ITALIC) => (&FONT_7X13_ITALIC, None),
            (Self::SIZE_MEDIUM, Self::VARIANT_BOLD) => (&FONT_7X14_BOLD, None),
            (Self::SIZE_MEDIUM, Self::VARIANT_BOLD_ITALIC) => (
                &FONT_7X14_BOLD,
                Some(FontFallbackReason::UnsupportedWeightItalic),
            ),
            (Self::SIZE_LARGE, Self::VARIANT_REGULAR) => (&FONT_8X13, None),
            (Self::SIZE_LARGE, Self::VARIANT_ITALIC) => (&FONT_8X13_ITALIC, None),
            (Self::SIZE_LARGE, Self::VARIANT_BOLD) => (&FONT_8X13_BOLD, None),
            (Self::SIZE_LARGE, Self::VARIANT_BOLD_ITALIC) => (
                &FONT_8X13_BOLD,
                Some(FontFallbackReason::UnsupportedWeightItalic),
            ),
            (Self::SIZE_XL, Self::VARIANT_REGULAR) => (&FONT_10X20, None),
            (Self::SIZE_XL, Self::VARIANT_ITALIC) => (
                &FONT_9X18,
                Some(FontFallbackReason::UnsupportedWeightItalic),
            ),
            (Self::SIZE_XL, Self::VARIANT_BOLD) => (&FONT_9X18_BOLD, None),
            (Self::SIZE_XL, Self::VARIANT_BOLD_ITALIC) => (
                &FONT_9X18_BOLD,
                Some(FontFallbackReason::UnsupportedWeightItalic),
            ),
            _ => (&FONT_8X13, Some(FontFallbackReason::UnknownFontId)),
        }
    }

    fn style_for(font_id: FontId) -> MonoTextStyle<'static, BinaryColor> {
        let (font, _) = Self::font_for(font_id);
        MonoTextStyle::new(font, BinaryColor::On)
    }
}

impl FontBackend for MonoFontBackend {
    fn resolve_font(&self, layout_font: epub_reflow::FontId, style: FontStyle) -> FontSelection {
        let variant = Self::style_variant_for(style);
        let bucket = u8::try_from(layout_font)
            .ok()
            .filter(|bucket| *bucket <= Self::SIZE_XL);
        let Some(size_bucket) = bucket else {
            return FontSelection {
                font_id: Self::encode_font_id(Self::SIZE_LARGE, variant),
                fallback_reason: Some(FontFallbackReason::UnknownFontId),
            };
        };

        let font_id = Self::encode_font_id(size_bucket, variant);
        let (_, fallback_reason) = Self::font_for(font_id);
        FontSelection {
            font_id,
            fallback_reason,
        }
    }

    fn metrics(&self, font_id: FontId) -> FontMetrics {
        let style = Self::style_for(font_id);
        let width = style.font.character_size.width as i32;
        FontMetrics {
            char_width: width,
            space_width: width,
        }
    }

    fn draw_text_run<D>(
        &self,
        display: &mut D,
        font_id: FontId,
        text: &str,
        origin: Point,
    ) -> Result<i32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let style = Self::style_for(font_id);
        let normalized = normalize_text_for_mono(text);
        Text::with_baseline(normalized.as_ref(), origin, style, Baseline::Top).draw(display)?;
        Ok((normalized.chars().count() as i32) * (style.font.character_size.width as i32))
    }
}

fn normalize_text_for_mono(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|ch| {
        matches!(
            ch,
            '\u{00A0}' // nbsp
                | '\u{2002}' // en space
                | '\u{2003}' // em space (paragraph indent)
                | '\u{2010}' // hyphen
                | '\u{2013}' // en dash
                | '\u{2014}' // em dash
                | '\u{2018}' // left single quote
                | '\u{2019}' // right single quote
                | '\u{201C}' // left double quote
                | '\u{201D}' // right double quote
                | '\u{2026}' // ellipsis
        )
    }) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{00A0}' | '\u{2002}' | '\u{2003}' => out.push(' '),
            '\u{2010}' | '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// embedded-graphics backend configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EgRenderConfig {
    /// Clear display before drawing page.
    pub clear_first: bool,
}

impl Default for EgRenderConfig {
    fn default() -> Self {
        Self { clear_first: true }
    }
}

/// Page painter for embedded-graphics targets.
#[derive(Clone, Debug)]
pub struct EgRenderer<B = MonoFontBackend> {
    cfg: EgRenderConfig,
    backend: B,
}

impl Default for EgRenderer<MonoFontBackend> {
    fn default() -> Self {
        Self {
            cfg: EgRenderConfig::default(),
            backend: MonoFontBackend,
        }
    }
}

impl<B> EgRenderer<B>
where
    B: FontBackend,
{
    /// Create renderer with config and backend.
    pub fn with_backend(cfg: EgRenderConfig, backend: B) -> Self {
        Self { cfg, backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Draw every word of `page`.
    ///
    /// Line y positions are absolute; word offsets are shifted right by the
    /// section's left margin.
    pub fn render_page<D>(
        &self,
        page: &Page,
        section: &SectionConfig,
        display: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        if self.cfg.clear_first {
            display.clear(BinaryColor::Off)?;
        }
        let mut fallbacks = 0usize;
        for placed in &page.lines {
            for (word, x, style) in placed.line.iter() {
                let selection = self.backend.resolve_font(section.font_id, style);
                if selection.fallback_reason.is_some() {
                    fallbacks += 1;
                }
                let origin = Point::new(section.margin_left + i32::from(x), placed.y);
                self.backend
                    .draw_text_run(display, selection.font_id, word, origin)?;
            }
        }
        if fallbacks > 0 {
            log::debug!("page drawn with {} fallback font runs", fallbacks);
        }
        Ok(())
    }
}
