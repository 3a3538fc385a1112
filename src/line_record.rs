//! Finalized lines and their persisted encoding.
//!
//! Entry layout (little-endian):
//!
//! ```text
//! u8  version
//! u32 word count, then per word: u32 byte length + UTF-8 bytes
//! u32 offset count, then per word: u16 pen x-offset
//! u32 style count, then per word: u8 style code
//! u8  alignment code
//! ```

use std::io::{self, Read, Write};

use crate::text::FontStyle;

/// Bumped whenever the entry layout changes; readers reject other versions.
pub const LINE_RECORD_VERSION: u8 = 1;
/// Upper bound for a single stored word.
pub const MAX_WORD_BYTES: usize = 4 * 1024;
/// Upper bound for words in a stored line.
pub const MAX_WORDS_PER_LINE: usize = 1024;

/// Block-level horizontal alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    #[default]
    Justified,
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn code(self) -> u8 {
        match self {
            Self::Justified => 0,
            Self::Left => 1,
            Self::Center => 2,
            Self::Right => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Justified),
            1 => Some(Self::Left),
            2 => Some(Self::Center),
            3 => Some(Self::Right),
            _ => None,
        }
    }
}

/// Line record construction or decoding error.
#[derive(Debug)]
pub enum LineRecordError {
    Io(io::Error),
    VersionMismatch {
        found: u8,
        expected: u8,
    },
    InvalidUtf8,
    InvalidStyle(u8),
    InvalidAlignment(u8),
    /// Word, offset and style sequences differ in length.
    LengthMismatch {
        words: usize,
        offsets: usize,
        styles: usize,
    },
    EmptyWord,
    Empty,
    LimitExceeded {
        kind: &'static str,
        actual: usize,
        limit: usize,
    },
}

impl core::fmt::Display for LineRecordError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "line record io error: {}", err),
            Self::VersionMismatch { found, expected } => write!(
                f,
                "line record version mismatch (found={} expected={})",
                found, expected
            ),
            Self::InvalidUtf8 => write!(f, "line record word is not valid UTF-8"),
            Self::InvalidStyle(code) => write!(f, "invalid font style code: {}", code),
            Self::InvalidAlignment(code) => write!(f, "invalid alignment code: {}", code),
            Self::LengthMismatch {
                words,
                offsets,
                styles,
            } => write!(
                f,
                "line record length mismatch (words={} offsets={} styles={})",
                words, offsets, styles
            ),
            Self::EmptyWord => write!(f, "line record contains an empty word"),
            Self::Empty => write!(f, "line record has no words"),
            Self::LimitExceeded {
                kind,
                actual,
                limit,
            } => write!(
                f,
                "line record limit exceeded: {} (actual={} limit={})",
                kind, actual, limit
            ),
        }
    }
}

impl std::error::Error for LineRecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for LineRecordError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// One finalized line: words, pen x-offsets and styles in parallel, plus the
/// block alignment it was laid out with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineRecord {
    words: Vec<String>,
    x_offsets: Vec<u16>,
    styles: Vec<FontStyle>,
    alignment: Alignment,
}

impl LineRecord {
    /// Build a record, checking that the sequences are non-empty, equally
    /// long and free of empty words.
    pub fn new(
        words: Vec<String>,
        x_offsets: Vec<u16>,
        styles: Vec<FontStyle>,
        alignment: Alignment,
    ) -> Result<Self, LineRecordError> {
        if words.len() != x_offsets.len() || words.len() != styles.len() {
            return Err(LineRecordError::LengthMismatch {
                words: words.len(),
                offsets: x_offsets.len(),
                styles: styles.len(),
            });
        }
        if words.is_empty() {
            return Err(LineRecordError::Empty);
        }
        if words.iter().any(String::is_empty) {
            return Err(LineRecordError::EmptyWord);
        }
        Ok(Self {
            words,
            x_offsets,
            styles,
            alignment,
        })
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn x_offsets(&self) -> &[u16] {
        &self.x_offsets
    }

    pub fn styles(&self) -> &[FontStyle] {
        &self.styles
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always `false` for a constructed record.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// `(word, x, style)` in left-to-right order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u16, FontStyle)> {
        self.words
            .iter()
            .zip(&self.x_offsets)
            .zip(&self.styles)
            .map(|((word, x), style)| (word.as_str(), *x, *style))
    }

    /// Words joined by single spaces, for logs and tests.
    pub fn text(&self) -> String {
        self.words.join(" ")
    }

    /// Encode one entry. Limits are checked before anything is written, so a
    /// record `read_from` would refuse is never persisted.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), LineRecordError> {
        check_limit("words_per_line", self.words.len(), MAX_WORDS_PER_LINE)?;
        if let Some(word) = self.words.iter().find(|word| word.len() > MAX_WORD_BYTES) {
            return Err(LineRecordError::LimitExceeded {
                kind: "word_bytes",
                actual: word.len(),
                limit: MAX_WORD_BYTES,
            });
        }
        writer.write_all(&[LINE_RECORD_VERSION])?;

        write_len(&mut writer, self.words.len())?;
        for word in &self.words {
            write_len(&mut writer, word.len())?;
            writer.write_all(word.as_bytes())?;
        }

        write_len(&mut writer, self.x_offsets.len())?;
        for x in &self.x_offsets {
            writer.write_all(&x.to_le_bytes())?;
        }

        write_len(&mut writer, self.styles.len())?;
        for style in &self.styles {
            writer.write_all(&[style.code()])?;
        }

        writer.write_all(&[self.alignment.code()])?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, LineRecordError> {
        let version = read_u8(&mut reader)?;
        if version != LINE_RECORD_VERSION {
            return Err(LineRecordError::VersionMismatch {
                found: version,
                expected: LINE_RECORD_VERSION,
            });
        }

        let word_count = read_len(&mut reader, "words_per_line", MAX_WORDS_PER_LINE)?;
        let mut words = Vec::with_capacity(word_count);
        for _ in 0..word_count {
            let len = read_len(&mut reader, "word_bytes", MAX_WORD_BYTES)?;
            let mut bytes = vec![0u8; len];
            reader.read_exact(&mut bytes)?;
            let word = String::from_utf8(bytes).map_err(|_| LineRecordError::InvalidUtf8)?;
            words.push(word);
        }

        let offset_count = read_len(&mut reader, "offsets_per_line", MAX_WORDS_PER_LINE)?;
        let mut x_offsets = Vec::with_capacity(offset_count);
        for _ in 0..offset_count {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf)?;
            x_offsets.push(u16::from_le_bytes(buf));
        }

        let style_count = read_len(&mut reader, "styles_per_line", MAX_WORDS_PER_LINE)?;
        let mut styles = Vec::with_capacity(style_count);
        for _ in 0..style_count {
            let code = read_u8(&mut reader)?;
            styles.push(FontStyle::from_code(code).ok_or(LineRecordError::InvalidStyle(code))?);
        }

        let code = read_u8(&mut reader)?;
        let alignment = Alignment::from_code(code).ok_or(LineRecordError::InvalidAlignment(code))?;

        Self::new(words, x_offsets, styles, alignment)
    }
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> Result<(), LineRecordError> {
    let len = u32::try_from(len).map_err(|_| LineRecordError::LimitExceeded {
        kind: "u32_length",
        actual: len,
        limit: u32::MAX as usize,
    })?;
    writer.write_all(&len.to_le_bytes())?;
    Ok(())
}

fn check_limit(kind: &'static str, actual: usize, limit: usize) -> Result<(), LineRecordError> {
    if actual > limit {
        return Err(LineRecordError::LimitExceeded {
            kind,
            actual,
            limit,
        });
    }
    Ok(())
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8, LineRecordError> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_len<R: Read>(
    reader: &mut R,
    kind: &'static str,
    limit: usize,
) -> Result<usize, LineRecordError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    let len = u32::from_le_bytes(buf) as usize;
    check_limit(kind, len, limit)?;
    Ok(len)
}
