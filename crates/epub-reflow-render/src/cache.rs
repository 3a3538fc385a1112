use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use epub_reflow::LineRecordError;
use serde::{Deserialize, Serialize};

use crate::coordinator::ReaderPosition;
use crate::section::{Page, SectionConfig};

/// Bumped whenever section metadata or page files change shape.
pub const SECTION_CACHE_VERSION: u8 = 1;
const DEFAULT_MAX_CACHE_FILE_BYTES: usize = 256 * 1024;
const SECTION_FILE: &str = "section.bin";
const PROGRESS_FILE: &str = "progress.bin";
static CACHE_WRITE_NONCE: AtomicUsize = AtomicUsize::new(0);

/// Section cache error.
#[derive(Debug)]
pub enum SectionCacheError {
    Io(io::Error),
    Record(LineRecordError),
    Metadata(postcard::Error),
    VersionMismatch { found: u8, expected: u8 },
    /// Stored layout parameters differ from the requested ones.
    ParametersMismatch,
    /// Page file checksum did not match its contents.
    Corrupt { path: PathBuf },
    LimitExceeded {
        kind: &'static str,
        actual: usize,
        limit: usize,
    },
}

impl core::fmt::Display for SectionCacheError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "section cache io error: {}", err),
            Self::Record(err) => write!(f, "section cache record error: {}", err),
            Self::Metadata(err) => write!(f, "section metadata decode failed: {}", err),
            Self::VersionMismatch { found, expected } => write!(
                f,
                "section cache version mismatch (found={} expected={})",
                found, expected
            ),
            Self::ParametersMismatch => write!(f, "section cache parameters do not match"),
            Self::Corrupt { path } => write!(f, "corrupt cache file: {}", path.display()),
            Self::LimitExceeded {
                kind,
                actual,
                limit,
            } => write!(
                f,
                "section cache limit exceeded: {} (actual={} limit={})",
                kind, actual, limit
            ),
        }
    }
}

impl std::error::Error for SectionCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Record(err) => Some(err),
            Self::Metadata(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SectionCacheError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<LineRecordError> for SectionCacheError {
    fn from(value: LineRecordError) -> Self {
        match value {
            LineRecordError::Io(err) => Self::Io(err),
            other => Self::Record(other),
        }
    }
}

impl From<postcard::Error> for SectionCacheError {
    fn from(value: postcard::Error) -> Self {
        Self::Metadata(value)
    }
}

/// File-backed cache for one laid-out section.
///
/// Layout: `<root>/section.bin` holds the version byte followed by a postcard
/// body with the [`SectionConfig`] and page count; `<root>/page_<n>.bin` holds
/// one encoded [`Page`] followed by its CRC-32. Writes go through a temp file
/// and a rename, and every file is capped at `max_file_bytes`.
///
/// A stored version or parameter set that differs from the requested one
/// invalidates the whole directory: pages are never patched individually.
#[derive(Clone, Debug)]
pub struct FileSectionCacheStore {
    root: PathBuf,
    max_file_bytes: usize,
}

#[derive(Serialize, Deserialize)]
struct PersistedSection {
    config: SectionConfig,
    page_count: u32,
}

impl FileSectionCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_bytes: DEFAULT_MAX_CACHE_FILE_BYTES,
        }
    }

    /// Values of `0` are treated as `1` to keep the cap explicit.
    pub fn with_max_file_bytes(mut self, max_file_bytes: usize) -> Self {
        self.max_file_bytes = max_file_bytes.max(1);
        self
    }

    pub fn cache_root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    pub fn section_path(&self) -> PathBuf {
        self.root.join(SECTION_FILE)
    }

    pub fn page_path(&self, page_index: usize) -> PathBuf {
        self.root.join(format!("page_{}.bin", page_index)) // allow: file I/O path, not hot
    }

    pub fn exists(&self) -> bool {
        self.section_path().is_file()
    }

    /// Read the stored page count, checking version and parameters.
    pub fn read_metadata(&self, config: &SectionConfig) -> Result<usize, SectionCacheError> {
        let payload = self.read_capped(&self.section_path())?;
        let (version, body) = postcard::take_from_bytes::<u8>(&payload)?;
        if version != SECTION_CACHE_VERSION {
            return Err(SectionCacheError::VersionMismatch {
                found: version,
                expected: SECTION_CACHE_VERSION,
            });
        }
        let stored: PersistedSection = postcard::from_bytes(body)?;
        if stored.config != *config {
            return Err(SectionCacheError::ParametersMismatch);
        }
        Ok(stored.page_count as usize)
    }

    /// Page count of a valid cache, or `None` after clearing a stale one.
    pub fn load_page_count(&self, config: &SectionConfig) -> Option<usize> {
        if !self.exists() {
            log::debug!("section cache miss: {}", self.root.display());
            return None;
        }
        match self.read_metadata(config) {
            Ok(page_count) => {
                log::debug!(
                    "section cache hit: {} ({} pages)",
                    self.root.display(),
                    page_count
                );
                Some(page_count)
            }
            Err(err) => {
                log::warn!("invalidating section cache {}: {}", self.root.display(), err);
                if let Err(clear_err) = self.clear() {
                    log::warn!("failed to clear section cache: {}", clear_err);
                }
                None
            }
        }
    }

    /// Write `section.bin`. Call after every page is stored so a crash mid
    /// build leaves no metadata and the next open rebuilds.
    pub fn write_metadata(
        &self,
        config: &SectionConfig,
        page_count: usize,
    ) -> Result<(), SectionCacheError> {
        let page_count = u32::try_from(page_count).map_err(|_| SectionCacheError::LimitExceeded {
            kind: "page_count",
            actual: page_count,
            limit: u32::MAX as usize,
        })?;
        let mut payload = postcard::to_allocvec(&SECTION_CACHE_VERSION)?;
        payload.extend(postcard::to_allocvec(&PersistedSection {
            config: *config,
            page_count,
        })?);
        self.write_atomic(&self.section_path(), &payload)
    }

    pub fn store_page(&self, page_index: usize, page: &Page) -> Result<(), SectionCacheError> {
        let mut payload = Vec::with_capacity(256);
        page.write_to(&mut payload)?;
        let checksum = crc32fast::hash(&payload);
        payload.extend_from_slice(&checksum.to_le_bytes());
        self.write_atomic(&self.page_path(page_index), &payload)
    }

    pub fn load_page(&self, page_index: usize) -> Result<Page, SectionCacheError> {
        let path = self.page_path(page_index);
        let payload = self.read_capped(&path)?;
        let Some(body_len) = payload.len().checked_sub(4) else {
            return Err(SectionCacheError::Corrupt { path });
        };
        let (body, tail) = payload.split_at(body_len);
        let mut stored = [0u8; 4];
        stored.copy_from_slice(tail);
        if crc32fast::hash(body) != u32::from_le_bytes(stored) {
            return Err(SectionCacheError::Corrupt { path });
        }
        Ok(Page::read_from(body)?)
    }

    /// Remove the whole section directory. Missing directories are fine.
    pub fn clear(&self) -> Result<(), SectionCacheError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Persist the reading position under the store root.
    pub fn store_progress(&self, position: ReaderPosition) -> Result<(), SectionCacheError> {
        self.write_atomic(&self.root.join(PROGRESS_FILE), &position.to_bytes())
    }

    pub fn load_progress(&self) -> Option<ReaderPosition> {
        let payload = self.read_capped(&self.root.join(PROGRESS_FILE)).ok()?;
        ReaderPosition::from_bytes(&payload)
    }

    fn read_capped(&self, path: &Path) -> Result<Vec<u8>, SectionCacheError> {
        let max_file_bytes = self.max_file_bytes as u64;
        let len = fs::metadata(path)?.len();
        if len > max_file_bytes {
            return Err(SectionCacheError::LimitExceeded {
                kind: "max_file_bytes",
                actual: len as usize,
                limit: self.max_file_bytes,
            });
        }
        let file = File::open(path)?;
        let mut reader = file.take(max_file_bytes.saturating_add(1));
        let mut payload = Vec::with_capacity(len as usize);
        reader.read_to_end(&mut payload)?;
        if payload.len() > self.max_file_bytes {
            return Err(SectionCacheError::LimitExceeded {
                kind: "max_file_bytes",
                actual: payload.len(),
                limit: self.max_file_bytes,
            });
        }
        Ok(payload)
    }

    fn write_atomic(&self, final_path: &Path, payload: &[u8]) -> Result<(), SectionCacheError> {
        let Some(parent) = final_path.parent() else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "cache path has no parent").into());
        };
        fs::create_dir_all(parent)?;

        let nonce = CACHE_WRITE_NONCE.fetch_add(1, Ordering::Relaxed);
        let file_name = final_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = parent.join(format!(
            // allow: file I/O path, not hot
            "{}.tmp-{}-{}",
            file_name,
            std::process::id(),
            nonce
        ));

        let result = write_temp(&temp_path, payload, self.max_file_bytes)
            .and_then(|()| fs::rename(&temp_path, final_path));
        if let Err(err) = result {
            remove_file_quiet(&temp_path);
            return Err(err.into());
        }
        sync_directory(parent);
        Ok(())
    }
}

fn write_temp(temp_path: &Path, payload: &[u8], max_file_bytes: usize) -> io::Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;
    let mut writer = CappedWriter::new(BufWriter::new(file), max_file_bytes);
    writer.write_all(payload)?;
    writer.flush()?;
    let file = writer.into_inner().into_inner().map_err(|err| err.into_error())?;
    file.sync_all()
}

fn remove_file_quiet(path: &Path) {
    let _ = fs::remove_file(path);
}

fn sync_directory(path: &Path) {
    if let Ok(dir) = File::open(path) {
        let _ = dir.sync_all();
    }
}

struct CappedWriter<W> {
    inner: W,
    max_bytes: usize,
    written: usize,
}

impl<W> CappedWriter<W> {
    fn new(inner: W, max_bytes: usize) -> Self {
        Self {
            inner,
            max_bytes: max_bytes.max(1),
            written: 0,
        }
    }

    fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CappedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = self.max_bytes.saturating_sub(self.written);
        if buf.len() > remaining {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "cache file exceeds max_file_bytes",
            ));
        }
        self.inner.write_all(buf)?;
        self.written = self.written.saturating_add(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{layout_section, Paragraph};
    use epub_reflow::{Alignment, FixedAdvanceMeasurer};

    fn temp_cache_root(label: &str) -> PathBuf {
        let nonce = CACHE_WRITE_NONCE.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "epub-reflow-render-{label}-{}-{nonce}",
            std::process::id()
        ))
    }

    fn sample_pages(config: &SectionConfig) -> Vec<Page> {
        let measurer = FixedAdvanceMeasurer::default();
        let paragraphs = (0..12).map(|idx| {
            Paragraph::from_text(
                &format!("paragraph {idx} with a handful of words"),
                Alignment::Justified,
            )
        });
        layout_section(*config, &measurer, paragraphs)
    }

    fn store_all(store: &FileSectionCacheStore, config: &SectionConfig, pages: &[Page]) {
        for (idx, page) in pages.iter().enumerate() {
            store.store_page(idx, page).expect("store page");
        }
        store.write_metadata(config, pages.len()).expect("store metadata");
    }

    #[test]
    fn cache_roundtrip_load_store() {
        let root = temp_cache_root("roundtrip");
        let store = FileSectionCacheStore::new(&root);
        let config = SectionConfig::for_display(200, 120);
        let pages = sample_pages(&config);
        assert!(pages.len() > 1);

        assert_eq!(store.load_page_count(&config), None);
        store_all(&store, &config, &pages);
        assert_eq!(store.load_page_count(&config), Some(pages.len()));
        for (idx, page) in pages.iter().enumerate() {
            assert_eq!(&store.load_page(idx).expect("load page"), page);
        }

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn parameter_mismatch_clears_directory() {
        let root = temp_cache_root("params");
        let store = FileSectionCacheStore::new(&root);
        let config = SectionConfig::for_display(200, 120);
        store_all(&store, &config, &sample_pages(&config));

        let mut other = config;
        other.line_compression = 1.1;
        assert!(matches!(
            store.read_metadata(&other),
            Err(SectionCacheError::ParametersMismatch)
        ));
        assert_eq!(store.load_page_count(&other), None);
        assert!(!root.exists());
    }

    #[test]
    fn version_mismatch_clears_directory() {
        let root = temp_cache_root("version");
        let store = FileSectionCacheStore::new(&root);
        let config = SectionConfig::for_display(200, 120);
        store_all(&store, &config, &sample_pages(&config));

        let path = store.section_path();
        let mut bytes = fs::read(&path).expect("read metadata");
        bytes[0] = SECTION_CACHE_VERSION.wrapping_add(1);
        fs::write(&path, bytes).expect("rewrite metadata");

        assert!(matches!(
            store.read_metadata(&config),
            Err(SectionCacheError::VersionMismatch { .. })
        ));
        assert_eq!(store.load_page_count(&config), None);
        assert!(!root.exists());
    }

    #[test]
    fn corrupt_page_is_detected() {
        let root = temp_cache_root("corrupt");
        let store = FileSectionCacheStore::new(&root);
        let config = SectionConfig::for_display(200, 120);
        store_all(&store, &config, &sample_pages(&config));

        let path = store.page_path(0);
        let mut bytes = fs::read(&path).expect("read page");
        bytes[6] ^= 0xFF;
        fs::write(&path, bytes).expect("rewrite page");
        assert!(matches!(
            store.load_page(0),
            Err(SectionCacheError::Corrupt { .. })
        ));

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn size_cap_applies_to_writes() {
        let root = temp_cache_root("cap");
        let config = SectionConfig::for_display(200, 120);
        let pages = sample_pages(&config);
        let tiny = FileSectionCacheStore::new(&root).with_max_file_bytes(16);
        assert!(tiny.store_page(0, &pages[0]).is_err());
        assert!(!tiny.page_path(0).exists());
        let leftovers = fs::read_dir(&root).map(|dir| dir.count()).unwrap_or(0);
        assert_eq!(leftovers, 0);

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn progress_roundtrip() {
        let root = temp_cache_root("progress");
        let store = FileSectionCacheStore::new(&root);
        assert_eq!(store.load_progress(), None);
        let position = ReaderPosition {
            chapter_index: 3,
            page_index: 258,
        };
        store.store_progress(position).expect("store progress");
        assert_eq!(store.load_progress(), Some(position));

        let _ = fs::remove_dir_all(root);
    }
}
