use std::path::{Path, PathBuf};
use std::sync::Arc;

use epub_reflow::TextMeasurer;

use crate::cache::{FileSectionCacheStore, SectionCacheError};
use crate::coordinator::{ReaderBackend, ReaderPosition};
use crate::section::{Page, Paragraph, SectionBuilder, SectionConfig};

/// In-memory chapters backed by an on-disk page cache.
///
/// Each chapter lays out into `<root>/section_<n>/` on first open; later opens
/// read the cached page count (and rebuild if the layout parameters changed).
/// The last rendered page is kept for the display layer to draw.
pub struct CachedBook<M: TextMeasurer + ?Sized> {
    chapters: Vec<Vec<Paragraph>>,
    config: SectionConfig,
    measurer: Arc<M>,
    cache_root: PathBuf,
    max_file_bytes: Option<usize>,
    current_page: Option<Page>,
}

impl<M: TextMeasurer + ?Sized> CachedBook<M> {
    pub fn new(cache_root: impl Into<PathBuf>, config: SectionConfig, measurer: Arc<M>) -> Self {
        Self {
            chapters: Vec::with_capacity(8),
            config,
            measurer,
            cache_root: cache_root.into(),
            max_file_bytes: None,
            current_page: None,
        }
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: usize) -> Self {
        self.max_file_bytes = Some(max_file_bytes);
        self
    }

    pub fn push_chapter(&mut self, paragraphs: Vec<Paragraph>) {
        self.chapters.push(paragraphs);
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn config(&self) -> &SectionConfig {
        &self.config
    }

    /// Change layout parameters; cached sections rebuild on their next open.
    pub fn set_config(&mut self, config: SectionConfig) {
        self.config = config;
    }

    pub fn section_store(&self, chapter_index: usize) -> FileSectionCacheStore {
        let store = FileSectionCacheStore::new(
            self.cache_root
                .join(format!("section_{}", chapter_index)), // allow: file I/O path, not hot
        );
        match self.max_file_bytes {
            Some(max) => store.with_max_file_bytes(max),
            None => store,
        }
    }

    /// Last saved reading position, if any.
    pub fn saved_position(&self) -> Option<ReaderPosition> {
        FileSectionCacheStore::new(&self.cache_root).load_progress()
    }

    /// Page produced by the most recent render.
    pub fn current_page(&self) -> Option<&Page> {
        self.current_page.as_ref()
    }

    fn build_section(
        &self,
        chapter_index: usize,
        store: &FileSectionCacheStore,
    ) -> Result<usize, SectionCacheError> {
        store.clear()?;
        let paragraphs = self.chapters.get(chapter_index).cloned().unwrap_or_default();
        let mut builder = SectionBuilder::new(self.config, self.measurer.as_ref());

        let mut stored = 0usize;
        let mut failure = None;
        let mut persist = |page: Page| {
            if failure.is_some() {
                return;
            }
            match store.store_page(stored, &page) {
                Ok(()) => stored += 1,
                Err(err) => failure = Some(err),
            }
        };
        for paragraph in paragraphs {
            builder.push_paragraph(paragraph);
            builder.drain_pages(&mut persist);
        }
        builder.finish(&mut persist);
        if let Some(err) = failure {
            let _ = store.clear();
            return Err(err);
        }

        store.write_metadata(&self.config, stored)?;
        log::debug!("built section {} ({} pages)", chapter_index, stored);
        Ok(stored)
    }
}

impl<M: TextMeasurer + ?Sized> ReaderBackend for CachedBook<M> {
    type Error = SectionCacheError;

    fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    fn open_section(&mut self, chapter_index: usize) -> Result<usize, Self::Error> {
        let store = self.section_store(chapter_index);
        match store.load_page_count(&self.config) {
            Some(page_count) => Ok(page_count),
            None => self.build_section(chapter_index, &store),
        }
    }

    fn render_page(
        &mut self,
        position: ReaderPosition,
        page_count: usize,
    ) -> Result<(), Self::Error> {
        let page = if page_count == 0 {
            Page::default()
        } else {
            let store = self.section_store(position.chapter_index);
            match store.load_page(position.page_index) {
                Ok(page) => page,
                Err(err) => {
                    log::warn!(
                        "page {} of section {} unreadable, rebuilding: {}",
                        position.page_index,
                        position.chapter_index,
                        err
                    );
                    self.build_section(position.chapter_index, &store)?;
                    store.load_page(position.page_index)?
                }
            }
        };
        self.current_page = Some(page);
        Ok(())
    }

    fn save_position(&mut self, position: ReaderPosition) -> Result<(), Self::Error> {
        FileSectionCacheStore::new(&self.cache_root).store_progress(position)
    }
}
