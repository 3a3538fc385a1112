use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use epub_reflow::{
    Alignment, FixedAdvanceMeasurer, LineRecordError, TextMeasurer, LINE_RECORD_VERSION,
};
use epub_reflow_render::{
    CachedBook, FileSectionCacheStore, NavRequest, Paragraph, ReaderBackend, ReaderPosition,
    RenderCoordinator, SectionCacheError, SectionConfig, MAX_LINES_PER_PAGE,
};

static ROOT_NONCE: AtomicUsize = AtomicUsize::new(0);

fn temp_cache_root(label: &str) -> PathBuf {
    let nonce = ROOT_NONCE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "epub-reflow-reader-{label}-{}-{nonce}",
        std::process::id()
    ))
}

fn config() -> SectionConfig {
    SectionConfig {
        viewport_width: 220,
        viewport_height: 140,
        ..SectionConfig::default()
    }
}

fn chapter(paragraphs: usize, text: &str) -> Vec<Paragraph> {
    (0..paragraphs)
        .map(|_| Paragraph::from_text(text, Alignment::Justified))
        .collect()
}

fn book(root: &Path, config: SectionConfig) -> CachedBook<dyn TextMeasurer + Send + Sync> {
    let measurer: Arc<dyn TextMeasurer + Send + Sync> = Arc::new(FixedAdvanceMeasurer::default());
    let mut book = CachedBook::new(root, config, measurer);
    book.push_chapter(chapter(6, "The quick brown fox jumps over the lazy dog."));
    book.push_chapter(chapter(2, "Съешь же ещё этих мягких французских булок."));
    book
}

#[test]
fn reading_through_a_book_builds_and_reuses_the_cache() {
    let root = temp_cache_root("flow");
    let coordinator = RenderCoordinator::new(book(&root, config()), ReaderPosition::default());

    let first = coordinator.run_pending().expect("first pass");
    assert_eq!(first, Some(ReaderPosition::default()));
    let page_count = coordinator.with_backend(|book| {
        book.section_store(0)
            .load_page_count(book.config())
            .expect("section 0 cached")
    });
    assert!(page_count > 1, "chapter 0 should span pages");

    let mut visited = vec![coordinator.position()];
    for _ in 0..page_count {
        coordinator.request_navigation(NavRequest::NextPage);
        let position = coordinator
            .run_pending()
            .expect("pass")
            .expect("pass was due");
        visited.push(position);
    }
    assert_eq!(visited.last().map(|p| p.chapter_index), Some(1));
    assert!(coordinator.with_backend(|book| book
        .current_page()
        .is_some_and(|page| !page.is_empty())));

    coordinator.request_navigation(NavRequest::PrevPage);
    let back = coordinator.run_pending().expect("pass").expect("pass was due");
    assert_eq!(
        back,
        ReaderPosition {
            chapter_index: 0,
            page_index: page_count - 1,
        }
    );

    let saved = coordinator.with_backend(|book| book.saved_position());
    assert_eq!(saved, Some(back));

    // Same parameters: a fresh book over the same root reads the cached count
    // even though its chapter text differs.
    let mut reopened = CachedBook::new(
        &root,
        config(),
        Arc::new(FixedAdvanceMeasurer::default()),
    );
    reopened.push_chapter(chapter(1, "short"));
    assert_eq!(reopened.open_section(0).expect("open cached"), page_count);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn changed_parameters_rebuild_the_section() {
    let root = temp_cache_root("rebuild");
    let mut book = book(&root, config());
    let narrow = book.open_section(0).expect("build");

    let mut wide = config();
    wide.viewport_width = 600;
    book.set_config(wide);
    let rebuilt = book.open_section(0).expect("rebuild");
    assert!(rebuilt < narrow);
    assert_eq!(
        FileSectionCacheStore::new(root.join("section_0")).read_metadata(&wide).ok(),
        Some(rebuilt)
    );

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn every_cached_line_fits_the_content_width() {
    let root = temp_cache_root("widths");
    let mut cfg = config();
    cfg.hyphenation_enabled = true;
    let mut book = book(&root, cfg);
    let measurer = FixedAdvanceMeasurer::default();

    for chapter_index in 0..book.chapter_count() {
        let pages = book.open_section(chapter_index).expect("build");
        let store = book.section_store(chapter_index);
        for page_index in 0..pages {
            let page = store.load_page(page_index).expect("cached page");
            for placed in &page.lines {
                let line = &placed.line;
                let last = line.len() - 1;
                let end = i32::from(line.x_offsets()[last])
                    + measurer.text_width(0, &line.words()[last], line.styles()[last]);
                assert!(end <= cfg.content_width(), "{:?}", line);
            }
        }
    }

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn corrupt_page_is_rebuilt_on_render() {
    let root = temp_cache_root("corrupt");
    let mut book = book(&root, config());
    let pages = book.open_section(0).expect("build");
    let page_path = book.section_store(0).page_path(1);
    std::fs::write(&page_path, b"not a page").expect("clobber page");

    let position = ReaderPosition {
        chapter_index: 0,
        page_index: 1,
    };
    book.render_page(position, pages).expect("render rebuilds");
    assert!(book.current_page().is_some_and(|page| !page.is_empty()));
    assert!(book.section_store(0).load_page(1).is_ok());

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn stale_line_record_version_rebuilds_the_whole_section() {
    let root = temp_cache_root("record-version");
    let mut book = book(&root, config());
    let pages = book.open_section(0).expect("build");
    let store = book.section_store(0);

    // Page entry: u32 line count, i32 y, then the first line record's version.
    let page_path = store.page_path(1);
    let payload = std::fs::read(&page_path).expect("read page");
    let mut body = payload[..payload.len() - 4].to_vec();
    assert_eq!(body[8], LINE_RECORD_VERSION);
    body[8] = LINE_RECORD_VERSION.wrapping_sub(1);
    let checksum = crc32fast::hash(&body);
    body.extend_from_slice(&checksum.to_le_bytes());
    std::fs::write(&page_path, &body).expect("rewrite page");

    let leftover = store.cache_root().join("page_999.bin");
    std::fs::write(&leftover, b"left from an older build").expect("write leftover");

    assert!(matches!(
        store.load_page(1),
        Err(SectionCacheError::Record(LineRecordError::VersionMismatch { .. }))
    ));

    let position = ReaderPosition {
        chapter_index: 0,
        page_index: 1,
    };
    book.render_page(position, pages).expect("render rebuilds");
    assert!(book.current_page().is_some_and(|page| !page.is_empty()));
    assert!(store.load_page(1).is_ok());
    assert!(!leftover.exists(), "whole section directory is rebuilt");
    assert_eq!(store.read_metadata(&config()).ok(), Some(pages));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn dense_pages_stay_loadable() {
    let root = temp_cache_root("dense");
    let cfg = SectionConfig {
        line_height_px: 1,
        viewport_height: 800,
        ..config()
    };
    let mut book = CachedBook::new(&root, cfg, Arc::new(FixedAdvanceMeasurer::default()));
    book.push_chapter(chapter(700, "word"));

    let pages = book.open_section(0).expect("build");
    assert_eq!(pages, 2);
    let store = book.section_store(0);
    let first = store.load_page(0).expect("page 0 loads");
    assert_eq!(first.lines.len(), MAX_LINES_PER_PAGE);
    let second = store.load_page(1).expect("page 1 loads");
    assert_eq!(second.lines.len(), 700 - MAX_LINES_PER_PAGE);

    for page_index in 0..pages {
        let position = ReaderPosition {
            chapter_index: 0,
            page_index,
        };
        book.render_page(position, pages).expect("render");
    }

    let _ = std::fs::remove_dir_all(root);
}
