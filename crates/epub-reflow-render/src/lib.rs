//! Section layout, page caching and reader coordination for `epub-reflow`.

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

mod book;
mod cache;
mod coordinator;
mod section;

pub use book::CachedBook;
pub use cache::{FileSectionCacheStore, SectionCacheError, SECTION_CACHE_VERSION};
pub use coordinator::{NavRequest, ReaderBackend, ReaderPosition, RenderCoordinator};
pub use section::{
    layout_section, Page, PageLine, Paragraph, SectionBuilder, SectionConfig, MAX_LINES_PER_PAGE,
};
