//! Reader navigation and the render pass lock.
//!
//! A display task calls [`RenderCoordinator::run_pending`] in a loop; input
//! handlers call [`RenderCoordinator::request_navigation`]. A render pass
//! holds the state lock from start to finish. Navigation that arrives while a
//! pass is running is parked in a single slot (a newer request replaces an
//! older one) and applied once the pass has released the lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// Chapter and page the reader is on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ReaderPosition {
    pub chapter_index: usize,
    pub page_index: usize,
}

impl ReaderPosition {
    /// Four bytes: chapter then page, each `u16` little-endian (saturated).
    pub fn to_bytes(self) -> [u8; 4] {
        let chapter = u16::try_from(self.chapter_index).unwrap_or(u16::MAX);
        let page = u16::try_from(self.page_index).unwrap_or(u16::MAX);
        let [c0, c1] = chapter.to_le_bytes();
        let [p0, p1] = page.to_le_bytes();
        [c0, c1, p0, p1]
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let [c0, c1, p0, p1] = <[u8; 4]>::try_from(bytes).ok()?;
        Some(Self {
            chapter_index: usize::from(u16::from_le_bytes([c0, c1])),
            page_index: usize::from(u16::from_le_bytes([p0, p1])),
        })
    }
}

/// Reader navigation input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavRequest {
    NextPage,
    PrevPage,
    /// Skip to the first page of the next chapter.
    NextChapter,
    /// Skip to the first page of the previous chapter.
    PrevChapter,
}

/// Page to land on once the target chapter is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PageTarget {
    Page(usize),
    Last,
}

/// Book-side operations the coordinator drives.
pub trait ReaderBackend {
    type Error;

    fn chapter_count(&self) -> usize;

    /// Load (or build and persist) a chapter's pages; returns the page count.
    fn open_section(&mut self, chapter_index: usize) -> Result<usize, Self::Error>;

    /// Draw one page.
    fn render_page(
        &mut self,
        position: ReaderPosition,
        page_count: usize,
    ) -> Result<(), Self::Error>;

    /// Persist progress after a successful draw.
    fn save_position(&mut self, _position: ReaderPosition) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct OpenSection {
    page_count: usize,
    current_page: usize,
}

struct ReaderState<B> {
    backend: B,
    /// Signed so stepping back from chapter 0 can be detected and wrapped.
    chapter_index: isize,
    pending_page: PageTarget,
    section: Option<OpenSection>,
}

impl<B: ReaderBackend> ReaderState<B> {
    fn position(&self) -> ReaderPosition {
        ReaderPosition {
            chapter_index: usize::try_from(self.chapter_index).unwrap_or(0),
            page_index: self.section.map_or(0, |section| section.current_page),
        }
    }

    fn step_chapter(&mut self, delta: isize, target: PageTarget) {
        self.chapter_index = self.chapter_index.saturating_add(delta);
        self.pending_page = target;
        self.section = None;
    }

    fn turn_to(&mut self, page: usize) {
        if let Some(section) = self.section.as_mut() {
            section.current_page = page;
        }
    }

    fn navigate(&mut self, nav: NavRequest) {
        let Some(OpenSection {
            page_count,
            current_page,
        }) = self.section
        else {
            // Nothing open yet: the next pass retries the current chapter.
            return;
        };
        match nav {
            NavRequest::NextChapter => self.step_chapter(1, PageTarget::Page(0)),
            NavRequest::PrevChapter => self.step_chapter(-1, PageTarget::Page(0)),
            NavRequest::PrevPage if current_page > 0 => self.turn_to(current_page - 1),
            NavRequest::PrevPage => self.step_chapter(-1, PageTarget::Last),
            NavRequest::NextPage if current_page + 1 < page_count => {
                self.turn_to(current_page + 1)
            }
            NavRequest::NextPage => self.step_chapter(1, PageTarget::Page(0)),
        }
    }

    fn render_pass(&mut self) -> Result<Option<ReaderPosition>, B::Error> {
        let chapter_count = self.backend.chapter_count();
        if chapter_count == 0 {
            return Ok(None);
        }
        let in_range = usize::try_from(self.chapter_index).is_ok_and(|idx| idx < chapter_count);
        if !in_range {
            self.chapter_index = 0;
            self.section = None;
        }
        let chapter_index = usize::try_from(self.chapter_index).unwrap_or(0);

        let section = match self.section {
            Some(section) => section,
            None => {
                let page_count = self.backend.open_section(chapter_index)?;
                let last_page = page_count.saturating_sub(1);
                let current_page = match self.pending_page {
                    PageTarget::Last => last_page,
                    PageTarget::Page(page) => page.min(last_page),
                };
                let section = OpenSection {
                    page_count,
                    current_page,
                };
                self.section = Some(section);
                section
            }
        };

        let position = ReaderPosition {
            chapter_index,
            page_index: section.current_page,
        };
        self.backend.render_page(position, section.page_count)?;
        self.backend.save_position(position)?;
        Ok(Some(position))
    }
}

/// Serializes render passes against navigation for one open book.
pub struct RenderCoordinator<B> {
    state: Mutex<ReaderState<B>>,
    update_required: AtomicBool,
    deferred: Mutex<Option<NavRequest>>,
}

impl<B: ReaderBackend> RenderCoordinator<B> {
    /// Start at `position`; the first [`Self::run_pending`] renders it.
    pub fn new(backend: B, position: ReaderPosition) -> Self {
        Self {
            state: Mutex::new(ReaderState {
                backend,
                chapter_index: isize::try_from(position.chapter_index).unwrap_or(0),
                pending_page: PageTarget::Page(position.page_index),
                section: None,
            }),
            update_required: AtomicBool::new(true),
            deferred: Mutex::new(None),
        }
    }

    /// Apply `nav` now, or park it if a render pass holds the lock.
    ///
    /// Returns `true` when applied immediately. Either way a redraw is flagged.
    pub fn request_navigation(&self, nav: NavRequest) -> bool {
        let applied = match self.state.try_lock() {
            Ok(mut state) => {
                state.navigate(nav);
                true
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                poisoned.into_inner().navigate(nav);
                true
            }
            Err(TryLockError::WouldBlock) => {
                *lock(&self.deferred) = Some(nav);
                false
            }
        };
        self.update_required.store(true, Ordering::Release);
        applied
    }

    /// Flag a redraw without navigating.
    pub fn request_update(&self) {
        self.update_required.store(true, Ordering::Release);
    }

    pub fn update_required(&self) -> bool {
        self.update_required.load(Ordering::Acquire)
    }

    /// Whether a navigation request is parked for after the current pass.
    pub fn has_deferred_navigation(&self) -> bool {
        lock(&self.deferred).is_some()
    }

    /// Run one render pass if a redraw is pending.
    ///
    /// Returns the rendered position, `None` when nothing was due (or the book
    /// has no chapters). The pass always runs to completion under the lock; a
    /// parked navigation request is applied after the lock is released. One
    /// parked while something else held the lock (`position`, `with_backend`)
    /// is applied before this pass starts.
    pub fn run_pending(&self) -> Result<Option<ReaderPosition>, B::Error> {
        self.apply_deferred();
        if !self.update_required.swap(false, Ordering::AcqRel) {
            return Ok(None);
        }
        let result = {
            let mut state = lock(&self.state);
            state.render_pass()
        };
        self.apply_deferred();
        result
    }

    pub fn position(&self) -> ReaderPosition {
        lock(&self.state).position()
    }

    /// Run `f` against the backend under the render lock.
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut lock(&self.state).backend)
    }

    pub fn into_backend(self) -> B {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .backend
    }

    fn apply_deferred(&self) {
        let Some(nav) = lock(&self.deferred).take() else {
            return;
        };
        lock(&self.state).navigate(nav);
        self.update_required.store(true, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
