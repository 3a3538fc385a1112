//! DHAT heap profiler for epub-reflow.
//!
//! Profiles allocation patterns across the reflow pipeline:
//! hyphenate -> layout -> section -> cache -> session.
//!
//! Usage:
//!   cargo run -p epub-reflow-heap-profile --release -- [OPTIONS] [TEXT_FILES...]
//!
//! Text files hold blank-line separated paragraphs. Without files a synthetic
//! mixed English/Russian corpus is profiled.
//!
//! Outputs dhat-<phase>-<name>.json files in the output directory (default: target/memory).
//! Open in https://nnethercote.github.io/dh_view/dh_view.html

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use epub_reflow::{break_offsets, Alignment, FontStyle, LineBreaker, TextMeasurer, WordQueue};
use epub_reflow_embedded_graphics::EgTextMeasurer;
use epub_reflow_render::{
    layout_section, CachedBook, NavRequest, Paragraph, ReaderBackend, ReaderPosition,
    RenderCoordinator, SectionConfig,
};

const DISPLAY_WIDTH: i32 = 480;
const DISPLAY_HEIGHT: i32 = 800;

const SYNTHETIC_NAME: &str = "synthetic";
const SYNTHETIC_PARAGRAPHS: usize = 400;

const ENGLISH_WORDS: &[&str] = &[
    "the", "understanding", "of", "remarkable", "typography", "depends", "upon", "careful",
    "hyphenation", "and", "well-balanced", "paragraphs", "whose", "lines", "neither", "crowd",
    "nor", "scatter", "their", "letters", "across", "narrow", "electronic", "paper",
];

const RUSSIAN_WORDS: &[&str] = &[
    "электронная", "книга", "показывает", "страницы", "медленно", "поэтому", "переносы",
    "слов", "и", "ровные", "строки", "особенно", "важны", "для", "читателя",
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Hyphenate,
    Layout,
    Section,
    Cache,
    Session,
}

impl Phase {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "hyphenate" => Some(Self::Hyphenate),
            "layout" => Some(Self::Layout),
            "section" => Some(Self::Section),
            "cache" => Some(Self::Cache),
            "session" => Some(Self::Session),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Hyphenate => "hyphenate",
            Self::Layout => "layout",
            Self::Section => "section",
            Self::Cache => "cache",
            Self::Session => "session",
        }
    }
}

/// Deterministic corpus alternating English and Russian paragraphs.
fn synthetic_paragraphs() -> Vec<String> {
    let mut seed: u32 = 0x2545_f491;
    let mut next = move |bound: usize| {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (seed >> 16) as usize % bound
    };
    (0..SYNTHETIC_PARAGRAPHS)
        .map(|idx| {
            let words = if idx % 3 == 2 {
                RUSSIAN_WORDS
            } else {
                ENGLISH_WORDS
            };
            let len = 20 + next(60);
            let mut text = String::with_capacity(len * 10);
            for i in 0..len {
                if i > 0 {
                    text.push(' ');
                }
                text.push_str(words[next(words.len())]);
            }
            text.push('.');
            text
        })
        .collect()
}

fn read_paragraphs(path: &Path) -> Vec<String> {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("read {}: {}", path.display(), e));
    text.split("\n\n")
        .map(|block| block.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|block| !block.is_empty())
        .collect()
}

fn section_config() -> SectionConfig {
    SectionConfig {
        font_id: 1,
        hyphenation_enabled: true,
        ..SectionConfig::for_display(DISPLAY_WIDTH, DISPLAY_HEIGHT)
    }
}

fn to_paragraphs(texts: &[String]) -> Vec<Paragraph> {
    texts
        .iter()
        .map(|text| Paragraph::from_text(text, Alignment::Justified))
        .collect()
}

fn profile_cache_root(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("epub-reflow-heap-{}-{}", name, std::process::id()))
}

fn profile_paragraphs(name: &str, texts: &[String], phase: Phase) {
    let measurer = EgTextMeasurer::new();
    let config = section_config();

    match phase {
        Phase::Hyphenate => {
            let mut offsets = 0usize;
            for text in texts {
                for word in text.split_whitespace() {
                    offsets += break_offsets(word, true).len();
                }
            }
            if offsets == 0 {
                panic!("hyphenate {} found no break offsets", name);
            }
        }
        Phase::Layout => {
            let breaker = LineBreaker::new(config.layout_config(), &measurer);
            let mut lines = 0usize;
            for text in texts {
                let mut queue = WordQueue::new(Alignment::Justified);
                queue.push_text(text, FontStyle::Regular);
                lines += breaker.layout_and_extract_lines(&mut queue, |_| {});
            }
            if lines == 0 {
                panic!("layout {} produced zero lines", name);
            }
        }
        Phase::Section => {
            let pages = layout_section(config, &measurer, to_paragraphs(texts));
            if pages.is_empty() {
                panic!("section {} produced zero pages", name);
            }
        }
        Phase::Cache => {
            let root = profile_cache_root(name);
            let shared: Arc<dyn TextMeasurer + Send + Sync> = EgTextMeasurer::shared();
            let mut book = CachedBook::new(&root, config, shared);
            book.push_chapter(to_paragraphs(texts));
            // First open builds and persists, second reads the metadata back.
            for _ in 0..2 {
                book.open_section(0)
                    .unwrap_or_else(|e| panic!("cache {}: {}", name, e));
            }
            let _ = std::fs::remove_dir_all(&root);
        }
        Phase::Session => {
            // Page-flip simulation over two chapters through the coordinator.
            let root = profile_cache_root(name);
            let mut book = CachedBook::new(&root, config, EgTextMeasurer::shared());
            let half = texts.len() / 2;
            book.push_chapter(to_paragraphs(&texts[..half]));
            book.push_chapter(to_paragraphs(&texts[half..]));
            let coordinator = RenderCoordinator::new(book, ReaderPosition::default());

            let mut flips = 0usize;
            while let Some(position) = coordinator
                .run_pending()
                .unwrap_or_else(|e| panic!("session {}: {}", name, e))
            {
                flips += 1;
                if flips > 1 && position == ReaderPosition::default() {
                    break;
                }
                coordinator.request_navigation(NavRequest::NextPage);
            }
            if flips == 0 {
                panic!("session {} produced zero pages", name);
            }
            let _ = std::fs::remove_dir_all(&root);
        }
    }
}

/// Extract a short name from a file path for use in output filenames.
fn short_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

fn profile_input(file: Option<&PathBuf>, phase: Phase) {
    match file {
        Some(path) => profile_paragraphs(&short_name(path), &read_paragraphs(path), phase),
        None => profile_paragraphs(SYNTHETIC_NAME, &synthetic_paragraphs(), phase),
    }
}

fn usage() {
    eprintln!("Usage: heap-profile [OPTIONS] [TEXT_FILES...]");
    eprintln!();
    eprintln!("Options:");
    eprintln!(
        "  --phase <hyphenate|layout|section|cache|session>  Pipeline phase to profile (default: section)"
    );
    eprintln!("  --out-dir <DIR>                      Output directory for dhat JSON (default: target/memory)");
    eprintln!(
        "  --aggregate                          Single profile for all files (default: per-file)"
    );
    eprintln!();
    eprintln!("By default, each file gets its own clean DHAT profile (separate process).");
    eprintln!("With --aggregate, all files share one profile.");
    eprintln!();
    eprintln!("If no files are given, profiles a synthetic English/Russian corpus.");
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut phase = Phase::Section;
    let mut out_dir = PathBuf::from("target/memory");
    let mut files: Vec<PathBuf> = Vec::with_capacity(8);
    let mut aggregate = false;
    // Internal flag: when set, we're a child process profiling a single file.
    let mut single_file_mode = false;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--phase" => {
                i += 1;
                let value = args.get(i).map(String::as_str).unwrap_or_default();
                phase = Phase::from_str(value).unwrap_or_else(|| {
                    eprintln!("Unknown phase: {}", value);
                    usage();
                    std::process::exit(1);
                });
            }
            "--out-dir" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    usage();
                    std::process::exit(1);
                };
                out_dir = PathBuf::from(value);
            }
            "--aggregate" => {
                aggregate = true;
            }
            "--single-file" => {
                single_file_mode = true;
            }
            "--help" | "-h" => {
                usage();
                std::process::exit(0);
            }
            other => {
                files.push(PathBuf::from(other));
            }
        }
        i += 1;
    }

    std::fs::create_dir_all(&out_dir).unwrap_or_else(|e| {
        eprintln!("Failed to create output dir {}: {}", out_dir.display(), e);
        std::process::exit(1);
    });

    let phase_name = phase.name();

    // Synthetic corpus or child process mode: one DHAT session in this process.
    if files.is_empty() || single_file_mode {
        assert!(files.len() <= 1, "--single-file expects exactly one file");
        let file = files.first();
        let name = file.map_or_else(|| SYNTHETIC_NAME.to_string(), |path| short_name(path));
        let json_path = out_dir.join(format!("dhat-{phase_name}-{name}.json"));
        eprintln!("heap-profile: phase={}, input={}", phase_name, name);

        let profiler = dhat::Profiler::builder().file_name(json_path.clone()).build();
        profile_input(file, phase);
        drop(profiler);

        if !single_file_mode {
            eprintln!(
                "Done. Open {} in https://nnethercote.github.io/dh_view/dh_view.html",
                json_path.display()
            );
        }
        return;
    }

    if aggregate {
        let json_path = out_dir.join(format!("dhat-{phase_name}.json"));
        eprintln!(
            "heap-profile: phase={}, files={} (aggregate), out={}",
            phase_name,
            files.len(),
            out_dir.display()
        );

        let _profiler = dhat::Profiler::builder()
            .file_name(json_path.clone())
            .build();

        for file in &files {
            eprintln!("  profiling: {}", file.display());
            profile_input(Some(file), phase);
        }

        eprintln!(
            "Done. Open {} in https://nnethercote.github.io/dh_view/dh_view.html",
            json_path.display()
        );
        return;
    }

    // Per-file mode (default): spawn a child process per file for clean DHAT sessions.
    let self_exe = std::env::current_exe().unwrap_or_else(|e| {
        eprintln!("Failed to determine own executable path: {}", e);
        std::process::exit(1);
    });

    eprintln!(
        "heap-profile: phase={}, files={} (per-file), out={}",
        phase_name,
        files.len(),
        out_dir.display()
    );

    let mut any_failed = false;
    for file in &files {
        let name = short_name(file);
        eprintln!(
            "  profiling: {} -> dhat-{}-{}.json",
            file.display(),
            phase_name,
            name
        );

        let status = Command::new(&self_exe)
            .arg("--single-file")
            .arg("--phase")
            .arg(phase_name)
            .arg("--out-dir")
            .arg(&out_dir)
            .arg(file)
            .status();

        match status {
            Ok(s) if s.success() => {}
            Ok(s) => {
                eprintln!("    FAILED (exit {})", s.code().unwrap_or(-1));
                any_failed = true;
            }
            Err(e) => {
                eprintln!("    FAILED to spawn: {}", e);
                any_failed = true;
            }
        }
    }

    eprintln!();
    eprintln!("Profiles saved to {}:", out_dir.display());
    for file in &files {
        let name = short_name(file);
        let json_path = out_dir.join(format!("dhat-{phase_name}-{name}.json"));
        if json_path.exists() {
            eprintln!("  {}", json_path.display());
        }
    }
    eprintln!();
    eprintln!("Open in https://nnethercote.github.io/dh_view/dh_view.html");

    if any_failed {
        std::process::exit(1);
    }
}
