use std::env;
use std::process::ExitCode;

use epub_reflow::{
    Alignment, FixedAdvanceMeasurer, FontStyle, LayoutConfig, LineBreaker, LineRecord, WordQueue,
};

#[derive(Clone, Debug)]
struct Args {
    path: String,
    width: i32,
    hyphenate: bool,
    indent: bool,
    alignment: Alignment,
    advance: i32,
    hyphen_advance: i32,
    space: i32,
    show_offsets: bool,
}

fn main() -> ExitCode {
    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("{}", help_text());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let cfg = parse_args(args)?;
    let source = std::fs::read_to_string(&cfg.path)
        .map_err(|e| format!("read {}: {}", cfg.path, e))?;

    let measurer = FixedAdvanceMeasurer::new(cfg.advance, cfg.hyphen_advance, cfg.space);
    let layout = LayoutConfig {
        hyphenation_enabled: cfg.hyphenate,
        extra_paragraph_spacing: !cfg.indent,
        ..LayoutConfig::for_width(cfg.width)
    };
    let breaker = LineBreaker::new(layout, &measurer);

    let mut total_lines = 0usize;
    for (idx, paragraph) in paragraphs(&source).enumerate() {
        let mut queue = WordQueue::new(cfg.alignment);
        queue.push_text(paragraph, FontStyle::Regular);
        if queue.is_empty() {
            continue;
        }
        if idx > 0 && !cfg.indent {
            println!();
        }
        total_lines += breaker.layout_and_extract_lines(&mut queue, |line| {
            println!("{}", render_line(&line, &measurer, cfg.show_offsets));
        });
    }
    eprintln!("{} lines at {}px", total_lines, cfg.width);
    Ok(())
}

/// Blank-line separated paragraphs.
fn paragraphs(source: &str) -> impl Iterator<Item = &str> {
    source
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
}

fn render_line(line: &LineRecord, measurer: &FixedAdvanceMeasurer, show_offsets: bool) -> String {
    if show_offsets {
        return line
            .iter()
            .map(|(word, x, _)| format!("{}@{}", word, x))
            .collect::<Vec<_>>()
            .join(" ");
    }
    // Place words on a character grid using the measurer's advance.
    let advance = measurer.advance.max(1);
    let mut out = String::with_capacity(line.words().iter().map(String::len).sum::<usize>() + 8);
    let mut column = 0usize;
    for (word, x, _) in line.iter() {
        let target = usize::from(x) / advance as usize;
        while column < target {
            out.push(' ');
            column += 1;
        }
        if column > 0 && !out.ends_with(' ') {
            out.push(' ');
            column += 1;
        }
        out.push_str(word);
        column += word.chars().count();
    }
    out
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        return Err("help requested".to_string());
    }

    let mut cfg = Args {
        path: args[1].clone(),
        width: 480,
        hyphenate: false,
        indent: false,
        alignment: Alignment::Justified,
        advance: 10,
        hyphen_advance: 5,
        space: 5,
        show_offsets: false,
    };

    let mut i = 2usize;
    while i < args.len() {
        match args[i].as_str() {
            "--width" => {
                cfg.width = parse_value(&args, i, "--width")?;
                i += 2;
            }
            "--advance" => {
                cfg.advance = parse_value(&args, i, "--advance")?;
                i += 2;
            }
            "--hyphen-advance" => {
                cfg.hyphen_advance = parse_value(&args, i, "--hyphen-advance")?;
                i += 2;
            }
            "--space" => {
                cfg.space = parse_value(&args, i, "--space")?;
                i += 2;
            }
            "--align" => {
                let v = args
                    .get(i + 1)
                    .ok_or_else(|| "--align requires a value".to_string())?;
                cfg.alignment = match v.as_str() {
                    "justify" | "justified" => Alignment::Justified,
                    "left" => Alignment::Left,
                    "center" => Alignment::Center,
                    "right" => Alignment::Right,
                    _ => return Err(format!("invalid --align value '{}'", v)),
                };
                i += 2;
            }
            "--hyphenate" => {
                cfg.hyphenate = true;
                i += 1;
            }
            "--indent" => {
                cfg.indent = true;
                i += 1;
            }
            "--offsets" => {
                cfg.show_offsets = true;
                i += 1;
            }
            other => return Err(format!("unknown option '{}'", other)),
        }
    }

    if cfg.width <= 0 {
        return Err("--width must be positive".to_string());
    }
    Ok(cfg)
}

fn parse_value(args: &[String], i: usize, name: &str) -> Result<i32, String> {
    let v = args
        .get(i + 1)
        .ok_or_else(|| format!("{} requires a value", name))?;
    v.parse::<i32>()
        .map_err(|_| format!("invalid {} value '{}'", name, v))
}

fn help_text() -> &'static str {
    r#"epub-reflow - reflow plain text paragraphs into fixed-width lines

USAGE:
  cargo run --features cli --bin epub-reflow -- <text_file> [options]

OPTIONS:
  --width <px>            line width (default: 480)
  --align <mode>          justify|left|center|right (default: justify)
  --hyphenate             greedy layout with hyphenation (default: optimal, no hyphenation)
  --indent                em-space first-line indent instead of blank lines
  --advance <px>          glyph advance (default: 10)
  --hyphen-advance <px>   advance of '-' (default: 5)
  --space <px>            inter-word space (default: 5)
  --offsets               print word@x instead of a character grid
"#
}
