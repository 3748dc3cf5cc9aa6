use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use exif_sweep::config::Config;
use exif_sweep::picture::Image;
use exif_sweep::pipeline::{self, BatchSummary, FileOutcome, FileStatus};
use exif_sweep::sweeper::{MetadataState, Sweeper, TagListing};

#[derive(Parser, Debug)]
#[command(
    name = "exif-sweep",
    version,
    about = "Remove EXIF metadata from images, keeping only the tags that affect how they decode"
)]
struct Cli {
    /// Image files to sweep individually (any decodable image)
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Folder to sweep (default: folders.input from the config)
    #[arg(short, long, value_name = "DIR")]
    input: Option<PathBuf>,

    /// Folder to write cleaned images to (default: folders.output from the config)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Report what would be removed without writing any files
    #[arg(long)]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output (log every tag decision)
    #[arg(short, long)]
    verbose: bool,

    /// List every EXIF tag of the given files and whether it would be kept, then exit
    #[arg(long = "show-exif")]
    show_exif: bool,

    /// Tag name or hex id to keep; repeatable, replaces the configured list
    #[arg(long, value_name = "NAME")]
    preserve: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    // Load config, then apply CLI overrides
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if !cli.preserve.is_empty() {
        config.preserve.tags = cli.preserve.clone();
    }
    if cli.input.is_some() {
        config.folders.input = cli.input.clone();
    }
    if cli.output.is_some() {
        config.folders.output = cli.output.clone();
    }

    let sweeper = config.sweeper();
    log::debug!("Preserving {} tag(s)", sweeper.preserve().len());

    // Handle --show-exif
    if cli.show_exif {
        if cli.files.is_empty() {
            anyhow::bail!("No input files specified. Use --help for usage.");
        }
        return show_exif(&cli.files, &sweeper, cli.json);
    }

    if config.output.dry_run {
        log::info!("DRY RUN: no files will be written");
    }

    let outcomes = if cli.files.is_empty() {
        let pipeline = config.pipeline().context(
            "Set --input and --output (or folders.input/folders.output in config.json)",
        )?;
        pipeline.run()?
    } else {
        let output = config
            .folders
            .output
            .clone()
            .context("No output folder. Pass --output DIR.")?;
        pipeline::sweep_files(&cli.files, &output, &sweeper, config.output.dry_run)?
    };

    println!("{}", batch_report(&outcomes, cli.json)?);
    if cli.json {
        log::info!("{}", BatchSummary::from(&outcomes));
    }
    Ok(())
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 40;
/// Width of the ifd, tag, name and action columns, for continuation lines.
const INDENT_WIDTH: usize = 54;

/// What a batch run prints to stdout. With `json` that is only the JSON
/// document; otherwise one line per file followed by the summary line.
fn batch_report(outcomes: &[FileOutcome], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(outcomes)?);
    }
    let mut lines = outcome_lines(outcomes);
    lines.push(BatchSummary::from(outcomes).to_string());
    Ok(lines.join("\n"))
}

/// One line per file; removed tag names for swept files.
fn outcome_lines(outcomes: &[FileOutcome]) -> Vec<String> {
    let mut lines = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let name = outcome.path.display();
        match &outcome.status {
            FileStatus::Swept { report } => {
                let detail = match report.metadata {
                    MetadataState::Absent => "no metadata".to_string(),
                    MetadataState::Unparseable => "unreadable metadata dropped".to_string(),
                    MetadataState::Swept => {
                        let removed: Vec<&str> = report.removed().map(|d| d.name.as_str()).collect();
                        if removed.is_empty() {
                            "nothing to remove".to_string()
                        } else {
                            format!("removed {}", removed.join(", "))
                        }
                    }
                };
                lines.push(format!("  {GREEN}ok{RESET}      {name} {DIM}({detail}){RESET}"));
            }
            FileStatus::Skipped => lines.push(format!("  {DIM}skipped {name}{RESET}")),
            FileStatus::Failed { error } => lines.push(format!("  {RED}failed{RESET}  {name}: {error}")),
        }
    }
    lines
}

/// Print every EXIF entry of each file with the sweeper's decision.
fn show_exif(files: &[PathBuf], sweeper: &Sweeper, json: bool) -> Result<()> {
    let mut listings = Vec::new();
    for path in files {
        let image = Image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let rows = sweeper.describe(&image);
        if json {
            listings.push(serde_json::json!({
                "path": path.display().to_string(),
                "format": format!("{:?}", image.format()),
                "tags": rows,
            }));
        } else {
            print_listing(path, &image, &rows);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
    }
    Ok(())
}

fn print_listing(path: &Path, image: &Image, rows: &[TagListing]) {
    let (w, h) = image.dimensions();
    println!();
    println!("{BOLD}File:{RESET} {} {DIM}({:?}, {w} x {h}){RESET}", path.display(), image.format());
    println!("{DIM}{}{RESET}", "═".repeat(88));

    if rows.is_empty() {
        println!("  {DIM}(no EXIF metadata found){RESET}");
        println!();
        return;
    }

    println!(
        "  {BOLD}{:<8} {:<6} {:<30} {:<6} {}{RESET}",
        "IFD", "Tag", "Name", "Action", "Value"
    );
    println!("  {DIM}{}{RESET}", "─".repeat(86));
    for row in rows {
        let action = if row.kept {
            format!("{GREEN}{:<6}{RESET}", "keep")
        } else {
            format!("{RED}{:<6}{RESET}", "remove")
        };
        let lines = wrap_text(&row.value, VAL_WIDTH);
        for (i, line) in lines.iter().enumerate() {
            if i == 0 {
                println!(
                    "  {:<8} {:<6} {:<30} {action} {line}",
                    row.ifd.name(),
                    format!("{:04X}", row.tag),
                    row.name
                );
            } else {
                println!("  {:INDENT_WIDTH$}{line}", "");
            }
        }
    }
    println!();
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_batch_flags() {
        let cli = Cli::parse_from([
            "exif-sweep", "--input", "in", "--output", "out", "--preserve", "Orientation",
            "--preserve", "0x0112", "--dry-run",
        ]);
        assert_eq!(cli.input, Some(PathBuf::from("in")));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert_eq!(cli.preserve, vec!["Orientation", "0x0112"]);
        assert!(cli.dry_run);
        assert!(cli.files.is_empty());
    }

    #[test]
    fn parses_show_exif_files() {
        let cli = Cli::parse_from(["exif-sweep", "--show-exif", "a.jpg", "b.png", "--json"]);
        assert!(cli.show_exif);
        assert!(cli.json);
        assert_eq!(cli.files.len(), 2);
    }

    fn outcomes() -> Vec<FileOutcome> {
        vec![
            FileOutcome {
                path: PathBuf::from("in/notes.txt"),
                output: None,
                status: FileStatus::Skipped,
            },
            FileOutcome {
                path: PathBuf::from("in/broken.jpg"),
                output: None,
                status: FileStatus::Failed {
                    error: "Failed to decode image: truncated".into(),
                },
            },
        ]
    }

    #[test]
    fn json_report_is_a_single_document() {
        let text = batch_report(&outcomes(), true).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let files = parsed.as_array().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1]["status"], "failed");
        assert!(!text.contains("Metadata removal complete"));
    }

    #[test]
    fn text_report_ends_with_summary() {
        let text = batch_report(&outcomes(), false).unwrap();
        let last = text.lines().last().unwrap();
        assert_eq!(last, BatchSummary::from(&outcomes()).to_string());
        assert!(text.contains("in/broken.jpg"));
    }

    #[test]
    fn wrap_text_breaks_on_words() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }
}
