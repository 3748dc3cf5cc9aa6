use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::config;
use crate::error::{Result, SweepError};
use crate::exif::TagNames;
use crate::picture::Image;
use crate::sweeper::{PreserveSet, StripReport, Sweeper};

/// Extensions picked up by a batch sweep (matched case-insensitively).
pub const RECOGNIZED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "bmp", "gif"];

/// Check if a file has a recognized image extension.
pub fn is_recognized_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| RECOGNIZED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// What happened to one file of a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Swept { report: StripReport },
    /// Not a recognized image; left alone and not copied.
    Skipped,
    Failed { error: String },
}

/// The result of sweeping a single file in a batch.
///
/// `output` is the path written, which is `None` for skipped and failed
/// files and for every file of a dry run.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub output: Option<PathBuf>,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileStatus::Failed { .. })
    }
}

/// Open, strip, and (unless `dry_run`) save one image.
///
/// Unlike [`sweep`], the input can be any image the codec decodes; its
/// extension is not checked.
///
/// ```rust,no_run
/// use exif_sweep::config::Config;
/// use exif_sweep::pipeline::strip_file;
///
/// let sweeper = Config::default().sweeper();
/// let report = strip_file(&sweeper, "in.jpg".as_ref(), "out.jpg".as_ref(), false).unwrap();
/// for tag in report.removed() {
///     println!("removed {} from {}", tag.name, tag.ifd);
/// }
/// ```
pub fn strip_file(sweeper: &Sweeper, input: &Path, output: &Path, dry_run: bool) -> Result<StripReport> {
    let image = Image::open(input)?;
    let (clean, report) = sweeper.strip_metadata(&image)?;
    if dry_run {
        log::info!(
            "[dry run] {}: would remove {} tags",
            input.display(),
            report.removed().count()
        );
    } else {
        clean.save(output)?;
    }
    Ok(report)
}

/// Sweep every regular file directly inside `input_dir` (not recursive),
/// in file-name order, writing cleaned images to `output_dir` under the
/// same file name.
///
/// Files without a recognized extension are reported as
/// [`FileStatus::Skipped`]. A file that fails to decode, encode, or write
/// becomes [`FileStatus::Failed`]; the rest of the batch still runs. Only
/// an unreadable `input_dir` or an uncreatable `output_dir` fail the
/// whole call. With `dry_run`, nothing is written and `output_dir` is not
/// created.
pub fn sweep(
    input_dir: &Path,
    output_dir: &Path,
    sweeper: &Sweeper,
    dry_run: bool,
) -> Result<Vec<FileOutcome>> {
    let files = list_files(input_dir)?;
    sweep_paths(&files, output_dir, sweeper, dry_run, true)
}

/// Sweep an explicit list of files into `output_dir`.
///
/// Each file goes through [`strip_file`], so extensions are not checked;
/// anything the codec cannot decode becomes [`FileStatus::Failed`]. Files
/// sharing a name overwrite each other in `output_dir`.
pub fn sweep_files(
    files: &[PathBuf],
    output_dir: &Path,
    sweeper: &Sweeper,
    dry_run: bool,
) -> Result<Vec<FileOutcome>> {
    sweep_paths(files, output_dir, sweeper, dry_run, false)
}

fn sweep_paths(
    files: &[PathBuf],
    output_dir: &Path,
    sweeper: &Sweeper,
    dry_run: bool,
    recognized_only: bool,
) -> Result<Vec<FileOutcome>> {
    if !dry_run {
        std::fs::create_dir_all(output_dir).map_err(|source| SweepError::Write {
            path: output_dir.to_path_buf(),
            source,
        })?;
    }

    let mut outcomes = Vec::with_capacity(files.len());
    for path in files {
        let path = path.clone();
        let Some(file_name) = path.file_name() else {
            log::warn!("Skipping path without a file name: {}", path.display());
            continue;
        };

        if recognized_only && !is_recognized_image(&path) {
            log::info!("Skipping non-image file: {}", path.display());
            outcomes.push(FileOutcome {
                path,
                output: None,
                status: FileStatus::Skipped,
            });
            continue;
        }

        let target = output_dir.join(file_name);
        log::info!("Processing: {}", path.display());

        let outcome = match strip_file(sweeper, &path, &target, dry_run) {
            Ok(report) => {
                log::info!(
                    "  Removed {} tags, kept {}",
                    report.removed().count(),
                    report.kept().count()
                );
                FileOutcome {
                    path,
                    output: (!dry_run).then_some(target),
                    status: FileStatus::Swept { report },
                }
            }
            Err(e) => {
                log::error!("  Failed: {}: {e}", path.display());
                FileOutcome {
                    path,
                    output: None,
                    status: FileStatus::Failed {
                        error: e.to_string(),
                    },
                }
            }
        };
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

/// Regular files directly inside `dir`, sorted by file name.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_dir_error = |source: std::io::Error| SweepError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    if !dir.is_dir() {
        return Err(read_dir_error(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "not a directory",
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) if e.depth() == 0 => return Err(read_dir_error(e.into())),
            Err(e) => log::warn!("Skipping unreadable entry: {e}"),
        }
    }
    Ok(files)
}

/// Counts over a batch, rendered as the one-line status shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub swept: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Tags removed across all swept files.
    pub tags_removed: usize,
}

impl From<&[FileOutcome]> for BatchSummary {
    fn from(outcomes: &[FileOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match &outcome.status {
                FileStatus::Swept { report } => {
                    summary.swept += 1;
                    summary.tags_removed += report.removed().count();
                }
                FileStatus::Skipped => summary.skipped += 1,
                FileStatus::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

impl From<&Vec<FileOutcome>> for BatchSummary {
    fn from(outcomes: &Vec<FileOutcome>) -> Self {
        Self::from(outcomes.as_slice())
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Metadata removal complete! {} image(s) cleaned, {} tag(s) removed",
            self.swept, self.tags_removed
        )?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        f.write_str(".")
    }
}

/// A configured batch sweep: input and output folders plus the sweeper.
///
/// ```rust,no_run
/// use exif_sweep::pipeline::{BatchSummary, Pipeline};
///
/// let pipeline = Pipeline::builder()
///     .input("photos")
///     .output("clean")
///     .build()
///     .unwrap();
/// let outcomes = pipeline.run().unwrap();
/// println!("{}", BatchSummary::from(&outcomes));
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    input: PathBuf,
    output: PathBuf,
    sweeper: Sweeper,
    dry_run: bool,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn sweeper(&self) -> &Sweeper {
        &self.sweeper
    }

    pub fn run(&self) -> Result<Vec<FileOutcome>> {
        log::info!(
            "Sweeping {} -> {}{}",
            self.input.display(),
            self.output.display(),
            if self.dry_run { " (dry run)" } else { "" }
        );
        sweep(&self.input, &self.output, &self.sweeper, self.dry_run)
    }
}

#[derive(Debug, Default)]
pub struct PipelineBuilder {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    preserve: Option<PreserveSet>,
    names: Option<TagNames>,
    dry_run: bool,
}

impl PipelineBuilder {
    pub fn input(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input = Some(dir.into());
        self
    }

    pub fn output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output = Some(dir.into());
        self
    }

    /// Tags to keep. Defaults to [`config::DEFAULT_PRESERVE_TAGS`].
    pub fn preserve(mut self, preserve: PreserveSet) -> Self {
        self.preserve = Some(preserve);
        self
    }

    /// Name table used to resolve tag ids. Defaults to [`TagNames::standard`].
    pub fn tag_names(mut self, names: TagNames) -> Self {
        self.names = Some(names);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Fails with [`SweepError::NotConfigured`] if either folder is unset.
    /// Touches no files.
    pub fn build(self) -> Result<Pipeline> {
        let (Some(input), Some(output)) = (self.input, self.output) else {
            return Err(SweepError::NotConfigured);
        };
        let preserve = self
            .preserve
            .unwrap_or_else(|| PreserveSet::new(config::DEFAULT_PRESERVE_TAGS));
        Ok(Pipeline {
            input,
            output,
            sweeper: Sweeper::new(preserve, self.names.unwrap_or_default()),
            dry_run: self.dry_run,
        })
    }
}
