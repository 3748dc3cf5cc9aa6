use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::exif::TagNames;
use crate::pipeline::Pipeline;
use crate::sweeper::{PreserveSet, Sweeper};

/// Tags kept by default: the ones that change how an image is decoded or
/// displayed (geometry, sampling, compression, resolution, orientation),
/// plus the embedded thumbnail pointer.
pub const DEFAULT_PRESERVE_TAGS: &[&str] = &[
    "ImageWidth",
    "ImageLength",
    "BitsPerSample",
    "Compression",
    "PhotometricInterpretation",
    "Padding",
    "MakerNote",
    "Orientation",
    "XResolution",
    "YResolution",
    "ResolutionUnit",
    "YCbCrPositioning",
    "ExposureProgram",
    "ISOSpeedRatings",
    "ExifVersion",
    "ExposureBiasValue",
    "MeteringMode",
    "Flash",
    "FlashpixVersion",
    "PixelXDimension",
    "PixelYDimension",
    "SensingMethod",
    "SceneType",
    "JPEGInterchangeFormat",
    "JPEGInterchangeFormatLength",
];

/// Top-level configuration for exif-sweep.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_sweep::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.folders.input = Some("photos".into());
/// config.preserve.tags.push("Make".into());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folders used by a batch sweep.
    pub folders: FolderConfig,
    /// Tags that are never removed.
    pub preserve: PreserveConfig,
    /// Output behavior.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderConfig {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Tag names (as listed by `--show-exif`) or hex ids such as `"0x0112"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreserveConfig {
    pub tags: Vec<String>,
}

impl Default for PreserveConfig {
    fn default() -> Self {
        Self {
            tags: DEFAULT_PRESERVE_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, report what would be removed without writing any files.
    pub dry_run: bool,
}

impl Config {
    /// Resolve the config file path: `config.json` next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        log::debug!(
            "Loaded config from {} ({} preserved tags)",
            config_path.display(),
            config.preserve.tags.len()
        );
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    pub fn preserve_set(&self) -> PreserveSet {
        PreserveSet::new(&self.preserve.tags)
    }

    /// A sweeper using the configured preserve list and the standard tag names.
    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new(self.preserve_set(), TagNames::standard())
    }

    /// A batch pipeline over the configured folders.
    pub fn pipeline(&self) -> crate::error::Result<Pipeline> {
        let mut builder = Pipeline::builder()
            .preserve(self.preserve_set())
            .dry_run(self.output.dry_run);
        if let Some(input) = &self.folders.input {
            builder = builder.input(input);
        }
        if let Some(output) = &self.folders.output {
            builder = builder.output(output);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SweepError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_preserves_decoding_tags() {
        let config = Config::default();
        assert_eq!(config.preserve.tags.len(), DEFAULT_PRESERVE_TAGS.len());
        assert!(config.folders.input.is_none());
        assert!(!config.output.dry_run);

        let sweeper = config.sweeper();
        assert!(sweeper.preserve().matches("Orientation", 0x0112));
        assert!(!sweeper.preserve().matches("Make", 0x010F));
    }

    #[test]
    fn default_names_resolve_in_the_tag_table() {
        use crate::exif::Ifd;

        let names = TagNames::standard();
        let ids = [
            (Ifd::Primary, 0x0100),
            (Ifd::Primary, 0x0112),
            (Ifd::Primary, 0xEA1C),
            (Ifd::Exif, 0x927C),
            (Ifd::Exif, 0xA301),
            (Ifd::Thumbnail, 0x0202),
        ];
        for (ifd, tag) in ids {
            let name = names.resolve(ifd, tag);
            assert!(DEFAULT_PRESERVE_TAGS.contains(&name), "{name}");
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.folders.input = Some("in".into());
        config.preserve.tags = vec!["Make".into(), "0x0112".into()];
        config.output.dry_run = true;
        config.save(Some(path.as_path())).unwrap();

        let loaded = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(loaded.folders.input, Some(PathBuf::from("in")));
        assert_eq!(loaded.preserve.tags, vec!["Make", "0x0112"]);
        assert!(loaded.output.dry_run);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(dir.path().join("absent.json").as_path())).unwrap();
        assert_eq!(config.preserve.tags.len(), DEFAULT_PRESERVE_TAGS.len());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "folders": { "output": "clean" } }"#).unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.folders.output, Some(PathBuf::from("clean")));
        assert!(config.folders.input.is_none());
        assert_eq!(config.preserve.tags.len(), DEFAULT_PRESERVE_TAGS.len());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(Some(path.as_path())).is_err());
    }

    #[test]
    fn pipeline_needs_both_folders() {
        let mut config = Config::default();
        config.folders.input = Some("in".into());
        assert!(matches!(config.pipeline(), Err(SweepError::NotConfigured)));

        config.folders.output = Some("out".into());
        let pipeline = config.pipeline().unwrap();
        assert_eq!(pipeline.output(), Path::new("out"));
    }
}
