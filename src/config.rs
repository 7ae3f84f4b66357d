//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging `pipeline.toml`. Every key is
//! optional: stock defaults describe the conventional Hugo project layout and
//! a user file only overrides the values it names.
//!
//! ## Project Layout
//!
//! ```text
//! project/
//! ├── pipeline.toml            # Optional, overrides stock defaults
//! ├── webpack.conf.js          # Read by the bundler, not by us
//! ├── src/
//! │   ├── css/*.css            # → dist/css (style CLI)
//! │   ├── js/**/*              # → dist/js  (bundler + copy, app.js excluded)
//! │   ├── fonts/**/*           # → dist/fonts
//! │   ├── img/**/*             # → dist/img
//! │   └── *                    # → dist/
//! └── site/                    # Hugo source → dist/ (hugo -d ../dist -s site -v)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! [paths]
//! source = "src"
//! site = "site"
//! output = "dist"
//! temp = ".site-pipeline"
//!
//! [site]
//! program = "hugo"
//! args = ["-d", "{output}", "-s", "{site}", "-v"]
//! preview_args = ["--buildDrafts", "--buildFuture"]
//!
//! [styles]
//! command = ["npx", "postcss"]
//!
//! [styles.variables]
//! brand = "#cc3300"
//!
//! [scripts]
//! command = ["npx", "webpack", "--config", "webpack.conf.js"]
//! entry = "app.js"
//!
//! [optimize]
//! quality = 80
//! without_enlargement = true
//! exclude = ["favicon/**"]
//! srcset_exclude = ["docs/**"]
//! svg_command = ["svgo", "--multipass"]
//! gif_command = ["gifsicle", "-O3", "--interlace", "--batch"]
//!
//! [[optimize.variants]]
//! width = 1170
//! suffix = ""
//! density = 1
//!
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//! notify = false
//! debounce_ms = 200
//!
//! [processing]
//! max_processes = 4
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Replaced by the output directory as seen from the site directory.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Replaced by `paths.site`.
pub const SITE_PLACEHOLDER: &str = "{site}";

/// Pipeline configuration loaded from `pipeline.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Source, site, and output directories, relative to the project root.
    pub paths: PathsConfig,
    /// External site generator invocation.
    pub site: SiteGeneratorConfig,
    /// Style CLI invocation and variables.
    pub styles: StylesConfig,
    /// Bundler invocation.
    pub scripts: ScriptsConfig,
    /// Production image pass.
    pub optimize: OptimizeConfig,
    /// Dev server and watcher.
    pub server: ServerConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site.program must not be empty".into(),
            ));
        }
        for pair in self.site.args.windows(2) {
            let expected = match pair[0].as_str() {
                "-d" | "--destination" => OUTPUT_PLACEHOLDER,
                "-s" | "--source" => SITE_PLACEHOLDER,
                _ => continue,
            };
            if pair[1] != expected {
                return Err(ConfigError::Validation(format!(
                    "site.args: {} must be followed by {} so the site lands in paths.output",
                    pair[0], expected
                )));
            }
        }
        if self.styles.command.is_empty() {
            return Err(ConfigError::Validation(
                "styles.command must not be empty".into(),
            ));
        }
        if self.scripts.command.is_empty() {
            return Err(ConfigError::Validation(
                "scripts.command must not be empty".into(),
            ));
        }
        if self.optimize.quality == 0 || self.optimize.quality > 100 {
            return Err(ConfigError::Validation(
                "optimize.quality must be 1-100".into(),
            ));
        }
        if self.optimize.variants.is_empty() {
            return Err(ConfigError::Validation(
                "optimize.variants must not be empty".into(),
            ));
        }
        if self.optimize.variants.iter().any(|v| v.width == 0) {
            return Err(ConfigError::Validation(
                "optimize.variants widths must be non-zero".into(),
            ));
        }
        if self.optimize.variants.iter().any(|v| v.density == 0) {
            return Err(ConfigError::Validation(
                "optimize.variants densities must be non-zero".into(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Directory layout, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Asset sources (`css/`, `js/`, `fonts/`, `img/`, root files).
    pub source: String,
    /// Site generator content directory.
    pub site: String,
    /// Generated output directory.
    pub output: String,
    /// Scratch directory for files handed to external tools.
    pub temp: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: "src".to_string(),
            site: "site".to_string(),
            output: "dist".to_string(),
            temp: ".site-pipeline".to_string(),
        }
    }
}

/// Site generator binary and its fixed argument lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteGeneratorConfig {
    pub program: String,
    /// Arguments for every run. The generator runs from the project root.
    /// `{output}` and `{site}` are filled in from `[paths]`.
    pub args: Vec<String>,
    /// Extra arguments appended by the `hugo-preview` stage.
    pub preview_args: Vec<String>,
}

impl Default for SiteGeneratorConfig {
    fn default() -> Self {
        Self {
            program: "hugo".to_string(),
            args: ["-d", OUTPUT_PLACEHOLDER, "-s", SITE_PLACEHOLDER, "-v"]
                .map(String::from)
                .to_vec(),
            preview_args: ["--buildDrafts", "--buildFuture"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Style CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesConfig {
    /// Program and leading arguments. Inputs and `--dir <out>` are appended.
    pub command: Vec<String>,
    /// Variables exported to the style tool as a JSON file.
    pub variables: BTreeMap<String, String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            command: vec!["npx".to_string(), "postcss".to_string()],
            variables: BTreeMap::new(),
        }
    }
}

/// Bundler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptsConfig {
    pub command: Vec<String>,
    /// Bundler entry point under `<source>/js`. Not copied verbatim to the output.
    pub entry: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            command: ["npx", "webpack", "--config", "webpack.conf.js"]
                .map(String::from)
                .to_vec(),
            entry: "app.js".to_string(),
        }
    }
}

/// One responsive output of the raster pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantRule {
    /// Target width in pixels.
    pub width: u32,
    /// Appended to the file stem (`photo@2x.jpg`). Empty replaces the file in place.
    #[serde(default)]
    pub suffix: String,
    /// Pixel density advertised in generated `srcset` attributes.
    pub density: u32,
}

impl VariantRule {
    pub fn new(width: u32, suffix: &str, density: u32) -> Self {
        Self {
            width,
            suffix: suffix.to_string(),
            density,
        }
    }
}

/// Production image pass settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizeConfig {
    pub variants: Vec<VariantRule>,
    /// JPEG encoding quality (1-100).
    pub quality: u32,
    /// Write variants wider than the original at the original size instead.
    pub without_enlargement: bool,
    /// Globs under `<output>/img` skipped by the raster pass.
    pub exclude: Vec<String>,
    /// Globs under `<output>` whose HTML is left without `srcset`.
    pub srcset_exclude: Vec<String>,
    /// SVG optimizer; the file path is appended. Empty disables the pass.
    pub svg_command: Vec<String>,
    /// GIF optimizer; the file path is appended. Empty disables the pass.
    pub gif_command: Vec<String>,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            variants: vec![
                VariantRule::new(1170, "", 1),
                VariantRule::new(2340, "@2x", 2),
                VariantRule::new(3510, "@3x", 3),
            ],
            quality: 80,
            without_enlargement: true,
            exclude: vec!["favicon/**".to_string()],
            srcset_exclude: vec!["docs/**".to_string()],
            svg_command: vec!["svgo".to_string(), "--multipass".to_string()],
            gif_command: ["gifsicle", "-O3", "--interlace", "--batch"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Dev server and watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Show notification banners (e.g. failed site builds) in the browser.
    pub notify: bool,
    /// Filesystem event debounce window.
    pub debounce_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            notify: false,
            debounce_ms: 200,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Absolute directories for one project, resolved from [`PathsConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub source: PathBuf,
    pub site: PathBuf,
    pub output: PathBuf,
    pub temp: PathBuf,
}

impl Layout {
    pub fn resolve(root: &Path, paths: &PathsConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            source: root.join(&paths.source),
            site: root.join(&paths.site),
            output: root.join(&paths.output),
            temp: root.join(&paths.temp),
        }
    }

    pub fn source_dir(&self, sub: &str) -> PathBuf {
        self.source.join(sub)
    }

    pub fn output_dir(&self, sub: &str) -> PathBuf {
        self.output.join(sub)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PipelineConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values, arrays included, replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file, falling back to stock defaults when absent.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `pipeline.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# site-pipeline configuration
# ===========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Directories, relative to the project root
# ---------------------------------------------------------------------------
[paths]
source = "src"
site = "site"
output = "dist"
# Scratch files handed to external tools (style variables).
temp = ".site-pipeline"

# ---------------------------------------------------------------------------
# Site generator (run from the project root)
# ---------------------------------------------------------------------------
[site]
program = "hugo"
# {output} and {site} come from [paths]; with the defaults this runs
# hugo -d ../dist -s site -v
args = ["-d", "{output}", "-s", "{site}", "-v"]
# Appended by the hugo-preview stage.
preview_args = ["--buildDrafts", "--buildFuture"]

# ---------------------------------------------------------------------------
# Stylesheets: <command> src/css/*.css --dir dist/css
# ---------------------------------------------------------------------------
[styles]
command = ["npx", "postcss"]

# Written to .site-pipeline/style-variables.json; the path is exported as
# PIPELINE_STYLE_VARIABLES for the style tool's config to read.
[styles.variables]

# ---------------------------------------------------------------------------
# Scripts
# ---------------------------------------------------------------------------
[scripts]
command = ["npx", "webpack", "--config", "webpack.conf.js"]
# Bundler entry under src/js; every other file there is copied as-is.
entry = "app.js"

# ---------------------------------------------------------------------------
# Production image pass (build only)
# ---------------------------------------------------------------------------
[optimize]
# JPEG quality (1-100).
quality = 80
# Never upscale: variants wider than the original keep the original size.
without_enlargement = true
# Skipped by the raster pass (relative to dist/img).
exclude = ["favicon/**"]
# HTML pages left without srcset (relative to dist).
srcset_exclude = ["docs/**"]
# External optimizers; the file path is appended. Use [] to disable.
svg_command = ["svgo", "--multipass"]
gif_command = ["gifsicle", "-O3", "--interlace", "--batch"]

[[optimize.variants]]
width = 1170
suffix = ""
density = 1

[[optimize.variants]]
width = 2340
suffix = "@2x"
density = 2

[[optimize.variants]]
width = 3510
suffix = "@3x"
density = 3

# ---------------------------------------------------------------------------
# Dev server
# ---------------------------------------------------------------------------
[server]
host = "127.0.0.1"
port = 3000
# Show notification banners (e.g. failed site builds) in the browser.
notify = false
# Filesystem event debounce window in milliseconds.
debounce_ms = 200

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Omit to use every CPU core.
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_hugo_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.paths.source, "src");
        assert_eq!(config.paths.output, "dist");
        assert_eq!(config.site.program, "hugo");
        assert_eq!(
            config.site.args,
            vec!["-d", "{output}", "-s", "{site}", "-v"]
        );
        assert_eq!(
            config.site.preview_args,
            vec!["--buildDrafts", "--buildFuture"]
        );
    }

    #[test]
    fn default_variants_are_1x_2x_3x() {
        let config = PipelineConfig::default();
        let widths: Vec<u32> = config.optimize.variants.iter().map(|v| v.width).collect();
        let suffixes: Vec<&str> = config
            .optimize
            .variants
            .iter()
            .map(|v| v.suffix.as_str())
            .collect();
        assert_eq!(widths, vec![1170, 2340, 3510]);
        assert_eq!(suffixes, vec!["", "@2x", "@3x"]);
        assert!(config.optimize.without_enlargement);
    }

    #[test]
    fn server_notifications_off_by_default() {
        assert!(!ServerConfig::default().notify);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[server]
port = 8080
"#;
        let config = resolve_config(
            stock_defaults_value(),
            Some(toml::from_str(toml).unwrap()),
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.site.program, "hugo");
    }

    #[test]
    fn parse_style_variables() {
        let toml = r##"
[styles.variables]
brand = "#cc3300"
gutter = "1.5rem"
"##;
        let config = resolve_config(
            stock_defaults_value(),
            Some(toml::from_str(toml).unwrap()),
        )
        .unwrap();
        assert_eq!(config.styles.variables.len(), 2);
        assert_eq!(config.styles.variables["brand"], "#cc3300");
        assert_eq!(config.styles.command, vec!["npx", "postcss"]);
    }

    #[test]
    fn variants_array_replaces_defaults() {
        let toml = r#"
[[optimize.variants]]
width = 800
density = 1
"#;
        let config = resolve_config(
            stock_defaults_value(),
            Some(toml::from_str(toml).unwrap()),
        )
        .unwrap();
        assert_eq!(config.optimize.variants, vec![VariantRule::new(800, "", 1)]);
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("pipeline.toml")).unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pipeline.toml");
        fs::write(
            &path,
            r#"
[paths]
output = "public"

[site]
program = "/opt/hugo/bin/hugo"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.paths.output, "public");
        assert_eq!(config.paths.source, "src");
        assert_eq!(config.site.program, "/opt/hugo/bin/hugo");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pipeline.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: None,
        };
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_never_zero() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn layout_resolves_against_root() {
        let layout = Layout::resolve(Path::new("/work/site"), &PathsConfig::default());
        assert_eq!(layout.source, PathBuf::from("/work/site/src"));
        assert_eq!(layout.site, PathBuf::from("/work/site/site"));
        assert_eq!(layout.output_dir("img"), PathBuf::from("/work/site/dist/img"));
        assert_eq!(layout.source_dir("css"), PathBuf::from("/work/site/src/css"));
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value = toml::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 3000
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[server]
port = 4000
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["server"]["host"].as_str(), Some("127.0.0.1"));
        assert_eq!(merged["server"]["port"].as_integer(), Some(4000));
    }

    // =========================================================================
    // Unknown keys and validation
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let overlay: toml::Value = toml::from_str("[server]\nlivereload = true").unwrap();
        let result = resolve_config(stock_defaults_value(), Some(overlay));
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_section_rejected() {
        let overlay: toml::Value = toml::from_str("[sass]\nenabled = true").unwrap();
        assert!(resolve_config(stock_defaults_value(), Some(overlay)).is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_hard_coded_site_destination() {
        let mut config = PipelineConfig::default();
        config.paths.output = "public".into();
        config.site.args = ["-d", "../dist", "-s", "{site}"].map(String::from).to_vec();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("-d must be followed by {output}"));

        config.site.args = ["--source", "site"].map(String::from).to_vec();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_site_args_without_layout_flags() {
        let mut config = PipelineConfig::default();
        config.site.args = vec!["-c".into(), "exit 0".into()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = PipelineConfig::default();
        config.optimize.quality = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.optimize.quality = 101;
        assert!(config.validate().is_err());
        config.optimize.quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_variants() {
        let mut config = PipelineConfig::default();
        config.optimize.variants.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("optimize.variants"));
    }

    #[test]
    fn validate_rejects_zero_width() {
        let mut config = PipelineConfig::default();
        config.optimize.variants.push(VariantRule::new(0, "@0x", 1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_commands() {
        let mut config = PipelineConfig::default();
        config.scripts.command.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.site.program = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pipeline.toml");
        fs::write(&path, "[server]\nport = 0\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(stock_defaults_value(), Some(value)).unwrap();
        let defaults = PipelineConfig::default();
        assert_eq!(config.site.args, defaults.site.args);
        assert_eq!(config.optimize.variants, defaults.optimize.variants);
        assert_eq!(config.optimize.gif_command, defaults.optimize.gif_command);
        assert_eq!(config.server.port, defaults.server.port);
        assert!(config.styles.variables.is_empty());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[paths]",
            "[site]",
            "[styles]",
            "[scripts]",
            "[optimize]",
            "[[optimize.variants]]",
            "[server]",
            "[processing]",
        ] {
            assert!(content.contains(section), "missing {section}");
        }
    }
}
