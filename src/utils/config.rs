use crate::errors::CaseResult;
use console::style;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

static DEFAULT_CONFIG_TOML: &str = include_str!("../../default-commentcase.conf");

/// What to do with the remaining files once one of them fails.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failure. Files already rewritten stay rewritten.
    #[default]
    Abort,
    /// Keep going, report every failure, fail the run at the end.
    Continue,
}

/// How a rewritten file reaches the disk.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteStrategy {
    /// Truncate and rewrite the original. A failed write can leave it truncated.
    #[default]
    InPlace,
    /// Write a sibling temporary file and rename it over the original.
    Atomic,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RunConfig {
    /// Behaviour after a per-file read/write failure.
    pub on_error: FailurePolicy,

    /// How rewritten content is written back.
    pub write_strategy: WriteStrategy,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Suppress notes and the closing summary. `Processed:` lines are always printed.
    pub quiet: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub run: RunConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load the user config, noting it on stderr unless `quiet`.
    pub fn load(config_dir: &Path, quiet: bool) -> CaseResult<Self> {
        Self::load_with(config_dir, quiet, &mut std::io::stderr())
    }

    /// Like [`Config::load`], with notes going to `notes`.
    pub fn load_with<W: Write>(config_dir: &Path, quiet: bool, notes: &mut W) -> CaseResult<Self> {
        let mut config = Config::default();

        let default_config_path = config_dir.join("commentcase.conf");
        if !default_config_path.exists() {
            create_example_config(config_dir);
        }

        let user_config_path = config_dir.join("commentcase.local");
        if user_config_path.exists() {
            let user_config_content = fs::read_to_string(&user_config_path)?;
            let user_config: Config = toml::from_str(&user_config_content)?;

            config = merge_configs(config, user_config);

            if !(quiet || config.output.quiet) {
                writeln!(
                    notes,
                    "{}: Loaded user config from: {}",
                    style("note").green().bold(),
                    style(user_config_path.display()).underlined().bold()
                )?;
            }
        } else {
            tracing::debug!(
                "no user config at {}, using defaults",
                user_config_path.display()
            );
        }

        Ok(config)
    }
}

/// The example file is a convenience; failing to write it never stops a run.
fn create_example_config(config_dir: &Path) {
    let example_path = config_dir.join("commentcase.conf");
    match fs::write(&example_path, DEFAULT_CONFIG_TOML) {
        Ok(()) => tracing::debug!("Example config created at: {}", example_path.display()),
        Err(e) => tracing::warn!("cannot write {}: {e}", example_path.display()),
    }
}

/// Overlay the user's settings on the defaults.
fn merge_configs(mut default: Config, user: Config) -> Config {
    default.run.on_error = user.run.on_error;
    default.run.write_strategy = user.run.write_strategy;

    default.output.quiet = user.output.quiet;

    default
}

#[test]
fn defaults_match_reference_behaviour() {
    let cfg = Config::default();
    assert_eq!(cfg.run.on_error, FailurePolicy::Abort);
    assert_eq!(cfg.run.write_strategy, WriteStrategy::InPlace);
    assert!(!cfg.output.quiet);
}

#[test]
fn bundled_example_config_parses_to_defaults() {
    let cfg: Config = toml::from_str(DEFAULT_CONFIG_TOML).expect("bundled config must parse");
    assert_eq!(cfg.run.on_error, FailurePolicy::Abort);
    assert_eq!(cfg.run.write_strategy, WriteStrategy::InPlace);
    assert!(!cfg.output.quiet);
}

#[test]
fn merge_configs_takes_user_values() {
    let mut user = Config::default();
    user.run.on_error = FailurePolicy::Continue;
    user.output.quiet = true;

    let merged = merge_configs(Config::default(), user);

    assert_eq!(merged.run.on_error, FailurePolicy::Continue);
    assert_eq!(merged.run.write_strategy, WriteStrategy::InPlace);
    assert!(merged.output.quiet);
}

#[test]
fn load_creates_example_and_reads_user_overrides() {
    let cfg_dir = tempfile::tempdir().unwrap();
    let cfg_path = cfg_dir.path();

    let user_toml = r#"
        [run]
        on_error = "continue"
        write_strategy = "atomic"

        [output]
        quiet = true
    "#;
    fs::write(cfg_path.join("commentcase.local"), user_toml).unwrap();

    let cfg = Config::load(cfg_path, false).expect("Config::load should succeed");

    assert!(cfg_path.join("commentcase.conf").is_file());
    assert_eq!(cfg.run.on_error, FailurePolicy::Continue);
    assert_eq!(cfg.run.write_strategy, WriteStrategy::Atomic);
    assert!(cfg.output.quiet);
}

#[test]
fn load_rejects_unknown_policy() {
    let cfg_dir = tempfile::tempdir().unwrap();
    fs::write(
        cfg_dir.path().join("commentcase.local"),
        "[run]\non_error = \"retry\"\n",
    )
    .unwrap();

    assert!(matches!(
        Config::load(cfg_dir.path(), true),
        Err(crate::errors::CaseError::Config(_))
    ));
}

#[test]
fn load_survives_unwritable_example_config() {
    let cfg_dir = tempfile::tempdir().unwrap();
    let missing = cfg_dir.path().join("not-created");

    let cfg = Config::load(&missing, true).expect("example file is best-effort");

    assert!(!missing.join("commentcase.conf").exists());
    assert_eq!(cfg.run.on_error, FailurePolicy::Abort);
    assert_eq!(cfg.run.write_strategy, WriteStrategy::InPlace);
}

#[test]
fn quiet_load_hides_the_user_config_note() {
    let cfg_dir = tempfile::tempdir().unwrap();
    fs::write(
        cfg_dir.path().join("commentcase.local"),
        "[run]\non_error = \"continue\"\n",
    )
    .unwrap();

    let mut loud = Vec::new();
    let cfg = Config::load_with(cfg_dir.path(), false, &mut loud).unwrap();
    assert_eq!(cfg.run.on_error, FailurePolicy::Continue);
    let loud = console::strip_ansi_codes(&String::from_utf8(loud).unwrap()).into_owned();
    assert!(loud.starts_with("note: Loaded user config from: "));

    let mut hushed = Vec::new();
    let cfg = Config::load_with(cfg_dir.path(), true, &mut hushed).unwrap();
    assert_eq!(cfg.run.on_error, FailurePolicy::Continue);
    assert!(hushed.is_empty());
}
