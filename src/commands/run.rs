use crate::errors::{CaseError, CaseResult};
use crate::normalize::process_file;
use crate::utils::config::{Config, FailurePolicy};
use crate::utils::ext::Target;
use crate::walk::discover;
use console::style;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
}

/// Entry point called by the CLI.
pub fn handle(root: &Path, target: &Target, config: &Config) -> CaseResult<RunSummary> {
    let stdout = io::stdout();
    let stderr = io::stderr();
    run_with(root, target, config, &mut stdout.lock(), &mut stderr.lock())
}

/// Rewrite every target file under `root`, one at a time, in discovery order.
///
/// Each success is reported on `out` as `Processed: <path>`. Under
/// [`FailurePolicy::Abort`] the first failure is returned as-is; under
/// [`FailurePolicy::Continue`] failures are reported on `err` and the run
/// ends with [`CaseError::Failed`] if there were any.
pub fn run_with<O: Write, E: Write>(
    root: &Path,
    target: &Target,
    config: &Config,
    out: &mut O,
    err: &mut E,
) -> CaseResult<RunSummary> {
    let files = discover(root, target)?;
    tracing::debug!("{} target file(s) in {}", files.len(), root.display());

    let mut summary = RunSummary {
        total: files.len(),
        ..RunSummary::default()
    };

    for path in &files {
        match process_file(path, target, config.run.write_strategy) {
            Ok(outcome) => {
                summary.processed += 1;
                tracing::debug!(
                    lines = outcome.lines,
                    changed = outcome.changed_lines,
                    "processed {}",
                    outcome.path.display()
                );
                writeln!(
                    out,
                    "{} {}",
                    style("Processed:").green(),
                    display_path(&outcome.path).display()
                )?;
            }
            Err(e) => {
                tracing::warn!(path = ?e.path(), "{e}");
                match config.run.on_error {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Continue => {
                        summary.failed += 1;
                        writeln!(err, "{}: {e}", style("error").red().bold())?;
                    }
                }
            }
        }
    }

    if summary.failed > 0 {
        return Err(CaseError::Failed {
            failed: summary.failed,
            total: summary.total,
        });
    }
    Ok(summary)
}

/// Paths under the working directory are shown without the leading `./`.
fn display_path(path: &Path) -> &Path {
    path.strip_prefix(".").unwrap_or(path)
}

#[cfg(test)]
fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("a.lua"), "A = 1 -- First FILE\n").unwrap();
    std::fs::write(root.join("b.lua"), b"B = 2 -- Bad \xff Bytes\n").unwrap();
    std::fs::write(root.join("c.lua"), "C = 3 -- Third FILE").unwrap();
    std::fs::write(root.join("notes.txt"), "-- Leave ME Alone\n").unwrap();
    dir
}

#[cfg(test)]
fn run_fixture(root: &Path, config: &Config) -> (CaseResult<RunSummary>, String, String) {
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let res = run_with(root, &crate::utils::LUA, config, &mut out, &mut err);
    let out = console::strip_ansi_codes(&String::from_utf8(out).unwrap()).into_owned();
    let err = console::strip_ansi_codes(&String::from_utf8(err).unwrap()).into_owned();
    (res, out, err)
}

#[test]
fn all_good_files_are_processed_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("one.lua"), "x = 1 -- Set X To One\n").unwrap();
    std::fs::write(root.join("two.lua"), "y = 2").unwrap();
    std::fs::write(root.join("skip.txt"), "z = 3 -- UPPER").unwrap();

    let (res, out, err) = run_fixture(root, &Config::default());

    let summary = res.unwrap();
    assert_eq!(summary, RunSummary { total: 2, processed: 2, failed: 0 });
    assert_eq!(
        out,
        format!(
            "Processed: {}\nProcessed: {}\n",
            root.join("one.lua").display(),
            root.join("two.lua").display()
        )
    );
    assert!(err.is_empty());
    assert_eq!(
        std::fs::read_to_string(root.join("one.lua")).unwrap(),
        "x = 1 -- set x to one\n"
    );
    assert_eq!(
        std::fs::read_to_string(root.join("skip.txt")).unwrap(),
        "z = 3 -- UPPER"
    );
}

#[test]
fn abort_policy_stops_at_first_failure() {
    let dir = fixture();
    let root = dir.path();

    let (res, out, err) = run_fixture(root, &Config::default());

    let e = res.unwrap_err();
    assert!(matches!(e, CaseError::Decode { .. }));
    assert_eq!(e.path(), Some(root.join("b.lua").as_path()));
    assert_eq!(out, format!("Processed: {}\n", root.join("a.lua").display()));
    assert!(err.is_empty(), "abort leaves reporting to the caller");

    assert_eq!(
        std::fs::read_to_string(root.join("a.lua")).unwrap(),
        "A = 1 -- first file\n"
    );
    assert_eq!(
        std::fs::read_to_string(root.join("c.lua")).unwrap(),
        "C = 3 -- Third FILE",
        "files after the failure are not touched"
    );
}

#[test]
fn continue_policy_processes_the_rest_and_fails_at_the_end() {
    let dir = fixture();
    let root = dir.path();
    let mut config = Config::default();
    config.run.on_error = FailurePolicy::Continue;

    let (res, out, err) = run_fixture(root, &config);

    assert!(matches!(res, Err(CaseError::Failed { failed: 1, total: 3 })));
    assert_eq!(
        out,
        format!(
            "Processed: {}\nProcessed: {}\n",
            root.join("a.lua").display(),
            root.join("c.lua").display()
        )
    );
    assert!(err.starts_with("error: "));
    assert!(err.contains("b.lua"));
    assert!(!out.contains("b.lua"), "a failed file is never reported as processed");

    assert_eq!(
        std::fs::read_to_string(root.join("c.lua")).unwrap(),
        "C = 3 -- third file"
    );
    assert_eq!(
        std::fs::read_to_string(root.join("notes.txt")).unwrap(),
        "-- Leave ME Alone\n"
    );
}

#[test]
fn atomic_strategy_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("m.lua"), "-- Hello\r\nreturn 1 -- BYE").unwrap();
    let mut config = Config::default();
    config.run.write_strategy = crate::utils::config::WriteStrategy::Atomic;

    let (res, _, _) = run_fixture(root, &config);

    assert_eq!(res.unwrap().processed, 1);
    assert_eq!(
        std::fs::read_to_string(root.join("m.lua")).unwrap(),
        "-- hello\r\nreturn 1 -- bye"
    );
}

#[test]
fn missing_root_is_a_discovery_error() {
    let dir = tempfile::tempdir().unwrap();
    let (res, out, _) = run_fixture(&dir.path().join("absent"), &Config::default());

    assert!(matches!(res, Err(CaseError::Discovery { .. })));
    assert!(out.is_empty());
}

#[test]
fn display_path_drops_leading_cur_dir() {
    assert_eq!(display_path(Path::new("./init.lua")), Path::new("init.lua"));
    assert_eq!(display_path(Path::new("src/init.lua")), Path::new("src/init.lua"));
    assert_eq!(display_path(Path::new("/tmp/init.lua")), Path::new("/tmp/init.lua"));
}
