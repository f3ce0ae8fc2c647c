use std::borrow::Cow;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytesize::ByteSize;

use crate::errors::{CaseError, CaseResult};
use crate::utils::config::WriteStrategy;
use crate::utils::ext::Target;

/// Result of rewriting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub lines: usize,
    pub changed_lines: usize,
}

/// Lower-case everything from the first `marker` in `line` to its end.
///
/// This is a plain text search, not a lexer: a marker inside a string
/// literal opens the comment just the same, and any later markers are
/// part of the span. The line terminator, if present, passes through.
pub fn lowercase_comment<'a>(line: &'a str, marker: &str) -> Cow<'a, str> {
    let Some(start) = line.find(marker) else {
        return Cow::Borrowed(line);
    };

    let (code, comment) = line.split_at(start);
    let folded = lowercase_span(comment);
    if folded == comment {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len());
    out.push_str(code);
    out.push_str(&folded);
    Cow::Owned(out)
}

/// `str::to_lowercase`, Final_Sigma included, except that characters
/// whose lower-case form is more than one character are kept as-is so the
/// span keeps its length.
fn lowercase_span(span: &str) -> String {
    let lowered = span.to_lowercase();
    let mut folded = lowered.chars();
    let mut out = String::with_capacity(span.len());

    for c in span.chars() {
        let width = c.to_lowercase().count();
        if width == 1 {
            out.extend(folded.next());
        } else {
            folded.nth(width - 1);
            out.push(c);
        }
    }
    out
}

/// Text with its comments lower-cased, plus line counts for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    pub lines: usize,
    pub changed_lines: usize,
}

/// Apply [`lowercase_comment`] to every line of `text`, terminators kept.
pub fn lowercase_comments(text: &str, marker: &str) -> Rewritten {
    let mut out = String::with_capacity(text.len());
    let (mut lines, mut changed_lines) = (0, 0);

    for line in text.split_inclusive('\n') {
        lines += 1;
        let folded = lowercase_comment(line, marker);
        if let Cow::Owned(_) = folded {
            changed_lines += 1;
        }
        out.push_str(&folded);
    }

    Rewritten {
        text: out,
        lines,
        changed_lines,
    }
}

/// Read `path`, lower-case its comments and write the result back.
///
/// The read and the write use separate handles. The file is rewritten even
/// when no line changed.
pub fn process_file(
    path: &Path,
    target: &Target,
    strategy: WriteStrategy,
) -> CaseResult<FileOutcome> {
    tracing::debug!("processing {}", path.display());

    let bytes = fs::read(path).map_err(|source| CaseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let size = ByteSize::b(bytes.len() as u64);
    let text = String::from_utf8(bytes).map_err(|source| CaseError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let Rewritten {
        text: out,
        lines,
        changed_lines,
    } = lowercase_comments(&text, target.marker);

    write_back(path, out.as_bytes(), strategy).map_err(|source| CaseError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        lines,
        changed_lines,
        "rewrote {} ({size}, {strategy:?})",
        path.display()
    );

    Ok(FileOutcome {
        path: path.to_path_buf(),
        lines,
        changed_lines,
    })
}

fn write_back(path: &Path, contents: &[u8], strategy: WriteStrategy) -> io::Result<()> {
    match strategy {
        WriteStrategy::InPlace => fs::write(path, contents),
        WriteStrategy::Atomic => {
            // Resolve links so the rename replaces the real file, not the link.
            let real = fs::canonicalize(path)?;
            let dir = real.parent().unwrap_or(Path::new("."));

            let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
            tmp.write_all(contents)?;
            tmp.as_file().sync_all()?;
            fs::set_permissions(tmp.path(), fs::metadata(&real)?.permissions())?;
            tmp.persist(&real).map_err(|e| e.error)?;
            Ok(())
        }
    }
}

#[cfg(test)]
const SAMPLE: &str = "\
-- Module Header: CONFIG Loader
local M = {}

local Count = 0 -- Tracks How Many Times We Ran
function M.Run(Name) --[[ Inline BLOCK ]] return Name end
print(\"--NOT A COMMENT\") -- Second -- MARKER
x = 5 --
  --   Indented ÀÉÎ Ünïcödé
return M";

#[test]
fn basic_comment_is_lower_cased() {
    assert_eq!(
        lowercase_comment("local x = 1 -- Set X To One", "--"),
        "local x = 1 -- set x to one"
    );
}

#[test]
fn marker_inside_string_still_opens_comment() {
    assert_eq!(
        lowercase_comment("print(\"--NOT A COMMENT\")", "--"),
        "print(\"--not a comment\")"
    );
    assert!(matches!(
        lowercase_comment("print(\"--not a comment\")", "--"),
        Cow::Borrowed(_)
    ));
}

#[test]
fn first_marker_anchors_the_whole_span() {
    assert_eq!(
        lowercase_comment("A = B -- One -- TWO --Three", "--"),
        "A = B -- one -- two --three"
    );
}

#[test]
fn empty_comment_and_plain_lines_are_untouched() {
    assert!(matches!(lowercase_comment("x = 5 --", "--"), Cow::Borrowed("x = 5 --")));
    assert!(matches!(lowercase_comment("--", "--"), Cow::Borrowed("--")));
    assert!(matches!(
        lowercase_comment("local Value = MAX - 1\n", "--"),
        Cow::Borrowed("local Value = MAX - 1\n")
    ));
}

#[test]
fn terminators_pass_through() {
    assert_eq!(lowercase_comments("", "--").text, "");
    assert_eq!(lowercase_comments("A -- B", "--").text, "A -- b");
    assert_eq!(lowercase_comments("A -- B\n", "--").text, "A -- b\n");
    assert_eq!(
        lowercase_comments("A -- B\r\nC\r\n-- D", "--").text,
        "A -- b\r\nC\r\n-- d"
    );
    assert_eq!(lowercase_comments("\n\n-- X\n", "--").text, "\n\n-- x\n");
}

#[test]
fn multi_char_lower_case_mappings_are_kept() {
    // 'İ' lower-cases to two characters; it stays, the rest folds.
    assert_eq!(lowercase_comment("-- İSTANBUL", "--"), "-- İstanbul");
    assert_eq!(lowercase_comment("-- ÀÉÎ Σ", "--"), "-- àéî σ");
    assert_eq!(lowercase_comment("-- İΣ ΟΔΟΣ", "--"), "-- İς οδος");
}

#[test]
fn final_sigma_follows_unicode_rules() {
    assert_eq!(lowercase_comment("x -- ΟΔΟΣ", "--"), "x -- οδος");
    assert_eq!(lowercase_comment("-- ΣΟΦΟΣ ΛΟΓΟΣ.", "--"), "-- σοφος λογος.");
    assert_eq!(lowercase_comment("-- ΟΔΟΣ\n", "--"), "-- οδος\n");
    assert!(matches!(lowercase_comment("-- οδος", "--"), Cow::Borrowed(_)));
}

#[test]
fn transform_is_idempotent() {
    let once = lowercase_comments(SAMPLE, "--");
    let twice = lowercase_comments(&once.text, "--");
    assert_eq!(once.text, twice.text);
    assert_eq!(twice.changed_lines, 0);
}

#[test]
fn transform_preserves_code_and_span_structure() {
    let out = lowercase_comments(SAMPLE, "--").text;
    let in_lines: Vec<_> = SAMPLE.split_inclusive('\n').collect();
    let out_lines: Vec<_> = out.split_inclusive('\n').collect();
    assert_eq!(in_lines.len(), out_lines.len());

    for (input, output) in in_lines.iter().zip(&out_lines) {
        let Some(p) = input.find("--") else {
            assert_eq!(input, output, "non-comment line changed");
            continue;
        };
        assert_eq!(&input[..p], &output[..p], "prefix changed");

        let span_in: Vec<char> = input[p..].chars().collect();
        let span_out: Vec<char> = output[p..].chars().collect();
        assert_eq!(span_in.len(), span_out.len(), "span length changed");
        for (a, b) in span_in.iter().zip(&span_out) {
            if a.is_alphabetic() {
                assert!(b.to_lowercase().eq(std::iter::once(*b)), "{b} not lower-case");
                assert!(a.to_lowercase().any(|l| l == *b) || a == b);
            } else {
                assert_eq!(a, b, "non-alphabetic character changed");
            }
        }
    }
}

#[test]
fn process_file_rewrites_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("init.lua");
    fs::write(&path, SAMPLE).unwrap();

    let outcome = process_file(&path, &crate::utils::ext::LUA, WriteStrategy::InPlace).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert_eq!(written, lowercase_comments(SAMPLE, "--").text);
    assert!(written.ends_with("return M"), "no terminator added");
    assert!(written.contains("-- tracks how many times we ran\n"));
    assert!(written.contains("local Count = 0"));
    assert_eq!(outcome.path, path);
    assert_eq!(outcome.lines, 9);
    assert_eq!(outcome.changed_lines, 5);
}

#[test]
fn process_file_handles_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.lua");
    fs::write(&path, "").unwrap();

    let outcome = process_file(&path, &crate::utils::ext::LUA, WriteStrategy::InPlace).unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"");
    assert_eq!(outcome.lines, 0);
    assert_eq!(outcome.changed_lines, 0);
}

#[test]
fn process_file_leaves_undecodable_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin1.lua");
    let raw = b"x = 1 -- Caf\xe9\n".to_vec();
    fs::write(&path, &raw).unwrap();

    let err = process_file(&path, &crate::utils::ext::LUA, WriteStrategy::InPlace).unwrap_err();

    assert!(matches!(err, CaseError::Decode { .. }));
    assert_eq!(err.path(), Some(path.as_path()));
    assert_eq!(fs::read(&path).unwrap(), raw);
}

#[test]
fn process_file_reports_missing_file_as_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone.lua");

    let err = process_file(&path, &crate::utils::ext::LUA, WriteStrategy::InPlace).unwrap_err();

    assert!(matches!(err, CaseError::Read { .. }));
    assert!(!path.exists(), "nothing is created on a failed read");
}

#[test]
fn atomic_strategy_replaces_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atomic.lua");
    fs::write(&path, "a = 1 -- KEEP Me\n").unwrap();

    process_file(&path, &crate::utils::ext::LUA, WriteStrategy::Atomic).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "a = 1 -- keep me\n");
    let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1, "temporary file left behind");
}

#[cfg(unix)]
#[test]
fn atomic_strategy_keeps_permissions_and_links() {
    use std::os::unix::fs::{PermissionsExt, symlink};

    let dir = tempfile::tempdir().unwrap();
    let real = dir.path().join("real.lua");
    let link = dir.path().join("link.lua");
    fs::write(&real, "-- Linked\n").unwrap();
    fs::set_permissions(&real, fs::Permissions::from_mode(0o640)).unwrap();
    symlink(&real, &link).unwrap();

    process_file(&link, &crate::utils::ext::LUA, WriteStrategy::Atomic).unwrap();

    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_to_string(&real).unwrap(), "-- linked\n");
    assert_eq!(fs::metadata(&real).unwrap().permissions().mode() & 0o777, 0o640);
}
