use std::path::PathBuf;
use thiserror::Error;

pub type CaseResult<T, E = CaseError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CaseError {
  #[error("cannot list {}: {source}", .root.display())]
  Discovery {
    root: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("cannot read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{} is not valid UTF-8: {source}", .path.display())]
  Decode {
    path: PathBuf,
    #[source]
    source: std::string::FromUtf8Error,
  },

  #[error("cannot write {}: {source}", .path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{failed} of {total} file(s) failed")]
  Failed { failed: usize, total: usize },

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("config error: {0}")]
  Config(#[from] toml::de::Error),
}

impl CaseError {
  /// The file a per-file failure refers to, if any.
  pub fn path(&self) -> Option<&std::path::Path> {
    match self {
      CaseError::Read { path, .. }
      | CaseError::Decode { path, .. }
      | CaseError::Write { path, .. } => Some(path),
      _ => None,
    }
  }
}

#[test]
fn per_file_errors_name_their_path() {
  let err = CaseError::Read {
    path: PathBuf::from("init.lua"),
    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
  };
  assert_eq!(err.path(), Some(std::path::Path::new("init.lua")));
  assert!(err.to_string().contains("init.lua"));
  assert!(err.to_string().contains("denied"));

  let failed = CaseError::Failed { failed: 2, total: 5 };
  assert_eq!(failed.path(), None);
  assert_eq!(failed.to_string(), "2 of 5 file(s) failed");
}
