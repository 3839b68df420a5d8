//! Loading the alias word list from disk.

use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use thiserror::Error;
use tracing::info;

use crate::domain::{AliasWords, AliasWordsError};

/// Errors returned while loading the alias word list.
#[derive(Debug, Error)]
pub enum AliasWordsLoadError {
    /// The file could not be read.
    #[error("failed to read alias words at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file was read but its contents are unusable.
    #[error("invalid alias words at {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: AliasWordsError,
    },
}

/// Read one alias word per line from `path`.
pub fn load_alias_words(path: &Path) -> Result<AliasWords, AliasWordsLoadError> {
    let read_error = |source| AliasWordsLoadError::Read {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path.file_name().ok_or_else(|| {
        read_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "alias words path must be a file",
        ))
    })?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
    let contents = dir.read_to_string(Path::new(file_name)).map_err(read_error)?;
    let words = AliasWords::parse_lines(&contents).map_err(|source| AliasWordsLoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), count = words.len(), "alias words loaded");
    Ok(words)
}
