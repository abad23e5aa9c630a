//! Directory helpers.
use std::path::{Path, PathBuf};

use snafu::prelude::*;

use crate::{ChangeDirSnafu, CreateDirSnafu, Error, HomeDirSnafu, WorkingDirSnafu};

/// Changes the working directory of the process, like `cd`.
pub fn change(directory: impl AsRef<Path>) -> Result<(), Error> {
    let path = directory.as_ref();
    std::env::set_current_dir(path).context(ChangeDirSnafu { path })
}

/// Creates the directory and any missing parents. Existing directories are
/// left alone.
pub fn create(directory: impl AsRef<Path>) -> Result<(), Error> {
    let path = directory.as_ref();
    log::trace!("ensuring directory {}", path.display());
    std::fs::create_dir_all(path).context(CreateDirSnafu { path })
}

/// Returns the home directory of the user running the program.
pub fn home() -> Result<PathBuf, Error> {
    dirs::home_dir().context(HomeDirSnafu)
}

pub fn working() -> Result<PathBuf, Error> {
    std::env::current_dir().context(WorkingDirSnafu)
}

/// Returns whether a file or directory exists at `path`.
pub fn exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}
