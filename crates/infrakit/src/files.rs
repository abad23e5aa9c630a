//! File helpers.
//!
//! Every helper reports failures as an [`Error`] carrying the offending path.
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use regex::Regex;
use snafu::prelude::*;

use crate::{
    CreateFileSnafu, DeleteFileSnafu, Error, ReadDirSnafu, ReadFileSnafu, RegexSnafu,
    WriteFileSnafu,
};

pub fn delete(path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    std::fs::remove_file(path).context(DeleteFileSnafu { path })
}

pub fn exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Opens the file for writing, creating it empty if it does not exist.
pub fn create_blank(path: impl AsRef<Path>) -> Result<File, Error> {
    let path = path.as_ref();
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .context(CreateFileSnafu { path })
}

/// Writes (or overwrites) the file with `data`.
pub fn write(path: impl AsRef<Path>, data: impl AsRef<[u8]>) -> Result<(), Error> {
    let path = path.as_ref();
    log::trace!("writing {} bytes to {}", data.as_ref().len(), path.display());
    std::fs::write(path, data).context(WriteFileSnafu { path })
}

pub fn read(path: impl AsRef<Path>) -> Result<Vec<u8>, Error> {
    let path = path.as_ref();
    std::fs::read(path).context(ReadFileSnafu { path })
}

fn read_string(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).context(ReadFileSnafu { path })
}

/// Creates the directory (and its parents) if it does not already exist.
pub fn ensure_path(directory: impl AsRef<Path>) -> Result<(), Error> {
    crate::directories::create(directory)
}

/// Adds `data` to the top of the file.
pub fn prepend(path: impl AsRef<Path>, data: impl AsRef<[u8]>) -> Result<(), Error> {
    let path = path.as_ref();
    let mut contents = data.as_ref().to_vec();
    contents.extend(read(path)?);
    write(path, contents)
}

/// Adds `data` to the bottom of the file.
pub fn append(path: impl AsRef<Path>, data: impl AsRef<[u8]>) -> Result<(), Error> {
    use std::io::Write;

    let path = path.as_ref();
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .context(WriteFileSnafu { path })?;
    file.write_all(data.as_ref())
        .context(WriteFileSnafu { path })
}

/// Inserts `data` as a new line directly below every line equal to
/// `marker_line`.
///
/// The rewritten file always ends with a newline.
pub fn append_below(
    path: impl AsRef<Path>,
    marker_line: &str,
    data: &str,
) -> Result<(), Error> {
    let path = path.as_ref();
    let file = File::open(path).context(ReadFileSnafu { path })?;
    let mut contents = String::new();
    for line in BufReader::new(file).lines() {
        let line = line.context(ReadFileSnafu { path })?;
        contents.push_str(&line);
        contents.push('\n');
        if line == marker_line {
            contents.push_str(data);
            contents.push('\n');
        }
    }
    write(path, contents)
}

/// Sets the unix permission bits of the file, e.g. `0o755`.
#[cfg(unix)]
pub fn change_permissions(path: impl AsRef<Path>, mode: u32) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;

    let path = path.as_ref();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .context(crate::PermissionsSnafu { path })
}

/// Looks for `file_name` in `start` and then in each of its ancestors,
/// returning the first directory that contains it.
pub fn find_up_tree(start: impl AsRef<Path>, file_name: impl AsRef<Path>) -> Option<PathBuf> {
    let file_name = file_name.as_ref();
    start
        .as_ref()
        .ancestors()
        .find(|dir| dir.join(file_name).exists())
        .map(Path::to_path_buf)
}

fn compile(pattern: &str) -> Result<Regex, Error> {
    Regex::new(pattern).context(RegexSnafu { pattern })
}

fn replace_in_file(path: &Path, find: &Regex, replace: &str) -> Result<(), Error> {
    let contents = read_string(path)?;
    let replaced = find.replace_all(&contents, replace);
    if let std::borrow::Cow::Owned(replaced) = replaced {
        log::debug!("replacing /{find}/ in {}", path.display());
        write(path, replaced)?;
    }
    Ok(())
}

/// Replaces every match of the regular expression `find` in the file with
/// `replace`. `replace` may refer to capture groups (`$1`, `${name}`).
pub fn file_string_replace(path: impl AsRef<Path>, find: &str, replace: &str) -> Result<(), Error> {
    replace_in_file(path.as_ref(), &compile(find)?, replace)
}

/// Runs [`file_string_replace`] on each file directly inside `dir` whose name
/// matches the regular expression `file_pattern`.
pub fn directory_file_string_replace(
    dir: impl AsRef<Path>,
    file_pattern: &str,
    find: &str,
    replace: &str,
) -> Result<(), Error> {
    let dir = dir.as_ref();
    let file_pattern = compile(file_pattern)?;
    let find = compile(find)?;
    let entries = std::fs::read_dir(dir).context(ReadDirSnafu { path: dir })?;
    for entry in entries {
        let entry = entry.context(ReadDirSnafu { path: dir })?;
        let path = entry.path();
        if path.is_file() && file_pattern.is_match(&entry.file_name().to_string_lossy()) {
            replace_in_file(&path, &find, replace)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn contents(path: &Path) -> String {
        String::from_utf8(read(path).unwrap()).unwrap()
    }

    #[test]
    fn string_replace() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("testFile.txt");
        write(&file, "Hello world!").unwrap();
        file_string_replace(&file, "world", "Mom").unwrap();
        assert_eq!("Hello Mom!", contents(&file));

        file_string_replace(&file, r"(\w+) (\w+)", "$2 $1").unwrap();
        assert_eq!("Mom Hello!", contents(&file));
    }

    #[test]
    fn directory_string_replace_only_touches_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("testFile_1.txt");
        let second = dir.path().join("testFile_2.txt");
        let other = dir.path().join("other.txt");
        for file in [&first, &second, &other] {
            write(file, "Hello world!").unwrap();
        }
        directory_file_string_replace(dir.path(), "testFile", "world", "Mom").unwrap();
        assert_eq!("Hello Mom!", contents(&first));
        assert_eq!("Hello Mom!", contents(&second));
        assert_eq!("Hello world!", contents(&other));
    }

    #[test]
    fn bad_patterns_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        write(&file, "x").unwrap();
        match file_string_replace(&file, "(unclosed", "") {
            Err(Error::Regex { pattern, .. }) => assert_eq!("(unclosed", pattern),
            other => panic!("expected a regex error, got {other:?}"),
        }
    }

    #[test]
    fn prepend_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes");
        write(&file, "middle\n").unwrap();
        prepend(&file, "top\n").unwrap();
        append(&file, "bottom\n").unwrap();
        assert_eq!("top\nmiddle\nbottom\n", contents(&file));
    }

    #[test]
    fn append_below_marker() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.tf");
        write(&file, "provider \"aws\" {\n# modules\n}").unwrap();
        append_below(&file, "# modules", "module \"vpc\" {}").unwrap();
        assert_eq!(
            "provider \"aws\" {\n# modules\nmodule \"vpc\" {}\n}\n",
            contents(&file)
        );
    }

    #[test]
    fn blank_files_and_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("blank");
        assert!(!exists(&file));
        drop(create_blank(&file).unwrap());
        assert!(exists(&file));
        assert!(read(&file).unwrap().is_empty());
        delete(&file).unwrap();
        assert!(!exists(&file));
        assert!(matches!(delete(&file), Err(Error::DeleteFile { .. })));
        assert!(matches!(read(&file), Err(Error::ReadFile { .. })));
    }

    #[test]
    fn finds_files_up_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("c");
        ensure_path(&nested).unwrap();
        write(dir.path().join("a").join("Cargo.toml"), "").unwrap();
        assert_eq!(
            Some(dir.path().join("a")),
            find_up_tree(&nested, "Cargo.toml")
        );
        assert_eq!(None, find_up_tree(&nested, "no-such-file-anywhere.infrakit"));
    }

    #[cfg(unix)]
    #[test]
    fn permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("script.sh");
        write(&file, "#!/bin/sh\n").unwrap();
        change_permissions(&file, 0o750).unwrap();
        let mode = std::fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(0o750, mode & 0o777);
    }
}
