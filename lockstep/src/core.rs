//! The migration file model: parsing a directory of `<version>_<label>.sql`
//! files into ordered, versioned units, and computing which units a run
//! should execute.
//!
//! Parsing is a pure concern. Nothing in this module touches a database, so
//! every malformed file is rejected before any SQL runs.

use std::fs;
use std::path::Path;

use crate::error::Error;

/// The literal that splits a migration file into its up and down scripts.
/// Everything before the first occurrence is the up script; everything after
/// the literal is the down script.
pub const SEPARATOR: &str = "-- migrate:down";

/// One versioned, reversible schema change, read from a single file.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationFile {
    /// Version parsed from the file name's integer prefix.
    pub version: u32,
    /// The file name the unit was read from, for reporting.
    pub file_name: String,
    /// SQL applied when moving forward into this version.
    pub up_sql: String,
    /// SQL applied when reverting out of this version.
    pub down_sql: String,
}

/// Parse the version prefix out of a migration file name: the substring
/// before the first `_` (the whole name when there is none), as a positive
/// integer.
fn parse_version(file_name: &str) -> Result<u32, Error> {
    let prefix = file_name.split('_').next().unwrap_or(file_name);
    match prefix.parse::<u32>() {
        Ok(version) if version > 0 => Ok(version),
        _ => Err(Error::InvalidMigrationName {
            file: file_name.to_string(),
        }),
    }
}

/// Split a migration file's contents at the first [SEPARATOR] occurrence.
/// The separator itself belongs to neither script.
fn split_scripts(file_name: &str, contents: &str) -> Result<(String, String), Error> {
    let idx = contents
        .find(SEPARATOR)
        .ok_or_else(|| Error::MissingSeparator {
            file: file_name.to_string(),
        })?;
    let up_sql = contents[..idx].to_string();
    let down_sql = contents[idx + SEPARATOR.len()..].to_string();
    Ok((up_sql, down_sql))
}

/// Read every migration file in `dir` into a fully parsed, ascending set.
///
/// Versions must be unique and form the exact sequence `1..=N`; the down
/// path records `version - 1` after each revert, which only lines up with
/// history when versions count upward without gaps.
pub fn load_migration_dir(dir: &Path) -> Result<Vec<MigrationFile>, Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let version = parse_version(&file_name)?;
        let contents = fs::read_to_string(entry.path())?;
        let (up_sql, down_sql) = split_scripts(&file_name, &contents)?;
        files.push(MigrationFile {
            version,
            file_name,
            up_sql,
            down_sql,
        });
    }
    files.sort_by_key(|f| f.version);

    for (i, file) in files.iter().enumerate() {
        if i > 0 && files[i - 1].version == file.version {
            return Err(Error::DuplicateVersion {
                version: file.version,
                first: files[i - 1].file_name.clone(),
                second: file.file_name.clone(),
            });
        }
        let expected = (i + 1) as u32;
        if file.version != expected {
            return Err(Error::NonContiguousVersions {
                expected,
                found: file.version,
                file: file.file_name.clone(),
            });
        }
    }

    Ok(files)
}

/// Units an up run must apply: versions strictly greater than `current`,
/// ascending.
pub(crate) fn pending_upgrades(files: &[MigrationFile], current: u32) -> Vec<&MigrationFile> {
    files.iter().filter(|f| f.version > current).collect()
}

/// Units a down run must revert: versions in `(target, current]`,
/// descending.
pub(crate) fn pending_downgrades(
    files: &[MigrationFile],
    current: u32,
    target: u32,
) -> Vec<&MigrationFile> {
    let mut selected = files
        .iter()
        .filter(|f| f.version > target && f.version <= current)
        .collect::<Vec<_>>();
    selected.sort_by_key(|f| std::cmp::Reverse(f.version));
    selected
}
