use crate::core::SEPARATOR;

/// Error type for the lockstep crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A migration file name does not begin with a parseable, positive
    /// integer version prefix.
    #[error("invalid migration file name '{file}': expected '<version>_<label>.sql' with a positive integer version")]
    InvalidMigrationName { file: String },
    /// A migration file does not contain the up/down separator.
    #[error("migration '{file}' does not contain '{SEPARATOR}'")]
    MissingSeparator { file: String },
    /// Two migration files declare the same version.
    #[error("duplicate migration version {version} (in '{first}' and '{second}')")]
    DuplicateVersion {
        version: u32,
        first: String,
        second: String,
    },
    /// Migration versions do not form the contiguous sequence 1..=N.
    #[error("migration versions must be contiguous: expected version {expected}, found {found} ('{file}')")]
    NonContiguousVersions {
        expected: u32,
        found: u32,
        file: String,
    },
    /// The control table no longer holds a single usable version row.
    #[error("corrupt version state: {0}")]
    CorruptVersionState(String),
    /// A down target at or above the current version.
    #[error("cannot migrate down to version {target}: current version is {current}")]
    InvalidTargetVersion { target: u32, current: u32 },
    /// The driver key did not name a compiled-in adapter.
    #[error("unknown driver '{0}'")]
    UnknownDriver(String),
    /// The database was unreachable.
    #[error("failed to connect to database: {0}")]
    Connection(String),
    /// A migration's SQL (or its version write) failed; the step's
    /// transaction was rolled back.
    #[error("migration {version} failed: {source}")]
    Apply {
        version: u32,
        #[source]
        source: Box<Error>,
    },
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "postgres")]
    #[error("{0}")]
    Postgres(#[from] postgres::Error),
    #[cfg(feature = "sqlite")]
    #[error("{0}")]
    Rusqlite(#[from] rusqlite::Error),
}

// Manual PartialEq implementation because the backend error payloads
// (postgres::Error, std::io::Error) don't implement it.
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::InvalidMigrationName { file: a },
                Self::InvalidMigrationName { file: b },
            ) => a == b,
            (Self::MissingSeparator { file: a }, Self::MissingSeparator { file: b }) => a == b,
            (
                Self::DuplicateVersion {
                    version: a,
                    first: af,
                    second: asec,
                },
                Self::DuplicateVersion {
                    version: b,
                    first: bf,
                    second: bsec,
                },
            ) => a == b && af == bf && asec == bsec,
            (
                Self::NonContiguousVersions {
                    expected: ae,
                    found: af,
                    file: afile,
                },
                Self::NonContiguousVersions {
                    expected: be,
                    found: bf,
                    file: bfile,
                },
            ) => ae == be && af == bf && afile == bfile,
            (Self::CorruptVersionState(a), Self::CorruptVersionState(b)) => a == b,
            (
                Self::InvalidTargetVersion {
                    target: at,
                    current: ac,
                },
                Self::InvalidTargetVersion {
                    target: bt,
                    current: bc,
                },
            ) => at == bt && ac == bc,
            (Self::UnknownDriver(a), Self::UnknownDriver(b)) => a == b,
            (Self::Connection(a), Self::Connection(b)) => a == b,
            (
                Self::Apply {
                    version: av,
                    source: asrc,
                },
                Self::Apply {
                    version: bv,
                    source: bsrc,
                },
            ) => av == bv && asrc == bsrc,
            (Self::Io(a), Self::Io(b)) => a.to_string() == b.to_string(),
            #[cfg(feature = "postgres")]
            (Self::Postgres(a), Self::Postgres(b)) => a.to_string() == b.to_string(),
            #[cfg(feature = "sqlite")]
            (Self::Rusqlite(a), Self::Rusqlite(b)) => a == b,
            _ => false,
        }
    }
}
