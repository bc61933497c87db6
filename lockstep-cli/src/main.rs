//! Command-line runner for lockstep database migrations.
//!
//! `lockstep up` applies every pending migration; `lockstep down <version>`
//! reverts until the database sits at the given version. Exit code 0 on
//! success, 1 on any handled error.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use lockstep::{Config, Driver, Error, MigrationReport, Migrator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lockstep", version, about = "Linear, file-based SQL schema migrations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Apply all pending migrations
    Up {
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Revert migrations until the database sits at the given version
    Down {
        /// Version to migrate down to; must be below the current version
        version: u32,
        #[command(flatten)]
        opts: RunOpts,
    },
}

#[derive(clap::Args)]
struct RunOpts {
    /// Database driver to use
    #[arg(long, default_value = "pg")]
    driver: Driver,

    /// Directory containing the migration files
    #[arg(long, default_value = "migrations")]
    dir: PathBuf,

    /// Database URL to connect to
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

impl RunOpts {
    fn into_config(self) -> Config {
        Config {
            dir: self.dir,
            driver: self.driver,
            database_url: self.database_url,
        }
    }
}

fn main() {
    // clap exits with status 2 on usage errors by default; every handled
    // error here exits with 1 instead (--help/--version stay at 0)
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Commands::Up { opts } => {
            let migrator = Migrator::new(opts.into_config())
                .on_migration_start(|version, file| {
                    println!("Migrating to version {version} ({file})");
                })
                .on_migration_complete(|version, _file, duration| {
                    println!("Migrated to version {version} in {duration:?}");
                });
            let report = migrator.up()?;
            print_summary("Applied", &report);
        }
        Commands::Down {
            version: target,
            opts,
        } => {
            let migrator = Migrator::new(opts.into_config())
                .on_migration_start(|version, file| {
                    println!("Reverting version {version} ({file})");
                })
                .on_migration_complete(|version, _file, duration| {
                    println!("Reverted version {version} in {duration:?}");
                });
            let report = migrator.down(target)?;
            print_summary("Reverted", &report);
        }
    }
    Ok(())
}

fn print_summary(verb: &str, report: &MigrationReport) {
    if report.applied.is_empty() {
        println!(
            "Nothing to do: database is at version {}",
            report.to_version
        );
    } else {
        println!(
            "{verb} {} migration(s): version {} -> {}",
            report.applied.len(),
            report.from_version,
            report.to_version
        );
    }
}
