//! Operator CLI over `courseware_core`.
//!
//! # Responsibility
//! - Resolve configuration (file, environment, then flags) and bootstrap
//!   logging plus the database.
//! - Print read-only catalog views as plain text lines.

use clap::{Parser, Subcommand};
use courseware_core::db::{migrations, open_db};
use courseware_core::{
    init_from_config, logging_status, CatalogService, CoreConfig, SqliteCourseRepository,
    SqliteSubjectRepository,
};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Courseware command line
///
/// Examples:
///   courseware info
///   courseware --db courses.sqlite3 subjects
///   courseware courses --subject programming
///   courseware modules rust-101
#[derive(Parser, Debug)]
#[clap(name = "courseware", version, about = "Inspect a courseware database")]
struct CliArgs {
    /// JSON config file; absent keys keep their defaults.
    #[clap(long = "config", short = 'c')]
    config: Option<PathBuf>,

    /// SQLite database path. Overrides config and `COURSEWARE_DB`.
    #[clap(long = "db")]
    db: Option<PathBuf>,

    /// One of trace, debug, info, warn, error.
    #[clap(long = "log-level")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[clap(long = "log-dir")]
    log_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print version, database, and logging details.
    Info,
    /// List subjects with their course totals.
    Subjects,
    /// List courses, newest first.
    Courses {
        /// Only courses of this subject slug.
        #[clap(long = "subject")]
        subject: Option<String>,
    },
    /// List a course's modules in display order.
    Modules {
        /// Course slug.
        course: String,
    },
}

fn resolve_config(args: &CliArgs) -> Result<CoreConfig, Box<dyn Error>> {
    let mut config = CoreConfig::load(args.config.as_deref())?;
    if let Some(db) = &args.db {
        config.db_path = db.clone();
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = Some(dir.clone());
    }
    Ok(config)
}

fn run(args: CliArgs) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&args)?;
    init_from_config(&config)?;
    let conn = open_db(&config.db_path)?;
    info!(
        "event=cli_command module=cli status=start command={:?}",
        args.command
    );

    match &args.command {
        Command::Info => print_info(&config, &conn)?,
        Command::Subjects => print_subjects(&conn)?,
        Command::Courses { subject } => print_courses(&conn, subject.as_deref())?,
        Command::Modules { course } => print_modules(&conn, course)?,
    }
    Ok(())
}

type Catalog<'conn> =
    CatalogService<SqliteSubjectRepository<'conn>, SqliteCourseRepository<'conn>>;

fn catalog(conn: &Connection) -> Catalog<'_> {
    CatalogService::new(
        SqliteSubjectRepository::new(conn),
        SqliteCourseRepository::new(conn),
    )
}

fn print_info(config: &CoreConfig, conn: &Connection) -> Result<(), Box<dyn Error>> {
    println!("courseware_core version={}", courseware_core::core_version());
    println!("db path={}", config.db_path.display());
    println!(
        "db schema_version={} latest={}",
        migrations::current_user_version(conn)?,
        migrations::latest_version()
    );
    match logging_status() {
        Some((level, dir)) => println!("logging level={level} dir={}", dir.display()),
        None => println!("logging off"),
    }
    Ok(())
}

fn print_subjects(conn: &Connection) -> Result<(), Box<dyn Error>> {
    for summary in catalog(conn).course_catalog(None)?.subjects {
        println!(
            "{}\t{}\t{} courses",
            summary.subject.slug, summary.subject.title, summary.total_courses
        );
    }
    Ok(())
}

fn print_courses(conn: &Connection, subject: Option<&str>) -> Result<(), Box<dyn Error>> {
    for summary in catalog(conn).course_catalog(subject)?.courses {
        println!(
            "{}\t{}\t{} modules",
            summary.course.slug, summary.course.title, summary.total_modules
        );
    }
    Ok(())
}

fn print_modules(conn: &Connection, course_slug: &str) -> Result<(), Box<dyn Error>> {
    let detail = catalog(conn).course_detail(course_slug)?;
    println!("{}", detail.course.title);
    for module in detail.modules {
        println!("  {module}");
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(CliArgs::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
