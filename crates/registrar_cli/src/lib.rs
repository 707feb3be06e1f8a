//! Maintenance commands for a registrar database.
//!
//! # Responsibility
//! - Apply schema migrations without starting the server.
//! - Inspect, restore and purge trashed records of any kind.
//!
//! # Invariants
//! - Every command opens the database through `open_db`, so migrations
//!   always run first.
//! - Purge goes through `RecordService`, never raw SQL, so attachment
//!   bytes and metadata are removed with the row.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use registrar_core::db::migrations::{current_user_version, latest_version};
use registrar_core::{
    open_db, ActorContext, ActorId, Course, Document, EntityKind, FsBlobStore, LibraryBook,
    ListQuery, Publication, RecordId, RecordService, RecordTable, TrashFilter, University,
};
use rusqlite::Connection;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Registrar maintenance CLI
#[derive(Debug, Parser)]
#[command(name = "registrar", version, about, long_about = None)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "REGISTRAR_DATABASE_PATH", default_value = "registrar.sqlite3")]
    pub db: PathBuf,

    /// Root directory of attachment bytes
    #[arg(long, global = true, env = "REGISTRAR_STORAGE_DIR", default_value = "storage")]
    pub storage: PathBuf,

    /// Actor id recorded in logs for restore and purge
    #[arg(long, global = true)]
    pub actor: Option<ActorId>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "REGISTRAR_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// List trashed records of one kind, one JSON object per line
    Trashed {
        /// university, course, document, publication or book
        kind: EntityKind,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Restore a trashed record
    Restore { kind: EntityKind, id: RecordId },
    /// Permanently delete a record and its attachments
    Purge { kind: EntityKind, id: RecordId },
}

macro_rules! for_kind {
    ($kind:expr, $func:ident($($arg:expr),* $(,)?)) => {
        match $kind {
            EntityKind::University => $func::<University>($($arg),*),
            EntityKind::Course => $func::<Course>($($arg),*),
            EntityKind::Document => $func::<Document>($($arg),*),
            EntityKind::Publication => $func::<Publication>($($arg),*),
            EntityKind::LibraryBook => $func::<LibraryBook>($($arg),*),
        }
    };
}

/// Runs one command, writing human-facing output to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let actor = ActorContext::from(cli.actor);

    match &cli.command {
        Commands::Migrate => {
            let version = current_user_version(&conn)?;
            writeln!(
                out,
                "schema version {version} (latest {})",
                latest_version()
            )?;
        }
        Commands::Trashed { kind, limit } => {
            let blobs = open_storage(cli)?;
            for_kind!(*kind, print_trashed(&conn, &blobs, *limit, out))?;
        }
        Commands::Restore { kind, id } => {
            let blobs = open_storage(cli)?;
            for_kind!(*kind, restore(&conn, &blobs, *id, out))?;
            info!(
                "event=cli_restore module=cli status=ok kind={} id={} actor={}",
                kind, id, actor
            );
        }
        Commands::Purge { kind, id } => {
            let blobs = open_storage(cli)?;
            let removed = for_kind!(*kind, purge(&conn, &blobs, *id))?;
            info!(
                "event=cli_purge module=cli status=ok kind={} id={} attachments_removed={} actor={}",
                kind, id, removed, actor
            );
            writeln!(out, "purged {kind} {id} ({removed} attachments removed)")?;
        }
    }
    Ok(())
}

fn open_storage(cli: &Cli) -> Result<FsBlobStore> {
    FsBlobStore::open(&cli.storage).with_context(|| {
        format!("failed to open storage directory `{}`", cli.storage.display())
    })
}

fn print_trashed<R>(
    conn: &Connection,
    blobs: &FsBlobStore,
    limit: Option<u32>,
    out: &mut impl Write,
) -> Result<()>
where
    R: RecordTable + Serialize,
{
    let query = ListQuery {
        trashed: TrashFilter::Only,
        limit,
        offset: 0,
    };
    let records = RecordService::<R, _>::new(conn, blobs).list(&query)?;
    for record in &records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    Ok(())
}

fn restore<R>(
    conn: &Connection,
    blobs: &FsBlobStore,
    id: RecordId,
    out: &mut impl Write,
) -> Result<()>
where
    R: RecordTable + Serialize,
{
    let record = RecordService::<R, _>::new(conn, blobs).restore(id)?;
    writeln!(out, "{}", serde_json::to_string(&record)?)?;
    Ok(())
}

fn purge<R>(conn: &Connection, blobs: &FsBlobStore, id: RecordId) -> Result<usize>
where
    R: RecordTable + Serialize,
{
    let report = RecordService::<R, _>::new(conn, blobs).force_delete(id)?;
    Ok(report.attachments_removed)
}

#[cfg(test)]
mod tests {
    use super::{run, Cli};
    use clap::Parser;
    use registrar_core::{
        open_db, ActorContext, FsBlobStore, RecordService, University, UniversityInput,
    };
    use std::path::Path;

    fn cli(root: &Path, args: &[&str]) -> Cli {
        let db = root.join("registrar.sqlite3");
        let storage = root.join("storage");
        let mut argv = vec![
            "registrar".to_string(),
            "--db".to_string(),
            db.display().to_string(),
            "--storage".to_string(),
            storage.display().to_string(),
        ];
        argv.extend(args.iter().map(|arg| arg.to_string()));
        Cli::try_parse_from(argv).unwrap()
    }

    fn output(cli: &Cli) -> String {
        let mut out = Vec::new();
        run(cli, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn trashed_university(root: &Path) -> uuid::Uuid {
        let conn = open_db(root.join("registrar.sqlite3")).unwrap();
        let blobs = FsBlobStore::open(root.join("storage")).unwrap();
        let service = RecordService::<University, _>::new(&conn, &blobs);
        let actor = ActorContext::authenticated(3);
        let university = service
            .create(UniversityInput::named("Lakeside"), &actor)
            .unwrap();
        service.delete(university.id, &actor).unwrap();
        university.id
    }

    #[test]
    fn migrate_reports_latest_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let text = output(&cli(dir.path(), &["migrate"]));
        assert!(text.starts_with("schema version 2"));
    }

    #[test]
    fn trashed_lists_and_restore_revives() {
        let dir = tempfile::tempdir().unwrap();
        let id = trashed_university(dir.path());

        let text = output(&cli(dir.path(), &["trashed", "universities"]));
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains(&id.to_string()));

        let restored = output(&cli(
            dir.path(),
            &["--actor", "9", "restore", "university", &id.to_string()],
        ));
        assert!(restored.contains("\"deleted_at\":null"));

        let text = output(&cli(dir.path(), &["trashed", "university"]));
        assert!(text.is_empty());
    }

    #[test]
    fn purge_removes_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let id = trashed_university(dir.path());

        let text = output(&cli(dir.path(), &["purge", "university", &id.to_string()]));
        assert!(text.contains("0 attachments removed"));

        let again = cli(dir.path(), &["purge", "university", &id.to_string()]);
        assert!(run(&again, &mut Vec::new()).is_err());
    }

    #[test]
    fn unknown_kind_is_a_parse_error() {
        let parsed = Cli::try_parse_from(["registrar", "trashed", "planets"]);
        assert!(parsed.is_err());
    }
}
