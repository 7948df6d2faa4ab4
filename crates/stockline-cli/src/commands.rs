use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use stockline_ledger::{
    ChainValidator, FileLedger, FileLedgerConfig, LedgerError, LedgerReader, ValidationReport,
    SNAPSHOT_FILE,
};
use stockline_server::{AppConfig, FileUserStore, StocklineServer, UserRecord};
use stockline_types::{Block, BlockStatus};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Verify(args) => cmd_verify(&args, format),
        Command::Show(args) => cmd_show(&args, format),
        Command::Compact(args) => cmd_compact(&args, format),
        Command::User(UserArgs { action }) => match action {
            UserAction::Add { username, password, users_file } => {
                cmd_user_add(&username, &password, &users_file, format)
            }
        },
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if let Some(dir) = args.data_dir {
        config.storage.data_dir = Some(dir);
    }

    let users = FileUserStore::new(&config.auth.users_file);
    if users.load()?.is_empty() {
        tracing::warn!(
            users_file = %config.auth.users_file.display(),
            "no users configured; create one with `stockline user add`"
        );
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(StocklineServer::new(config).serve())?;
    Ok(())
}

/// Open an existing ledger directory without creating one.
fn open_existing(dir: &Path) -> Result<FileLedger, LedgerError> {
    if !dir.join(SNAPSHOT_FILE).exists() {
        return Err(LedgerError::Storage(format!(
            "no ledger found in {}",
            dir.display()
        )));
    }
    FileLedger::open(dir, FileLedgerConfig::default())
}

fn cmd_verify(args: &StoreArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (length, first_invalid, reason) = match open_existing(&args.data_dir) {
        Ok(ledger) => {
            let report = ChainValidator::verify(&ledger)?;
            summarize(&report)
        }
        // The store refuses to load a chain that fails validation.
        Err(LedgerError::IntegrityViolation { index, reason }) => (None, Some(index), Some(reason)),
        Err(e) => return Err(e.into()),
    };
    let valid = first_invalid.is_none();

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "valid": valid,
                "length": length,
                "firstInvalidIndex": first_invalid,
                "reason": reason,
            }))?
        ),
        OutputFormat::Text if valid => {
            println!("{} Ledger chain integrity verified", "✓".green().bold());
            if let Some(length) = length {
                println!("  Blocks: {}", length.to_string().bold());
            }
            println!("  Hash chain: {}", "valid".green());
            println!("  Indices: {}", "contiguous".green());
        }
        OutputFormat::Text => {
            println!("{} Ledger chain integrity check failed", "✗".red().bold());
            if let Some(index) = first_invalid {
                println!("  First invalid block: {}", index.to_string().yellow());
            }
            if let Some(reason) = &reason {
                println!("  Reason: {reason}");
            }
        }
    }

    if !valid {
        bail!("ledger verification failed");
    }
    Ok(())
}

fn summarize(report: &ValidationReport) -> (Option<u64>, Option<u64>, Option<String>) {
    let first = report.violations.iter().min_by_key(|v| v.index);
    (
        Some(report.block_count),
        first.map(|v| v.index),
        first.map(|v| v.description.clone()),
    )
}

fn cmd_show(args: &ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ledger = open_existing(&args.store.data_dir)?;
    let chain = ledger.chain()?;
    let start = chain.len().saturating_sub(args.limit);
    let latest = &chain[start..];

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(latest)?),
        OutputFormat::Text => {
            for block in latest.iter().rev() {
                println!("{}", format_block(block));
            }
            println!("{} of {} blocks shown", latest.len(), chain.len());
        }
    }
    Ok(())
}

fn format_block(block: &Block) -> String {
    let status = match block.status() {
        BlockStatus::Pending => block.status().as_str().yellow(),
        BlockStatus::Confirmed => block.status().as_str().green(),
        BlockStatus::Rejected => block.status().as_str().red(),
    };
    format!(
        "{}  {}  {} {:+}  {}  by {}  {}",
        format!("#{}", block.index).yellow().bold(),
        block.timestamp.format("%Y-%m-%d %H:%M:%S"),
        block.payload.product.bold(),
        block.payload.quantity_delta,
        status,
        block.payload.submitted_by,
        block.hash.short().dimmed(),
    )
}

fn cmd_compact(args: &StoreArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ledger = open_existing(&args.data_dir)?;
    ledger.compact()?;
    let blocks = ledger.block_count()?;

    match format {
        OutputFormat::Json => println!("{}", json!({ "compacted": true, "blocks": blocks })),
        OutputFormat::Text => println!(
            "{} Compacted ledger in {} ({} blocks)",
            "✓".green().bold(),
            args.data_dir.display().to_string().bold(),
            blocks
        ),
    }
    Ok(())
}

fn cmd_user_add(
    username: &str,
    password: &str,
    users_file: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let record = UserRecord::new(username, password)?;
    let username = record.username.clone();
    let created = FileUserStore::new(users_file).upsert(record)?;

    match format {
        OutputFormat::Json => println!("{}", json!({ "username": username, "created": created })),
        OutputFormat::Text => {
            let verb = if created { "Created" } else { "Updated" };
            println!(
                "{} {verb} user {} in {}",
                "✓".green().bold(),
                username.bold(),
                users_file.display()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use stockline_ledger::LedgerWriter;
    use stockline_server::UserStore;
    use stockline_types::NewEntry;

    use super::*;

    fn run(args: &[&str]) -> anyhow::Result<()> {
        run_command(Cli::try_parse_from(args).unwrap())
    }

    fn seeded_ledger(dir: &Path) {
        let ledger = FileLedger::open(dir, FileLedgerConfig::default()).unwrap();
        ledger.append(NewEntry::new("Toys", -100)).unwrap();
        ledger.resolve(1, BlockStatus::Confirmed).unwrap();
        ledger.append(NewEntry::new("Sports", 30)).unwrap();
    }

    #[test]
    fn verify_show_and_compact_an_existing_ledger() {
        let dir = tempfile::tempdir().unwrap();
        seeded_ledger(dir.path());
        let data_dir = dir.path().to_str().unwrap();

        run(&["stockline", "verify", "--data-dir", data_dir]).unwrap();
        run(&["stockline", "--format", "json", "show", "--data-dir", data_dir, "-n", "2"]).unwrap();
        run(&["stockline", "compact", "--data-dir", data_dir]).unwrap();

        let reopened = FileLedger::open(dir.path(), FileLedgerConfig::default()).unwrap();
        assert_eq!(reopened.block_count().unwrap(), 3);
    }

    #[test]
    fn missing_ledger_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nothing");
        assert!(run(&["stockline", "verify", "--data-dir", missing.to_str().unwrap()]).is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn compact_refuses_a_ledger_held_by_a_running_server() {
        let dir = tempfile::tempdir().unwrap();
        seeded_ledger(dir.path());
        let data_dir = dir.path().to_str().unwrap();

        let server = FileLedger::open(dir.path(), FileLedgerConfig::default()).unwrap();
        let err = run(&["stockline", "compact", "--data-dir", data_dir]).unwrap_err();
        assert!(err.to_string().contains("locked"));

        server.append(NewEntry::new("Toys", 5)).unwrap();
        drop(server);

        let reopened = FileLedger::open(dir.path(), FileLedgerConfig::default()).unwrap();
        assert_eq!(reopened.block_count().unwrap(), 4);
    }

    #[test]
    fn tampered_snapshot_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        seeded_ledger(dir.path());
        FileLedger::open(dir.path(), FileLedgerConfig::default())
            .unwrap()
            .compact()
            .unwrap();

        let path = dir.path().join(SNAPSHOT_FILE);
        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, raw.replace("-100", "-1")).unwrap();

        let err = run(&["stockline", "verify", "--data-dir", dir.path().to_str().unwrap()]).unwrap_err();
        assert!(err.to_string().contains("verification failed"));
    }

    #[tokio::test]
    async fn user_add_writes_hashed_record() {
        let dir = tempfile::tempdir().unwrap();
        let users_file = dir.path().join("users.json");
        let users = users_file.to_str().unwrap();

        run(&["stockline", "user", "add", "alice", "--password", "pw1", "--users-file", users]).unwrap();
        run(&["stockline", "user", "add", "alice", "--password", "pw2", "--users-file", users]).unwrap();

        let store = FileUserStore::new(&users_file);
        assert_eq!(store.load().unwrap().len(), 1);
        assert!(store.find("alice").await.unwrap().unwrap().verify("pw2"));
    }

    #[test]
    fn format_block_mentions_product_and_delta() {
        let dir = tempfile::tempdir().unwrap();
        seeded_ledger(dir.path());
        let ledger = FileLedger::open(dir.path(), FileLedgerConfig::default()).unwrap();
        let line = format_block(&ledger.get(1).unwrap().unwrap());
        assert!(line.contains("Toys"));
        assert!(line.contains("-100"));
    }
}
