use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stockline",
    about = "Stockline: hash-linked inventory ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Verify ledger chain integrity
    Verify(StoreArgs),
    /// Show the latest blocks
    Show(ShowArgs),
    /// Snapshot the ledger and truncate its write-ahead log
    Compact(StoreArgs),
    /// Manage user records
    User(UserArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long, env = "STOCKLINE_CONFIG")]
    pub config: Option<PathBuf>,
    /// Override `server.bind_addr`
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Override `storage.data_dir`
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct StoreArgs {
    #[arg(long, env = "STOCKLINE_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,
}

#[derive(Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub action: UserAction,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Create a user, or reset an existing user's password
    Add {
        username: String,
        #[arg(long, env = "STOCKLINE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "users.json")]
        users_file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve_defaults() {
        let cli = Cli::try_parse_from(["stockline", "serve"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert!(args.bind.is_none());
            assert!(args.data_dir.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "stockline", "serve", "--config", "stockline.toml", "--bind", "0.0.0.0:8080", "--data-dir", "/srv/ledger",
        ])
        .unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.config, Some(PathBuf::from("stockline.toml")));
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
            assert_eq!(args.data_dir, Some(PathBuf::from("/srv/ledger")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve_rejects_bad_bind() {
        assert!(Cli::try_parse_from(["stockline", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn parse_verify() {
        let cli = Cli::try_parse_from(["stockline", "verify", "--data-dir", "/tmp/l"]).unwrap();
        if let Command::Verify(args) = cli.command {
            assert_eq!(args.data_dir, PathBuf::from("/tmp/l"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_show_limit() {
        let cli = Cli::try_parse_from(["stockline", "show", "-n", "5"]).unwrap();
        if let Command::Show(args) = cli.command {
            assert_eq!(args.limit, 5);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_compact() {
        let cli = Cli::try_parse_from(["stockline", "compact"]).unwrap();
        assert!(matches!(cli.command, Command::Compact(_)));
    }

    #[test]
    fn parse_user_add() {
        let cli = Cli::try_parse_from([
            "stockline", "user", "add", "alice", "--password", "pw", "--users-file", "/etc/stockline/users.json",
        ])
        .unwrap();
        if let Command::User(UserArgs { action: UserAction::Add { username, password, users_file } }) = cli.command {
            assert_eq!(username, "alice");
            assert_eq!(password, "pw");
            assert_eq!(users_file, PathBuf::from("/etc/stockline/users.json"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["stockline", "--verbose", "compact"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["stockline", "--format", "json", "verify"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
