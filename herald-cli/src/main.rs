#![forbid(unsafe_code)]

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use herald_core::{
    Config, DirectPolicy, DocumentStore, InMemoryDocumentStore, RedbDocumentStore,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use commands::{
    handle_docs_action, handle_presence_command, handle_serve_command, handle_trigger_action,
    DocsAction, TriggerAction,
};

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Push notification fan-out for chat message writes", version)]
struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true, env = "HERALD_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Keep documents in memory instead of the redb file.
    #[arg(long, global = true)]
    memory: bool,

    /// Overrides `fanout.direct_policy` (`no_guard` or `mirror_guard`).
    #[arg(long, global = true)]
    direct_policy: Option<DirectPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Expose Prometheus metrics on this address.
        #[arg(long)]
        metrics_addr: Option<SocketAddr>,
    },
    /// Run a message trigger by hand against the configured store.
    Trigger {
        #[command(subcommand)]
        action: TriggerAction,
    },
    Presence {
        #[arg(long)]
        user: String,
        #[arg(long, action = ArgAction::Set)]
        active: bool,
    },
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },
}

pub struct Stores {
    pub documents: Arc<dyn DocumentStore>,
}

impl Stores {
    fn new_memory() -> Self {
        Self {
            documents: Arc::new(InMemoryDocumentStore::new()),
        }
    }

    fn new_redb(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        config.ensure_data_dir()?;
        let store = RedbDocumentStore::open(config.db_path())?;

        Ok(Self {
            documents: Arc::new(store),
        })
    }
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match (&cli.config, &cli.data_dir) {
        (Some(path), _) => Config::load(path)?,
        (None, Some(_)) => Config::default(),
        (None, None) => Config::new()?,
    };

    if let Some(ref data_dir) = cli.data_dir {
        config = config.with_data_dir(data_dir.clone());
    }
    if let Some(policy) = cli.direct_policy {
        config = config.with_direct_policy(policy);
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let stores = if cli.memory {
        Stores::new_memory()
    } else {
        Stores::new_redb(&config)?
    };

    match cli.command {
        Commands::Serve {
            host,
            port,
            metrics_addr,
        } => handle_serve_command(&config, &stores, host, port, metrics_addr).await?,
        Commands::Trigger { action } => handle_trigger_action(&config, &stores, action).await?,
        Commands::Presence { user, active } => {
            handle_presence_command(&stores, user, active).await?
        }
        Commands::Docs { action } => handle_docs_action(&stores, action).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_trigger() {
        let cli = Cli::try_parse_from([
            "herald",
            "--memory",
            "--direct-policy",
            "no_guard",
            "trigger",
            "direct",
            "--owner",
            "bob",
            "--counterpart",
            "alice",
            "--message",
            "m1",
        ])
        .unwrap();

        assert!(cli.memory);
        assert_eq!(cli.direct_policy, Some(DirectPolicy::DirectNoGuard));
        assert!(matches!(cli.command, Commands::Trigger { .. }));
    }

    #[test]
    fn test_cli_presence_takes_explicit_bool() {
        let cli = Cli::try_parse_from(["herald", "presence", "--user", "bob", "--active", "false"])
            .unwrap();
        match cli.command {
            Commands::Presence { user, active } => {
                assert_eq!(user, "bob");
                assert!(!active);
            }
            _ => panic!("expected presence command"),
        }
    }

    #[test]
    fn test_data_dir_overrides_config() {
        let dir = std::env::temp_dir().join("herald-cli-test");
        let cli = Cli::try_parse_from([
            "herald",
            "--data-dir",
            dir.to_str().unwrap(),
            "docs",
            "get",
            "users/bob",
        ])
        .unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.data_dir, dir);
        assert_eq!(
            config.fanout.direct_policy,
            DirectPolicy::DirectWithMirrorGuard
        );
    }
}
