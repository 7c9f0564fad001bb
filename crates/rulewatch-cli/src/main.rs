#![deny(unsafe_code)]

//! RuleWatch CLI: version review and conversational console.

mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rulewatch_config::AppConfig;
use rulewatch_core::backend::create_backend;
use rulewatch_core::{Attachment, RuleFilter, RuleType, Session, VersionCatalog};

/// RuleWatch: track investment-guideline rule changes and ask the
/// compliance agents about them.
#[derive(Parser)]
#[command(name = "rulewatch", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "rulewatch.toml")]
    config: PathBuf,

    /// Version catalog file; overrides `catalog.path` from the config.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog versions, newest first.
    Versions,

    /// Show the rules of a version.
    Rules {
        /// Version id; defaults to the latest.
        #[arg(long)]
        version: Option<String>,

        /// Case-insensitive match on rule name or id.
        #[arg(long)]
        search: Option<String>,

        /// Only rules of this type (limit, restriction, requirement).
        #[arg(long = "type")]
        rule_type: Option<RuleType>,
    },

    /// Compare two versions.
    Diff {
        /// Baseline version id.
        older: String,

        /// Comparison version id.
        newer: String,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Send a single message to the agents and print the reply.
    Ask {
        /// Message text.
        text: String,

        /// Document to attach (routes to rule extraction).
        #[arg(long)]
        attach: Option<PathBuf>,
    },

    /// Interactive conversation on stdin.
    Chat,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, from_file) = load_config(&cli.config).await?;

    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if !from_file {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    let catalog_path = cli.catalog.clone().or_else(|| config.catalog.path.clone());

    match cli.command {
        Commands::Versions => cmd_versions(catalog_path.as_deref()).await?,
        Commands::Rules {
            version,
            search,
            rule_type,
        } => cmd_rules(catalog_path.as_deref(), version, search, rule_type).await?,
        Commands::Diff { older, newer, json } => {
            cmd_diff(catalog_path.as_deref(), &older, &newer, json).await?
        }
        Commands::Ask { text, attach } => {
            let mut session = open_session(&config, catalog_path.as_deref()).await?;
            cmd_ask(&mut session, &text, attach.as_deref()).await?
        }
        Commands::Chat => {
            let mut session = open_session(&config, catalog_path.as_deref()).await?;
            cmd_chat(&mut session).await?
        }
        Commands::Config { show } => cmd_config(&cli.config, &config, show)?,
    }

    Ok(())
}

async fn cmd_versions(catalog_path: Option<&Path>) -> Result<()> {
    let catalog = load_catalog(catalog_path).await?;
    print!("{}", display::render_versions(catalog.iter()));
    Ok(())
}

async fn cmd_rules(
    catalog_path: Option<&Path>,
    version: Option<String>,
    search: Option<String>,
    rule_type: Option<RuleType>,
) -> Result<()> {
    let catalog = load_catalog(catalog_path).await?;
    let version = match version {
        Some(id) => catalog.get(&id).map_err(|e| anyhow::anyhow!(e))?,
        None => catalog
            .latest()
            .ok_or_else(|| anyhow::anyhow!("catalog has no versions"))?,
    };

    let mut filter = RuleFilter::new();
    if let Some(term) = search {
        filter = filter.with_search(term);
    }
    if let Some(rule_type) = rule_type {
        filter = filter.with_type(rule_type);
    }
    let rules = version.filter_rules(&filter);
    print!("{}", display::render_rules(version, &rules));
    Ok(())
}

async fn cmd_diff(catalog_path: Option<&Path>, older: &str, newer: &str, json: bool) -> Result<()> {
    let catalog = load_catalog(catalog_path).await?;
    let result = catalog
        .diff(older, newer)
        .map_err(|e| anyhow::anyhow!(e))?;
    info!(older, newer, summary = %result.summary(), "Versions compared");

    if json {
        let out =
            serde_json::to_string_pretty(&result).map_err(|e| anyhow::anyhow!("JSON error: {e}"))?;
        println!("{out}");
    } else {
        print!("{}", display::render_diff(older, newer, &result));
    }
    Ok(())
}

async fn cmd_ask(session: &mut Session, text: &str, attach: Option<&Path>) -> Result<()> {
    let attachment = match attach {
        Some(path) => Some(read_attachment(path).await?),
        None => None,
    };
    let turn = session
        .submit(text, attachment)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    if let Some(turn) = session.log().get(turn) {
        print!("{}", display::render_turn(turn));
    }
    Ok(())
}

const CHAT_HELP: &str = "\
Commands:
  :attach <file>   attach a document to the next message
  :version <id>    select the version under review
  :help            show this help
  :quit            leave the conversation
Press Ctrl-C while waiting for a reply to cancel it.";

async fn cmd_chat(session: &mut Session) -> Result<()> {
    if let Some(v) = session.active_version() {
        println!("Reviewing {} ({}). Type :help for commands.", v.label, v.id);
    } else {
        println!("No version catalog loaded. Type :help for commands.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut staged: Option<Attachment> = None;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => continue,
            (":quit" | ":q", _) => break,
            (":help", _) => println!("{CHAT_HELP}"),
            (":attach", path) if !path.trim().is_empty() => {
                match read_attachment(Path::new(path.trim())).await {
                    Ok(a) => {
                        println!("Attached {} ({} bytes).", a.filename, a.bytes.len());
                        staged = Some(a);
                    }
                    Err(e) => println!("{e:#}"),
                }
            }
            (":version", id) if !id.trim().is_empty() => match session.select_version(id.trim()) {
                Ok(v) => println!("Reviewing {} ({}).", v.label, v.id),
                Err(e) => println!("{e}"),
            },
            _ if line.starts_with(':') => println!("Unknown command. Type :help."),
            _ => exchange(session, line, staged.take()).await,
        }
    }
    Ok(())
}

/// Run one request/reply cycle, cancelling it on Ctrl-C.
async fn exchange(session: &mut Session, text: &str, attachment: Option<Attachment>) {
    let pending = match session.begin(text, attachment) {
        Ok(p) => p,
        Err(e) => {
            println!("{e}");
            return;
        }
    };
    let backend = session.backend();

    tokio::select! {
        outcome = backend.call(&pending.request) => {
            if let Some(turn) = session.complete(pending.ticket, outcome)
                .and_then(|id| session.log().get(id))
            {
                print!("{}", display::render_turn(turn));
            }
        }
        _ = tokio::signal::ctrl_c() => {
            session.cancel();
            println!("Request cancelled.");
        }
    }
}

async fn read_attachment(path: &Path) -> Result<Attachment> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot read '{}': {e}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("attachment")
        .to_string();
    Ok(Attachment::new(filename, bytes))
}

async fn open_session(config: &AppConfig, catalog_path: Option<&Path>) -> Result<Session> {
    let catalog = load_catalog(catalog_path).await?;
    let backend = create_backend(&config.backend).map_err(|e| anyhow::anyhow!(e))?;
    info!(backend = backend.name(), url = %config.backend.base_url, "Backend ready");
    Ok(Session::new(
        Arc::from(backend),
        config.backend.capabilities.clone(),
        catalog,
    ))
}

async fn load_catalog(path: Option<&Path>) -> Result<VersionCatalog> {
    match path {
        Some(path) => VersionCatalog::load(path)
            .await
            .map_err(|e| anyhow::anyhow!("catalog '{}': {e}", path.display())),
        None => {
            warn!("No catalog configured, starting with an empty one");
            Ok(VersionCatalog::default())
        }
    }
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let mut redacted = config.clone();
        if !redacted.backend.api_key.is_empty() {
            redacted.backend.api_key = "<redacted>".to_string();
        }
        let toml_str =
            toml::to_string_pretty(&redacted).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

/// Load the config file, or defaults when it does not exist. The flag tells
/// whether the file was read.
async fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        let config = AppConfig::load(path)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok((config, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}
