use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::model::Priority;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sundial",
    version,
    about = "Sundial: task scheduling client",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "sundialrc", global = true)]
    pub sundialrc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authenticate and persist the token pair.
    Login {
        username: String,
        #[arg(long, env = "SUNDIAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Hydrate the local store and print summary counts.
    Fetch,
    /// List cached tasks, today-scoped unless a date is given.
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Create a task.
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        deadline: Option<NaiveDate>,
        #[arg(long = "tag", action = ArgAction::Append)]
        tags: Vec<i64>,
    },
    /// Toggle a task's completion.
    Done { id: i64 },
    /// Delete a task.
    Rm { id: i64 },
    /// Manage tags.
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Manage categories (task lists).
    Cat {
        #[command(subcommand)]
        action: CatAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TagAction {
    List,
    Add { title: String },
    Rename { id: i64, title: String },
    Rm { id: i64 },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CatAction {
    List,
    Add { title: String },
    Rename { id: i64, title: String },
    Rm { id: i64 },
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyval_parses_and_trims() {
        let kv: KeyVal = " api.url = http://x ".parse().expect("parse");
        assert_eq!(kv.key, "api.url");
        assert_eq!(kv.value, "http://x");
        assert!(" noequals ".parse::<KeyVal>().is_err());
    }

    #[test]
    fn add_accepts_repeated_tags_and_priority_words() {
        let cli = GlobalCli::parse_from([
            "sundial", "add", "water", "--priority", "high", "--tag", "1", "--tag", "2",
        ]);
        match cli.command {
            Command::Add {
                priority, tags, ..
            } => {
                assert_eq!(priority, Priority::High);
                assert_eq!(tags, vec![1, 2]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rc_overrides_are_global() {
        let cli = GlobalCli::parse_from(["sundial", "fetch", "--rc", "language=fa", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides.len(), 1);
        assert_eq!(cli.rc_overrides[0].key, "language");
    }
}
