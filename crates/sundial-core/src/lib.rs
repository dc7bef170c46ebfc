pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod messages;
pub mod model;
pub mod notify;
pub mod store;

use std::ffi::OsString;
use std::sync::Arc;

use anyhow::Context;
use chrono::TimeDelta;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub async fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(verbose = cli.verbose, quiet = cli.quiet, "starting sundial");

    let mut cfg = config::Config::load(cli.sundialrc.as_deref())?;
    cfg.apply_overrides(
        cli.rc_overrides
            .iter()
            .cloned()
            .map(|kv| (kv.key, kv.value)),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;
    debug!(dir = %data_dir.display(), "data directory resolved");

    let token_store = auth::TokenStore::open(&data_dir)
        .with_context(|| format!("failed to open token store in {}", data_dir.display()))?;

    let base_url = cfg
        .get("api.url")
        .context("api.url missing from configuration")?;
    let gateway = Arc::new(http::HttpGateway::new(base_url, token_store));

    let language = cfg
        .get("language")
        .map(|tag| messages::Language::from_tag(&tag))
        .unwrap_or_default();
    let notify_ttl = cfg
        .get_u64("notify.ttl_ms")
        .filter(|ms| *ms > 0)
        .map(|ms| TimeDelta::milliseconds(ms as i64));

    let mut app = store::App::new(
        gateway.clone(),
        messages::Catalog::new(language),
        notify_ttl,
    );

    let outcome = commands::dispatch(&mut app, &gateway, cli.command).await;

    for note in app.notifier.drain() {
        eprintln!("[{}] {}", note.kind.label(), note.message);
    }

    outcome?;
    info!("done");
    Ok(())
}
