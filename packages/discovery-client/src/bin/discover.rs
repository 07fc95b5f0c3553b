//! Command-line driver for the discovery orchestrator.
//!
//! Mounts a session (global or per campaign), optionally applies filters,
//! pages through results and prints them. Session state is kept on disk so
//! the next run for the same campaign picks up where this one stopped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use discovery::{
    DiscoveryConfig, DiscoveryEngine, DiscoverySnapshot, EngineError, EngineHandle, FileStore,
    MemberStatus, Phase, SearchFilter, SessionKey, ShortlistQuery, SortSpec,
};
use discovery_client::{ClientConfig, HttpBackend};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "discover")]
#[command(about = "Search for creators from the terminal")]
struct Cli {
    /// Campaign to attach the session to; omit for the global session
    #[arg(long)]
    campaign: Option<Uuid>,

    /// Platform id to search on
    #[arg(long)]
    platform: Option<String>,

    /// Free-text search
    #[arg(long)]
    text: Option<String>,

    /// Filter as JSON, e.g. '{"creator_locations":["US"]}'
    #[arg(long)]
    filter: Option<String>,

    /// Sort field, descending
    #[arg(long)]
    sort: Option<String>,

    /// Extra pages to load after the first
    #[arg(long, default_value_t = 0)]
    pages: u32,

    /// Directory holding saved sessions
    #[arg(long, env = "DISCOVERY_SESSION_DIR", default_value = ".discovery-sessions")]
    session_dir: PathBuf,

    /// List the campaign shortlist instead of searching
    #[arg(long)]
    shortlist: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Filter to apply, if any search option was given.
    fn requested_filter(&self) -> Result<Option<SearchFilter>> {
        let any = self.filter.is_some()
            || self.text.is_some()
            || self.sort.is_some()
            || self.platform.is_some();
        if !any {
            return Ok(None);
        }

        let mut filter: SearchFilter = match &self.filter {
            Some(raw) => serde_json::from_str(raw).context("--filter is not a valid filter")?,
            None => SearchFilter::default(),
        };
        if let Some(text) = &self.text {
            filter.text = Some(text.clone());
        }
        if let Some(sort) = &self.sort {
            filter.sort = Some(SortSpec::desc(sort));
        }
        Ok(Some(filter))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,discovery=debug,discovery_client=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    let requested = cli.requested_filter()?;

    let config = DiscoveryConfig::from_env()?;
    let client_config = ClientConfig::from_env()?;
    let backend = Arc::new(HttpBackend::new(client_config));
    let store = Arc::new(FileStore::new(&cli.session_dir));
    let key = SessionKey::from(cli.campaign);

    tracing::info!(%key, session_dir = %cli.session_dir.display(), "Starting discovery session");

    let (engine, handle) = DiscoveryEngine::builder(key, backend, store)
        .config(config.clone())
        .build();
    let task = tokio::spawn(engine.run());

    if cli.shortlist {
        print_shortlist(&handle, cli.text.clone(), cli.json).await?;
    } else {
        let mut snapshot = handle
            .wait_until(|s| s.phase == Phase::Ready && !s.is_loading())
            .await?;

        if let Some(platform) = &cli.platform {
            handle.select_platform(platform.clone())?;
            tokio::time::timeout(
                config.request_timeout,
                handle.wait_until(|s| {
                    s.session.platform.as_deref() == Some(platform.as_str()) && !s.is_loading()
                }),
            )
            .await
            .with_context(|| format!("platform {:?} is not available", platform))??;
        }

        if let Some(filter) = requested {
            snapshot = after_search(&handle, || handle.apply_filters(filter)).await?;
        }

        for _ in 0..cli.pages {
            if !snapshot.can_load_more() {
                break;
            }
            snapshot = after_search(&handle, || handle.load_more()).await?;
        }

        print_results(&snapshot, cli.json)?;

        // Unmount drops a pending write, so wait it out first
        tokio::time::sleep(config.persist_debounce + Duration::from_millis(100)).await;
    }

    handle.unmount()?;
    task.await.context("discovery engine panicked")?;
    Ok(())
}

/// Send a search trigger and wait for its response to land.
async fn after_search(
    handle: &EngineHandle,
    trigger: impl FnOnce() -> Result<(), EngineError>,
) -> Result<DiscoverySnapshot> {
    let issued = handle.current().session.request_seq;
    trigger()?;
    let snapshot = handle
        .wait_until(|s| s.session.request_seq > issued && !s.is_loading())
        .await?;
    Ok(snapshot)
}

fn print_results(snapshot: &DiscoverySnapshot, json: bool) -> Result<()> {
    let session = &snapshot.session;

    if json {
        let rows: Vec<_> = session.results.iter().map(|r| r.row()).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{} of {} creators on {}",
        session.results.len(),
        session.total,
        session.platform.as_deref().unwrap_or("(no platform)")
    );
    for result in &session.results {
        let row = result.row();
        let engagement = row
            .engagement_rate_pct
            .map(|pct| format!("{:.2}%", pct))
            .unwrap_or_else(|| "-".into());
        let card = result.card();
        println!(
            "  {:<28} {:<24} {:>8} {:>8}",
            row.name,
            card.handle,
            card.followers_label.unwrap_or_else(|| "-".into()),
            engagement
        );
    }
    if snapshot.remaining > 0 {
        println!(
            "{} more available (next page: {})",
            snapshot.remaining, snapshot.next_batch_size
        );
    }
    Ok(())
}

async fn print_shortlist(handle: &EngineHandle, search: Option<String>, json: bool) -> Result<()> {
    let query = ShortlistQuery {
        status: MemberStatus::Active,
        search,
        ..Default::default()
    };
    let page = handle.shortlist(&query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    println!("{} shortlisted creators", page.total);
    for member in &page.members {
        let card = member.creator.card();
        println!("  {:<28} {:<24} {}", card.name, card.handle, member.status.as_str());
    }
    Ok(())
}
