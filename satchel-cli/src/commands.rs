// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations

use console::style;
use satchel_cache::{CacheStorage, KeyValueStore, SledBackend, SledCacheStorage};
use satchel_core::{Fetcher, Request, SatchelError, SatchelResult, WorkerVersionState};
use satchel_providers::{HttpFetcher, HttpFetcherConfig, LocalOrigin, OfflineSwitch};
use satchel_worker::{FetchOutcome, Registration, ServiceWorker, Source, SyncKind, WorkerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tokio::sync::Mutex;
use url::Url;

/// Version that last activated through this CLI
const ACTIVE_VERSION_KEY: &str = "cli/active-version";

/// Global options shared by every command
pub struct Options {
    pub config: Option<PathBuf>,
    pub origin: Option<String>,
    pub root: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub version: Option<String>,
    pub verbose: bool,
}

/// Everything a command needs
struct Context {
    worker: ServiceWorker,
    backend: SledBackend,
    network: Arc<OfflineSwitch<Arc<dyn Fetcher>>>,
}

fn load_config(options: &Options) -> SatchelResult<WorkerConfig> {
    let path = options.config.clone().unwrap_or_else(WorkerConfig::default_path);
    let mut config = WorkerConfig::load_or_default(&path)?;

    if let Some(origin) = &options.origin {
        config.origin = Url::parse(origin)?;
    }
    if let Some(version) = &options.version {
        config.version = version.clone();
    }
    Ok(config)
}

fn open_context(options: &Options) -> SatchelResult<Context> {
    let config = load_config(options)?;

    let db_path = options
        .data_dir
        .as_ref()
        .map(|d| d.join("store.db"))
        .unwrap_or_else(SledBackend::default_path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let backend = SledBackend::open(&db_path)?;

    let inner: Arc<dyn Fetcher> = match &options.root {
        Some(root) => Arc::new(LocalOrigin::new(root)),
        None => Arc::new(HttpFetcher::new(HttpFetcherConfig::default())?),
    };
    let network = Arc::new(OfflineSwitch::new(inner));

    if options.verbose {
        eprintln!("Origin:  {}", config.origin);
        eprintln!("Version: {}", config.version);
        eprintln!("Store:   {}", db_path.display());
    }

    // Restore the version a previous run activated
    let (mut registration, _events) = Registration::new();
    if let Some(previous) = backend.get_string(ACTIVE_VERSION_KEY)? {
        registration.update(&previous);
        registration.install_complete(&previous)?;
        registration.activate()?;
    }

    let worker = ServiceWorker::new(
        config,
        Arc::new(SledCacheStorage::new(backend.clone())),
        network.clone(),
        Arc::new(backend.clone()),
        Arc::new(Mutex::new(registration)),
    )?;

    Ok(Context {
        worker,
        backend,
        network,
    })
}

fn finish(ctx: &Context) -> SatchelResult<()> {
    ctx.backend.flush()?;
    Ok(())
}

fn format_source(source: Source) -> String {
    match source {
        Source::Network => style("network").green().to_string(),
        Source::Cache => style("cache").cyan().to_string(),
        Source::Fallback => style("fallback").yellow().to_string(),
    }
}

/// Fetch a path through the worker
pub async fn fetch(options: &Options, path: &str, html: bool, offline: bool, body: bool) -> SatchelResult<()> {
    let ctx = open_context(options)?;
    let url = ctx.worker.config().url(path)?;
    let request = if html {
        Request::navigate(url.as_str())?
    } else {
        Request::get(url.as_str())?
    };

    if offline {
        ctx.network.set_online(false);
    }

    let served = match ctx.worker.handle_fetch(&request).await {
        FetchOutcome::Respond(served) => served,
        FetchOutcome::PassThrough => {
            println!("{} {} (not intercepted)", style("pass").dim(), url);
            return Ok(());
        }
    };

    let response = &served.response;
    println!(
        "{} {} from {}",
        response.status,
        url,
        format_source(served.source)
    );
    println!("  Type: {}", response.content_type().unwrap_or("-"));
    println!("  Size: {}", bytesize::ByteSize(response.len() as u64));
    println!("  Network attempts: {}", ctx.network.attempts());

    if body {
        use std::io::Write;
        std::io::stdout().write_all(&response.body)?;
    }

    finish(&ctx)
}

impl Context {
    fn caches(&self) -> SledCacheStorage {
        SledCacheStorage::new(self.backend.clone())
    }

    fn active_version(&self) -> SatchelResult<Option<String>> {
        Ok(self.backend.get_string(ACTIVE_VERSION_KEY)?)
    }

    /// Install the configured version and remember it once active
    async fn install(&self) -> SatchelResult<WorkerVersionState> {
        let state = self.worker.handle_install().await?;
        if state == WorkerVersionState::Active {
            self.backend.insert_string(ACTIVE_VERSION_KEY, self.worker.version())?;
        }
        Ok(state)
    }

    async fn update(&self) -> SatchelResult<UpdateOutcome> {
        let from = self.active_version()?;
        if from.as_deref() == Some(self.worker.version()) {
            return Ok(UpdateOutcome::UpToDate);
        }

        let before = self.caches().keys().await?;
        let state = self.install().await?;
        let after = self.caches().keys().await?;

        Ok(UpdateOutcome::Installed {
            from,
            state,
            deleted: before.into_iter().filter(|n| !after.contains(n)).collect(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum UpdateOutcome {
    /// The configured version is already active; nothing was fetched
    UpToDate,
    Installed {
        from: Option<String>,
        state: WorkerVersionState,
        deleted: Vec<String>,
    },
}

fn format_state(state: WorkerVersionState) -> String {
    match state {
        WorkerVersionState::Active => style("active").green().to_string(),
        other => style(format!("{other:?}").to_lowercase()).yellow().to_string(),
    }
}

/// Precache the application shell, even when this version is already active
pub async fn install(options: &Options) -> SatchelResult<()> {
    let ctx = open_context(options)?;
    let state = ctx.install().await?;

    println!(
        "Installed {} ({} entries), now {}",
        ctx.worker.version(),
        ctx.worker.config().precache.len(),
        format_state(state)
    );
    finish(&ctx)
}

/// Delete caches from other versions
pub async fn activate(options: &Options) -> SatchelResult<()> {
    let ctx = open_context(options)?;
    let deleted = ctx.worker.handle_activate().await?;

    if deleted.is_empty() {
        println!("No outdated caches");
    } else {
        for name in &deleted {
            println!("Deleted {}", style(name).red());
        }
    }
    finish(&ctx)
}

/// Switch to the configured version unless it is already active
pub async fn update(options: &Options) -> SatchelResult<()> {
    let ctx = open_context(options)?;

    match ctx.update().await? {
        UpdateOutcome::UpToDate => {
            println!("Already on {}", style(ctx.worker.version()).green());
            return Ok(());
        }
        UpdateOutcome::Installed { from, state, deleted } => {
            println!(
                "{} -> {}, now {}",
                from.as_deref().unwrap_or("(none)"),
                style(ctx.worker.version()).green(),
                format_state(state)
            );
            for name in deleted {
                println!("  Deleted {}", style(name).red());
            }
        }
    }
    finish(&ctx)
}

#[derive(Tabled)]
struct CacheRow {
    #[tabled(rename = "Cache")]
    name: String,
    #[tabled(rename = "Entries")]
    entries: u64,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Show or clear caches
pub async fn caches(options: &Options, clear: bool, force: bool) -> SatchelResult<()> {
    let ctx = open_context(options)?;

    if clear {
        let confirmed = force
            || dialoguer::Confirm::new()
                .with_prompt(format!("Delete all caches of version {}?", ctx.worker.version()))
                .default(false)
                .interact()
                .map_err(|e| SatchelError::Other(e.to_string()))?;
        if !confirmed {
            println!("Aborted");
            return Ok(());
        }
        let cleared = ctx.worker.clear_caches().await?;
        ctx.backend.remove(ACTIVE_VERSION_KEY)?;
        println!("Cleared {} caches", cleared.len());
        return finish(&ctx);
    }

    let namespaces = ctx.worker.config().namespaces();
    let stats = ctx.caches().stats().await?;
    let rows: Vec<CacheRow> = stats
        .namespaces
        .iter()
        .map(|ns| CacheRow {
            name: ns.name.clone(),
            entries: ns.entries,
            size: bytesize::ByteSize(ns.total_size).to_string(),
            status: if namespaces.is_current(&ns.name) {
                style("current").green().to_string()
            } else {
                style("outdated").yellow().to_string()
            },
        })
        .collect();

    if rows.is_empty() {
        println!("(no caches)");
    } else {
        println!("{}", Table::new(rows));
        println!(
            "Total: {} entries, {}",
            stats.entries(),
            bytesize::ByteSize(stats.total_size())
        );
    }
    println!("Store on disk: {}", bytesize::ByteSize(ctx.backend.size_on_disk()?));
    Ok(())
}

#[derive(Tabled)]
struct QueueRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Queued")]
    queued: String,
    #[tabled(rename = "Attempts")]
    attempts: u32,
    #[tabled(rename = "Last error")]
    last_error: String,
}

/// List queued submissions
pub async fn queue(options: &Options) -> SatchelResult<()> {
    let ctx = open_context(options)?;
    let items = ctx.worker.queue().pending(None)?;

    if items.is_empty() {
        println!("(queue empty)");
        return Ok(());
    }

    let rows: Vec<QueueRow> = items
        .iter()
        .map(|item| QueueRow {
            id: item.id.to_string(),
            kind: item.kind.to_string(),
            queued: item.enqueued_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            attempts: item.attempts,
            last_error: item.last_error.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

/// Queue a submission for background sync
pub async fn enqueue(options: &Options, kind: &str, payload: &str) -> SatchelResult<()> {
    let ctx = open_context(options)?;
    let kind: SyncKind = kind.parse()?;
    let payload: serde_json::Value = serde_json::from_str(payload)?;

    let item = ctx.worker.enqueue(kind, payload)?;
    println!("Queued {} under {}", item.id, style(kind.tag()).cyan());
    finish(&ctx)
}

/// Replay queued submissions for a sync tag
pub async fn sync(options: &Options, tag: &str) -> SatchelResult<()> {
    let ctx = open_context(options)?;
    let report = ctx.worker.handle_sync(tag).await?;

    println!(
        "{}: {} attempted, {} sent, {} kept",
        tag,
        report.attempted,
        style(report.succeeded).green(),
        if report.failed > 0 {
            style(report.failed).red()
        } else {
            style(report.failed).dim()
        }
    );
    finish(&ctx)
}

/// Render the notification for a push payload
pub async fn push(options: &Options, payload: Option<&str>) -> SatchelResult<()> {
    let ctx = open_context(options)?;
    let notification = ctx.worker.handle_push(payload.map(str::as_bytes));

    println!("{}", style(&notification.title).bold());
    println!("  {}", notification.body);
    println!("  Icon:  {}", notification.icon);
    println!("  Opens: {}", notification.target);
    Ok(())
}
