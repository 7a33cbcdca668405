//! Thin CLI runner for Shopwarden patrol runs.
//!
//! Everything interesting lives in `shopwarden-core`; this binary wires a
//! source, a classifier, and a store together from configuration, streams
//! progress to the terminal, and turns Ctrl-C into a pause.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use shopwarden_config::PatrolConfig;
use shopwarden_core::{
    BulkEncoding, BulkFileSource, CatalogSource, Classifier, HttpClassifyEndpoint,
    MemorySessionStore, PatrolController, PatrolProgress, PostgresSessionStore,
    RiskClassifier, SessionStore, report,
};
use shopwarden_model::{Session, SessionId};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "wardenctl", about = "IP-infringement patrol for e-commerce catalogs", version)]
struct Cli {
    /// Widen batches and drop pacing delays (rate-limit risk).
    #[arg(long, global = true)]
    high_speed: bool,

    /// Write gathered verdicts to this CSV file when the run ends.
    #[arg(long, global = true)]
    export: Option<PathBuf>,

    /// Operator name recorded in exports.
    #[arg(long, global = true, default_value = "operator")]
    operator: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Patrol a remote shop by URL.
    Patrol {
        /// Shop URL to patrol. Optional when resuming.
        shop_url: Option<String>,

        /// How many items to check.
        #[arg(long, default_value_t = 30)]
        target: usize,

        /// Resume a paused or aborted session by id.
        #[arg(long)]
        resume: Option<Uuid>,

        /// Only probe the shop (item count, name); classify nothing.
        #[arg(long)]
        probe: bool,
    },
    /// Check bulk catalog export files.
    Bulk {
        /// Delimited export files to check.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Text encoding of the exports.
        #[arg(long, default_value = "shift_jis")]
        encoding: String,

        /// Zero-based column index holding the item name. Auto-detected
        /// from the header when omitted.
        #[arg(long)]
        column: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let (mut config, source) = PatrolConfig::load_from_env()?;
    tracing::debug!(?source, "patrol config loaded");
    if cli.high_speed {
        config.pacing.high_speed = true;
    }

    let store = open_store().await?;

    match cli.command {
        Command::Patrol {
            shop_url,
            target,
            resume,
            probe,
        } => {
            let resume_session = match resume {
                Some(id) => Some(load_resumable(&*store, id).await?),
                None => None,
            };
            let shop_url = shop_url
                .or_else(|| resume_session.as_ref().map(|s| s.target.clone()))
                .context("a shop URL is required unless --resume is given")?;

            let catalog = CatalogSource::from_shop_url(config.catalog.clone(), &shop_url)?;
            if probe {
                let info = catalog.probe().await?;
                println!(
                    "shop {} ({}) lists {} items",
                    info.shop_code,
                    info.shop_name.as_deref().unwrap_or("unknown"),
                    info.total_items
                );
                return Ok(());
            }

            let classifier = build_classifier(&config)?;
            run(
                config,
                Arc::new(catalog),
                classifier,
                store,
                resume_session,
                target,
                cli.export.as_deref(),
                &cli.operator,
            )
            .await
        }
        Command::Bulk {
            files,
            encoding,
            column,
        } => {
            let encoding: BulkEncoding = encoding.parse()?;
            let bulk = BulkFileSource::load(&files, encoding, column);
            if bulk.is_empty() && !bulk.warnings().is_empty() {
                bail!("no readable rows in the given files");
            }
            let target = bulk.len();
            let classifier = build_classifier(&config)?;
            run(
                config,
                Arc::new(bulk),
                classifier,
                store,
                None,
                target,
                cli.export.as_deref(),
                &cli.operator,
            )
            .await
        }
    }
}

fn build_classifier(config: &PatrolConfig) -> anyhow::Result<Arc<dyn Classifier>> {
    if config.classifier.api_key.trim().is_empty() {
        bail!("no classifier API key configured; set CLASSIFIER_API_KEY");
    }
    let endpoint = HttpClassifyEndpoint::new(&config.classifier)?;
    Ok(Arc::new(RiskClassifier::new(
        endpoint,
        config.classifier.max_retries,
    )))
}

/// Postgres when DATABASE_URL is set, in-memory otherwise. Memory-backed
/// runs cannot be resumed after the process exits.
async fn open_store() -> anyhow::Result<Arc<dyn SessionStore>> {
    match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => {
            let pool = sqlx::PgPool::connect(&url)
                .await
                .context("connecting to DATABASE_URL")?;
            shopwarden_core::MIGRATOR
                .run(&pool)
                .await
                .context("running session store migrations")?;
            Ok(Arc::new(PostgresSessionStore::new(pool).await?))
        }
        _ => {
            warn!("DATABASE_URL not set; sessions will not survive this process");
            Ok(Arc::new(MemorySessionStore::default()))
        }
    }
}

async fn load_resumable(store: &dyn SessionStore, id: Uuid) -> anyhow::Result<Session> {
    let session = store
        .fetch(SessionId(id))
        .await?
        .with_context(|| format!("no session {id} in the store"))?;
    if !session.status.is_resumable() {
        bail!("session {id} is {:?} and cannot be resumed", session.status);
    }
    Ok(session)
}

#[allow(clippy::too_many_arguments)]
async fn run(
    config: PatrolConfig,
    source: Arc<dyn shopwarden_core::ItemSource>,
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn SessionStore>,
    resume: Option<Session>,
    target: usize,
    export: Option<&std::path::Path>,
    operator: &str,
) -> anyhow::Result<()> {
    let (progress_tx, mut progress_rx) = mpsc::channel(256);
    let controller = PatrolController::new(config, source, classifier, store, progress_tx);
    let cancel = controller.cancellation_token();
    let handle = controller.spawn(resume, target);

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("pausing after the current batch...");
            cancel.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            match event {
                PatrolProgress::Started {
                    session_id,
                    target_count,
                    ..
                } => println!("session {session_id}: checking up to {target_count} items"),
                PatrolProgress::PageFetched { page, items } => {
                    println!("page {page}: {items} items fetched")
                }
                PatrolProgress::BatchCompleted {
                    processed,
                    target_count,
                } => println!("  {processed}/{target_count} classified"),
                PatrolProgress::FileSkipped { message } => println!("skipped: {message}"),
                PatrolProgress::StatusChanged { status, .. } => println!("{status}"),
                PatrolProgress::Finished {
                    status, summary, ..
                } => println!(
                    "finished ({status:?}): {} checked, {} high, {} medium, {} critical",
                    summary.total, summary.high, summary.medium, summary.critical
                ),
            }
        }
    });

    let session = handle.join().await?;
    ctrl_c.abort();
    let _ = printer.await;

    if let Some(path) = export {
        report::export_csv(path, &session.results, operator, session.updated_at)?;
        println!("report written to {}", path.display());
    }

    Ok(())
}
