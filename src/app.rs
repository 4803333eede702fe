use std::future::Future;
use std::path::Path;

use anyhow::{Context as AnyhowContext, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::core::Core;
use crate::report::{EventSink, LogSink, Reporter};
use crate::repository::HttpRepository;
use crate::resolver::AncestorResolver;
use crate::scanner::{ScanReport, Scanner};
use crate::{cli, context};

/// Connects, scans and returns the collected pages. Runs on a blocking thread.
pub fn scan(ctx: &Context, shutdown: CancellationToken) -> ScanReport {
    let sink = LogSink::operations();
    let resolver = AncestorResolver::new(ctx.page_type.as_str()).with_max_depth(ctx.max_depth);
    let scanner = Scanner::new(resolver, &sink)
        .with_policy(ctx.policy)
        .with_cancellation(shutdown);

    match HttpRepository::connect(&ctx.connection.uri, ctx.timeout) {
        Ok(repository) => Core::new(repository, scanner).run(&ctx.connection),
        Err(e) => {
            sink.error(&format!("Repository error: {}", e));
            ScanReport::default()
        }
    }
}

fn spawn_scan(ctx: Context, shutdown: CancellationToken) -> JoinHandle<ScanReport> {
    // the HTTP client is blocking, so it must live and die off the async runtime
    tokio::task::spawn_blocking(move || scan(&ctx, shutdown))
}

/// Waits for the scan, cancelling it when `interrupt` fires. A failed signal handler only logs.
async fn wait_for_scan<F>(
    mut scan_handle: JoinHandle<ScanReport>,
    interrupt: F,
    shutdown: &CancellationToken,
) -> Result<ScanReport>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        res = &mut scan_handle => return res.context("scan task failed"),
        signal = interrupt => match signal {
            Ok(()) => {
                log::info!("🧨 Ctrl-C received, stopping after the current node");
                shutdown.cancel();
            }
            Err(e) => log::warn!("Ctrl-C handler unavailable, scan cannot be interrupted: {}", e),
        },
    }

    scan_handle.await.context("scan task failed")
}

fn log_startup_info(ctx: &context::Context) {
    log::info!("🚀 Starting pagefinder");
    log::info!("Loaded repository connection properties");
    log::info!("🔗 Repository URI: {}", ctx.connection.uri);
    log::info!("👤 User: {}", ctx.connection.user);
    log::info!("📄 Page type: {}", ctx.page_type);
    log::info!("🧮 Collect policy: {:?}", ctx.policy);
    if let Some(path) = ctx.log_file.as_deref() {
        log::info!("📝 Log file: {}", path.to_string_lossy());
    }
}

fn log_summary(report: &ScanReport) {
    log::info!(
        "✅ Scan finished: {} matched, {} without page, {} failed",
        report.matched,
        report.unresolved,
        report.failed
    );
    if report.interrupted {
        log::warn!("Result is partial, the scan was interrupted");
    }
}

// --- Entry Point ---

pub async fn run() -> Result<()> {
    let cli = cli::parse();
    crate::tracing::init(cli.log_file.as_deref().map(Path::new));

    let ctx = match Context::from_cli(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            log::error!("{:#}", e);
            return Err(e);
        }
    };
    log_startup_info(&ctx);

    let shutdown = CancellationToken::new();
    let scan_handle = spawn_scan(ctx, shutdown.clone());
    let report = wait_for_scan(scan_handle, tokio::signal::ctrl_c(), &shutdown).await?;

    log_summary(&report);
    Reporter::new(&LogSink::operations(), &LogSink::results()).report(&report.pages);
    Ok(())
}
