use anyhow::Result;
use etscraper::{
    config::Config,
    fetch::HttpFetcher,
    logging::init_logging,
    pipeline::{self, RunOutcome},
};
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> Result<ExitCode> {
    // ─── 1) config + logging ─────────────────────────────────────────
    let cfg = Config::load()?;
    let log_file = init_logging(&cfg.log_dir)?;
    info!(log_file = %log_file.display(), "startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) run ──────────────────────────────────────────────────────
    let fetcher = HttpFetcher::new(&cfg.http)?;
    let processed_at = pipeline::processed_now();

    // ─── 3) map outcome to exit code ─────────────────────────────────
    match pipeline::run(&cfg, &fetcher, processed_at) {
        Ok(RunOutcome::Skipped { filename }) => {
            info!(%filename, "no new file; exit");
            Ok(ExitCode::SUCCESS)
        }
        Ok(RunOutcome::Ingested {
            filename,
            rows_written,
            rows_skipped,
        }) => {
            info!(%filename, rows_written, rows_skipped, "all done");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if !e.is_fatal() => {
            warn!("{:#}", anyhow::Error::new(e));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("{:#}", anyhow::Error::new(e));
            if cfg.swallow_fatal_errors {
                warn!("fatal error swallowed by configuration");
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
