//! # `polybox`
//!
//! Fetches `--polygons-num` weighted polygons from `--url` with a fixed pool
//! of workers and prints, as JSON on stdout, their combined bounding box, the
//! maximum polygon weight and every polygon weighing at least 100.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin polybox --release -- \
//!     --url 'http://localhost:8080/polygon/{index}' \
//!     --polygons-num 1000 --workers 16 --timeout 60
//! ```
//!
//! Exit status: `0` on success, `1` on a polygon or internal failure, `124`
//! when the timeout elapsed, `130` when interrupted.

use clap::Parser;
use polybox::{
    config::{CliArgs, RunConfig},
    pipeline,
    polybox_core::{Error, Report},
    source::HttpPolygonSource,
    telemetry::init_tracing,
};
use std::{process::ExitCode, sync::Arc};
use tokio::signal;

// Using mimalloc for better performance when many large point vectors are
// allocated and freed across worker threads.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;
const EXIT_TIMEOUT: u8 = 124;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    let (status, output) = outcome(try_main(args).await);
    if let Some(output) = output {
        println!("{output}");
    }
    ExitCode::from(status)
}

async fn try_main(args: CliArgs) -> anyhow::Result<Report> {
    let config = RunConfig::try_from(args)?;
    init_tracing()?;
    log_startup_info(&config);

    let source = HttpPolygonSource::new(config.url.clone(), config.fetch_timeout)?;

    let report = tokio::select! {
        res = pipeline::run(&config.pipeline, Arc::new(source)) => res?,
        () = interrupted() => return Err(Error::Interrupted.into()),
    };

    Ok(report)
}

fn log_startup_info(config: &RunConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting run with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Fetching {} polygons from {:?} with {} workers",
            config.pipeline.polygons,
            config.url,
            config.pipeline.workers
        );
    }
}

/// Maps the run result to an exit status and the text for stdout.
///
/// Only a completed run produces output; every error is reported on stderr.
fn outcome(res: anyhow::Result<Report>) -> (u8, Option<String>) {
    let err = match res.and_then(|report| Ok(serde_json::to_string_pretty(&report)?)) {
        Ok(output) => return (EXIT_SUCCESS, Some(output)),
        Err(e) => e,
    };

    eprintln!("Error: {err:#}");
    (exit_status(&err), None)
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(Error::DeadlineExceeded { .. }) => EXIT_TIMEOUT,
        Some(Error::Interrupted) => EXIT_INTERRUPTED,
        _ => EXIT_FAILURE,
    }
}

async fn interrupted() {
    if let Err(_e) = signal::ctrl_c().await {
        tracing::warn!("Failed to install Ctrl+C handler: {_e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use polybox::polybox_core::{BoundingBox, PolygonError};

    #[test]
    fn completed_run_prints_report() {
        let report = Report {
            bbox: Some(BoundingBox::new(0, 0, 10, 10)),
            max_weight: 109.0,
            heavy_polygons: Vec::new(),
        };

        let (status, output) = outcome(Ok(report.clone()));
        assert_eq!(status, EXIT_SUCCESS);
        let printed: Report = serde_json::from_str(&output.unwrap()).unwrap();
        assert_eq!(printed, report);
    }

    #[test]
    fn timeout_exits_124_without_output() {
        let err = Error::DeadlineExceeded {
            timeout: Duration::from_secs(1),
        };
        assert_eq!(outcome(Err(err.into())), (EXIT_TIMEOUT, None));
    }

    #[test]
    fn polygon_failure_exits_1_without_output() {
        let err = Error::Polygon {
            index: 1,
            source: PolygonError::Status { status: 500 },
        };
        assert_eq!(outcome(Err(err.into())), (EXIT_FAILURE, None));
    }

    #[test]
    fn interrupt_exits_130_without_output() {
        assert_eq!(
            outcome(Err(Error::Interrupted.into())),
            (EXIT_INTERRUPTED, None)
        );
    }

    #[test]
    fn other_errors_exit_1() {
        let incomplete = Error::Incomplete {
            processed: 1,
            total: 3,
        };
        assert_eq!(outcome(Err(incomplete.into())), (EXIT_FAILURE, None));
        assert_eq!(
            outcome(Err(anyhow::anyhow!("invalid config"))),
            (EXIT_FAILURE, None)
        );
    }

    #[test]
    fn context_does_not_hide_the_run_error() {
        let err = anyhow::Error::from(Error::DeadlineExceeded {
            timeout: Duration::from_secs(1),
        })
        .context("run failed");
        assert_eq!(exit_status(&err), EXIT_TIMEOUT);
    }
}
