use crate::{pipeline::PipelineConfig, source::UrlTemplate};
use anyhow::bail;
use clap::Parser;
use core::{num::NonZeroUsize, time::Duration};
use polybox_core::DEFAULT_POLL_INTERVAL;
use tokio::sync::Semaphore;

/// Longest accepted `TIMEOUT` and `FETCH_TIMEOUT`: one year.
pub const MAX_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;

/// Largest accepted `POLYGONS_NUM` and `OUTCOME_BUFFER`, bounded by the
/// capacity of a Tokio channel.
pub const MAX_CHANNEL_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// Runtime configuration for the `polybox` binary.
///
/// These settings control how many polygons are fetched, where they are
/// fetched from, how much concurrency is used and how long the whole run may
/// take. All values are parsed from CLI arguments or environment variables
/// (a `.env` file is honored), with defaults suitable for a local endpoint.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "polybox",
    version,
    about = "Fetches weighted polygons in parallel and reports their bounding box, max weight and heavy polygons"
)]
pub struct CliArgs {
    /// Maximum wall-clock time for the whole run, in seconds.
    ///
    /// When it elapses every worker stops, in-flight requests are dropped and
    /// the process exits with status 124 without printing a result.
    ///
    /// Environment variable: `TIMEOUT`
    #[arg(long, env = "TIMEOUT", default_value_t = 60)]
    pub timeout: u64,

    /// Number of polygons to fetch. Indices `0..polygons_num` are dispatched.
    ///
    /// Environment variable: `POLYGONS_NUM`
    #[arg(long, env = "POLYGONS_NUM", default_value_t = 3)]
    pub polygons_num: usize,

    /// Polygon endpoint.
    ///
    /// Every `{index}` in the value is replaced with the polygon index, e.g.
    /// "http://localhost:8080/polygon/{index}" or
    /// "http://localhost:8080/polygon?id={index}". Without the placeholder the
    /// same URL is requested for every index.
    ///
    /// Environment variable: `POLYGON_URL`
    #[arg(long, env = "POLYGON_URL", default_value_t = String::from("http://localhost:8080/polygon"))]
    pub url: String,

    /// Number of concurrent fetch-and-reduce workers.
    ///
    /// Defaults to the number of available CPUs.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = num_cpus::get())]
    pub workers: usize,

    /// Per-request timeout, in seconds. Clamped to `timeout`.
    ///
    /// Environment variable: `FETCH_TIMEOUT`
    #[arg(long, env = "FETCH_TIMEOUT", default_value_t = 30)]
    pub fetch_timeout: u64,

    /// Capacity of the channel between workers and the aggregator.
    ///
    /// Environment variable: `OUTCOME_BUFFER`
    #[arg(long, env = "OUTCOME_BUFFER", default_value_t = 100)]
    pub outcome_buffer: usize,

    /// Number of points reduced between two deadline checks.
    ///
    /// Environment variable: `POLL_INTERVAL`
    #[arg(long, env = "POLL_INTERVAL", default_value_t = DEFAULT_POLL_INTERVAL.get())]
    pub poll_interval: usize,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub pipeline: PipelineConfig,
    pub url: UrlTemplate,
    pub fetch_timeout: Duration,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.timeout == 0 {
            bail!("TIMEOUT must be greater than 0");
        }

        if args.timeout > MAX_TIMEOUT_SECS {
            bail!("TIMEOUT must be at most {MAX_TIMEOUT_SECS} seconds");
        }

        if args.fetch_timeout > MAX_TIMEOUT_SECS {
            bail!("FETCH_TIMEOUT must be at most {MAX_TIMEOUT_SECS} seconds");
        }

        if args.polygons_num == 0 {
            bail!("POLYGONS_NUM must be greater than 0");
        }

        if args.polygons_num > MAX_CHANNEL_CAPACITY {
            bail!("POLYGONS_NUM must be at most {MAX_CHANNEL_CAPACITY}");
        }

        if args.workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.outcome_buffer == 0 {
            bail!("OUTCOME_BUFFER must be greater than 0");
        }

        if args.outcome_buffer > MAX_CHANNEL_CAPACITY {
            bail!("OUTCOME_BUFFER must be at most {MAX_CHANNEL_CAPACITY}");
        }

        let Some(poll_interval) = NonZeroUsize::new(args.poll_interval) else {
            bail!("POLL_INTERVAL must be greater than 0");
        };

        let url = UrlTemplate::parse(&args.url)?;
        let timeout = Duration::from_secs(args.timeout);
        let fetch_timeout = Duration::from_secs(args.fetch_timeout.max(1)).min(timeout);

        Ok(Self {
            pipeline: PipelineConfig {
                polygons: args.polygons_num,
                workers: args.workers,
                timeout,
                outcome_buffer: args.outcome_buffer,
                poll_interval,
            },
            url,
            fetch_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> anyhow::Result<RunConfig> {
        let args = CliArgs::try_parse_from(
            ["polybox", "--url", "http://127.0.0.1:8080/polygon/{index}"]
                .iter()
                .chain(extra),
        )?;
        RunConfig::try_from(args)
    }

    #[test]
    fn defaults_are_valid() {
        let config = parse(&["--workers", "4"]).unwrap();
        assert_eq!(config.pipeline.polygons, 3);
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.pipeline.timeout, Duration::from_secs(60));
        assert_eq!(config.pipeline.outcome_buffer, 100);
        assert_eq!(config.pipeline.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn fetch_timeout_is_clamped_to_run_timeout() {
        let config = parse(&["--timeout", "5", "--fetch-timeout", "30"]).unwrap();
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_zero_values() {
        assert!(parse(&["--timeout", "0"]).is_err());
        assert!(parse(&["--polygons-num", "0"]).is_err());
        assert!(parse(&["--workers", "0"]).is_err());
        assert!(parse(&["--outcome-buffer", "0"]).is_err());
        assert!(parse(&["--poll-interval", "0"]).is_err());
    }

    #[test]
    fn rejects_values_past_runtime_limits() {
        let too_many = (MAX_CHANNEL_CAPACITY + 1).to_string();
        let max_usize = usize::MAX.to_string();
        let too_long = (MAX_TIMEOUT_SECS + 1).to_string();
        let max_u64 = u64::MAX.to_string();

        assert!(parse(&["--polygons-num", &too_many]).is_err());
        assert!(parse(&["--polygons-num", &max_usize]).is_err());
        assert!(parse(&["--outcome-buffer", &max_usize]).is_err());
        assert!(parse(&["--timeout", &too_long]).is_err());
        assert!(parse(&["--timeout", &max_u64]).is_err());
        assert!(parse(&["--fetch-timeout", &max_u64]).is_err());
    }

    #[test]
    fn accepts_values_at_runtime_limits() {
        let max_channel = MAX_CHANNEL_CAPACITY.to_string();
        let max_timeout = MAX_TIMEOUT_SECS.to_string();

        let config = parse(&[
            "--polygons-num",
            &max_channel,
            "--outcome-buffer",
            &max_channel,
            "--timeout",
            &max_timeout,
        ])
        .unwrap();
        assert_eq!(config.pipeline.polygons, MAX_CHANNEL_CAPACITY);
        assert_eq!(config.pipeline.timeout, Duration::from_secs(MAX_TIMEOUT_SECS));
    }

    #[test]
    fn rejects_relative_url() {
        let args = CliArgs::try_parse_from(["polybox", "--url", "/polygon"]).unwrap();
        assert!(RunConfig::try_from(args).is_err());
    }
}
