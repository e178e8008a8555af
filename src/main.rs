//! Upstream proxy
//!
//! A streaming reverse proxy in front of one upstream server, which it can
//! also launch and supervise.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http server ──▶ rewrite policy ──▶ upstream pool ──▶ Upstream
//!            ◀── RelayBody  ◀─────────────────────────────────────────┘
//!
//!     supervisor ──launch/monitor──▶ Upstream process
//!         │ exit + grace period
//!         ▼
//!     shutdown coordinator ──▶ drain ──▶ stop upstream ──▶ exit
//!
//!     admin listener: /livez /readyz /status ──▶ health prober
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use upstream_proxy::config::resolve_config;
use upstream_proxy::lifecycle::run;
use upstream_proxy::observability::init_logging;

#[derive(Parser)]
#[command(name = "upstream-proxy")]
#[command(about = "Streaming reverse proxy with upstream process supervision", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the upstream base URL
    #[arg(long)]
    upstream: Option<String>,

    /// Do not launch the upstream; proxy to an externally managed one
    #[arg(long)]
    no_supervisor: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(cli.config.as_deref(), |config| {
        if let Some(bind) = cli.bind {
            config.listener.bind_address = bind;
        }
        if let Some(upstream) = cli.upstream {
            config.upstream.base_url = upstream;
        }
        if cli.no_supervisor {
            config.supervisor.enabled = false;
        }
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("upstream-proxy: {e}");
            return ExitCode::from(2);
        }
    };

    init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        supervised = config.supervisor.enabled,
        "upstream-proxy starting"
    );

    match run(config).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
