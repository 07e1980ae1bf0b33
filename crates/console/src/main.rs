mod print;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use micro_forwarder::acceptor::ConnectionAcceptor;
use micro_forwarder::config::{DEFAULT_IO_CHUNK_SIZE, ForwarderConfig};
use micro_forwarder::engine::ForwardingEngine;
use micro_forwarder::error::ConfigError;
use micro_forwarder::upstream::TlsVersionPolicy;
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

use crate::print::{ConsolePrinter, USAGE_EXAMPLE, write_usage_error};

/// Forwards every HTTP request it receives to one upstream server and prints the traffic.
#[derive(Parser, Debug)]
#[command(name = "forwarder", version, about, long_about = None, after_help = USAGE_EXAMPLE)]
struct Cli {
    /// Port to listen on
    port: u32,

    /// Url to forward to
    url: String,

    /// TLS versions offered to https upstreams: default, 1.2 or 1.3
    #[arg(long, default_value_t = TlsVersionPolicy::Default)]
    tls_version: TlsVersionPolicy,

    /// Bytes per socket read and write
    #[arg(long, default_value_t = DEFAULT_IO_CHUNK_SIZE)]
    io_chunk_size: usize,

    /// Rewrite http://<ip>:<port> urls in request bodies to the upstream origin
    #[arg(long)]
    rewrite_body_urls: bool,

    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

impl Cli {
    fn config(&self) -> Result<ForwarderConfig, ConfigError> {
        Ok(ForwarderConfig::new(self.port, &self.url)?
            .with_io_chunk_size(self.io_chunk_size)?
            .with_tls_policy(self.tls_version)
            .with_rewrite_body_urls(self.rewrite_body_urls))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(cli.log_level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            let _ = write_usage_error(&mut io::stderr(), e);
            return ExitCode::FAILURE;
        }
    };

    let engine = match ForwardingEngine::with_tcp_connector(config, ConsolePrinter::stdout()) {
        Ok(engine) => engine,
        Err(e) => {
            error!(cause = %e, "tls setup error");
            return ExitCode::FAILURE;
        }
    };

    let acceptor = match ConnectionAcceptor::bind(engine).await {
        Ok(acceptor) => acceptor,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return ExitCode::FAILURE;
        }
    };

    acceptor.run().await;
    ExitCode::SUCCESS
}
