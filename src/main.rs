// src/main.rs
// netprobe - ping/traceroute execution and SSE streaming server

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use netprobe::api;
use netprobe::api::validate::check_target;
use netprobe::config::ServerConfig;
use netprobe::diagnostic::{
    DiagnosticEvent, DiagnosticRequest, DiagnosticRun, DEFAULT_MAX_HOPS, DEFAULT_PING_COUNT,
};
use netprobe::logging;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Parser)]
#[command(name = "netprobe")]
#[command(about = "Run ping and traceroute, streamed as normalized events")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP/SSE server (default)
    Serve {
        /// Address to bind
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Ping a host locally and print the events
    Ping {
        /// IPv4 address or domain name
        host: String,

        /// Number of echo requests
        #[arg(short, long, default_value_t = DEFAULT_PING_COUNT, value_parser = clap::value_parser!(u32).range(1..=10))]
        count: u32,

        /// Print one JSON event per line
        #[arg(long)]
        json: bool,
    },

    /// Trace the route to a host locally and print the events
    Trace {
        /// IPv4 address or domain name
        host: String,

        /// Maximum number of hops
        #[arg(short, long, default_value_t = DEFAULT_MAX_HOPS, value_parser = clap::value_parser!(u32).range(1..=30))]
        max_hops: u32,

        /// Print one JSON event per line
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            let mut config = ServerConfig::from_env();
            logging::init(config.log_format);

            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            config.log_status();

            api::serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ping { host, count, json } => {
            logging::init_cli();
            check_target(&host)?;
            run_once(DiagnosticRequest::ping(host, Some(count)), json).await
        }
        Commands::Trace {
            host,
            max_hops,
            json,
        } => {
            logging::init_cli();
            check_target(&host)?;
            run_once(DiagnosticRequest::traceroute(host, Some(max_hops)), json).await
        }
    }
}

/// Run one diagnostic on this machine, printing events as they arrive
async fn run_once(request: DiagnosticRequest, json: bool) -> Result<ExitCode> {
    let (tx, mut rx) = mpsc::channel(100);
    let cancel = CancellationToken::new();

    let run = DiagnosticRun::new(request).with_origin("local");
    let task = tokio::spawn(run.execute(tx, cancel.clone()));

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupted, cancelling diagnostic");
                cancel.cancel();
            }
        })
    };

    while let Some(event) = rx.recv().await {
        print_event(&event, json)?;
    }

    let outcome = task.await.context("Diagnostic task failed")?;
    interrupt.abort();

    Ok(if outcome.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_event(event: &DiagnosticEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else if matches!(event, DiagnosticEvent::Error { .. }) {
        eprintln!("{}", event.message());
    } else {
        println!("{}", event.message());
    }
    Ok(())
}
