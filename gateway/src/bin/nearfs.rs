use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use nearfs_castore::blockservice::{self, BlockService};
use nearfs_castore::import::import_archive;
use nearfs_gateway::AppState;
use nearfs_tracing::TracingHandle;
use tracing::{info, instrument, Level, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Serve content-addressed archives over an IPFS-style HTTP gateway.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Default log level. RUST_LOG takes precedence.
    #[arg(long, env, default_value_t = Level::INFO)]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the HTTP gateway.
    Daemon {
        #[arg(long, env, default_value = "sled:///var/lib/nearfs/blocks.sled")]
        block_service_addr: String,

        /// The address to listen on.
        #[clap(flatten)]
        listen_args: tokio_listener::ListenerAddressLFlag,
    },
    /// Imports CAR files into the block store (not using the daemon).
    Import {
        #[clap(value_name = "FILE", required = true)]
        paths: Vec<PathBuf>,

        #[arg(long, env, default_value = "sled:///var/lib/nearfs/blocks.sled")]
        block_service_addr: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let tracing_handle = {
        let mut builder = nearfs_tracing::TracingBuilder::default().level(cli.log_level);
        if matches!(cli.command, Commands::Import { .. }) {
            builder = builder.enable_progressbar();
        }
        builder.build()?
    };

    match cli.command {
        Commands::Daemon {
            block_service_addr,
            listen_args,
        } => {
            let block_service: Arc<dyn BlockService> =
                blockservice::from_addr(&block_service_addr).await?.into();

            let app = nearfs_gateway::gen_router().with_state(AppState::new(block_service));

            let listen_address = &listen_args.listen_address.unwrap_or_else(|| {
                "[::]:3000"
                    .parse()
                    .expect("invalid fallback listen address")
            });

            let listener = tokio_listener::Listener::bind(
                listen_address,
                &Default::default(),
                &listen_args.listener_options,
            )
            .await?;

            info!(listen_address=%listen_address, "starting daemon");

            tokio_listener::axum07::serve(
                listener,
                app.into_make_service_with_connect_info::<tokio_listener::SomeSocketAddrClonable>(),
            )
            .await?;
        }
        Commands::Import {
            paths,
            block_service_addr,
        } => {
            let block_service: Arc<dyn BlockService> =
                blockservice::from_addr(&block_service_addr).await?.into();

            import_files(block_service, paths, &tracing_handle).await?;
        }
    }

    Ok(())
}

/// Imports each archive in turn, printing its root and block count.
#[instrument(skip_all, fields(indicatif.pb_show = 1))]
async fn import_files(
    block_service: Arc<dyn BlockService>,
    paths: Vec<PathBuf>,
    tracing_handle: &TracingHandle,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let span = Span::current();
    span.pb_set_style(&nearfs_tracing::PB_PROGRESS_STYLE);
    span.pb_set_length(paths.len() as u64);
    span.pb_set_message("Importing archives");
    span.pb_start();

    let mut stdout = tracing_handle.get_stdout_writer();
    for path in paths {
        let data = tokio::fs::read(&path).await?;
        let (root, count) = import_archive(block_service.clone(), data.into())
            .await
            .map_err(|e| format!("unable to import {}: {}", path.display(), e))?;

        writeln!(stdout, "{} {}", root, count)?;
        span.pb_inc(1);
    }

    Ok(())
}
