use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod cli;
mod commands;
mod config;
mod identity;

use cli::{Args, Mode};

fn initialize_tracing() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "info,\
         fuse_broker_server=debug,\
         fuse_broker_orchestrations=debug,\
         kube=warn"
            .into()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    initialize_tracing();

    match args.mode {
        Mode::Serve { port } => commands::server::run_server(port).await,
        Mode::Deploy {
            instance_id,
            user,
            namespace,
            limit,
        } => commands::instance::run_deploy(instance_id, user, namespace, limit).await,
        Mode::Remove { instance_id } => commands::instance::run_remove(instance_id).await,
        Mode::Status {
            instance_id,
            operation,
        } => commands::instance::run_status(instance_id, operation).await,
    }
}
