use clap::{Parser, Subcommand};

/// Fuse Broker - Fuse Online as a managed service on OpenShift
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Run the service broker API
    Serve {
        /// API port (default: SERVER_PORT or 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Provision a Fuse instance directly against the cluster
    Deploy {
        /// Instance id; resources land in namespace "fuse-<instance-id>"
        instance_id: String,

        /// User the instance is created for
        #[arg(short, long)]
        user: String,

        /// Namespace the request originates from
        #[arg(long, default_value = "")]
        namespace: String,

        /// Maximum number of integrations (default: 0)
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Remove a Fuse instance
    Remove {
        /// Instance id
        instance_id: String,
    },

    /// Show the status of the last operation on an instance
    Status {
        /// Instance id
        instance_id: String,

        /// Operation to check ("deploy" or "remove")
        #[arg(short, long, default_value = "deploy")]
        operation: String,
    },
}
