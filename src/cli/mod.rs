//! # Command Line Interface
//!
//! Subcommands for listener, cluster, endpoint and route discovery against a
//! control plane, impersonating a proxy identified by a short tag.

pub mod config;
pub mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use crate::observability::init_logging;
use crate::xds::{
    inspect, AdsSession, ClusterCriteria, ClusterHandler, EndpointHandler, Handler,
    InspectOptions, ListenerCriteria, ListenerHandler, OutputFormat, ProxyClass, ProxyResolver,
    RouteHandler, StaticResolver,
};
use config::{resolve_settings, CliConfig};
use output::Destination;

#[derive(Parser)]
#[command(name = crate::APP_NAME)]
#[command(about = "Inspect xDS configuration served by a control plane to a proxy")]
#[command(version = crate::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Control plane address, e.g. http://localhost:15010
    #[arg(long, global = true)]
    pub xds_address: Option<String>,

    /// Pod name, optionally `pod.namespace`, or a full node id
    #[arg(short = 't', long, global = true, default_value = "")]
    pub proxy_tag: String,

    /// Proxy class: sidecar, ingress or router
    #[arg(long, global = true, default_value = "sidecar")]
    pub proxy_type: String,

    /// IP reported for the impersonated proxy
    #[arg(long, global = true)]
    pub proxy_ip: Option<String>,

    /// Keep the stream open and render every response until terminated
    #[arg(short, long, global = true)]
    pub watch: bool,

    /// Output file. Leave unset to write to stdout
    #[arg(short, long, global = true)]
    pub out: Option<PathBuf>,

    /// Output format: short, json or yaml
    #[arg(long, global = true, default_value = "short")]
    pub format: String,

    /// Connect timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show listeners (LDS)
    Lds {
        /// Show only the listener with this name (`*` or `all` for every listener)
        #[arg(short = 'r', long = "resource")]
        name: Option<String>,

        /// Filter listeners by bound address
        #[arg(short, long)]
        address: Option<String>,

        /// Filter listeners by bound port
        #[arg(long)]
        port: Option<u32>,

        /// Keep only filter chains whose destination prefixes include this address
        #[arg(long)]
        chain_address: Option<String>,

        /// Keep only filter chains matching this destination port
        #[arg(long)]
        chain_port: Option<u32>,
    },

    /// Show clusters (CDS)
    Cds {
        /// Show only the cluster with this exact name
        #[arg(short = 'r', long = "resource")]
        name: Option<String>,

        /// Filter clusters by substring of the service FQDN
        #[arg(long)]
        fqdn: Option<String>,

        /// Filter clusters by substring of the direction
        #[arg(short, long)]
        direction: Option<String>,

        /// Filter clusters by substring of the subset
        #[arg(long)]
        subset: Option<String>,

        /// Filter clusters by port
        #[arg(long)]
        port: Option<u32>,
    },

    /// Show endpoints (EDS) for the named clusters
    Eds {
        /// Cluster names to request
        #[arg(short, long = "resources")]
        resources: Vec<String>,
    },

    /// Show route configurations (RDS)
    Rds {
        /// Route configuration names to request
        #[arg(short, long = "resources")]
        resources: Vec<String>,
    },
}

impl Commands {
    /// Turn the parsed subcommand into an immutable handler.
    pub fn into_handler(self, format: OutputFormat) -> Handler {
        match self {
            Commands::Lds {
                name,
                address,
                port,
                chain_address,
                chain_port,
            } => Handler::Listener(ListenerHandler::new(
                ListenerCriteria {
                    name,
                    address,
                    port,
                    chain_address,
                    chain_port,
                },
                format,
            )),
            Commands::Cds {
                name,
                fqdn,
                direction,
                subset,
                port,
            } => Handler::Cluster(ClusterHandler::new(
                ClusterCriteria {
                    name,
                    fqdn,
                    direction,
                    subset,
                    port,
                },
                format,
            )),
            Commands::Eds { resources } => {
                Handler::Endpoint(EndpointHandler::new(resources, format))
            }
            Commands::Rds { resources } => Handler::Route(RouteHandler::new(resources, format)),
        }
    }
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let global = cli.global;

    init_logging(global.verbose);

    let config = CliConfig::load().unwrap_or_else(|e| {
        debug!(error = %e, "Ignoring unreadable config file");
        CliConfig::default()
    });
    let settings = resolve_settings(
        &config,
        global.xds_address,
        global.proxy_ip,
        global.timeout,
    );

    let format: OutputFormat = global.format.parse()?;
    let class: ProxyClass = global.proxy_type.parse()?;
    let identity = StaticResolver::new(settings.proxy_ip.as_str())
        .resolve(&global.proxy_tag, class)
        .context("Failed to resolve proxy identity")?;
    let node = identity.node();

    let handler = cli.command.into_handler(format);
    info!(
        kind = %handler.kind(),
        node_id = %node.id,
        watch = global.watch,
        "Starting discovery"
    );

    let timeout = Duration::from_secs(settings.timeout);
    let mut session = AdsSession::connect(&settings.xds_address, timeout)
        .await
        .context("Failed to open control plane session")?;
    let mut out = Destination::open(global.out.as_deref())?;

    let options = InspectOptions {
        watch: global.watch,
    };
    inspect(&mut session, &handler, &node, options, &mut out)
        .await
        .with_context(|| {
            format!(
                "{} discovery failed",
                handler.kind().short_name().to_uppercase()
            )
        })?;

    Ok(())
}
