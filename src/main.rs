//! ndm-export
//!
//! Replays recorded probe observations for one node, correlates them into
//! disks and prints the resulting Disk resources, or applies them to the
//! cluster with `--apply`. `--print-crd` prints the Disk
//! CustomResourceDefinition instead.

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use node_disk_manager::export::{self, KubePublisher, KubePublisherConfig};
use node_disk_manager::{
    Disk, DiskPublisher, DiskRegistry, ExportConfig, OutputFormat, Result,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Node Disk Manager - export correlated disks as Disk resources
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Observation log to replay (YAML, or JSON with a .json extension)
    #[arg(long, short, env = "NDM_INPUT", required_unless_present = "print_crd")]
    input: Option<PathBuf>,

    /// Print the Disk CustomResourceDefinition and exit
    #[arg(long)]
    print_crd: bool,

    /// Output format
    #[arg(long, short, env = "NDM_OUTPUT", value_enum, default_value_t = OutputFormat::Yaml)]
    output: OutputFormat,

    /// Node name recorded on disks without a reported hostname
    #[arg(long, env = "NODE_NAME")]
    node_name: Option<String>,

    /// Apply the disks to the cluster instead of printing them
    #[arg(long, env = "NDM_APPLY")]
    apply: bool,

    /// Field manager used for server-side apply
    #[arg(long, env = "NDM_FIELD_MANAGER", default_value = "node-disk-manager")]
    field_manager: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl From<&Args> for ExportConfig {
    fn from(args: &Args) -> Self {
        Self {
            input: args.input.clone().unwrap_or_default(),
            output: args.output,
            node_name: args.node_name.clone(),
            apply: args.apply,
            field_manager: args.field_manager.clone(),
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    if args.print_crd {
        print!("{}", serde_yaml::to_string(&Disk::crd()?)?);
        return Ok(());
    }

    let config = ExportConfig::from(&args);
    config.validate()?;

    info!(
        version = node_disk_manager::VERSION,
        input = %config.input.display(),
        output = %config.output,
        apply = config.apply,
        "Starting disk export"
    );

    let registry = DiskRegistry::new();
    let summary = export::replay_file(&registry, &config.input, config.node_name.as_deref())?;
    info!(
        applied = summary.applied,
        removed = summary.removed,
        rejected = summary.rejected,
        disks = registry.len(),
        "Observations replayed"
    );

    let disks = registry.export_all();

    if config.apply {
        let publisher = KubePublisher::try_default(KubePublisherConfig {
            field_manager: config.field_manager.clone(),
            node_name: config.node_name.clone(),
            ..Default::default()
        })
        .await?;
        let count = publisher.publish_all(&disks).await?;
        info!(count, "Disks applied");
    } else {
        print!("{}", export::render(&disks, config.output)?);
    }

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["kube=info", "hyper=warn", "tower=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // stdout carries the rendered disks
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
