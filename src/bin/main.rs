use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use kubewire::scan::Scanner;
use kubewire::{diff_reports, render, Report};

#[derive(Parser)]
#[command(name = "kubewire", version)]
#[command(about = "Integrity checker for Kubernetes")]
#[command(long_about = "kubewire snapshots Kubernetes resources that could impact the whole \
cluster and compares cluster states.

It detects if it is running in a Kubernetes cluster and uses the service account of the Pod \
if available. If this is not the case, it looks through the default kubectl paths for a \
kubeconfig. Either case can be overridden by setting the 'kubeconfig' flag.")]
struct Cli {
    /// Absolute path to the kubeconfig file
    #[arg(short, long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a snapshot of cluster resources and objects
    Snapshot(SnapshotArgs),

    /// Compare a baseline snapshot with another snapshot or a live cluster
    Diff(DiffArgs),

    /// List API resources
    Resources(ResourcesArgs),

    /// List API resource objects
    ResourceObjects(ResourceObjectsArgs),

    /// Print information about the remote server
    ServerInfo,
}

/// Output formats for whole documents.
#[derive(Clone, Copy, ValueEnum)]
enum DocumentFormat {
    Json,
    Yaml,
}

/// Output formats for record listings.
#[derive(Clone, Copy, ValueEnum)]
enum TableFormat {
    Wide,
    Json,
    Yaml,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Namespaces to scrape, commaseparated
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "default,kube-public,kube-system"
    )]
    namespaces: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = DocumentFormat::Yaml)]
    output: DocumentFormat,
}

#[derive(Args)]
struct DiffArgs {
    /// Baseline report in yaml format
    #[arg(short, long, default_value = "baseline.yaml")]
    baseline: PathBuf,

    /// Snapshot to read in, empty to run against the live cluster
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = TableFormat::Wide)]
    output: TableFormat,
}

#[derive(Args)]
struct ResourcesArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = TableFormat::Wide)]
    output: TableFormat,
}

#[derive(Args)]
struct ResourceObjectsArgs {
    /// Namespaces to scrape, commaseparated
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "default,kube-public,kube-system"
    )]
    namespaces: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = TableFormat::Wide)]
    output: TableFormat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(&cli.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(run(cli))
}

fn init_logger(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<()> {
    let kubeconfig = cli.kubeconfig.as_deref();

    match cli.command {
        Commands::Snapshot(args) => snapshot(kubeconfig, args).await,
        Commands::Diff(args) => diff(kubeconfig, args).await,
        Commands::Resources(args) => resources(kubeconfig, args).await,
        Commands::ResourceObjects(args) => resource_objects(kubeconfig, args).await,
        Commands::ServerInfo => server_info(kubeconfig).await,
    }
}

async fn snapshot(kubeconfig: Option<&Path>, args: SnapshotArgs) -> Result<()> {
    let scanner = Scanner::connect(kubeconfig).await?;
    let report = scanner.snapshot(&normalize(args.namespaces)).await?;

    match args.output {
        DocumentFormat::Json => print_json(&report),
        DocumentFormat::Yaml => print_yaml(&report),
    }
}

async fn diff(kubeconfig: Option<&Path>, args: DiffArgs) -> Result<()> {
    let baseline = read_report(&args.baseline)?;

    // The namespaces recorded in the baseline are used when snapshotting
    // the live cluster.
    let live = match &args.snapshot {
        Some(path) => read_report(path)?,
        None => {
            let scanner = Scanner::connect(kubeconfig).await?;
            scanner
                .snapshot(&baseline.configuration.namespaces)
                .await?
        }
    };

    let entries = diff_reports(&baseline, &live);

    match args.output {
        TableFormat::Wide => Ok(render::diff_table(io::stdout(), &entries)?),
        TableFormat::Json => print_json(&entries),
        TableFormat::Yaml => print_yaml(&entries),
    }
}

async fn resources(kubeconfig: Option<&Path>, args: ResourcesArgs) -> Result<()> {
    let scanner = Scanner::connect(kubeconfig).await?;
    let data = scanner.resources().await?;

    match args.output {
        TableFormat::Wide => Ok(render::resource_table(io::stdout(), &data)?),
        TableFormat::Json => print_json(&data),
        TableFormat::Yaml => print_yaml(&data),
    }
}

async fn resource_objects(kubeconfig: Option<&Path>, args: ResourceObjectsArgs) -> Result<()> {
    let scanner = Scanner::connect(kubeconfig).await?;
    let data = scanner
        .resource_objects(&normalize(args.namespaces))
        .await?;

    match args.output {
        TableFormat::Wide => Ok(render::resource_object_table(io::stdout(), &data)?),
        TableFormat::Json => print_json(&data),
        TableFormat::Yaml => print_yaml(&data),
    }
}

async fn server_info(kubeconfig: Option<&Path>) -> Result<()> {
    let scanner = Scanner::connect(kubeconfig).await?;
    let server = scanner.server().await?;

    println!("Host: {}, Version: {}", server.host, server.version);
    Ok(())
}

/// Drops empty namespace entries, so `-n ""` means "no namespaces".
fn normalize(mut namespaces: Vec<String>) -> Vec<String> {
    namespaces.retain(|namespace| !namespace.is_empty());
    namespaces
}

fn read_report(path: &Path) -> Result<Report> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_yaml::from_reader(file)
        .with_context(|| format!("failed to parse report {}", path.display()))
}

fn print_json<T: Serialize>(data: &T) -> Result<()> {
    serde_json::to_writer(io::stdout(), data)?;
    println!();
    Ok(())
}

fn print_yaml<T: Serialize>(data: &T) -> Result<()> {
    serde_yaml::to_writer(io::stdout(), data)?;
    Ok(())
}
