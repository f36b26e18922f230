use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hangar_types::{DeployState, DevState, InfraState};

#[derive(Parser)]
#[command(
    name = "hangar",
    about = "Hangar — inspect and edit a deployment directory",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store configuration file (TOML).
    #[arg(long, global = true, conflicts_with = "dir")]
    pub config: Option<PathBuf>,

    /// Root directory of a file backend.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read or write blobs
    Blob(BlobArgs),
    /// Read or write infrastructure records
    Infra(InfraArgs),
    /// Read or write deployment records
    Deploy(DeployArgs),
    /// Read, write, or delete dev environment records
    Dev(DevArgs),
    /// Run the backend conformance suite against scratch backends
    Check,
}

#[derive(Args)]
pub struct BlobArgs {
    #[command(subcommand)]
    pub action: BlobAction,
}

#[derive(Subcommand)]
pub enum BlobAction {
    /// Write a blob to stdout or a file
    Get {
        key: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Store a file (or stdin) as a blob
    Put { key: String, file: Option<PathBuf> },
}

#[derive(Args)]
pub struct InfraArgs {
    #[command(subcommand)]
    pub action: InfraAction,
}

#[derive(Subcommand)]
pub enum InfraAction {
    Get {
        infra: String,
        #[arg(long)]
        foundation: Option<String>,
    },
    Put {
        infra: String,
        #[arg(long)]
        foundation: Option<String>,
        #[arg(long, default_value = "ready")]
        state: InfraStateArg,
        /// Output as KEY=VALUE; repeatable
        #[arg(long = "output", value_parser = parse_key_val)]
        outputs: Vec<(String, String)>,
    },
}

#[derive(Args)]
pub struct DeployArgs {
    #[command(subcommand)]
    pub action: DeployAction,
}

#[derive(Subcommand)]
pub enum DeployAction {
    Get {
        app: String,
        infra: String,
        flavor: String,
    },
    Put {
        app: String,
        infra: String,
        flavor: String,
        #[arg(long, default_value = "new")]
        state: DeployStateArg,
        #[arg(long)]
        deploy_id: Option<String>,
    },
}

#[derive(Args)]
pub struct DevArgs {
    #[command(subcommand)]
    pub action: DevAction,
}

#[derive(Subcommand)]
pub enum DevAction {
    Get {
        app: String,
    },
    Put {
        app: String,
        #[arg(long, default_value = "new")]
        state: DevStateArg,
    },
    Delete {
        app: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum InfraStateArg {
    Invalid,
    Ready,
    Partial,
}

impl From<InfraStateArg> for InfraState {
    fn from(arg: InfraStateArg) -> Self {
        match arg {
            InfraStateArg::Invalid => Self::Invalid,
            InfraStateArg::Ready => Self::Ready,
            InfraStateArg::Partial => Self::Partial,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DeployStateArg {
    New,
    Deployed,
    Failed,
    Destroyed,
}

impl From<DeployStateArg> for DeployState {
    fn from(arg: DeployStateArg) -> Self {
        match arg {
            DeployStateArg::New => Self::New,
            DeployStateArg::Deployed => Self::Deployed,
            DeployStateArg::Failed => Self::Failed,
            DeployStateArg::Destroyed => Self::Destroyed,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DevStateArg {
    New,
    Ready,
}

impl From<DevStateArg> for DevState {
    fn from(arg: DevStateArg) -> Self {
        match arg {
            DevStateArg::New => Self::New,
            DevStateArg::Ready => Self::Ready,
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
