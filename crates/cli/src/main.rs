//! autotile CLI
//!
//! Command-line interface for controlling the autotile daemon.
//!
//! Commands are sent to the daemon as single JSON lines over its Unix
//! socket; responses are printed as pretty JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use autotile_core::{InsertPosition, Rect};
use autotile_ipc::{encode_line, socket_path, IpcCommand, IpcResponse};

#[derive(Parser)]
#[command(name = "autotile")]
#[command(author, version, about = "Control the autotile daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Focus commands
    Focus {
        #[command(subcommand)]
        target: FocusTarget,
    },
    /// Swap two windows, or the focused window with the master
    Swap {
        /// First window id (omit both to swap focused with master)
        first: Option<String>,
        /// Second window id
        second: Option<String>,
    },
    /// Rotate the tiled window order
    Rotate {
        /// Rotate counter-clockwise instead
        #[arg(long)]
        counter: bool,
    },
    /// Move a window into the master area
    Promote {
        /// Window id (defaults to the focused window)
        window: Option<String>,
    },
    /// Move a window out of the master area
    Demote {
        /// Window id (defaults to the focused window)
        window: Option<String>,
    },
    /// Toggle a window between tiled and floating
    Toggle { window: String },
    /// Float a window, removing it from the layout
    Float { window: String },
    /// Return a floating window to the layout
    Unfloat { window: String },
    /// Set or adjust the master/stack split ratio
    Ratio {
        #[command(subcommand)]
        op: RatioOp,
    },
    /// Set or adjust the master window count
    Master {
        #[command(subcommand)]
        op: MasterOp,
    },
    /// Switch the tiling algorithm
    Algorithm { id: String },
    /// Set the gap sizes
    Gaps {
        /// Gap between adjacent zones
        #[arg(long)]
        inner: Option<i32>,
        /// Gap between zones and the screen edge
        #[arg(long)]
        outer: Option<i32>,
    },
    /// Choose where new windows are inserted
    InsertPosition {
        #[arg(value_enum)]
        position: InsertPositionArg,
    },
    /// Enable tiling on a screen
    Enable {
        screen: String,
        /// Geometry as x,y,width,height
        #[arg(long, value_parser = parse_rect)]
        geometry: Rect,
    },
    /// Disable tiling on a screen
    Disable { screen: String },
    /// Recompute the layout
    Retile {
        /// Screen to retile (all screens when omitted)
        screen: Option<String>,
    },
    /// Query daemon state
    Query {
        #[command(subcommand)]
        what: QueryType,
    },
    /// Stream notifications to stdout
    Listen,
    /// Reload configuration
    Reload,
    /// Stop the daemon
    Stop,
}

#[derive(Subcommand)]
enum FocusTarget {
    /// Focus the master window
    Master,
    /// Focus the next tiled window
    Next,
    /// Focus the previous tiled window
    Prev,
}

#[derive(Subcommand)]
enum RatioOp {
    /// Set the ratio to an absolute value
    Set { ratio: f64 },
    /// Grow the master area
    Grow {
        #[arg(short, long, default_value = "0.05")]
        delta: f64,
    },
    /// Shrink the master area
    Shrink {
        #[arg(short, long, default_value = "0.05")]
        delta: f64,
    },
}

#[derive(Subcommand)]
enum MasterOp {
    /// Set the master count to an absolute value
    Set { count: usize },
    /// Add one window to the master area
    Grow,
    /// Remove one window from the master area
    Shrink,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum InsertPositionArg {
    End,
    AfterFocused,
    AsMaster,
}

impl From<InsertPositionArg> for InsertPosition {
    fn from(arg: InsertPositionArg) -> Self {
        match arg {
            InsertPositionArg::End => InsertPosition::End,
            InsertPositionArg::AfterFocused => InsertPosition::AfterFocused,
            InsertPositionArg::AsMaster => InsertPosition::AsMaster,
        }
    }
}

#[derive(Subcommand)]
enum QueryType {
    /// Tiling state of a screen (active screen by default)
    State { screen: Option<String> },
    /// The daemon's effective configuration
    Config,
    /// Most recent zone geometry for a screen
    Zones { screen: String },
    /// Registered tiling algorithms
    Algorithms,
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<i32> = s
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid geometry '{s}': {e}"))?;
    match parts.as_slice() {
        [x, y, width, height] => Ok(Rect::new(*x, *y, *width, *height)),
        _ => Err(format!("expected x,y,width,height, got '{s}'")),
    }
}

fn build_command(command: Commands) -> Result<IpcCommand> {
    Ok(match command {
        Commands::Focus { target } => match target {
            FocusTarget::Master => IpcCommand::FocusMaster,
            FocusTarget::Next => IpcCommand::FocusNext,
            FocusTarget::Prev => IpcCommand::FocusPrevious,
        },
        Commands::Swap { first, second } => match (first, second) {
            (Some(first), Some(second)) => IpcCommand::SwapWindows { first, second },
            (None, None) => IpcCommand::SwapWithMaster,
            _ => anyhow::bail!("swap takes either two window ids or none"),
        },
        Commands::Rotate { counter } => IpcCommand::RotateWindows {
            clockwise: !counter,
        },
        Commands::Promote { window } => IpcCommand::PromoteToMaster { window },
        Commands::Demote { window } => IpcCommand::DemoteFromMaster { window },
        Commands::Toggle { window } => IpcCommand::ToggleFloating { window },
        Commands::Float { window } => IpcCommand::FloatWindow { window },
        Commands::Unfloat { window } => IpcCommand::UnfloatWindow { window },
        Commands::Ratio { op } => match op {
            RatioOp::Set { ratio } => IpcCommand::SetSplitRatio { ratio },
            RatioOp::Grow { delta } => IpcCommand::IncreaseRatio { delta },
            RatioOp::Shrink { delta } => IpcCommand::DecreaseRatio { delta },
        },
        Commands::Master { op } => match op {
            MasterOp::Set { count } => IpcCommand::SetMasterCount { count },
            MasterOp::Grow => IpcCommand::IncreaseMasterCount,
            MasterOp::Shrink => IpcCommand::DecreaseMasterCount,
        },
        Commands::Algorithm { id } => IpcCommand::SetAlgorithm { algorithm: id },
        Commands::Gaps { inner, outer } => match (inner, outer) {
            (Some(gap), None) => IpcCommand::SetInnerGap { gap },
            (None, Some(gap)) => IpcCommand::SetOuterGap { gap },
            _ => anyhow::bail!("gaps takes exactly one of --inner or --outer"),
        },
        Commands::InsertPosition { position } => IpcCommand::SetInsertPosition {
            position: position.into(),
        },
        Commands::Enable { screen, geometry } => IpcCommand::EnableScreen { screen, geometry },
        Commands::Disable { screen } => IpcCommand::DisableScreen { screen },
        Commands::Retile { screen } => IpcCommand::Retile { screen },
        Commands::Query { what } => match what {
            QueryType::State { screen } => IpcCommand::QueryState { screen },
            QueryType::Config => IpcCommand::QueryConfig,
            QueryType::Zones { screen } => IpcCommand::QueryZones { screen },
            QueryType::Algorithms => IpcCommand::QueryAlgorithms,
        },
        Commands::Listen => IpcCommand::Subscribe,
        Commands::Reload => IpcCommand::Reload,
        Commands::Stop => IpcCommand::Stop,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let listen = matches!(cli.command, Commands::Listen);
    let cmd = build_command(cli.command)?;

    let path = socket_path();
    let stream = UnixStream::connect(&path)
        .await
        .with_context(|| format!("connecting to daemon at {}", path.display()))?;
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    write_half.write_all(encode_line(&cmd)?.as_bytes()).await?;

    let response_line = lines
        .next_line()
        .await?
        .context("daemon closed the connection without responding")?;
    let response: IpcResponse = serde_json::from_str(&response_line)
        .with_context(|| format!("unexpected response: {response_line}"))?;

    if let IpcResponse::Error { message } = &response {
        anyhow::bail!("daemon error: {message}");
    }
    println!("{}", serde_json::to_string_pretty(&response)?);

    if listen {
        // The connection is now a notification stream; print until the
        // daemon goes away.
        while let Some(line) = lines.next_line().await? {
            println!("{line}");
        }
    }
    Ok(())
}
