//! Autotile IPC Protocol
//!
//! Shared types for daemon-CLI communication over a Unix domain socket.
//! Messages are line-delimited JSON in both directions; notifications use
//! the same framing on subscriber connections.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use autotile_core::{AutotileConfig, InsertPosition, Rect, WindowId};

/// Socket file name, placed under `$XDG_RUNTIME_DIR` (or `/tmp`).
pub const SOCKET_FILE_NAME: &str = "autotile.sock";

/// Upper bound on a single line-delimited message, in bytes.
pub const MAX_IPC_MESSAGE_SIZE: usize = 64 * 1024;

/// Resolve the daemon socket path for the current user.
pub fn socket_path() -> PathBuf {
    let dir = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    dir.join(SOCKET_FILE_NAME)
}

/// Errors produced while framing or parsing protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A message exceeded [`MAX_IPC_MESSAGE_SIZE`].
    #[error("message of {0} bytes exceeds the {MAX_IPC_MESSAGE_SIZE} byte limit")]
    MessageTooLarge(usize),
    /// The payload was not valid JSON for the expected type.
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize a message as a single JSON line, enforcing the size limit.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(message)?;
    if line.len() >= MAX_IPC_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge(line.len()));
    }
    line.push('\n');
    Ok(line)
}

/// Parse a single line received from the socket.
pub fn decode_line<T: for<'de> Deserialize<'de>>(line: &str) -> Result<T, ProtocolError> {
    if line.len() > MAX_IPC_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge(line.len()));
    }
    Ok(serde_json::from_str(line.trim())?)
}

/// Commands that can be sent to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcCommand {
    /// A window appeared and should be managed.
    WindowOpened {
        /// Window identifier.
        window: WindowId,
        /// Screen the window opened on.
        screen: String,
        /// Minimum width reported by the window, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_width: Option<i32>,
        /// Minimum height reported by the window, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_height: Option<i32>,
    },
    /// A managed window went away.
    WindowClosed { window: WindowId },
    /// Focus moved to the given window.
    WindowFocused {
        window: WindowId,
        /// Screen the window is on; omitted when the sender does not know.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        screen: Option<String>,
    },
    /// A screen's usable geometry changed.
    ScreenGeometryChanged { screen: String, geometry: Rect },
    /// Start tiling the given screen.
    EnableScreen { screen: String, geometry: Rect },
    /// Stop tiling the given screen and release its windows.
    DisableScreen { screen: String },

    /// Switch the active tiling algorithm.
    SetAlgorithm { algorithm: String },
    /// Set the master/stack split ratio on all screens.
    SetSplitRatio { ratio: f64 },
    /// Set the master window count on all screens.
    SetMasterCount { count: usize },
    /// Set the gap between adjacent zones.
    SetInnerGap { gap: i32 },
    /// Set the gap between zones and the screen edge.
    SetOuterGap { gap: i32 },
    /// Choose where newly opened windows are inserted.
    SetInsertPosition { position: InsertPosition },
    /// Toggle focusing windows as they open.
    SetFocusNewWindows { enabled: bool },
    /// Toggle focus following the mouse pointer.
    SetFocusFollowsMouse { enabled: bool },
    /// Toggle hiding non-focused windows in monocle.
    SetMonocleHideOthers { enabled: bool },
    /// Toggle the tab-bar hint for monocle clients.
    SetMonocleShowTabs { enabled: bool },
    /// Toggle suppressing gaps for a lone window.
    SetSmartGaps { enabled: bool },
    /// Toggle honoring window minimum sizes.
    SetRespectMinimumSize { enabled: bool },

    /// Swap the positions of two windows.
    SwapWindows { first: WindowId, second: WindowId },
    /// Move a window into the master zone.
    PromoteToMaster {
        /// Window to promote; defaults to the focused window.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<WindowId>,
    },
    /// Move a window out of the master area into the stack.
    DemoteFromMaster {
        /// Window to demote; defaults to the focused window.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<WindowId>,
    },
    /// Swap the focused window with the current master.
    SwapWithMaster,
    /// Focus the master window on the active screen.
    FocusMaster,
    /// Focus the next tiled window in order.
    FocusNext,
    /// Focus the previous tiled window in order.
    FocusPrevious,
    /// Rotate the tiled window order by one position.
    RotateWindows { clockwise: bool },

    /// Toggle a window between tiled and floating.
    ToggleFloating { window: WindowId },
    /// Float a window, removing it from the layout.
    FloatWindow { window: WindowId },
    /// Return a floating window to the layout.
    UnfloatWindow { window: WindowId },

    /// Grow the split ratio by a delta.
    IncreaseRatio { delta: f64 },
    /// Shrink the split ratio by a delta.
    DecreaseRatio { delta: f64 },
    /// Add one window to the master area.
    IncreaseMasterCount,
    /// Remove one window from the master area.
    DecreaseMasterCount,

    /// Recompute the layout for one screen, or all screens.
    Retile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        screen: Option<String>,
    },

    /// Query the tiling state of a screen (active screen by default).
    QueryState {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        screen: Option<String>,
    },
    /// Query the effective configuration.
    QueryConfig,
    /// Query the most recent zone geometry for a screen.
    QueryZones { screen: String },
    /// List the registered tiling algorithms.
    QueryAlgorithms,

    /// Turn this connection into a notification stream.
    Subscribe,
    /// Reload configuration from file.
    Reload,
    /// Stop the daemon.
    Stop,
}

/// A window paired with the zone it was assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneAssignment {
    /// The window occupying the zone.
    pub window: WindowId,
    /// Zone geometry in screen coordinates.
    pub zone: Rect,
}

/// Summary of one registered algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmInfo {
    /// Stable identifier used in commands and configuration.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
}

/// Responses from the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IpcResponse {
    /// Command executed successfully.
    Ok,
    /// Command failed with an error.
    Error {
        /// Error message describing what went wrong.
        message: String,
    },
    /// Tiling state query response.
    ScreenState {
        /// Screen this state belongs to.
        screen: String,
        /// Active algorithm identifier.
        algorithm: String,
        /// Managed windows in layout order.
        windows: Vec<WindowId>,
        /// Windows currently floating.
        floating: Vec<WindowId>,
        /// Focused window, if any.
        focused: Option<WindowId>,
        /// Number of windows in the master area.
        master_count: usize,
        /// Master/stack split ratio.
        split_ratio: f64,
    },
    /// Configuration query response.
    Config {
        /// The daemon's effective configuration.
        config: AutotileConfig,
    },
    /// Zone geometry query response.
    Zones {
        /// Screen the zones belong to.
        screen: String,
        /// Windows and their assigned zones, in layout order.
        zones: Vec<ZoneAssignment>,
    },
    /// Algorithm listing response.
    Algorithms {
        /// Registered algorithms, sorted by id.
        algorithms: Vec<AlgorithmInfo>,
    },
    /// The connection is now a notification stream.
    Subscribed,
}

impl IpcResponse {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Events pushed to subscribed connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// Windows on a screen were assigned new zones.
    WindowsTiled {
        /// Screen that was retiled.
        screen: String,
        /// Windows and their zones, in layout order.
        zones: Vec<ZoneAssignment>,
    },
    /// Windows were released from tiling management.
    WindowsReleased {
        /// The released windows.
        windows: Vec<WindowId>,
    },
    /// Monocle visibility changed: show one window, hide the rest.
    MonocleVisibility {
        /// Window that should be visible.
        show: WindowId,
        /// Windows that should be hidden.
        hide: Vec<WindowId>,
    },
    /// Outcome of a user-initiated window operation.
    Feedback {
        /// Whether the operation changed anything.
        succeeded: bool,
        /// Name of the operation, e.g. `swap_windows`.
        action: String,
        /// Reason the operation was a no-op, when it failed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Zone index the operation started from, when applicable.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_zone: Option<usize>,
        /// Zone index the operation targeted, when applicable.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_zone: Option<usize>,
        /// Screen the operation applied to.
        screen: String,
    },
    /// The daemon wants focus moved to a window.
    FocusWindow {
        /// Window to focus.
        window: WindowId,
    },
}
