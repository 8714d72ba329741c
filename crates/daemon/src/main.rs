//! The autotile daemon.
//!
//! Owns the engine on a single event loop and speaks line-delimited JSON
//! over a Unix socket. Clients send one command per line and receive one
//! response per line; a `subscribe` command turns the connection into a
//! notification stream.

mod config;
mod debounce;
mod engine;

use std::collections::HashMap;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Level};

use autotile_core::Rect;
use autotile_ipc::{decode_line, encode_line, socket_path, IpcCommand, IpcResponse, Notification};

use config::Settings;
use engine::{AutotileEngine, ScreenSource};

/// Events feeding the daemon's single event loop.
enum DaemonEvent {
    IpcCommand {
        cmd: IpcCommand,
        responder: oneshot::Sender<IpcResponse>,
    },
    /// The settings-retile debounce deadline passed.
    DebounceTick,
    Shutdown,
}

/// Screen geometry backed by the settings file.
struct ConfiguredScreens {
    geometries: HashMap<String, Rect>,
    primary: String,
}

impl ConfiguredScreens {
    fn from_settings(settings: &Settings) -> Self {
        let geometries: HashMap<String, Rect> =
            settings.screen_geometries().into_iter().collect();
        let primary = settings
            .enabled_screens()
            .first()
            .cloned()
            .unwrap_or_default();
        Self { geometries, primary }
    }
}

impl ScreenSource for ConfiguredScreens {
    fn available_geometry(&self, screen: &str) -> Option<Rect> {
        self.geometries.get(screen).copied()
    }

    fn primary_screen(&self) -> String {
        self.primary.clone()
    }
}

fn init_tracing(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Failed to load settings: {e:#}");
        Settings::default()
    });
    init_tracing(&settings.behavior.log_level);
    for (field, message) in settings.validate() {
        warn!("Settings: {}: {}", field, message);
    }

    let mut engine = AutotileEngine::new(Box::new(ConfiguredScreens::from_settings(&settings)));
    engine.update_screen_geometries(&settings.screen_geometries());
    engine.sync_from_settings(settings.to_config(), &settings.enabled_screens());

    let path = socket_path();
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("removing stale socket {}", path.display()))?;
    }
    let listener = UnixListener::bind(&path)
        .with_context(|| format!("binding socket {}", path.display()))?;
    info!("Listening on {}", path.display());

    let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(256);
    let (notify_tx, _) = broadcast::channel::<Notification>(256);

    let accept_tx = event_tx.clone();
    let accept_notify = notify_tx.clone();
    let accept_task = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let tx = accept_tx.clone();
                    let notify = accept_notify.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, tx, notify).await {
                            debug!("Client connection ended: {e:#}");
                        }
                    });
                }
                Err(e) => {
                    error!("Accept failed: {e}");
                    break;
                }
            }
        }
    });

    let ctrlc_tx = event_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ctrlc_tx.send(DaemonEvent::Shutdown).await;
        }
    });

    publish(&mut engine, &notify_tx);
    let mut debounce_task: Option<JoinHandle<()>> = None;
    rearm_debounce(&engine, &event_tx, &mut debounce_task);

    while let Some(event) = event_rx.recv().await {
        match event {
            DaemonEvent::IpcCommand { cmd, responder } => {
                let stop = matches!(cmd, IpcCommand::Stop);
                let response = dispatch(&mut engine, cmd);
                let _ = responder.send(response);
                publish(&mut engine, &notify_tx);
                rearm_debounce(&engine, &event_tx, &mut debounce_task);
                if stop {
                    info!("Stop requested over IPC");
                    break;
                }
            }
            DaemonEvent::DebounceTick => {
                engine.fire_debounce(std::time::Instant::now());
                publish(&mut engine, &notify_tx);
                rearm_debounce(&engine, &event_tx, &mut debounce_task);
            }
            DaemonEvent::Shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    accept_task.abort();
    if let Some(task) = debounce_task {
        task.abort();
    }
    if let Err(e) = std::fs::remove_file(&path) {
        debug!("Could not remove socket file: {e}");
    }
    Ok(())
}

/// Forward queued engine notifications to subscribers.
fn publish(engine: &mut AutotileEngine, notify_tx: &broadcast::Sender<Notification>) {
    for notification in engine.drain_notifications() {
        // Send only fails with no subscribers, which is fine.
        let _ = notify_tx.send(notification);
    }
}

/// Replace the single-shot timer task with one matching the engine's
/// current debounce deadline, if any.
fn rearm_debounce(
    engine: &AutotileEngine,
    event_tx: &mpsc::Sender<DaemonEvent>,
    task: &mut Option<JoinHandle<()>>,
) {
    if let Some(old) = task.take() {
        old.abort();
    }
    if let Some(deadline) = engine.retile_deadline() {
        let tx = event_tx.clone();
        *task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline.into()).await;
            let _ = tx.send(DaemonEvent::DebounceTick).await;
        }));
    }
}

/// Execute one command against the engine and build its response.
fn dispatch(engine: &mut AutotileEngine, cmd: IpcCommand) -> IpcResponse {
    match cmd {
        IpcCommand::WindowOpened {
            window,
            screen,
            min_width,
            min_height,
        } => {
            engine.window_opened(&window, &screen, min_width, min_height);
            IpcResponse::Ok
        }
        IpcCommand::WindowClosed { window } => {
            engine.window_closed(&window);
            IpcResponse::Ok
        }
        IpcCommand::WindowFocused { window, screen } => {
            engine.window_focused(&window, screen.as_deref());
            IpcResponse::Ok
        }
        IpcCommand::ScreenGeometryChanged { screen, geometry } => {
            engine.screen_geometry_changed(&screen, geometry);
            IpcResponse::Ok
        }
        IpcCommand::EnableScreen { screen, geometry } => {
            engine.enable_screen(&screen, Some(geometry));
            IpcResponse::Ok
        }
        IpcCommand::DisableScreen { screen } => {
            engine.disable_screen(&screen);
            IpcResponse::Ok
        }

        IpcCommand::SetAlgorithm { algorithm } => {
            engine.set_algorithm(&algorithm);
            IpcResponse::Ok
        }
        IpcCommand::SetSplitRatio { ratio } => {
            engine.set_split_ratio(ratio);
            IpcResponse::Ok
        }
        IpcCommand::SetMasterCount { count } => {
            engine.set_master_count(count);
            IpcResponse::Ok
        }
        IpcCommand::SetInnerGap { gap } => {
            engine.set_inner_gap(gap);
            IpcResponse::Ok
        }
        IpcCommand::SetOuterGap { gap } => {
            engine.set_outer_gap(gap);
            IpcResponse::Ok
        }
        IpcCommand::SetInsertPosition { position } => {
            engine.set_insert_position(position);
            IpcResponse::Ok
        }
        IpcCommand::SetFocusNewWindows { enabled } => {
            engine.set_focus_new_windows(enabled);
            IpcResponse::Ok
        }
        IpcCommand::SetFocusFollowsMouse { enabled } => {
            engine.set_focus_follows_mouse(enabled);
            IpcResponse::Ok
        }
        IpcCommand::SetMonocleShowTabs { enabled } => {
            engine.set_monocle_show_tabs(enabled);
            IpcResponse::Ok
        }
        IpcCommand::SetMonocleHideOthers { enabled } => {
            engine.set_monocle_hide_others(enabled);
            IpcResponse::Ok
        }
        IpcCommand::SetSmartGaps { enabled } => {
            engine.set_smart_gaps(enabled);
            IpcResponse::Ok
        }
        IpcCommand::SetRespectMinimumSize { enabled } => {
            engine.set_respect_minimum_size(enabled);
            IpcResponse::Ok
        }

        IpcCommand::SwapWindows { first, second } => {
            engine.swap_windows(&first, &second);
            IpcResponse::Ok
        }
        IpcCommand::PromoteToMaster { window } => {
            engine.promote_to_master(window.as_deref());
            IpcResponse::Ok
        }
        IpcCommand::DemoteFromMaster { window } => {
            engine.demote_from_master(window.as_deref());
            IpcResponse::Ok
        }
        IpcCommand::SwapWithMaster => {
            engine.swap_focused_with_master();
            IpcResponse::Ok
        }
        IpcCommand::FocusMaster => {
            engine.focus_master();
            IpcResponse::Ok
        }
        IpcCommand::FocusNext => {
            engine.focus_next();
            IpcResponse::Ok
        }
        IpcCommand::FocusPrevious => {
            engine.focus_previous();
            IpcResponse::Ok
        }
        IpcCommand::RotateWindows { clockwise } => {
            engine.rotate_window_order(clockwise);
            IpcResponse::Ok
        }

        IpcCommand::ToggleFloating { window } => {
            engine.toggle_floating(&window);
            IpcResponse::Ok
        }
        IpcCommand::FloatWindow { window } => {
            engine.float_window(&window);
            IpcResponse::Ok
        }
        IpcCommand::UnfloatWindow { window } => {
            engine.unfloat_window(&window);
            IpcResponse::Ok
        }

        IpcCommand::IncreaseRatio { delta } => {
            engine.adjust_split_ratio(delta.abs());
            IpcResponse::Ok
        }
        IpcCommand::DecreaseRatio { delta } => {
            engine.adjust_split_ratio(-delta.abs());
            IpcResponse::Ok
        }
        IpcCommand::IncreaseMasterCount => {
            engine.adjust_master_count(true);
            IpcResponse::Ok
        }
        IpcCommand::DecreaseMasterCount => {
            engine.adjust_master_count(false);
            IpcResponse::Ok
        }

        IpcCommand::Retile { screen } => {
            engine.retile(screen.as_deref());
            IpcResponse::Ok
        }

        IpcCommand::QueryState { screen } => {
            let Some(screen) = screen.or_else(|| engine.operation_screen()) else {
                return IpcResponse::error("no tiled screen to query");
            };
            match engine.screen_state(&screen) {
                Some(state) => IpcResponse::ScreenState {
                    screen,
                    algorithm: engine.algorithm().to_string(),
                    windows: state.window_order().to_vec(),
                    floating: state
                        .window_order()
                        .iter()
                        .filter(|w| state.is_floating(w))
                        .cloned()
                        .collect(),
                    focused: state.focused().cloned(),
                    master_count: state.master_count(),
                    split_ratio: state.split_ratio(),
                },
                None => IpcResponse::error(format!("screen '{screen}' is not tiled")),
            }
        }
        IpcCommand::QueryConfig => IpcResponse::Config {
            config: engine.config().clone(),
        },
        IpcCommand::QueryZones { screen } => match engine.zone_assignments(&screen) {
            Some(zones) => IpcResponse::Zones { screen, zones },
            None => IpcResponse::error(format!("screen '{screen}' is not tiled")),
        },
        IpcCommand::QueryAlgorithms => {
            let mut algorithms = engine.algorithm_infos();
            algorithms.sort_by(|a, b| a.id.cmp(&b.id));
            IpcResponse::Algorithms { algorithms }
        }

        IpcCommand::Subscribe => IpcResponse::Subscribed,
        IpcCommand::Reload => match Settings::load() {
            Ok(settings) => {
                for (field, message) in settings.validate() {
                    warn!("Settings: {}: {}", field, message);
                }
                engine.update_screen_geometries(&settings.screen_geometries());
                engine.sync_from_settings(settings.to_config(), &settings.enabled_screens());
                IpcResponse::Ok
            }
            Err(e) => IpcResponse::error(format!("reload failed: {e:#}")),
        },
        IpcCommand::Stop => IpcResponse::Ok,
    }
}

/// Serve one connection: commands in, responses out, one JSON object per
/// line. After a successful `subscribe` the connection only carries
/// notifications until the client disconnects.
async fn handle_client(
    stream: UnixStream,
    event_tx: mpsc::Sender<DaemonEvent>,
    notify_tx: broadcast::Sender<Notification>,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let cmd: IpcCommand = match decode_line(&line) {
            Ok(cmd) => cmd,
            Err(e) => {
                let response = IpcResponse::error(e.to_string());
                write_half.write_all(encode_line(&response)?.as_bytes()).await?;
                continue;
            }
        };
        let subscribe = matches!(cmd, IpcCommand::Subscribe);

        let (responder, response_rx) = oneshot::channel();
        event_tx
            .send(DaemonEvent::IpcCommand { cmd, responder })
            .await
            .context("event loop is gone")?;
        let response = response_rx.await.context("event loop dropped command")?;
        write_half.write_all(encode_line(&response)?.as_bytes()).await?;

        if subscribe && response == IpcResponse::Subscribed {
            let mut events = notify_tx.subscribe();
            loop {
                match events.recv().await {
                    Ok(notification) => {
                        write_half
                            .write_all(encode_line(&notification)?.as_bytes())
                            .await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Subscriber lagged, {} notifications dropped", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                }
            }
        }
    }
    Ok(())
}
