//! Tiling orchestration engine.
//!
//! `AutotileEngine` owns one `TilingState` per enabled screen, the process
//! configuration, and the algorithm registry. It reacts to window lifecycle
//! and settings events, runs the recompute pipeline, and queues batched
//! notifications for the event loop to deliver. Everything runs on the
//! daemon's single event loop; the re-entrancy flag guards against logical
//! re-entrancy, not concurrent threads.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use autotile_core::algorithms::sizing::MIN_SIZE_SLACK;
use autotile_core::{
    AlgorithmRegistry, AutotileConfig, InsertPosition, LayoutError, LayoutParams, MinSize, Rect,
    TilingState, WindowId, DEFAULT_ALGORITHM,
};
use autotile_ipc::{AlgorithmInfo, Notification, ZoneAssignment};

use crate::debounce::DebounceTimer;

/// Hard cap on tracked windows per screen. Additions beyond this are
/// refused rather than degrading layout quality.
pub const MAX_WINDOWS_PER_SCREEN: usize = 50;

/// Supplies screen geometry for screens the engine has no explicit
/// geometry for. The daemon backs this with the settings file since
/// compositor integration is out of scope.
pub trait ScreenSource: Send {
    /// Usable area of the named screen in absolute coordinates.
    fn available_geometry(&self, screen: &str) -> Option<Rect>;
    /// Name of the primary screen.
    fn primary_screen(&self) -> String;
}

/// RAII holder for the retile re-entrancy flag. Dropping releases the
/// flag on every exit path.
struct RetileGuard(Arc<AtomicBool>);

impl RetileGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Self(Arc::clone(flag)))
        }
    }
}

impl Drop for RetileGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The orchestrator: tracks windows per screen, invokes the selected
/// algorithm, and publishes geometry batches.
pub struct AutotileEngine {
    config: AutotileConfig,
    registry: AlgorithmRegistry,
    /// Membership equals "screen is tiled".
    screens: HashMap<String, TilingState>,
    /// Geometry pushed over IPC, taking precedence over the source.
    geometry: HashMap<String, Rect>,
    window_screen: HashMap<WindowId, String>,
    min_sizes: HashMap<WindowId, MinSize>,
    /// Last screen to receive a focus event.
    active_screen: Option<String>,
    source: Box<dyn ScreenSource>,
    retiling: Arc<AtomicBool>,
    debounce: DebounceTimer,
    notifications: VecDeque<Notification>,
}

impl AutotileEngine {
    pub fn new(source: Box<dyn ScreenSource>) -> Self {
        Self {
            config: AutotileConfig::default(),
            registry: AlgorithmRegistry::with_builtins(),
            screens: HashMap::new(),
            geometry: HashMap::new(),
            window_screen: HashMap::new(),
            min_sizes: HashMap::new(),
            active_screen: None,
            source,
            retiling: Arc::new(AtomicBool::new(false)),
            debounce: DebounceTimer::default(),
            notifications: VecDeque::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors used by the daemon's query commands
    // ------------------------------------------------------------------

    pub fn config(&self) -> &AutotileConfig {
        &self.config
    }

    /// The effective algorithm id (always a registered one).
    pub fn algorithm(&self) -> &str {
        &self.config.algorithm_id
    }

    pub fn screen_state(&self, screen: &str) -> Option<&TilingState> {
        self.screens.get(screen)
    }

    pub fn is_screen_tiled(&self, screen: &str) -> bool {
        self.screens.contains_key(screen)
    }

    /// The screen interactive operations apply to: the active screen if it
    /// is still tiled, otherwise any screen with a focused window.
    pub fn operation_screen(&self) -> Option<String> {
        if let Some(screen) = &self.active_screen {
            if self.screens.contains_key(screen) {
                return Some(screen.clone());
            }
        }
        self.screens
            .iter()
            .find(|(_, state)| state.focused().is_some())
            .map(|(name, _)| name.clone())
    }

    /// Windows and their last computed zones, in layout order.
    pub fn zone_assignments(&self, screen: &str) -> Option<Vec<ZoneAssignment>> {
        let state = self.screens.get(screen)?;
        let tiled = state.tiled_windows();
        if tiled.len() != state.last_geometry().len() {
            return Some(Vec::new());
        }
        Some(
            tiled
                .into_iter()
                .zip(state.last_geometry().iter().copied())
                .map(|(window, zone)| ZoneAssignment { window, zone })
                .collect(),
        )
    }

    pub fn algorithm_infos(&self) -> Vec<AlgorithmInfo> {
        self.registry
            .ids()
            .into_iter()
            .filter_map(|id| {
                self.registry.get(id).map(|a| AlgorithmInfo {
                    id: id.to_string(),
                    display_name: a.display_name().to_string(),
                })
            })
            .collect()
    }

    /// Take everything queued since the last drain.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    // ------------------------------------------------------------------
    // Screen feed
    // ------------------------------------------------------------------

    fn screen_geometry(&self, screen: &str) -> Option<Rect> {
        self.geometry
            .get(screen)
            .copied()
            .or_else(|| self.source.available_geometry(screen))
    }

    /// Start tiling a screen, lazily creating its state.
    pub fn enable_screen(&mut self, screen: &str, geometry: Option<Rect>) {
        if screen.is_empty() {
            warn!("Ignoring enable for empty screen name");
            return;
        }
        if let Some(g) = geometry {
            self.geometry.insert(screen.to_string(), g);
        }
        if self.screens.contains_key(screen) {
            debug!("Screen '{}' already tiled", screen);
            return;
        }
        let mut state = TilingState::new(screen);
        state.set_split_ratio(self.config.split_ratio);
        self.screens.insert(screen.to_string(), state);
        info!("Screen '{}' enabled for tiling", screen);
        self.retile(Some(screen));
    }

    /// Stop tiling a screen, releasing its windows back to normal handling.
    pub fn disable_screen(&mut self, screen: &str) {
        let Some(state) = self.screens.remove(screen) else {
            debug!("Screen '{}' is not tiled, nothing to disable", screen);
            return;
        };
        let released: Vec<WindowId> = state.window_order().to_vec();
        for id in &released {
            self.window_screen.remove(id);
            self.min_sizes.remove(id);
        }
        if self.active_screen.as_deref() == Some(screen) {
            self.active_screen = None;
        }
        self.registry.reset_all();
        info!(
            "Screen '{}' disabled, releasing {} windows",
            screen,
            released.len()
        );
        if !released.is_empty() {
            self.notifications
                .push_back(Notification::WindowsReleased { windows: released });
        }
    }

    /// Record declared geometries without retiling. Used when settings are
    /// (re)loaded, right before `sync_from_settings` runs its single retile.
    pub fn update_screen_geometries(&mut self, geometries: &[(String, Rect)]) {
        for (name, rect) in geometries {
            self.geometry.insert(name.clone(), *rect);
        }
    }

    pub fn screen_geometry_changed(&mut self, screen: &str, geometry: Rect) {
        self.geometry.insert(screen.to_string(), geometry);
        if self.screens.contains_key(screen) {
            debug!("Geometry changed for tiled screen '{}', retiling", screen);
            self.retile(Some(screen));
        }
    }

    // ------------------------------------------------------------------
    // Window lifecycle feed
    // ------------------------------------------------------------------

    pub fn window_opened(
        &mut self,
        id: &str,
        screen: &str,
        min_width: Option<i32>,
        min_height: Option<i32>,
    ) {
        if id.is_empty() || screen.is_empty() {
            warn!("Ignoring window open with empty id or screen");
            return;
        }
        if min_width.is_some() || min_height.is_some() {
            self.min_sizes.insert(
                id.to_string(),
                MinSize {
                    width: min_width.unwrap_or(0),
                    height: min_height.unwrap_or(0),
                },
            );
        }
        if !self.screens.contains_key(screen) {
            debug!("Window '{}' opened on untiled screen '{}'", id, screen);
            return;
        }
        if self.screens.values().any(|s| s.is_floating(id)) {
            debug!("Window '{}' is floating elsewhere, not adding", id);
            return;
        }
        if let Some(existing) = self.window_screen.get(id) {
            if existing != screen {
                debug!(
                    "Window '{}' is already tracked on '{}', ignoring open on '{}'",
                    id, existing, screen
                );
                return;
            }
        }
        let insert_position = self.config.insert_position;
        let Some(state) = self.screens.get_mut(screen) else {
            return;
        };
        if state.window_count() >= MAX_WINDOWS_PER_SCREEN {
            debug!(
                "Screen '{}' is at the {} window cap, refusing '{}'",
                screen, MAX_WINDOWS_PER_SCREEN, id
            );
            return;
        }
        let added = match insert_position {
            InsertPosition::End => state.add_window(id, None),
            InsertPosition::AfterFocused => state.insert_after_focused(id),
            InsertPosition::AsMaster => state.add_window(id, Some(0)),
        };
        if !added {
            debug!("Window '{}' already tracked on '{}'", id, screen);
            return;
        }
        self.window_screen.insert(id.to_string(), screen.to_string());
        info!("Window '{}' added to screen '{}'", id, screen);
        self.retile_after_operation(screen, true);
        if self.config.focus_new_windows {
            self.notifications.push_back(Notification::FocusWindow {
                window: id.to_string(),
            });
        }
    }

    pub fn window_closed(&mut self, id: &str) {
        if id.is_empty() {
            return;
        }
        self.min_sizes.remove(id);
        let Some(screen) = self.window_screen.remove(id) else {
            debug!("Close for untracked window '{}'", id);
            return;
        };
        let removed = self
            .screens
            .get_mut(&screen)
            .map(|s| s.remove_window(id))
            .unwrap_or(false);
        if removed {
            info!("Window '{}' removed from screen '{}'", id, screen);
        }
        self.retile_after_operation(&screen, removed);
    }

    pub fn window_focused(&mut self, id: &str, screen: Option<&str>) {
        if id.is_empty() {
            return;
        }
        // Trust the named screen only when its state actually tracks the
        // window; a stale or wrong screen must not detach the window from
        // where it is tiled.
        let named = screen
            .filter(|s| self.screens.get(*s).is_some_and(|st| st.contains(id)))
            .map(str::to_string);
        let screen = named.or_else(|| self.window_screen.get(id).cloned());
        let Some(screen) = screen else {
            debug!("Focus for untracked window '{}'", id);
            return;
        };
        if !self.screens.contains_key(&screen) {
            return;
        }
        self.window_screen.insert(id.to_string(), screen.clone());
        if let Some(state) = self.screens.get_mut(&screen) {
            state.set_focused(Some(id));
        }
        self.active_screen = Some(screen.clone());
        self.update_monocle_visibility(&screen);
    }

    // ------------------------------------------------------------------
    // Settings surface
    // ------------------------------------------------------------------

    /// Switch the algorithm, falling back to the default for unknown ids.
    pub fn set_algorithm(&mut self, id: &str) {
        let resolved = if self.registry.contains(id) {
            id
        } else {
            warn!(
                "Unknown algorithm '{}', falling back to '{}'",
                id, DEFAULT_ALGORITHM
            );
            DEFAULT_ALGORITHM
        };
        if self.config.set_algorithm_id(resolved) {
            info!("Algorithm set to '{}'", resolved);
            self.registry.reset_all();
            self.retile(None);
        }
    }

    pub fn set_split_ratio(&mut self, ratio: f64) {
        let mut changed = self.config.set_split_ratio(ratio);
        let value = self.config.split_ratio;
        for state in self.screens.values_mut() {
            changed |= state.set_split_ratio(value);
        }
        if changed {
            self.schedule_settings_retile();
        }
    }

    pub fn set_master_count(&mut self, count: usize) {
        let mut changed = self.config.set_master_count(count);
        let value = self.config.master_count;
        for state in self.screens.values_mut() {
            changed |= state.set_master_count(value);
        }
        if changed {
            self.schedule_settings_retile();
        }
    }

    pub fn set_inner_gap(&mut self, gap: i32) {
        if self.config.set_inner_gap(gap) {
            self.schedule_settings_retile();
        }
    }

    pub fn set_outer_gap(&mut self, gap: i32) {
        if self.config.set_outer_gap(gap) {
            self.schedule_settings_retile();
        }
    }

    pub fn set_insert_position(&mut self, position: InsertPosition) {
        self.config.set_insert_position(position);
    }

    pub fn set_focus_new_windows(&mut self, enabled: bool) {
        self.config.focus_new_windows = enabled;
    }

    pub fn set_focus_follows_mouse(&mut self, enabled: bool) {
        self.config.focus_follows_mouse = enabled;
    }

    /// Rendering hint for monocle clients, exposed via the config query.
    pub fn set_monocle_show_tabs(&mut self, enabled: bool) {
        self.config.monocle_show_tabs = enabled;
    }

    pub fn set_monocle_hide_others(&mut self, enabled: bool) {
        if self.config.monocle_hide_others != enabled {
            self.config.monocle_hide_others = enabled;
            self.schedule_settings_retile();
        }
    }

    pub fn set_smart_gaps(&mut self, enabled: bool) {
        if self.config.smart_gaps != enabled {
            self.config.smart_gaps = enabled;
            self.schedule_settings_retile();
        }
    }

    pub fn set_respect_minimum_size(&mut self, enabled: bool) {
        if self.config.respect_minimum_size != enabled {
            self.config.respect_minimum_size = enabled;
            self.schedule_settings_retile();
        }
    }

    fn schedule_settings_retile(&mut self) {
        self.debounce.schedule(Instant::now());
    }

    /// Deadline of the pending debounced retile, for the event loop timer.
    pub fn retile_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Fire the debounced retile if its deadline has passed.
    pub fn fire_debounce(&mut self, now: Instant) {
        if self.debounce.fire_if_due(now) {
            debug!("Debounced settings retile firing");
            self.retile(None);
        }
    }

    /// Bulk settings synchronization: rewrite the whole configuration,
    /// reconcile the enabled-screen set, then retile exactly once.
    pub fn sync_from_settings(&mut self, mut config: AutotileConfig, enabled: &[String]) {
        // Taking the screen map out disables retiling mid-update.
        let mut screens = std::mem::take(&mut self.screens);

        if !self.registry.contains(&config.algorithm_id) {
            warn!(
                "Settings name unknown algorithm '{}', falling back to '{}'",
                config.algorithm_id, DEFAULT_ALGORITHM
            );
            config.algorithm_id = DEFAULT_ALGORITHM.to_string();
        }
        let ratio = config.split_ratio;
        let masters = config.master_count;
        for state in screens.values_mut() {
            state.set_split_ratio(ratio);
            state.set_master_count(masters);
        }
        self.config = config;

        let keep: HashSet<&str> = enabled.iter().map(String::as_str).collect();
        let mut released = Vec::new();
        screens.retain(|name, state| {
            if keep.contains(name.as_str()) {
                true
            } else {
                released.extend(state.window_order().to_vec());
                false
            }
        });
        for id in &released {
            self.window_screen.remove(id);
            self.min_sizes.remove(id);
        }
        for name in enabled {
            screens.entry(name.clone()).or_insert_with(|| {
                let mut state = TilingState::new(name.clone());
                state.set_split_ratio(ratio);
                state
            });
        }
        self.screens = screens;
        if let Some(active) = &self.active_screen {
            if !self.screens.contains_key(active) {
                self.active_screen = None;
            }
        }
        if !released.is_empty() {
            self.notifications
                .push_back(Notification::WindowsReleased { windows: released });
        }
        self.debounce.cancel();
        info!(
            "Settings synchronized: algorithm '{}', {} screens enabled",
            self.config.algorithm_id,
            self.screens.len()
        );
        self.retile(None);
    }

    // ------------------------------------------------------------------
    // Interactive operations
    // ------------------------------------------------------------------

    pub fn swap_windows(&mut self, a: &str, b: &str) {
        let (Some(screen_a), Some(screen_b)) = (
            self.window_screen.get(a).cloned(),
            self.window_screen.get(b).cloned(),
        ) else {
            debug!("Swap with untracked window '{}' or '{}'", a, b);
            return;
        };
        if screen_a != screen_b {
            debug!(
                "Cannot swap '{}' ({}) with '{}' ({}): different screens",
                a, screen_a, b, screen_b
            );
            return;
        }
        let swapped = self
            .screens
            .get_mut(&screen_a)
            .map(|s| s.swap_ids(a, b))
            .unwrap_or(false);
        self.retile_after_operation(&screen_a, swapped);
    }

    pub fn promote_to_master(&mut self, window: Option<&str>) {
        let Some((screen, id)) = self.resolve_target(window) else {
            self.feedback(false, "promote_to_master", Some("no_focus"), None, None, "");
            return;
        };
        let (moved, from, reason) = match self.screens.get_mut(&screen) {
            Some(state) => {
                let tiled = state.tiled_windows();
                match tiled.iter().position(|w| *w == id) {
                    Some(rank) if rank > 0 => match state.index_of(&id) {
                        Some(from) => {
                            let to = tiled_insertion_index(state, &id, 0);
                            (state.move_window(from, to), Some(rank), None)
                        }
                        None => (false, None, Some("no_focus")),
                    },
                    Some(rank) => (false, Some(rank), Some("already_master")),
                    None => (false, None, Some("no_focus")),
                }
            }
            None => (false, None, Some("no_windows")),
        };
        let reason = if moved { None } else { reason };
        self.feedback(moved, "promote_to_master", reason, from, Some(0), &screen);
        self.retile_after_operation(&screen, moved);
    }

    pub fn demote_from_master(&mut self, window: Option<&str>) {
        let Some((screen, id)) = self.resolve_target(window) else {
            self.feedback(false, "demote_from_master", Some("no_focus"), None, None, "");
            return;
        };
        let (moved, from, to, reason) = match self.screens.get_mut(&screen) {
            Some(state) => {
                let masters = state.master_count();
                let tiled = state.tiled_windows();
                match tiled.iter().position(|w| *w == id) {
                    // Master membership is a property of the tiled
                    // subsequence, not of the raw window order.
                    Some(rank) if rank < masters && tiled.len() > masters => {
                        match state.index_of(&id) {
                            Some(from) => {
                                let target = tiled_insertion_index(state, &id, masters);
                                (
                                    state.move_window(from, target),
                                    Some(rank),
                                    Some(masters),
                                    None,
                                )
                            }
                            None => (false, None, None, Some("no_focus")),
                        }
                    }
                    Some(rank) => (false, Some(rank), None, Some("not_in_master")),
                    None => (false, None, None, Some("no_focus")),
                }
            }
            None => (false, None, None, Some("no_windows")),
        };
        let reason = if moved { None } else { reason };
        self.feedback(moved, "demote_from_master", reason, from, to, &screen);
        self.retile_after_operation(&screen, moved);
    }

    pub fn swap_focused_with_master(&mut self) {
        let Some(screen) = self.operation_screen() else {
            self.feedback(false, "swap_with_master", Some("no_windows"), None, None, "");
            return;
        };
        let (swapped, reason, source) = {
            let Some(state) = self.screens.get_mut(&screen) else {
                return;
            };
            let tiled = state.tiled_windows();
            if tiled.is_empty() {
                (false, Some("no_windows"), None)
            } else {
                match state.focused().cloned() {
                    None => (false, Some("no_focus"), None),
                    Some(focused) if state.is_floating(&focused) => {
                        (false, Some("no_focus"), None)
                    }
                    Some(focused) => {
                        let master = tiled[0].clone();
                        if focused == master {
                            (false, Some("already_master"), Some(0))
                        } else {
                            let source = tiled.iter().position(|w| *w == focused);
                            (state.swap_ids(&focused, &master), None, source)
                        }
                    }
                }
            }
        };
        self.feedback(swapped, "swap_with_master", reason, source, Some(0), &screen);
        self.retile_after_operation(&screen, swapped);
    }

    pub fn focus_master(&mut self) {
        self.focus_by(|_, _| 0, "focus_master");
    }

    pub fn focus_next(&mut self) {
        self.focus_by(|current, len| (current + 1) % len, "focus_next");
    }

    pub fn focus_previous(&mut self) {
        self.focus_by(|current, len| (current + len - 1) % len, "focus_previous");
    }

    /// Shared focus-cycling body: pick a target index in the tiled
    /// sequence, update focus, and request the focus change downstream.
    fn focus_by(&mut self, target_index: impl Fn(usize, usize) -> usize, action: &str) {
        let Some(screen) = self.operation_screen() else {
            self.feedback(false, action, Some("no_windows"), None, None, "");
            return;
        };
        let (target, source, index) = {
            let Some(state) = self.screens.get_mut(&screen) else {
                return;
            };
            let tiled = state.tiled_windows();
            if tiled.is_empty() {
                (None, None, None)
            } else {
                let source = state
                    .focused()
                    .and_then(|f| tiled.iter().position(|w| w == f));
                let index = target_index(source.unwrap_or(0), tiled.len());
                let target = tiled[index].clone();
                state.set_focused(Some(&target));
                (Some(target), source, Some(index))
            }
        };
        match target {
            Some(window) => {
                self.notifications.push_back(Notification::FocusWindow {
                    window: window.clone(),
                });
                self.feedback(true, action, None, source, index, &screen);
                self.active_screen = Some(screen.clone());
                self.update_monocle_visibility(&screen);
            }
            None => self.feedback(false, action, Some("no_windows"), None, None, &screen),
        }
    }

    pub fn rotate_window_order(&mut self, clockwise: bool) {
        let Some(screen) = self.operation_screen() else {
            self.feedback(false, "rotate", Some("nothing_to_rotate"), None, None, "");
            return;
        };
        let rotated = self
            .screens
            .get_mut(&screen)
            .map(|s| s.rotate(clockwise))
            .unwrap_or(false);
        let reason = if rotated {
            None
        } else {
            Some("nothing_to_rotate")
        };
        self.feedback(rotated, "rotate", reason, None, None, &screen);
        self.retile_after_operation(&screen, rotated);
    }

    pub fn toggle_floating(&mut self, id: &str) {
        self.set_window_floating(id, None);
    }

    pub fn float_window(&mut self, id: &str) {
        self.set_window_floating(id, Some(true));
    }

    pub fn unfloat_window(&mut self, id: &str) {
        self.set_window_floating(id, Some(false));
    }

    fn set_window_floating(&mut self, id: &str, floating: Option<bool>) {
        let Some(screen) = self.window_screen.get(id).cloned() else {
            debug!("Float toggle for untracked window '{}'", id);
            return;
        };
        let changed = match self.screens.get_mut(&screen) {
            Some(state) => {
                let target = floating.unwrap_or(!state.is_floating(id));
                state.set_floating(id, target)
            }
            None => false,
        };
        if changed {
            info!("Window '{}' floating toggled on '{}'", id, screen);
        }
        self.retile_after_operation(&screen, changed);
    }

    /// Adjust the split ratio on every enabled screen, then retile once.
    pub fn adjust_split_ratio(&mut self, delta: f64) {
        let target = self.config.split_ratio + delta;
        let mut changed = self.config.set_split_ratio(target);
        let value = self.config.split_ratio;
        for state in self.screens.values_mut() {
            changed |= state.set_split_ratio(value);
        }
        if changed {
            self.retile(None);
        }
    }

    /// Adjust the master count on every enabled screen, then retile once.
    pub fn adjust_master_count(&mut self, increase: bool) {
        let current = self.config.master_count;
        let target = if increase {
            current + 1
        } else {
            current.saturating_sub(1)
        };
        let mut changed = self.config.set_master_count(target);
        let value = self.config.master_count;
        for state in self.screens.values_mut() {
            changed |= state.set_master_count(value);
        }
        if changed {
            self.retile(None);
        }
    }

    // ------------------------------------------------------------------
    // Recompute pipeline
    // ------------------------------------------------------------------

    /// Recompute and apply for one screen, or for every enabled screen.
    /// Skipped entirely if a retile is already in progress.
    pub fn retile(&mut self, screen: Option<&str>) {
        let Some(_guard) = RetileGuard::acquire(&self.retiling) else {
            debug!("Retile already in progress, skipping");
            return;
        };
        match screen {
            Some(name) => self.retile_one(name),
            None => {
                let mut names: Vec<String> = self.screens.keys().cloned().collect();
                names.sort();
                for name in names {
                    self.retile_one(&name);
                }
            }
        }
    }

    /// Retile a single screen after a mutation. When an outer retile holds
    /// the guard, the screen is still recomputed so interactive operations
    /// are never silently dropped; only the outer call releases the flag.
    fn retile_after_operation(&mut self, screen: &str, succeeded: bool) {
        if !succeeded {
            return;
        }
        match RetileGuard::acquire(&self.retiling) {
            Some(_guard) => self.retile_one(screen),
            None => self.retile_one(screen),
        }
    }

    fn retile_one(&mut self, screen: &str) {
        if !self.screens.contains_key(screen) {
            debug!("Retile requested for untiled screen '{}'", screen);
            return;
        }
        match self.recalculate_layout(screen) {
            Ok(true) => self.apply_tiling(screen),
            Ok(false) => {}
            Err(e) => warn!("Layout fault on '{}', keeping stale geometry: {}", screen, e),
        }
    }

    /// Run the algorithm and store the result. `Ok(true)` means there are
    /// zones to apply; faults leave the previous geometry in place.
    fn recalculate_layout(&mut self, screen: &str) -> Result<bool, LayoutError> {
        let Some(geometry) = self.screen_geometry(screen) else {
            warn!("No geometry known for screen '{}', cannot retile", screen);
            return Ok(false);
        };
        let tiled = match self.screens.get(screen) {
            Some(state) => state.tiled_windows(),
            None => return Ok(false),
        };
        if tiled.is_empty() {
            if let Some(state) = self.screens.get_mut(screen) {
                state.clear_geometry();
            }
            return Ok(false);
        }

        let (inner_gap, outer_gap) = if self.config.smart_gaps && tiled.len() == 1 {
            (0, 0)
        } else {
            (self.config.inner_gap, self.config.outer_gap)
        };
        let min_sizes: Option<Vec<MinSize>> = if self.config.respect_minimum_size {
            Some(
                tiled
                    .iter()
                    .map(|id| self.min_sizes.get(id).copied().unwrap_or_default())
                    .collect(),
            )
        } else {
            None
        };

        let algorithm_id = self.registry.resolve(&self.config.algorithm_id).to_string();
        let mut zones = {
            let Some(state) = self.screens.get(screen) else {
                return Ok(false);
            };
            let params = LayoutParams {
                window_count: tiled.len(),
                screen: geometry,
                state,
                inner_gap,
                outer_gap,
                min_sizes: min_sizes.as_deref(),
            };
            let Some(algorithm) = self.registry.get_mut(&algorithm_id) else {
                return Err(LayoutError::UnknownAlgorithm(algorithm_id));
            };
            algorithm.calculate_zones(&params)
        };
        if zones.len() != tiled.len() {
            return Err(LayoutError::ZoneCountMismatch(
                algorithm_id,
                zones.len(),
                tiled.len(),
            ));
        }
        if let Some(mins) = &min_sizes {
            enforce_minimum_heights(&mut zones, mins, inner_gap);
        }
        if let Some(state) = self.screens.get_mut(screen) {
            state.store_geometry(zones);
        }
        Ok(true)
    }

    /// Zip windows with stored zones and emit one batched notification.
    fn apply_tiling(&mut self, screen: &str) {
        let (zones, monocle) = {
            let Some(state) = self.screens.get(screen) else {
                return;
            };
            let tiled = state.tiled_windows();
            if tiled.is_empty() {
                return;
            }
            if state.last_geometry().len() != tiled.len() {
                warn!(
                    "Stored geometry ({}) does not match tiled windows ({}) on '{}', aborting apply",
                    state.last_geometry().len(),
                    tiled.len(),
                    screen
                );
                return;
            }
            let zones: Vec<ZoneAssignment> = tiled
                .iter()
                .cloned()
                .zip(state.last_geometry().iter().copied())
                .map(|(window, zone)| ZoneAssignment { window, zone })
                .collect();
            (zones, self.monocle_visibility(state))
        };
        debug!("Applying {} zones on '{}'", zones.len(), screen);
        self.notifications.push_back(Notification::WindowsTiled {
            screen: screen.to_string(),
            zones,
        });
        if let Some((show, hide)) = monocle {
            self.notifications
                .push_back(Notification::MonocleVisibility { show, hide });
        }
    }

    /// In monocle with hide-others, the visible window is the focused one
    /// if it is tiled, otherwise the first tiled window.
    fn monocle_visibility(&self, state: &TilingState) -> Option<(WindowId, Vec<WindowId>)> {
        if !self.config.monocle_hide_others {
            return None;
        }
        if self.registry.resolve(&self.config.algorithm_id) != "monocle" {
            return None;
        }
        let tiled = state.tiled_windows();
        let show = state
            .focused()
            .filter(|f| !state.is_floating(f))
            .cloned()
            .or_else(|| tiled.first().cloned())?;
        let hide = tiled.into_iter().filter(|w| *w != show).collect();
        Some((show, hide))
    }

    fn update_monocle_visibility(&mut self, screen: &str) {
        let visibility = self
            .screens
            .get(screen)
            .and_then(|state| self.monocle_visibility(state));
        if let Some((show, hide)) = visibility {
            self.notifications
                .push_back(Notification::MonocleVisibility { show, hide });
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Resolve an explicit window target, or fall back to the focused
    /// window on the operation screen.
    fn resolve_target(&self, window: Option<&str>) -> Option<(String, WindowId)> {
        match window {
            Some(id) => self
                .window_screen
                .get(id)
                .map(|screen| (screen.clone(), id.to_string())),
            None => {
                let screen = self.operation_screen()?;
                let focused = self.screens.get(&screen)?.focused()?.clone();
                Some((screen, focused))
            }
        }
    }

    fn feedback(
        &mut self,
        succeeded: bool,
        action: &str,
        reason: Option<&str>,
        source_zone: Option<usize>,
        target_zone: Option<usize>,
        screen: &str,
    ) {
        if !succeeded {
            debug!(
                "Operation '{}' was a no-op on '{}': {}",
                action,
                screen,
                reason.unwrap_or("unspecified")
            );
        }
        self.notifications.push_back(Notification::Feedback {
            succeeded,
            action: action.to_string(),
            reason: reason.map(str::to_string),
            source_zone,
            target_zone,
            screen: screen.to_string(),
        });
    }
}

/// Index in the window order, with `id` itself removed, at which an
/// insertion lands the window at `rank` within the tiled subsequence.
/// Floating windows stay anchored at their positions.
fn tiled_insertion_index(state: &TilingState, id: &str, rank: usize) -> usize {
    let mut tiled_seen = 0;
    let mut index = 0;
    for window in state.window_order() {
        if window == id {
            continue;
        }
        if !state.is_floating(window) {
            if tiled_seen == rank {
                return index;
            }
            tiled_seen += 1;
        }
        index += 1;
    }
    index
}

/// Bounded post-pass: grow any residual undersized zone up to
/// `inner_gap + MIN_SIZE_SLACK`; larger shortfalls were already handled by
/// the proportional distribution and are left alone.
fn enforce_minimum_heights(zones: &mut [Rect], mins: &[MinSize], inner_gap: i32) {
    let limit = inner_gap + MIN_SIZE_SLACK;
    for (zone, min) in zones.iter_mut().zip(mins) {
        let shortfall = min.height - zone.height;
        if shortfall > 0 && shortfall <= limit {
            zone.height = min.height;
        } else if shortfall > limit {
            debug!(
                "Zone at ({},{}) is {}px under its minimum height, beyond the correction bound",
                zone.x, zone.y, shortfall
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScreens(HashMap<String, Rect>);

    impl FixedScreens {
        fn single(name: &str, rect: Rect) -> Box<Self> {
            let mut map = HashMap::new();
            map.insert(name.to_string(), rect);
            Box::new(Self(map))
        }
    }

    impl ScreenSource for FixedScreens {
        fn available_geometry(&self, screen: &str) -> Option<Rect> {
            self.0.get(screen).copied()
        }

        fn primary_screen(&self) -> String {
            self.0.keys().next().cloned().unwrap_or_default()
        }
    }

    fn engine_with_screen() -> AutotileEngine {
        let mut engine = AutotileEngine::new(FixedScreens::single(
            "primary",
            Rect::new(0, 0, 1000, 1000),
        ));
        let config = AutotileConfig {
            split_ratio: 0.6,
            inner_gap: 0,
            outer_gap: 0,
            smart_gaps: false,
            focus_new_windows: false,
            ..AutotileConfig::default()
        };
        engine.sync_from_settings(config, &["primary".to_string()]);
        engine.drain_notifications();
        engine
    }

    fn last_tiled_zones(engine: &mut AutotileEngine) -> Vec<ZoneAssignment> {
        engine
            .drain_notifications()
            .into_iter()
            .rev()
            .find_map(|n| match n {
                Notification::WindowsTiled { zones, .. } => Some(zones),
                _ => None,
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_master_stack_scenario() {
        let mut engine = engine_with_screen();
        engine.window_opened("w1", "primary", None, None);
        engine.window_opened("w2", "primary", None, None);
        engine.window_opened("w3", "primary", None, None);

        let zones = last_tiled_zones(&mut engine);
        assert_eq!(zones.len(), 3);
        assert_eq!(zones[0].window, "w1");
        assert_eq!(zones[0].zone, Rect::new(0, 0, 600, 1000));
        assert_eq!(zones[1].zone, Rect::new(600, 0, 400, 500));
        assert_eq!(zones[2].zone, Rect::new(600, 500, 400, 500));
    }

    #[test]
    fn test_floating_exclusion() {
        let mut engine = engine_with_screen();
        for id in ["w1", "w2", "w3"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.float_window("w2");

        let zones = last_tiled_zones(&mut engine);
        assert_eq!(zones.len(), 2);
        assert!(zones.iter().all(|z| z.window != "w2"));
        let state = engine.screen_state("primary").unwrap();
        assert_eq!(state.tiled_window_count(), 2);
    }

    #[test]
    fn test_swap_preserves_other_order() {
        let mut engine = engine_with_screen();
        for id in ["w1", "w2", "w3"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.swap_windows("w1", "w3");
        let state = engine.screen_state("primary").unwrap();
        assert_eq!(state.window_order(), ["w3", "w2", "w1"]);
    }

    #[test]
    fn test_unknown_algorithm_falls_back_to_default() {
        let mut engine = engine_with_screen();
        engine.set_algorithm("nonexistent");
        assert_eq!(engine.algorithm(), DEFAULT_ALGORITHM);
    }

    #[test]
    fn test_retile_is_idempotent() {
        let mut engine = engine_with_screen();
        for id in ["w1", "w2", "w3"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.retile(Some("primary"));
        let first = last_tiled_zones(&mut engine);
        engine.retile(Some("primary"));
        let second = last_tiled_zones(&mut engine);
        assert_eq!(first, second);
    }

    #[test]
    fn test_window_cap_refuses_additions() {
        let mut engine = engine_with_screen();
        for i in 0..MAX_WINDOWS_PER_SCREEN + 5 {
            engine.window_opened(&format!("w{i}"), "primary", None, None);
        }
        let state = engine.screen_state("primary").unwrap();
        assert_eq!(state.window_count(), MAX_WINDOWS_PER_SCREEN);
    }

    #[test]
    fn test_smart_gaps_single_window() {
        let mut engine = engine_with_screen();
        let config = AutotileConfig {
            split_ratio: 0.6,
            inner_gap: 10,
            outer_gap: 10,
            smart_gaps: true,
            focus_new_windows: false,
            ..AutotileConfig::default()
        };
        engine.sync_from_settings(config, &["primary".to_string()]);
        engine.drain_notifications();

        engine.window_opened("w1", "primary", None, None);
        let zones = last_tiled_zones(&mut engine);
        assert_eq!(zones[0].zone, Rect::new(0, 0, 1000, 1000));

        engine.window_opened("w2", "primary", None, None);
        let zones = last_tiled_zones(&mut engine);
        assert_eq!(zones[0].zone.x, 10);
        assert_eq!(zones[0].zone.y, 10);
    }

    #[test]
    fn test_disable_screen_releases_windows() {
        let mut engine = engine_with_screen();
        engine.window_opened("w1", "primary", None, None);
        engine.window_opened("w2", "primary", None, None);
        engine.drain_notifications();

        engine.disable_screen("primary");
        let released = engine
            .drain_notifications()
            .into_iter()
            .find_map(|n| match n {
                Notification::WindowsReleased { windows } => Some(windows),
                _ => None,
            })
            .unwrap();
        assert_eq!(released, ["w1", "w2"]);
        assert!(!engine.is_screen_tiled("primary"));

        // Re-enabling allows the same windows to be tracked again.
        engine.enable_screen("primary", None);
        engine.window_opened("w1", "primary", None, None);
        assert!(engine.screen_state("primary").unwrap().contains("w1"));
    }

    #[test]
    fn test_window_closed_retiles() {
        let mut engine = engine_with_screen();
        for id in ["w1", "w2"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.drain_notifications();
        engine.window_closed("w1");
        let zones = last_tiled_zones(&mut engine);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].window, "w2");
    }

    #[test]
    fn test_focus_next_wraps() {
        let mut engine = engine_with_screen();
        for id in ["w1", "w2", "w3"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.window_focused("w3", Some("primary"));
        engine.drain_notifications();

        engine.focus_next();
        let notes = engine.drain_notifications();
        assert!(notes
            .iter()
            .any(|n| matches!(n, Notification::FocusWindow { window } if window == "w1")));
        let state = engine.screen_state("primary").unwrap();
        assert_eq!(state.focused().map(String::as_str), Some("w1"));
    }

    #[test]
    fn test_focus_previous_wraps() {
        let mut engine = engine_with_screen();
        for id in ["w1", "w2"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.window_focused("w1", Some("primary"));
        engine.drain_notifications();

        engine.focus_previous();
        let state = engine.screen_state("primary").unwrap();
        assert_eq!(state.focused().map(String::as_str), Some("w2"));
    }

    #[test]
    fn test_rotate_requires_two_windows() {
        let mut engine = engine_with_screen();
        engine.window_opened("w1", "primary", None, None);
        engine.window_focused("w1", Some("primary"));
        engine.drain_notifications();

        engine.rotate_window_order(true);
        let notes = engine.drain_notifications();
        let feedback = notes
            .iter()
            .find_map(|n| match n {
                Notification::Feedback {
                    succeeded, reason, ..
                } => Some((*succeeded, reason.clone())),
                _ => None,
            })
            .unwrap();
        assert!(!feedback.0);
        assert_eq!(feedback.1.as_deref(), Some("nothing_to_rotate"));
    }

    #[test]
    fn test_rotate_shifts_order() {
        let mut engine = engine_with_screen();
        for id in ["w1", "w2", "w3"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.window_focused("w1", Some("primary"));
        engine.rotate_window_order(true);
        let state = engine.screen_state("primary").unwrap();
        assert_eq!(state.window_order(), ["w3", "w1", "w2"]);
    }

    #[test]
    fn test_swap_with_master() {
        let mut engine = engine_with_screen();
        for id in ["w1", "w2", "w3"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.window_focused("w3", Some("primary"));
        engine.drain_notifications();

        engine.swap_focused_with_master();
        let state = engine.screen_state("primary").unwrap();
        assert_eq!(state.window_order(), ["w3", "w2", "w1"]);

        let notes = engine.drain_notifications();
        assert!(notes.iter().any(|n| matches!(
            n,
            Notification::Feedback {
                succeeded: true,
                target_zone: Some(0),
                ..
            }
        )));
    }

    #[test]
    fn test_swap_with_master_already_master() {
        let mut engine = engine_with_screen();
        for id in ["w1", "w2"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.window_focused("w1", Some("primary"));
        engine.drain_notifications();

        engine.swap_focused_with_master();
        let notes = engine.drain_notifications();
        assert!(notes.iter().any(|n| matches!(
            n,
            Notification::Feedback {
                succeeded: false,
                reason: Some(reason),
                ..
            } if reason == "already_master"
        )));
    }

    #[test]
    fn test_promote_and_demote() {
        let mut engine = engine_with_screen();
        for id in ["w1", "w2", "w3"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.promote_to_master(Some("w3"));
        assert_eq!(
            engine.screen_state("primary").unwrap().window_order(),
            ["w3", "w1", "w2"]
        );

        engine.demote_from_master(Some("w3"));
        assert_eq!(
            engine.screen_state("primary").unwrap().window_order(),
            ["w1", "w3", "w2"]
        );
    }

    #[test]
    fn test_focus_naming_wrong_screen_keeps_tracking() {
        let mut engine = engine_with_screen();
        engine.window_opened("w1", "primary", None, None);
        engine.window_opened("w2", "primary", None, None);
        engine.enable_screen("secondary", Some(Rect::new(1000, 0, 1000, 1000)));
        engine.drain_notifications();

        // A focus event naming a screen that does not track the window
        // must not detach it from where it is tiled.
        engine.window_focused("w1", Some("secondary"));
        assert!(engine.screen_state("secondary").unwrap().window_order().is_empty());
        assert_eq!(
            engine.screen_state("primary").unwrap().focused().map(String::as_str),
            Some("w1")
        );

        engine.window_closed("w1");
        assert_eq!(engine.screen_state("primary").unwrap().window_order(), ["w2"]);
    }

    #[test]
    fn test_demote_master_with_floating_predecessor() {
        let mut engine = engine_with_screen();
        for id in ["f", "w1", "w2"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.float_window("f");

        // With "f" floating at position 0, "w1" is the tiled master.
        engine.demote_from_master(Some("w1"));
        assert_eq!(
            engine.screen_state("primary").unwrap().window_order(),
            ["f", "w2", "w1"]
        );
        let state = engine.screen_state("primary").unwrap();
        assert_eq!(state.tiled_windows(), ["w2", "w1"]);
    }

    #[test]
    fn test_promote_with_floating_predecessor() {
        let mut engine = engine_with_screen();
        for id in ["f", "w1", "w2"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.float_window("f");

        engine.promote_to_master(Some("w2"));
        assert_eq!(
            engine.screen_state("primary").unwrap().window_order(),
            ["f", "w2", "w1"]
        );
    }

    #[test]
    fn test_minimum_size_respected() {
        let mut engine = engine_with_screen();
        engine.window_opened("w1", "primary", None, None);
        engine.window_opened("w2", "primary", None, Some(600));
        engine.window_opened("w3", "primary", None, Some(600));

        let zones = last_tiled_zones(&mut engine);
        // Stack column holds w2 and w3; both request 600 of 1000px, so
        // space is distributed proportionally (500 each) and the residual
        // shortfall exceeds the correction bound.
        assert_eq!(zones.len(), 3);
        assert!(zones[1].zone.height >= 500);
        assert!(zones[2].zone.height >= 500);
    }

    #[test]
    fn test_monocle_visibility() {
        let mut engine = engine_with_screen();
        let config = AutotileConfig {
            algorithm_id: "monocle".to_string(),
            monocle_hide_others: true,
            inner_gap: 0,
            outer_gap: 0,
            smart_gaps: false,
            focus_new_windows: false,
            ..AutotileConfig::default()
        };
        engine.sync_from_settings(config, &["primary".to_string()]);
        engine.drain_notifications();

        for id in ["w1", "w2", "w3"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.drain_notifications();
        engine.window_focused("w2", Some("primary"));

        let notes = engine.drain_notifications();
        let (show, hide) = notes
            .into_iter()
            .rev()
            .find_map(|n| match n {
                Notification::MonocleVisibility { show, hide } => Some((show, hide)),
                _ => None,
            })
            .unwrap();
        assert_eq!(show, "w2");
        assert_eq!(hide.len(), 2);
        assert!(!hide.contains(&"w2".to_string()));
    }

    #[test]
    fn test_zone_count_fault_keeps_stale_geometry() {
        use autotile_core::TilingAlgorithm;

        struct BrokenAlgorithm;

        impl TilingAlgorithm for BrokenAlgorithm {
            fn id(&self) -> &'static str {
                "broken"
            }

            fn display_name(&self) -> &'static str {
                "Broken"
            }

            fn calculate_zones(&mut self, _params: &LayoutParams) -> Vec<Rect> {
                Vec::new()
            }
        }

        let mut engine = engine_with_screen();
        engine.window_opened("w1", "primary", None, None);
        engine.window_opened("w2", "primary", None, None);
        engine.drain_notifications();

        engine.registry.register(Box::new(BrokenAlgorithm));
        engine.set_algorithm("broken");

        // The fault is logged and the previous geometry survives; no
        // partial layout is ever applied.
        let notes = engine.drain_notifications();
        assert!(!notes
            .iter()
            .any(|n| matches!(n, Notification::WindowsTiled { .. })));
        let state = engine.screen_state("primary").unwrap();
        assert_eq!(state.last_geometry().len(), 2);
    }

    #[test]
    fn test_sync_from_settings_reconciles_screens() {
        let mut engine = engine_with_screen();
        engine.window_opened("w1", "primary", None, None);
        engine.drain_notifications();

        let config = AutotileConfig {
            algorithm_id: "bogus".to_string(),
            split_ratio: 0.7,
            focus_new_windows: false,
            ..AutotileConfig::default()
        };
        engine.sync_from_settings(config, &["secondary".to_string()]);

        assert_eq!(engine.algorithm(), DEFAULT_ALGORITHM);
        assert!(!engine.is_screen_tiled("primary"));
        assert!(engine.is_screen_tiled("secondary"));

        let notes = engine.drain_notifications();
        assert!(notes.iter().any(|n| matches!(
            n,
            Notification::WindowsReleased { windows } if windows == &["w1".to_string()]
        )));
    }

    #[test]
    fn test_settings_retile_is_debounced() {
        let mut engine = engine_with_screen();
        engine.window_opened("w1", "primary", None, None);
        engine.window_opened("w2", "primary", None, None);
        engine.drain_notifications();

        engine.set_inner_gap(20);
        engine.set_outer_gap(20);
        // No retile yet, only a pending deadline.
        assert!(engine.retile_deadline().is_some());
        assert!(last_tiled_zones(&mut engine).is_empty());

        let deadline = engine.retile_deadline().unwrap();
        engine.fire_debounce(deadline);
        let zones = last_tiled_zones(&mut engine);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].zone.x, 20);
    }

    #[test]
    fn test_adjust_split_ratio_retiles_immediately() {
        let mut engine = engine_with_screen();
        engine.window_opened("w1", "primary", None, None);
        engine.window_opened("w2", "primary", None, None);
        engine.drain_notifications();

        engine.adjust_split_ratio(0.1);
        let zones = last_tiled_zones(&mut engine);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].zone.width, 700);
    }

    #[test]
    fn test_adjust_master_count_broadcasts() {
        let mut engine = engine_with_screen();
        for id in ["w1", "w2", "w3"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.drain_notifications();

        engine.adjust_master_count(true);
        assert_eq!(engine.config().master_count, 2);
        assert_eq!(engine.screen_state("primary").unwrap().master_count(), 2);
        let zones = last_tiled_zones(&mut engine);
        // Two masters share the left column.
        assert_eq!(zones[0].zone.width, 600);
        assert_eq!(zones[1].zone.x, 0);
    }

    #[test]
    fn test_geometry_change_retiles() {
        let mut engine = engine_with_screen();
        engine.window_opened("w1", "primary", None, None);
        engine.drain_notifications();

        engine.screen_geometry_changed("primary", Rect::new(0, 0, 800, 600));
        let zones = last_tiled_zones(&mut engine);
        assert_eq!(zones[0].zone, Rect::new(0, 0, 800, 600));
    }

    #[test]
    fn test_retile_guard_blocks_nested_full_pass() {
        let engine = engine_with_screen();
        let outer = RetileGuard::acquire(&engine.retiling);
        assert!(outer.is_some());
        assert!(RetileGuard::acquire(&engine.retiling).is_none());
        drop(outer);
        assert!(RetileGuard::acquire(&engine.retiling).is_some());
    }

    #[test]
    fn test_operation_retiles_while_guard_held() {
        let mut engine = engine_with_screen();
        for id in ["w1", "w2"] {
            engine.window_opened(id, "primary", None, None);
        }
        engine.drain_notifications();

        // Simulate an operation arriving while an outer retile holds the
        // flag: a single apply for the screen still happens.
        let outer = RetileGuard::acquire(&engine.retiling).unwrap();
        engine.swap_windows("w1", "w2");
        drop(outer);

        let zones = last_tiled_zones(&mut engine);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].window, "w2");
        // The flag was not released by the nested path.
        assert!(!engine.retiling.load(Ordering::SeqCst));
    }

    #[test]
    fn test_opened_on_untiled_screen_is_ignored() {
        let mut engine = engine_with_screen();
        engine.window_opened("w1", "nope", None, None);
        assert!(engine.screen_state("nope").is_none());
        assert!(last_tiled_zones(&mut engine).is_empty());
    }

    #[test]
    fn test_focus_new_windows_requests_focus() {
        let mut engine = engine_with_screen();
        let config = AutotileConfig {
            focus_new_windows: true,
            ..AutotileConfig::default()
        };
        engine.sync_from_settings(config, &["primary".to_string()]);
        engine.drain_notifications();

        engine.window_opened("w1", "primary", None, None);
        let notes = engine.drain_notifications();
        assert!(notes
            .iter()
            .any(|n| matches!(n, Notification::FocusWindow { window } if window == "w1")));
    }

    #[test]
    fn test_insert_after_focused() {
        let mut engine = engine_with_screen();
        let config = AutotileConfig {
            insert_position: InsertPosition::AfterFocused,
            focus_new_windows: false,
            ..AutotileConfig::default()
        };
        engine.sync_from_settings(config, &["primary".to_string()]);

        engine.window_opened("w1", "primary", None, None);
        engine.window_opened("w2", "primary", None, None);
        engine.window_focused("w1", Some("primary"));
        engine.window_opened("w3", "primary", None, None);

        let state = engine.screen_state("primary").unwrap();
        assert_eq!(state.window_order(), ["w1", "w3", "w2"]);
    }

    #[test]
    fn test_enforce_minimum_heights_bounded() {
        let mut zones = vec![Rect::new(0, 0, 100, 90), Rect::new(0, 100, 100, 40)];
        let mins = vec![
            MinSize {
                width: 0,
                height: 100,
            },
            MinSize {
                width: 0,
                height: 200,
            },
        ];
        enforce_minimum_heights(&mut zones, &mins, 5);
        // 10px shortfall is within inner_gap + slack, corrected.
        assert_eq!(zones[0].height, 100);
        // 160px shortfall is beyond the bound, left alone.
        assert_eq!(zones[1].height, 40);
    }
}
