//! Process-wide active view mode and cross-family cancellation.

use std::sync::Weak;

use geostats_fetch::Cancellable;
use geostats_stats_models::ViewMode;

/// Derives the view mode a navigation section stands for. Unknown
/// sections fall back to [`ViewMode::Crime`].
#[must_use]
pub fn view_mode_for_section(section: &str) -> ViewMode {
    let section = section.trim().trim_start_matches('/');
    let head = section.split('/').next().unwrap_or_default();
    match head.to_ascii_lowercase().as_str() {
        "indicator" | "indicators" | "fundamental" | "map-area-details" => ViewMode::Fundamental,
        "primary" => ViewMode::Primary,
        _ => ViewMode::Crime,
    }
}

/// Owns the active [`ViewMode`] and holds non-owning handles to every
/// family's controller, which it may only cancel.
pub struct ViewModeCoordinator {
    active: ViewMode,
    controllers: Vec<Weak<dyn Cancellable>>,
}

impl std::fmt::Debug for ViewModeCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewModeCoordinator")
            .field("active", &self.active)
            .field("controllers", &self.controllers.len())
            .finish()
    }
}

impl Default for ViewModeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewModeCoordinator {
    /// A coordinator in the initial [`ViewMode::Crime`] state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: ViewMode::Crime,
            controllers: Vec::new(),
        }
    }

    /// The active view mode.
    #[must_use]
    pub const fn active(&self) -> ViewMode {
        self.active
    }

    /// Registers a controller for cancellation on mode switches.
    pub fn register(&mut self, controller: Weak<dyn Cancellable>) {
        self.controllers.push(controller);
    }

    /// Activates `mode`. Returns `false` without touching anything if it
    /// is already active; otherwise cancels every registered controller of
    /// another family.
    pub fn switch_to(&mut self, mode: ViewMode) -> bool {
        if mode == self.active {
            return false;
        }
        log::debug!("view mode {} -> {mode}", self.active);
        self.active = mode;

        self.controllers.retain(|controller| {
            let Some(controller) = controller.upgrade() else {
                return false;
            };
            if controller.view_mode() != mode {
                controller.cancel();
            }
            true
        });
        true
    }

    /// Re-derives the mode from a navigation section and switches to it.
    pub fn observe_section(&mut self, section: &str) -> bool {
        self.switch_to(view_mode_for_section(section))
    }
}
