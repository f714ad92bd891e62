#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Drill-down dashboard core.
//!
//! [`Dashboard`] wires the three family views to one
//! [`ViewModeCoordinator`] and exposes the mutation entry points the
//! presentation layer calls: apply a filter, select a department or
//! municipality, drill forward or back, and switch the view mode. None of
//! them block; each schedules at most one fetch and reports failures
//! through the families' state.

pub mod config;
pub mod coordinator;
pub mod drill;
pub mod view;

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use geostats_fetch::{
    Cancellable, CrimeFamily, FetchController, FundamentalFamily, PrimaryFamily, RequestId, StatsSource,
};
use geostats_geography::{GeoFeature, Joined, PaletteRegistry, join};
use geostats_geography_models::{FeatureLevel, LegendEntry};
use geostats_stats_models::{
    AdminCode, Axis, CrimeFilter, GeoLevel, IndicatorFilter, TimeLevel, ViewMode,
};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use config::{ConfigError, DashboardConfig};
pub use coordinator::{ViewModeCoordinator, view_mode_for_section};
pub use drill::{DrillDownStack, DrillError, Level};
pub use view::{DrillView, Drillable, FamilyView};

/// Whether a drill-down selection in one family reaches the others.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SelectionPolicy {
    /// Selections only affect the active family.
    #[default]
    PerFamily,
    /// Inactive families take over the active family's geography stack
    /// without fetching, and fetch it once activated.
    Shared,
}

/// A filter for one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyFilter {
    /// Crime filter.
    Crime(CrimeFilter),
    /// Fundamental indicator filter.
    Fundamental(IndicatorFilter),
    /// Primary indicator filter.
    Primary(IndicatorFilter),
}

impl AnyFilter {
    /// The family this filter belongs to.
    #[must_use]
    pub const fn view_mode(&self) -> ViewMode {
        match self {
            Self::Crime(_) => ViewMode::Crime,
            Self::Fundamental(_) => ViewMode::Fundamental,
            Self::Primary(_) => ViewMode::Primary,
        }
    }
}

/// Initial filter of every family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultFilters {
    /// Crime family.
    pub crime: CrimeFilter,
    /// Fundamental family.
    pub fundamental: IndicatorFilter,
    /// Primary family.
    pub primary: IndicatorFilter,
}

impl Default for DefaultFilters {
    fn default() -> Self {
        Self {
            crime: CrimeFilter::default(),
            fundamental: IndicatorFilter::new("male_count"),
            primary: IndicatorFilter::new("population_density"),
        }
    }
}

/// The active family's data joined onto map features.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Choropleth {
    /// Family being shown.
    pub view_mode: ViewMode,
    /// Level of the features.
    pub level: FeatureLevel,
    /// Value and fill color per feature index.
    pub features: BTreeMap<usize, Joined<String>>,
    /// Legend of the scale used.
    pub legend: Vec<LegendEntry>,
}

/// The dashboard core.
#[derive(Debug)]
pub struct Dashboard {
    coordinator: ViewModeCoordinator,
    policy: SelectionPolicy,
    crime: FamilyView<CrimeFamily>,
    fundamental: FamilyView<FundamentalFamily>,
    primary: FamilyView<PrimaryFamily>,
}

impl Dashboard {
    /// A dashboard in crime mode at both roots. Nothing is fetched until
    /// the first mutation.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(
        source: Arc<dyn StatsSource>,
        filters: DefaultFilters,
        policy: SelectionPolicy,
    ) -> Self {
        let crime = FamilyView::new(FetchController::new(
            CrimeFamily,
            Arc::clone(&source),
            filters.crime,
        ));
        let fundamental = FamilyView::new(FetchController::new(
            FundamentalFamily,
            Arc::clone(&source),
            filters.fundamental,
        ));
        let primary = FamilyView::new(FetchController::new(
            PrimaryFamily,
            source,
            filters.primary,
        ));

        let mut coordinator = ViewModeCoordinator::new();
        coordinator.register(cancel_handle(crime.controller()));
        coordinator.register(cancel_handle(fundamental.controller()));
        coordinator.register(cancel_handle(primary.controller()));

        Self {
            coordinator,
            policy,
            crime,
            fundamental,
            primary,
        }
    }

    /// The active view mode.
    #[must_use]
    pub const fn view_mode(&self) -> ViewMode {
        self.coordinator.active()
    }

    /// The selection policy in effect.
    #[must_use]
    pub const fn selection_policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// The crime family.
    #[must_use]
    pub const fn crime(&self) -> &FamilyView<CrimeFamily> {
        &self.crime
    }

    /// The fundamental indicator family.
    #[must_use]
    pub const fn fundamental(&self) -> &FamilyView<FundamentalFamily> {
        &self.fundamental
    }

    /// The primary indicator family.
    #[must_use]
    pub const fn primary(&self) -> &FamilyView<PrimaryFamily> {
        &self.primary
    }

    /// The view of `mode`.
    #[must_use]
    pub fn view(&self, mode: ViewMode) -> &dyn DrillView {
        match mode {
            ViewMode::Crime => &self.crime,
            ViewMode::Fundamental => &self.fundamental,
            ViewMode::Primary => &self.primary,
        }
    }

    /// The active family's view.
    #[must_use]
    pub fn active(&self) -> &dyn DrillView {
        self.view(self.view_mode())
    }

    fn view_mut(&mut self, mode: ViewMode) -> &mut dyn DrillView {
        match mode {
            ViewMode::Crime => &mut self.crime,
            ViewMode::Fundamental => &mut self.fundamental,
            ViewMode::Primary => &mut self.primary,
        }
    }

    /// Applies `filter` to its family, switching to that family first if
    /// another one is active. The family only fetches `filter`; its previous
    /// filter is not refreshed on the way in.
    pub fn apply_filter(&mut self, filter: AnyFilter) -> RequestId {
        self.coordinator.switch_to(filter.view_mode());
        match filter {
            AnyFilter::Crime(filter) => self.crime.apply_filter(&filter),
            AnyFilter::Fundamental(filter) => self.fundamental.apply_filter(&filter),
            AnyFilter::Primary(filter) => self.primary.apply_filter(&filter),
        }
    }

    /// Re-fetches the active family's current filter.
    pub fn refresh(&self) -> RequestId {
        match self.view_mode() {
            ViewMode::Crime => self.crime.controller().refresh(),
            ViewMode::Fundamental => self.fundamental.controller().refresh(),
            ViewMode::Primary => self.primary.controller().refresh(),
        }
    }

    /// Selects a department in the active family.
    ///
    /// # Errors
    ///
    /// Never fails in practice: a department can always be selected from
    /// the country level.
    pub fn select_department(&mut self, code: AdminCode) -> Result<RequestId, DrillError> {
        self.select_geo(GeoLevel::Department(code))
    }

    /// Selects a municipality of the active family's department.
    ///
    /// # Errors
    ///
    /// Returns [`DrillError::InvalidParent`] if no department is selected.
    pub fn select_municipality(&mut self, code: AdminCode) -> Result<RequestId, DrillError> {
        self.select_geo(GeoLevel::Municipality(code))
    }

    /// Drills the active family's time hierarchy one level down.
    ///
    /// # Errors
    ///
    /// Returns [`DrillError`] if the family has no time axis or `level`
    /// may not follow the current one.
    pub fn drill_forward(&mut self, level: TimeLevel) -> Result<RequestId, DrillError> {
        let mode = self.view_mode();
        self.view_mut(mode).push_time(level)
    }

    /// Drills the active family one level back along `axis`. `Ok(None)` at
    /// the root.
    ///
    /// # Errors
    ///
    /// Returns [`DrillError::Unsupported`] for the time axis of an
    /// indicator family.
    pub fn drill_back(&mut self, axis: Axis) -> Result<Option<RequestId>, DrillError> {
        let mode = self.view_mode();
        let popped = self.view_mut(mode).pop(axis)?;
        if popped.is_some() && axis == Axis::Geography {
            self.share_geography();
        }
        Ok(popped)
    }

    /// Switches the view mode, cancelling the other families. A family
    /// that is idle when activated re-fetches its filter. Returns `false`
    /// if `mode` was already active.
    pub fn switch_view_mode(&mut self, mode: ViewMode) -> bool {
        if !self.coordinator.switch_to(mode) {
            return false;
        }
        self.view(mode).reactivate();
        true
    }

    /// Switches to the view mode a navigation section stands for.
    pub fn observe_section(&mut self, section: &str) -> bool {
        self.switch_view_mode(view_mode_for_section(section))
    }

    /// Feature level the active family's map shows.
    #[must_use]
    pub fn feature_level(&self) -> FeatureLevel {
        match self.active().geography().current() {
            GeoLevel::Country => FeatureLevel::Department,
            GeoLevel::Department(_) | GeoLevel::Municipality(_) => FeatureLevel::Municipality,
        }
    }

    /// Department whose municipalities the map shows, if any.
    #[must_use]
    pub fn feature_parent(&self) -> Option<AdminCode> {
        self.active().geography().department()
    }

    /// Joins the active family's area rows onto `features` with the
    /// family's palette at the current feature level. `None` if the
    /// registry has no palette for the family.
    #[must_use]
    pub fn choropleth(
        &self,
        features: &[GeoFeature],
        palettes: &PaletteRegistry,
    ) -> Option<Choropleth> {
        let view_mode = self.view_mode();
        let level = self.feature_level();
        let scale = palettes.scale(view_mode, level)?;
        let rows = self.active().area_rows();
        Some(Choropleth {
            view_mode,
            level,
            features: join(features, &rows, |value| scale.color_for(value).to_string()),
            legend: scale.legend(),
        })
    }

    fn select_geo(&mut self, level: GeoLevel) -> Result<RequestId, DrillError> {
        let mode = self.view_mode();
        let id = self.view_mut(mode).select_geo(level)?;
        self.share_geography();
        Ok(id)
    }

    fn share_geography(&mut self) {
        if self.policy != SelectionPolicy::Shared {
            return;
        }
        let active = self.view_mode();
        let geography = self.active().geography().clone();
        for mode in ViewMode::ALL {
            if mode != active {
                log::debug!("staging {} geography for {mode}", geography.current());
                self.view_mut(mode).stage_geography(&geography);
            }
        }
    }
}

fn cancel_handle<F: Drillable>(controller: &Arc<FetchController<F>>) -> Weak<dyn Cancellable> {
    let handle: Weak<FetchController<F>> = Arc::downgrade(controller);
    handle
}
