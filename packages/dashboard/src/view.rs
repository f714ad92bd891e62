//! One family's controller together with its drill-down stacks.
//!
//! The stacks are the source of truth for the scope fields of a filter
//! (department, municipality, year, month): every filter handed to the
//! controller is first scoped by [`Drillable::scope`]. Area rows always
//! belong to the geography level on top of the stack: every geography move
//! drops them before the new level's rows are fetched.

use std::sync::Arc;

use geostats_fetch::{
    CrimeData, CrimeFamily, Family, FetchController, FetchState, FetchStatus, FundamentalFamily,
    PrimaryFamily, RequestId,
};
use geostats_stats_models::{
    AdminCode, Axis, CrimeFilter, GeoLevel, IndicatorFilter, StatRow, TimeLevel, ViewMode,
};

use crate::drill::{DrillDownStack, DrillError};

/// A family that can be drilled into.
pub trait Drillable: Family {
    /// Whether the family has a time hierarchy.
    const TIME_AXIS: bool;

    /// `filter` with its scope fields taken from the stacks.
    fn scope(
        filter: &Self::Filter,
        geography: &DrillDownStack<GeoLevel>,
        time: &DrillDownStack<TimeLevel>,
    ) -> Self::Filter;

    /// Drops the part of `data` that belongs to a level of `axis` being
    /// left.
    fn clear_axis(data: &mut Self::Data, axis: Axis);

    /// Rows keyed by area code, for the map join.
    fn area_rows(data: &Self::Data) -> &[StatRow];
}

impl Drillable for CrimeFamily {
    const TIME_AXIS: bool = true;

    fn scope(
        filter: &CrimeFilter,
        geography: &DrillDownStack<GeoLevel>,
        time: &DrillDownStack<TimeLevel>,
    ) -> CrimeFilter {
        CrimeFilter {
            department_code: geography.department(),
            municipality_code: geography.municipality(),
            year: time.year(),
            month: time.month(),
            ..filter.clone()
        }
    }

    fn clear_axis(data: &mut CrimeData, axis: Axis) {
        match axis {
            Axis::Geography => data.areas.clear(),
            Axis::Time => data.periods.clear(),
        }
    }

    fn area_rows(data: &CrimeData) -> &[StatRow] {
        &data.areas
    }
}

fn scope_indicator(filter: &IndicatorFilter, geography: &DrillDownStack<GeoLevel>) -> IndicatorFilter {
    IndicatorFilter {
        department_code: geography.department(),
        municipality_code: geography.municipality(),
        ..filter.clone()
    }
}

fn clear_indicator(data: &mut Vec<StatRow>, axis: Axis) {
    if axis == Axis::Geography {
        data.clear();
    }
}

impl Drillable for FundamentalFamily {
    const TIME_AXIS: bool = false;

    fn scope(
        filter: &IndicatorFilter,
        geography: &DrillDownStack<GeoLevel>,
        _time: &DrillDownStack<TimeLevel>,
    ) -> IndicatorFilter {
        scope_indicator(filter, geography)
    }

    fn clear_axis(data: &mut Vec<StatRow>, axis: Axis) {
        clear_indicator(data, axis);
    }

    fn area_rows(data: &Vec<StatRow>) -> &[StatRow] {
        data
    }
}

impl Drillable for PrimaryFamily {
    const TIME_AXIS: bool = false;

    fn scope(
        filter: &IndicatorFilter,
        geography: &DrillDownStack<GeoLevel>,
        _time: &DrillDownStack<TimeLevel>,
    ) -> IndicatorFilter {
        scope_indicator(filter, geography)
    }

    fn clear_axis(data: &mut Vec<StatRow>, axis: Axis) {
        clear_indicator(data, axis);
    }

    fn area_rows(data: &Vec<StatRow>) -> &[StatRow] {
        data
    }
}

/// Family-independent operations on a view, so the dashboard can act on
/// whichever family is active.
pub trait DrillView {
    /// The view's family.
    fn view_mode(&self) -> ViewMode;

    /// Fetch status of the family.
    fn status(&self) -> FetchStatus;

    /// The geography stack.
    fn geography(&self) -> &DrillDownStack<GeoLevel>;

    /// The time stack.
    fn time(&self) -> &DrillDownStack<TimeLevel>;

    /// Moves the geography stack to `level`, drops the area rows of the
    /// level left and fetches.
    ///
    /// # Errors
    ///
    /// Returns [`DrillError`] if `level` has no parent on the stack.
    fn select_geo(&mut self, level: GeoLevel) -> Result<RequestId, DrillError>;

    /// Pushes a time level and fetches.
    ///
    /// # Errors
    ///
    /// Returns [`DrillError`] if the family has no time axis or the level
    /// may not follow the current one.
    fn push_time(&mut self, level: TimeLevel) -> Result<RequestId, DrillError>;

    /// Pops the top level of `axis`. `Ok(None)` at the root, where nothing
    /// is fetched.
    ///
    /// # Errors
    ///
    /// Returns [`DrillError::Unsupported`] for the time axis of a family
    /// without one.
    fn pop(&mut self, axis: Axis) -> Result<Option<RequestId>, DrillError>;

    /// Takes over `geography` without fetching. Area rows are dropped if
    /// the stack moved.
    fn stage_geography(&mut self, geography: &DrillDownStack<GeoLevel>);

    /// Re-fetches if the family is idle.
    fn reactivate(&self) -> Option<RequestId>;

    /// Current area rows, for the map join.
    fn area_rows(&self) -> Vec<StatRow>;
}

/// A family's controller and drill-down stacks.
#[derive(Debug)]
pub struct FamilyView<F: Drillable> {
    controller: Arc<FetchController<F>>,
    geography: DrillDownStack<GeoLevel>,
    time: DrillDownStack<TimeLevel>,
}

impl<F: Drillable> FamilyView<F> {
    /// A view at both roots.
    #[must_use]
    pub fn new(controller: FetchController<F>) -> Self {
        Self {
            controller: Arc::new(controller),
            geography: DrillDownStack::new(),
            time: DrillDownStack::new(),
        }
    }

    /// The family's controller.
    #[must_use]
    pub const fn controller(&self) -> &Arc<FetchController<F>> {
        &self.controller
    }

    /// Snapshot of the family's state.
    #[must_use]
    pub fn state(&self) -> FetchState<F::Data> {
        self.controller.state()
    }

    /// The filter in effect, scope fields included.
    #[must_use]
    pub fn filter(&self) -> F::Filter {
        self.controller.filter()
    }

    /// Applies `filter`, scoped to the current drill-down levels.
    pub fn apply_filter(&mut self, filter: &F::Filter) -> RequestId {
        self.controller.apply(self.scoped(filter))
    }

    /// Pushes a geography level, drops the parent level's area rows and
    /// fetches its scope.
    ///
    /// # Errors
    ///
    /// Returns [`DrillError::InvalidParent`] if `level` may not follow the
    /// current level.
    pub fn push_geo(&mut self, level: GeoLevel) -> Result<RequestId, DrillError> {
        self.geography.push(level)?;
        Ok(self.refetch_clearing(Axis::Geography))
    }

    /// Selects a department, replacing any deeper selection.
    ///
    /// # Errors
    ///
    /// Never fails in practice; kept fallible like the other selections.
    pub fn select_department(&mut self, code: AdminCode) -> Result<RequestId, DrillError> {
        self.select_geo(GeoLevel::Department(code))
    }

    /// Selects a municipality of the selected department.
    ///
    /// # Errors
    ///
    /// Returns [`DrillError::InvalidParent`] if no department is selected.
    pub fn select_municipality(&mut self, code: AdminCode) -> Result<RequestId, DrillError> {
        self.select_geo(GeoLevel::Municipality(code))
    }

    /// Pops the geography stack and fetches the parent scope, dropping the
    /// popped level's area rows. No-op at the root.
    pub fn pop_geo(&mut self) -> Option<RequestId> {
        self.geography.pop()?;
        Some(self.refetch_clearing(Axis::Geography))
    }

    /// Pops the time stack; see [`DrillView::pop`].
    ///
    /// # Errors
    ///
    /// Returns [`DrillError::Unsupported`] if the family has no time axis.
    pub fn pop_time(&mut self) -> Result<Option<RequestId>, DrillError> {
        self.require_time()?;
        if self.time.pop().is_none() {
            return Ok(None);
        }
        Ok(Some(self.refetch_clearing(Axis::Time)))
    }

    fn scoped(&self, filter: &F::Filter) -> F::Filter {
        F::scope(filter, &self.geography, &self.time)
    }

    fn refetch(&self) -> RequestId {
        self.controller.apply(self.scoped(&self.controller.filter()))
    }

    fn refetch_clearing(&self, axis: Axis) -> RequestId {
        let filter = self.scoped(&self.controller.filter());
        self.controller
            .apply_and_clear(filter, |data| F::clear_axis(data, axis))
    }

    fn require_time(&self) -> Result<(), DrillError> {
        if F::TIME_AXIS {
            Ok(())
        } else {
            Err(DrillError::Unsupported {
                mode: self.controller.family().view_mode(),
                axis: Axis::Time,
            })
        }
    }
}

impl<F: Drillable> DrillView for FamilyView<F> {
    fn view_mode(&self) -> ViewMode {
        self.controller.family().view_mode()
    }

    fn status(&self) -> FetchStatus {
        self.controller.state().status
    }

    fn geography(&self) -> &DrillDownStack<GeoLevel> {
        &self.geography
    }

    fn time(&self) -> &DrillDownStack<TimeLevel> {
        &self.time
    }

    fn select_geo(&mut self, level: GeoLevel) -> Result<RequestId, DrillError> {
        self.geography.select(level)?;
        Ok(self.refetch_clearing(Axis::Geography))
    }

    fn push_time(&mut self, level: TimeLevel) -> Result<RequestId, DrillError> {
        self.require_time()?;
        self.time.push(level)?;
        Ok(self.refetch())
    }

    fn pop(&mut self, axis: Axis) -> Result<Option<RequestId>, DrillError> {
        match axis {
            Axis::Geography => Ok(self.pop_geo()),
            Axis::Time => self.pop_time(),
        }
    }

    fn stage_geography(&mut self, geography: &DrillDownStack<GeoLevel>) {
        let moved = self.geography != *geography;
        self.geography = geography.clone();
        let filter = self.scoped(&self.controller.filter());
        if moved {
            self.controller
                .stage_and_clear(filter, |data| F::clear_axis(data, Axis::Geography));
        } else {
            self.controller.stage(filter);
        }
    }

    fn reactivate(&self) -> Option<RequestId> {
        if self.status() != FetchStatus::Idle {
            return None;
        }
        log::debug!("{} reactivated while idle, refreshing", self.view_mode());
        Some(self.controller.refresh())
    }

    fn area_rows(&self) -> Vec<StatRow> {
        F::area_rows(&self.controller.state().data).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geostats_fetch::StatsSource;
    use geostats_fetch::fake::{Endpoint, ScriptedSource, row};
    use geostats_stats_models::CrimeVariable;

    fn crime_view(source: &Arc<ScriptedSource>) -> FamilyView<CrimeFamily> {
        FamilyView::new(FetchController::new(
            CrimeFamily,
            Arc::clone(source) as Arc<dyn StatsSource>,
            CrimeFilter::default(),
        ))
    }

    fn fundamental_view(source: &Arc<ScriptedSource>) -> FamilyView<FundamentalFamily> {
        FamilyView::new(FetchController::new(
            FundamentalFamily,
            Arc::clone(source) as Arc<dyn StatsSource>,
            IndicatorFilter::new("male_count"),
        ))
    }

    #[tokio::test]
    async fn push_scopes_the_filter() {
        let source = Arc::new(ScriptedSource::new());
        let mut view = crime_view(&source);

        view.apply_filter(&CrimeFilter::new("HOMICIDIOS", CrimeVariable::AgeGroup));
        view.push_geo(GeoLevel::Department(AdminCode::new(5))).unwrap();
        view.push_time(TimeLevel::Year { year: 2022 }).unwrap();

        let filter = view.filter();
        assert_eq!(filter.crime_type, "HOMICIDIOS");
        assert_eq!(filter.department_code, Some(AdminCode::new(5)));
        assert_eq!(filter.year, Some(2022));
    }

    #[tokio::test]
    async fn apply_filter_cannot_escape_the_stacks() {
        let source = Arc::new(ScriptedSource::new());
        let mut view = crime_view(&source);

        let mut filter = CrimeFilter::default();
        filter.department_code = Some(AdminCode::new(8));
        view.apply_filter(&filter);
        assert_eq!(view.filter().department_code, None);
    }

    #[tokio::test]
    async fn pop_clears_only_the_left_axis() {
        let source = Arc::new(ScriptedSource::new());
        let mut view = crime_view(&source);
        view.push_geo(GeoLevel::Department(AdminCode::new(5))).unwrap();
        let id = view.controller().state().request_id;
        view.controller().on_resolve(
            id,
            Ok(CrimeData {
                areas: vec![row("001", 3.0)],
                periods: vec![row("2022", 3.0)],
            }),
        );

        let popped = view.pop_geo();
        assert!(popped.is_some());
        let state = view.state();
        assert_eq!(state.status, FetchStatus::Loading);
        assert!(state.data.areas.is_empty());
        assert_eq!(state.data.periods.len(), 1);
        assert_eq!(view.filter().department_code, None);
    }

    #[tokio::test]
    async fn selecting_a_department_drops_department_rows() {
        let source = Arc::new(ScriptedSource::new());
        let mut view = crime_view(&source);
        let id = view.apply_filter(&CrimeFilter::default());
        view.controller().on_resolve(
            id,
            Ok(CrimeData {
                areas: vec![row("05", 120_000.0), row("44", 90_000.0)],
                periods: vec![row("2022", 210_000.0)],
            }),
        );

        view.select_department(AdminCode::new(5)).unwrap();
        let state = view.state();
        assert_eq!(state.status, FetchStatus::Loading);
        assert!(state.data.areas.is_empty());
        assert_eq!(state.data.periods.len(), 1);
        assert!(view.area_rows().is_empty());
    }

    #[tokio::test]
    async fn staging_a_new_geography_drops_area_rows() {
        let source = Arc::new(ScriptedSource::new());
        let mut view = fundamental_view(&source);
        let id = view.apply_filter(&IndicatorFilter::new("male_count"));
        view.controller()
            .on_resolve(id, Ok(vec![row("05", 40.0), row("44", 12.0)]));

        let unchanged = view.geography().clone();
        view.stage_geography(&unchanged);
        assert_eq!(view.area_rows().len(), 2);

        let mut geography = DrillDownStack::new();
        geography
            .push(GeoLevel::Department(AdminCode::new(5)))
            .unwrap();
        view.stage_geography(&geography);
        assert_eq!(view.status(), FetchStatus::Idle);
        assert!(view.area_rows().is_empty());
    }

    #[tokio::test]
    async fn pop_at_root_fetches_nothing() {
        let source = Arc::new(ScriptedSource::new());
        let mut view = crime_view(&source);
        assert_eq!(view.pop_geo(), None);
        assert_eq!(view.pop(Axis::Time), Ok(None));
        assert_eq!(view.status(), FetchStatus::Idle);
        tokio::task::yield_now().await;
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn indicator_families_have_no_time_axis() {
        let source = Arc::new(ScriptedSource::new());
        let mut view = fundamental_view(&source);
        assert_eq!(
            view.push_time(TimeLevel::Year { year: 2022 }),
            Err(DrillError::Unsupported {
                mode: ViewMode::Fundamental,
                axis: Axis::Time,
            })
        );
        assert!(view.pop(Axis::Time).is_err());
        assert_eq!(view.status(), FetchStatus::Idle);
    }

    #[tokio::test]
    async fn municipality_fetch_carries_department() {
        let source = Arc::new(ScriptedSource::new());
        source.respond_with(Endpoint::Fundamental, vec![row("001", 9.0)]);
        let mut view = fundamental_view(&source);

        view.select_department(AdminCode::new(5)).unwrap();
        view.select_municipality(AdminCode::new(1)).unwrap();
        view.controller().settled().await;

        let filter = source.calls().last().unwrap().indicator.clone().unwrap();
        assert_eq!(filter.department_code, Some(AdminCode::new(5)));
        assert_eq!(filter.municipality_code, Some(AdminCode::new(1)));
        assert_eq!(view.area_rows().len(), 1);
    }

    #[tokio::test]
    async fn stage_then_reactivate() {
        let source = Arc::new(ScriptedSource::new());
        source.respond_with(Endpoint::Fundamental, vec![row("001", 9.0)]);
        let mut view = fundamental_view(&source);

        let mut geography = DrillDownStack::new();
        geography
            .push(GeoLevel::Department(AdminCode::new(5)))
            .unwrap();
        view.stage_geography(&geography);
        assert_eq!(view.filter().department_code, Some(AdminCode::new(5)));
        assert_eq!(view.status(), FetchStatus::Idle);

        assert!(view.reactivate().is_some());
        let state = view.controller().settled().await;
        assert_eq!(state.status, FetchStatus::Ready);
        assert!(view.reactivate().is_none());
    }
}
