//! The network boundary of the dashboard core.
//!
//! Every statistic the dashboard shows is fetched through a
//! [`StatsSource`]. The core never aborts a call explicitly: a cancelled
//! request's future is dropped, which for [`crate::http::HttpStatsSource`]
//! aborts the underlying transport. Correctness does not depend on that
//! abort succeeding, only on the controller's request-id check.

use geostats_stats_models::{AdminCode, CrimeFilter, IndicatorFilter, StatRow};

use crate::FetchError;

/// Source of statistic rows for all three families.
#[async_trait::async_trait]
pub trait StatsSource: Send + Sync {
    /// Crime totals per year.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, non-success status or
    /// an undecodable body.
    async fn crime_by_year(&self, filter: &CrimeFilter) -> Result<Vec<StatRow>, FetchError>;

    /// Crime totals per department.
    ///
    /// # Errors
    ///
    /// See [`StatsSource::crime_by_year`].
    async fn crime_by_department(&self, filter: &CrimeFilter)
    -> Result<Vec<StatRow>, FetchError>;

    /// Crime totals per month of `year`.
    ///
    /// # Errors
    ///
    /// See [`StatsSource::crime_by_year`].
    async fn crime_by_month(
        &self,
        filter: &CrimeFilter,
        year: i32,
    ) -> Result<Vec<StatRow>, FetchError>;

    /// Crime totals per municipality of `department`.
    ///
    /// # Errors
    ///
    /// See [`StatsSource::crime_by_year`].
    async fn crime_by_municipality(
        &self,
        filter: &CrimeFilter,
        department: AdminCode,
    ) -> Result<Vec<StatRow>, FetchError>;

    /// Fundamental (census count) indicator rows.
    ///
    /// # Errors
    ///
    /// See [`StatsSource::crime_by_year`].
    async fn fundamental_indicator(
        &self,
        filter: &IndicatorFilter,
    ) -> Result<Vec<StatRow>, FetchError>;

    /// Primary (rate) indicator rows.
    ///
    /// # Errors
    ///
    /// See [`StatsSource::crime_by_year`].
    async fn primary_indicator(&self, filter: &IndicatorFilter)
    -> Result<Vec<StatRow>, FetchError>;
}
