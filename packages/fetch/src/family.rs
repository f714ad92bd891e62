//! The three statistic families and what one fetch means for each.

use std::fmt;

use geostats_stats_models::{CrimeFilter, IndicatorFilter, StatRow, ViewMode};
use serde::{Deserialize, Serialize};

use crate::{FetchError, StatsSource};

/// A statistic family: its filter shape, its dataset shape and how one
/// filter is turned into one dataset.
#[async_trait::async_trait]
pub trait Family: Send + Sync + 'static {
    /// Filter selecting what to fetch.
    type Filter: Clone + fmt::Debug + PartialEq + Send + Sync + 'static;
    /// Dataset produced by one successful fetch.
    type Data: Clone + fmt::Debug + Default + Send + Sync + 'static;

    /// The view mode this family is shown under.
    fn view_mode(&self) -> ViewMode;

    /// Fetches the dataset for `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if any underlying call fails.
    async fn fetch(
        &self,
        source: &dyn StatsSource,
        filter: &Self::Filter,
    ) -> Result<Self::Data, FetchError>;
}

/// Crime dataset: one row set per drill-down hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeData {
    /// Department rows at the country level, municipality rows once a
    /// department is selected.
    pub areas: Vec<StatRow>,
    /// Year rows at the time root, month rows once a year is selected.
    pub periods: Vec<StatRow>,
}

/// Crime incidents. Each fetch queries the area and period axes
/// concurrently; both belong to the same request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrimeFamily;

#[async_trait::async_trait]
impl Family for CrimeFamily {
    type Filter = CrimeFilter;
    type Data = CrimeData;

    fn view_mode(&self) -> ViewMode {
        ViewMode::Crime
    }

    async fn fetch(
        &self,
        source: &dyn StatsSource,
        filter: &CrimeFilter,
    ) -> Result<CrimeData, FetchError> {
        let areas = async {
            match filter.department_code {
                Some(department) => source.crime_by_municipality(filter, department).await,
                None => source.crime_by_department(filter).await,
            }
        };
        let periods = async {
            match filter.year {
                Some(year) => source.crime_by_month(filter, year).await,
                None => source.crime_by_year(filter).await,
            }
        };

        let (areas, periods) = tokio::try_join!(areas, periods)?;
        Ok(CrimeData { areas, periods })
    }
}

/// Census fundamental counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FundamentalFamily;

#[async_trait::async_trait]
impl Family for FundamentalFamily {
    type Filter = IndicatorFilter;
    type Data = Vec<StatRow>;

    fn view_mode(&self) -> ViewMode {
        ViewMode::Fundamental
    }

    async fn fetch(
        &self,
        source: &dyn StatsSource,
        filter: &IndicatorFilter,
    ) -> Result<Vec<StatRow>, FetchError> {
        source.fundamental_indicator(filter).await
    }
}

/// Derived primary rate indicators.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryFamily;

#[async_trait::async_trait]
impl Family for PrimaryFamily {
    type Filter = IndicatorFilter;
    type Data = Vec<StatRow>;

    fn view_mode(&self) -> ViewMode {
        ViewMode::Primary
    }

    async fn fetch(
        &self,
        source: &dyn StatsSource,
        filter: &IndicatorFilter,
    ) -> Result<Vec<StatRow>, FetchError> {
        source.primary_indicator(filter).await
    }
}
