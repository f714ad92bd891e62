//! `reqwest` implementation of [`StatsSource`] against the statistics
//! backend.
//!
//! All endpoints are `POST` with a JSON filter body. Crime endpoints wrap
//! their rows in `{"data": [...]}`, indicator endpoints in
//! `{"results": [...]}`.

use geostats_stats_models::{AdminCode, CrimeFilter, IndicatorFilter, StatRow};
use serde_json::json;

use crate::retry::{self, RetryPolicy};
use crate::wire::{self, CRIME_ENVELOPE, INDICATOR_ENVELOPE};
use crate::{FetchError, StatsSource};

/// Crime totals per year.
pub const CRIME_BY_YEARS_PATH: &str = "/crime_type_by_years";
/// Crime totals per department.
pub const CRIME_BY_DEPARTMENT_PATH: &str = "/crime_type_by_department";
/// Crime totals per month of a year.
pub const CRIME_BY_MONTHS_PATH: &str = "/crime_type_by_months";
/// Crime totals per municipality of a department.
pub const CRIME_BY_MUNICIPALITIES_PATH: &str = "/crime_type_by_municipalities";
/// Fundamental indicator rows.
pub const FUNDAMENTAL_PATH: &str =
    "/fundamental_indicators/fetch_fundamental_indicator_data_fast_sql";
/// Primary indicator rows.
pub const PRIMARY_PATH: &str = "/primary_indicators/fetch_primary_indicator_data_fast_sql";

/// Statistics backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStatsSource {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpStatsSource {
    /// Creates a source for the backend at `base_url` (no trailing slash
    /// needed).
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// The normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_rows(
        &self,
        path: &str,
        body: serde_json::Value,
        envelope: &str,
    ) -> Result<Vec<StatRow>, FetchError> {
        let url = format!("{}{path}", self.base_url);
        log::debug!("POST {url} {body}");
        let response = retry::send_json(|| self.client.post(&url).json(&body), &self.retry).await?;
        let rows = wire::rows_from_envelope(&response, envelope);
        log::debug!("POST {url}: {} rows", rows.len());
        Ok(rows)
    }
}

/// Body shared by every crime endpoint.
fn crime_body(filter: &CrimeFilter) -> serde_json::Value {
    json!({
        "crime_type": filter.crime_type,
        "variable": filter.variable,
    })
}

#[async_trait::async_trait]
impl StatsSource for HttpStatsSource {
    async fn crime_by_year(&self, filter: &CrimeFilter) -> Result<Vec<StatRow>, FetchError> {
        self.post_rows(CRIME_BY_YEARS_PATH, crime_body(filter), CRIME_ENVELOPE)
            .await
    }

    async fn crime_by_department(
        &self,
        filter: &CrimeFilter,
    ) -> Result<Vec<StatRow>, FetchError> {
        let mut body = crime_body(filter);
        if let Some(year) = filter.year {
            body["year"] = json!(year);
        }
        self.post_rows(CRIME_BY_DEPARTMENT_PATH, body, CRIME_ENVELOPE)
            .await
    }

    async fn crime_by_month(
        &self,
        filter: &CrimeFilter,
        year: i32,
    ) -> Result<Vec<StatRow>, FetchError> {
        let mut body = crime_body(filter);
        body["year"] = json!(year);
        if let Some(department) = filter.department_code {
            body["department_code"] = json!(department);
        }
        self.post_rows(CRIME_BY_MONTHS_PATH, body, CRIME_ENVELOPE)
            .await
    }

    async fn crime_by_municipality(
        &self,
        filter: &CrimeFilter,
        department: AdminCode,
    ) -> Result<Vec<StatRow>, FetchError> {
        let mut body = crime_body(filter);
        body["department_code"] = json!(department);
        if let Some(year) = filter.year {
            body["year"] = json!(year);
        }
        self.post_rows(CRIME_BY_MUNICIPALITIES_PATH, body, CRIME_ENVELOPE)
            .await
    }

    async fn fundamental_indicator(
        &self,
        filter: &IndicatorFilter,
    ) -> Result<Vec<StatRow>, FetchError> {
        self.post_rows(FUNDAMENTAL_PATH, indicator_body(filter), INDICATOR_ENVELOPE)
            .await
    }

    async fn primary_indicator(
        &self,
        filter: &IndicatorFilter,
    ) -> Result<Vec<StatRow>, FetchError> {
        self.post_rows(PRIMARY_PATH, indicator_body(filter), INDICATOR_ENVELOPE)
            .await
    }
}

fn indicator_body(filter: &IndicatorFilter) -> serde_json::Value {
    json!({
        "column": filter.column,
        "department_code": filter.department_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geostats_stats_models::CrimeVariable;

    #[test]
    fn trims_trailing_slash() {
        let source = HttpStatsSource::new(
            reqwest::Client::new(),
            "https://example.test/",
            RetryPolicy::default(),
        );
        assert_eq!(source.base_url(), "https://example.test");
    }

    #[test]
    fn crime_body_carries_type_and_variable_only() {
        let mut filter = CrimeFilter::new("HURTO_PERSONAS", CrimeVariable::AgeGroup);
        filter.department_code = Some(AdminCode::new(5));
        assert_eq!(
            crime_body(&filter),
            json!({"crime_type": "HURTO_PERSONAS", "variable": "age_group"})
        );
    }

    #[test]
    fn indicator_body_sends_normalized_department() {
        let mut filter = IndicatorFilter::new("male_count");
        filter.department_code = Some(AdminCode::new(5));
        assert_eq!(
            indicator_body(&filter),
            json!({"column": "male_count", "department_code": 5})
        );
    }
}
