//! Boundary service access.

use geostats_geography_models::FeatureLevel;
use geostats_stats_models::AdminCode;

use crate::GeoError;
use crate::features::{self, GeoFeature};

/// Where polygon features come from.
#[async_trait::async_trait]
pub trait GeoSource: Send + Sync {
    /// Fetches the features of `level`. Municipality features are scoped to
    /// the department `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the features cannot be fetched or parsed, or
    /// if municipalities are requested without a department.
    async fn features(
        &self,
        level: FeatureLevel,
        parent: Option<AdminCode>,
    ) -> Result<Vec<GeoFeature>, GeoError>;
}

/// Census boundary service reached over HTTP.
///
/// * `GET {base}/departments`
/// * `GET {base}/municipalities/{department:02}`
#[derive(Debug, Clone)]
pub struct HttpGeoSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGeoSource {
    /// Creates a source for the boundary service at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, level: FeatureLevel, parent: Option<AdminCode>) -> Result<String, GeoError> {
        match (level, parent) {
            (FeatureLevel::Department, _) => Ok(format!("{}/departments", self.base_url)),
            (FeatureLevel::Municipality, Some(department)) => Ok(format!(
                "{}/municipalities/{}",
                self.base_url,
                department.padded(2)
            )),
            (FeatureLevel::Municipality, None) => Err(GeoError::Conversion {
                message: "municipality features need a department code".to_string(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl GeoSource for HttpGeoSource {
    async fn features(
        &self,
        level: FeatureLevel,
        parent: Option<AdminCode>,
    ) -> Result<Vec<GeoFeature>, GeoError> {
        let url = self.url(level, parent)?;
        log::debug!("GET {url}");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let text = response.text().await?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        let features = features::features_from_json(value, level)?;
        log::debug!("GET {url}: {} {level} features", features.len());
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> HttpGeoSource {
        HttpGeoSource::new(reqwest::Client::new(), "https://boundaries.test/api/")
    }

    #[test]
    fn department_url() {
        assert_eq!(
            source().url(FeatureLevel::Department, None).unwrap(),
            "https://boundaries.test/api/departments"
        );
    }

    #[test]
    fn municipality_url_pads_department() {
        assert_eq!(
            source()
                .url(FeatureLevel::Municipality, Some(AdminCode::new(5)))
                .unwrap(),
            "https://boundaries.test/api/municipalities/05"
        );
    }

    #[tokio::test]
    async fn municipalities_need_a_department() {
        assert!(matches!(
            source().features(FeatureLevel::Municipality, None).await,
            Err(GeoError::Conversion { .. })
        ));
    }
}
