//! Compile-time registry of choropleth palettes.
//!
//! Each family's bucket thresholds and colors are defined in a TOML file
//! under `palettes/`, one [`BucketScale`] per feature level. The registry
//! embeds these at compile time, so adding a family means adding a file,
//! not code.

use geostats_geography_models::{BucketScale, FeatureLevel, ScaleError};
use geostats_stats_models::ViewMode;
use serde::Deserialize;
use thiserror::Error;

/// One family's scales.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Palette {
    /// Family the palette colors.
    pub family: ViewMode,
    /// Scale for the country view.
    pub department: BucketScale,
    /// Scale for the municipalities of one department.
    pub municipality: BucketScale,
}

impl Palette {
    /// The scale used at `level`.
    #[must_use]
    pub const fn scale(&self, level: FeatureLevel) -> &BucketScale {
        match level {
            FeatureLevel::Department => &self.department,
            FeatureLevel::Municipality => &self.municipality,
        }
    }
}

/// Errors raised while loading palettes.
#[derive(Debug, Error)]
pub enum PaletteError {
    /// A palette file is not valid TOML or has the wrong shape.
    #[error("palette '{name}': {source}")]
    Toml {
        /// Palette file name.
        name: String,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// A scale failed validation.
    #[error("palette '{name}' {level} scale: {source}")]
    Scale {
        /// Palette file name.
        name: String,
        /// Offending level.
        level: FeatureLevel,
        /// What was wrong.
        #[source]
        source: ScaleError,
    },

    /// Two palettes claim the same family.
    #[error("family {family} has more than one palette")]
    Duplicate {
        /// The family.
        family: ViewMode,
    },
}

// ── Compile-time embedded TOML files ────────────────────────────────

const PALETTE_TOMLS: &[(&str, &str)] = &[
    ("crime", include_str!("../palettes/crime.toml")),
    ("fundamental", include_str!("../palettes/fundamental.toml")),
    ("primary", include_str!("../palettes/primary.toml")),
];

/// Validated palettes, one per family.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteRegistry {
    palettes: Vec<Palette>,
}

impl PaletteRegistry {
    /// Loads the palettes embedded in the binary.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError`] if an embedded palette is malformed.
    pub fn embedded() -> Result<Self, PaletteError> {
        Self::from_tomls(PALETTE_TOMLS.iter().copied())
    }

    /// Loads palettes from `(name, toml)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError`] on the first malformed, invalid or
    /// duplicate palette.
    pub fn from_tomls<'a>(
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, PaletteError> {
        let mut palettes: Vec<Palette> = Vec::new();
        for (name, text) in sources {
            let palette: Palette = toml::de::from_str(text).map_err(|source| PaletteError::Toml {
                name: name.to_string(),
                source,
            })?;
            for level in FeatureLevel::ALL {
                palette
                    .scale(level)
                    .validate()
                    .map_err(|source| PaletteError::Scale {
                        name: name.to_string(),
                        level,
                        source,
                    })?;
            }
            if palettes.iter().any(|p| p.family == palette.family) {
                return Err(PaletteError::Duplicate {
                    family: palette.family,
                });
            }
            log::trace!("loaded palette '{name}' for {}", palette.family);
            palettes.push(palette);
        }
        Ok(Self { palettes })
    }

    /// The palette of `family`.
    #[must_use]
    pub fn palette(&self, family: ViewMode) -> Option<&Palette> {
        self.palettes.iter().find(|p| p.family == family)
    }

    /// The scale of `family` at `level`.
    #[must_use]
    pub fn scale(&self, family: ViewMode, level: FeatureLevel) -> Option<&BucketScale> {
        self.palette(family).map(|p| p.scale(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geostats_geography_models::Class;

    #[test]
    fn loads_every_family() {
        let registry = PaletteRegistry::embedded().unwrap();
        for family in ViewMode::ALL {
            for level in FeatureLevel::ALL {
                assert!(
                    registry.scale(family, level).is_some(),
                    "no {level} scale for {family}"
                );
            }
        }
    }

    #[test]
    fn crime_department_thresholds() {
        let registry = PaletteRegistry::embedded().unwrap();
        let scale = registry
            .scale(ViewMode::Crime, FeatureLevel::Department)
            .unwrap();
        let thresholds: Vec<f64> = scale.buckets.iter().map(|b| b.above).collect();
        assert_eq!(thresholds, vec![100_000.0, 60_000.0, 30_000.0, 1_000.0]);
        assert_eq!(scale.classify(Some(100_000.0)), Class::Bucket(1));
        assert_eq!(scale.color_for(None), "#FFFFFF");
    }

    #[test]
    fn levels_have_their_own_thresholds() {
        let registry = PaletteRegistry::embedded().unwrap();
        let department = registry
            .scale(ViewMode::Crime, FeatureLevel::Department)
            .unwrap();
        let municipality = registry
            .scale(ViewMode::Crime, FeatureLevel::Municipality)
            .unwrap();
        assert!(municipality.buckets[0].above < department.buckets[0].above);
    }

    #[test]
    fn rejects_unsorted_thresholds() {
        let text = r##"
family = "primary"
[department]
floor = "#FFFFFF"
buckets = [{ above = 10.0, color = "#000000" }, { above = 20.0, color = "#111111" }]
[municipality]
floor = "#FFFFFF"
buckets = [{ above = 10.0, color = "#000000" }]
"##;
        assert!(matches!(
            PaletteRegistry::from_tomls([("broken", text)]),
            Err(PaletteError::Scale {
                level: FeatureLevel::Department,
                ..
            })
        ));
    }

    #[test]
    fn rejects_duplicate_family() {
        let crime = PALETTE_TOMLS[0].1;
        assert!(matches!(
            PaletteRegistry::from_tomls([("a", crime), ("b", crime)]),
            Err(PaletteError::Duplicate {
                family: ViewMode::Crime
            })
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            PaletteRegistry::from_tomls([("bad", "family = ")]),
            Err(PaletteError::Toml { .. })
        ));
    }
}
