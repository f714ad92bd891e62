//! Drill-down levels for the geography and time hierarchies.
//!
//! Levels have a textual form used by collaborators and logs:
//! `country`, `department:<code>`, `municipality:<code>` for geography and
//! `years`, `year:<y>`, `month:<y>-<m>` for time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::code::AdminCode;

/// Error returned when a level's textual form cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelParseError {
    /// The `kind:` prefix is not a known level.
    #[error("unknown drill-down level: {input:?}")]
    UnknownLevel {
        /// The rejected input.
        input: String,
    },
    /// The level is known but its value is missing or malformed.
    #[error("invalid value for {level} level: {value:?}")]
    InvalidValue {
        /// Level kind (e.g. `department`).
        level: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// A position in the country → department → municipality hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", content = "code", rename_all = "camelCase")]
pub enum GeoLevel {
    /// Whole country; the root.
    Country,
    /// A single department.
    Department(AdminCode),
    /// A single municipality of the department below it on the stack.
    Municipality(AdminCode),
}

impl GeoLevel {
    /// Whether `self` may sit directly on top of `parent`.
    #[must_use]
    pub const fn may_follow(&self, parent: &Self) -> bool {
        matches!(
            (self, parent),
            (Self::Department(_), Self::Country) | (Self::Municipality(_), Self::Department(_))
        )
    }
}

impl fmt::Display for GeoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Country => f.write_str("country"),
            Self::Department(code) => write!(f, "department:{}", code.padded(2)),
            Self::Municipality(code) => write!(f, "municipality:{}", code.padded(3)),
        }
    }
}

impl FromStr for GeoLevel {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("country") {
            return Ok(Self::Country);
        }
        let (kind, value) = split_level(s)?;
        match kind.to_ascii_lowercase().as_str() {
            "department" => Ok(Self::Department(parse_code("department", value)?)),
            "municipality" => Ok(Self::Municipality(parse_code("municipality", value)?)),
            _ => Err(LevelParseError::UnknownLevel {
                input: s.to_string(),
            }),
        }
    }
}

/// A position in the years → year → month hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "camelCase")]
pub enum TimeLevel {
    /// All years; the root.
    Years,
    /// A single year.
    Year {
        /// Calendar year.
        year: i32,
    },
    /// A single month of a year.
    Month {
        /// Calendar year; must match the year level below.
        year: i32,
        /// Month number, 1-12.
        month: u32,
    },
}

impl TimeLevel {
    /// Whether `self` may sit directly on top of `parent`.
    #[must_use]
    pub const fn may_follow(&self, parent: &Self) -> bool {
        match (self, parent) {
            (Self::Year { .. }, Self::Years) => true,
            (Self::Month { year, .. }, Self::Year { year: parent_year }) => *year == *parent_year,
            _ => false,
        }
    }
}

impl fmt::Display for TimeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Years => f.write_str("years"),
            Self::Year { year } => write!(f, "year:{year}"),
            Self::Month { year, month } => write!(f, "month:{year}-{month}"),
        }
    }
}

impl FromStr for TimeLevel {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("years") {
            return Ok(Self::Years);
        }
        let (kind, value) = split_level(s)?;
        let invalid = |level: &'static str| LevelParseError::InvalidValue {
            level,
            value: value.to_string(),
        };
        match kind.to_ascii_lowercase().as_str() {
            "year" => value
                .trim()
                .parse()
                .map(|year| Self::Year { year })
                .map_err(|_| invalid("year")),
            "month" => {
                let (year, month) = value.trim().split_once('-').ok_or_else(|| invalid("month"))?;
                let year = year.parse().map_err(|_| invalid("month"))?;
                let month = month.parse().map_err(|_| invalid("month"))?;
                if !(1..=12).contains(&month) {
                    return Err(invalid("month"));
                }
                Ok(Self::Month { year, month })
            }
            _ => Err(LevelParseError::UnknownLevel {
                input: s.to_string(),
            }),
        }
    }
}

fn split_level(s: &str) -> Result<(&str, &str), LevelParseError> {
    s.split_once(':').ok_or_else(|| LevelParseError::UnknownLevel {
        input: s.to_string(),
    })
}

fn parse_code(level: &'static str, value: &str) -> Result<AdminCode, LevelParseError> {
    value.parse().map_err(|_| LevelParseError::InvalidValue {
        level,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_geo_levels() {
        assert_eq!("country".parse(), Ok(GeoLevel::Country));
        assert_eq!(
            "department:05".parse(),
            Ok(GeoLevel::Department(AdminCode::new(5)))
        );
        assert_eq!(
            "municipality:12".parse(),
            Ok(GeoLevel::Municipality(AdminCode::new(12)))
        );
        assert!("department:".parse::<GeoLevel>().is_err());
        assert!("province:5".parse::<GeoLevel>().is_err());
    }

    #[test]
    fn geo_display_roundtrips() {
        for level in [
            GeoLevel::Country,
            GeoLevel::Department(AdminCode::new(5)),
            GeoLevel::Municipality(AdminCode::new(1)),
        ] {
            assert_eq!(level.to_string().parse(), Ok(level));
        }
    }

    #[test]
    fn parses_time_levels() {
        assert_eq!("years".parse(), Ok(TimeLevel::Years));
        assert_eq!("year:2022".parse(), Ok(TimeLevel::Year { year: 2022 }));
        assert_eq!(
            "month:2022-3".parse(),
            Ok(TimeLevel::Month {
                year: 2022,
                month: 3
            })
        );
        assert!("month:2022-13".parse::<TimeLevel>().is_err());
        assert!("month:2022".parse::<TimeLevel>().is_err());
    }

    #[test]
    fn parent_rules() {
        let dept = GeoLevel::Department(AdminCode::new(5));
        let muni = GeoLevel::Municipality(AdminCode::new(12));
        assert!(dept.may_follow(&GeoLevel::Country));
        assert!(muni.may_follow(&dept));
        assert!(!muni.may_follow(&GeoLevel::Country));
        assert!(!dept.may_follow(&dept));

        let year = TimeLevel::Year { year: 2022 };
        assert!(year.may_follow(&TimeLevel::Years));
        assert!(TimeLevel::Month { year: 2022, month: 1 }.may_follow(&year));
        assert!(!TimeLevel::Month { year: 2021, month: 1 }.may_follow(&year));
        assert!(!TimeLevel::Month { year: 2022, month: 1 }.may_follow(&TimeLevel::Years));
    }
}
