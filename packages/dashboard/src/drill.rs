//! Drill-down stacks for the geography and time hierarchies.
//!
//! A stack always holds its root at the bottom. Pushing is validated
//! against the level below it; popping at the root is a no-op.

use std::fmt;

use geostats_stats_models::{AdminCode, Axis, GeoLevel, TimeLevel, ViewMode};
use thiserror::Error;

/// Errors from drill-down navigation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrillError {
    /// The level needs a different parent than the current top.
    #[error("{level} cannot be selected from {current}")]
    InvalidParent {
        /// Rejected level.
        level: String,
        /// Level on top of the stack at the time.
        current: String,
    },

    /// The family has no drill-down along this axis.
    #[error("{mode} has no {axis} drill-down")]
    Unsupported {
        /// Family that rejected the operation.
        mode: ViewMode,
        /// Axis it was asked to move along.
        axis: Axis,
    },
}

/// A hierarchy level that can live on a [`DrillDownStack`].
pub trait Level: Copy + Eq + fmt::Debug + fmt::Display {
    /// Bottom of every stack.
    const ROOT: Self;

    /// Whether `self` may sit directly on top of `parent`.
    fn may_follow(&self, parent: &Self) -> bool;
}

impl Level for GeoLevel {
    const ROOT: Self = Self::Country;

    fn may_follow(&self, parent: &Self) -> bool {
        Self::may_follow(self, parent)
    }
}

impl Level for TimeLevel {
    const ROOT: Self = Self::Years;

    fn may_follow(&self, parent: &Self) -> bool {
        Self::may_follow(self, parent)
    }
}

/// Ordered drill-down levels, root first, current level last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillDownStack<L: Level> {
    levels: Vec<L>,
}

impl<L: Level> Default for DrillDownStack<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Level> DrillDownStack<L> {
    /// A stack holding only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            levels: vec![L::ROOT],
        }
    }

    /// The current (top) level.
    #[must_use]
    pub fn current(&self) -> L {
        self.levels.last().copied().unwrap_or(L::ROOT)
    }

    /// Every level, root first.
    #[must_use]
    pub fn levels(&self) -> &[L] {
        &self.levels
    }

    /// Whether only the root is on the stack.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.levels.len() <= 1
    }

    /// Pushes `level` on top of the current level.
    ///
    /// # Errors
    ///
    /// Returns [`DrillError::InvalidParent`] if `level` may not follow the
    /// current level; the stack is unchanged.
    pub fn push(&mut self, level: L) -> Result<(), DrillError> {
        let current = self.current();
        if !level.may_follow(&current) {
            return Err(DrillError::InvalidParent {
                level: level.to_string(),
                current: current.to_string(),
            });
        }
        self.levels.push(level);
        Ok(())
    }

    /// Removes the current level and returns it. At the root nothing is
    /// removed and `None` is returned.
    pub fn pop(&mut self) -> Option<L> {
        if self.is_root() {
            return None;
        }
        self.levels.pop()
    }

    /// Moves to `level` from wherever the stack is: pops until `level` may
    /// follow the top, then pushes it. Selecting a sibling replaces the
    /// current level this way.
    ///
    /// # Errors
    ///
    /// Returns [`DrillError::InvalidParent`] if no level on the stack can
    /// parent `level`; the stack is unchanged.
    pub fn select(&mut self, level: L) -> Result<(), DrillError> {
        let Some(parent) = self.levels.iter().rposition(|l| level.may_follow(l)) else {
            return Err(DrillError::InvalidParent {
                level: level.to_string(),
                current: self.current().to_string(),
            });
        };
        self.levels.truncate(parent + 1);
        self.levels.push(level);
        Ok(())
    }

    /// Drops everything above the root.
    pub fn reset(&mut self) {
        self.levels.truncate(1);
    }
}

impl DrillDownStack<GeoLevel> {
    /// Selected department, if any.
    #[must_use]
    pub fn department(&self) -> Option<AdminCode> {
        self.levels.iter().find_map(|level| match level {
            GeoLevel::Department(code) => Some(*code),
            _ => None,
        })
    }

    /// Selected municipality, if any.
    #[must_use]
    pub fn municipality(&self) -> Option<AdminCode> {
        self.levels.iter().find_map(|level| match level {
            GeoLevel::Municipality(code) => Some(*code),
            _ => None,
        })
    }
}

impl DrillDownStack<TimeLevel> {
    /// Selected year, if any.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        self.levels.iter().find_map(|level| match level {
            TimeLevel::Year { year } => Some(*year),
            _ => None,
        })
    }

    /// Selected month, if any.
    #[must_use]
    pub fn month(&self) -> Option<u32> {
        self.levels.iter().find_map(|level| match level {
            TimeLevel::Month { month, .. } => Some(*month),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo(text: &str) -> GeoLevel {
        text.parse().unwrap()
    }

    #[test]
    fn municipality_needs_department_on_top() {
        let mut stack = DrillDownStack::<GeoLevel>::new();
        assert!(matches!(
            stack.push(geo("municipality:12")),
            Err(DrillError::InvalidParent { .. })
        ));
        assert!(stack.is_root());

        stack.push(geo("department:05")).unwrap();
        stack.push(geo("municipality:12")).unwrap();
        assert_eq!(stack.current(), geo("municipality:12"));
        assert_eq!(stack.department(), Some(AdminCode::new(5)));
        assert_eq!(stack.municipality(), Some(AdminCode::new(12)));
    }

    #[test]
    fn department_cannot_stack_on_department() {
        let mut stack = DrillDownStack::<GeoLevel>::new();
        stack.push(geo("department:05")).unwrap();
        let err = stack.push(geo("department:08")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "department:08 cannot be selected from department:05"
        );
    }

    #[test]
    fn pop_at_root_is_a_no_op() {
        let mut stack = DrillDownStack::<GeoLevel>::new();
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.current(), GeoLevel::Country);
        assert_eq!(stack.levels(), &[GeoLevel::Country]);

        stack.push(geo("department:05")).unwrap();
        assert_eq!(stack.pop(), Some(geo("department:05")));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.current(), GeoLevel::Country);
    }

    #[test]
    fn select_replaces_siblings() {
        let mut stack = DrillDownStack::<GeoLevel>::new();
        stack.select(geo("department:05")).unwrap();
        stack.select(geo("municipality:001")).unwrap();
        stack.select(geo("municipality:002")).unwrap();
        assert_eq!(
            stack.levels(),
            &[GeoLevel::Country, geo("department:05"), geo("municipality:002")]
        );

        stack.select(geo("department:08")).unwrap();
        assert_eq!(stack.levels(), &[GeoLevel::Country, geo("department:08")]);
        assert_eq!(stack.municipality(), None);
    }

    #[test]
    fn select_without_parent_leaves_stack_alone() {
        let mut stack = DrillDownStack::<GeoLevel>::new();
        assert!(stack.select(geo("municipality:001")).is_err());
        assert!(stack.is_root());
    }

    #[test]
    fn month_requires_matching_year() {
        let mut stack = DrillDownStack::<TimeLevel>::new();
        stack.push(TimeLevel::Year { year: 2022 }).unwrap();
        assert!(
            stack
                .push(TimeLevel::Month {
                    year: 2021,
                    month: 3
                })
                .is_err()
        );
        stack
            .push(TimeLevel::Month {
                year: 2022,
                month: 3,
            })
            .unwrap();
        assert_eq!(stack.year(), Some(2022));
        assert_eq!(stack.month(), Some(3));

        stack.reset();
        assert_eq!(stack.current(), TimeLevel::Years);
        assert_eq!(stack.year(), None);
    }
}
