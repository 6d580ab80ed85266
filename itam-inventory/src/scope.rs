//! Scope resolution
//!
//! Turns a plan's scope declaration into a predicate over asset snapshots.
//! The filter is rebuilt from the plan on every query and never caches
//! membership, so an asset created mid-count becomes visible to the plan
//! immediately.

use std::collections::BTreeSet;

use tracing::debug;

use itam_common::models::{AssetSnapshot, AssetStatus, InventoryPlan, ScopeType};

/// Which foreign key of the asset a scoped plan constrains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeDimension {
    Department,
    Location,
    Category,
}

/// Resolved membership test for one plan's scope.
///
/// Scrapped assets are excluded unconditionally, regardless of scope type;
/// that rule belongs to the core and is baked in here rather than delegated
/// to registry implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFilter {
    constraint: Option<(ScopeDimension, BTreeSet<i64>)>,
}

impl ScopeFilter {
    /// Unconditional scope (still excludes scrapped assets)
    pub fn all() -> Self {
        Self { constraint: None }
    }

    /// Resolve a plan's scope declaration.
    ///
    /// Policy: an empty id set under a scoped type degrades to the
    /// unconditional filter. Plan validation rejects empty sets on create
    /// and edit, so this branch is only reachable through legacy rows.
    pub fn for_plan(plan: &InventoryPlan) -> Self {
        Self::resolve(plan.scope_type, &plan.scope_ids)
    }

    pub fn resolve(scope_type: ScopeType, scope_ids: &BTreeSet<i64>) -> Self {
        let dimension = match scope_type {
            ScopeType::All => return Self::all(),
            ScopeType::Department => ScopeDimension::Department,
            ScopeType::Location => ScopeDimension::Location,
            ScopeType::Category => ScopeDimension::Category,
        };

        if scope_ids.is_empty() {
            debug!(
                "Scope type {} with empty id set; falling back to unconditional scope",
                scope_type
            );
            return Self::all();
        }

        Self {
            constraint: Some((dimension, scope_ids.clone())),
        }
    }

    /// The dimension and id set this filter constrains, if any
    pub fn constraint(&self) -> Option<(ScopeDimension, &BTreeSet<i64>)> {
        self.constraint.as_ref().map(|(dim, ids)| (*dim, ids))
    }

    /// Membership test for one asset
    pub fn matches(&self, asset: &AssetSnapshot) -> bool {
        if asset.status == AssetStatus::Scrapped {
            return false;
        }

        let Some((dimension, ids)) = &self.constraint else {
            return true;
        };

        match dimension {
            ScopeDimension::Department => ids.contains(&asset.department_id),
            // An asset with no recorded location cannot satisfy a
            // location-scoped count
            ScopeDimension::Location => asset
                .location_id
                .map(|id| ids.contains(&id))
                .unwrap_or(false),
            ScopeDimension::Category => ids.contains(&asset.category_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn asset(department_id: i64, location_id: Option<i64>, category_id: i64) -> AssetSnapshot {
        AssetSnapshot {
            id: 1,
            tag: "A202501-0001".into(),
            name: "Test Asset".into(),
            category_id,
            category_name: "IT-Portable Computer".into(),
            department_id,
            location_id,
            acquired_on: NaiveDate::from_ymd_opt(2023, 9, 1).unwrap(),
            status: AssetStatus::InService,
        }
    }

    #[test]
    fn all_scope_matches_everything_but_scrapped() {
        let filter = ScopeFilter::all();
        assert!(filter.matches(&asset(1, Some(2), 3)));

        let mut scrapped = asset(1, Some(2), 3);
        scrapped.status = AssetStatus::Scrapped;
        assert!(!filter.matches(&scrapped));
    }

    #[test]
    fn department_scope_tests_department_membership() {
        let ids: BTreeSet<i64> = [10, 11].into_iter().collect();
        let filter = ScopeFilter::resolve(ScopeType::Department, &ids);

        assert!(filter.matches(&asset(10, None, 3)));
        assert!(!filter.matches(&asset(12, None, 3)));
    }

    #[test]
    fn location_scope_rejects_assets_without_location() {
        let ids: BTreeSet<i64> = [5].into_iter().collect();
        let filter = ScopeFilter::resolve(ScopeType::Location, &ids);

        assert!(filter.matches(&asset(1, Some(5), 3)));
        assert!(!filter.matches(&asset(1, Some(6), 3)));
        assert!(!filter.matches(&asset(1, None, 3)));
    }

    #[test]
    fn scrapped_excluded_even_inside_scope() {
        let ids: BTreeSet<i64> = [3].into_iter().collect();
        let filter = ScopeFilter::resolve(ScopeType::Category, &ids);

        let mut scrapped = asset(1, None, 3);
        scrapped.status = AssetStatus::Scrapped;
        assert!(!filter.matches(&scrapped));
    }

    #[test]
    fn empty_id_set_degrades_to_unconditional() {
        let filter = ScopeFilter::resolve(ScopeType::Department, &BTreeSet::new());
        assert_eq!(filter, ScopeFilter::all());
        assert!(filter.matches(&asset(99, None, 99)));
    }
}
