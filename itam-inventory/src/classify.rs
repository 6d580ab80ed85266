//! Match classification
//!
//! Decides the reconciliation outcome of one scan against the live asset
//! register: `matched`, `discrepancy`, or `unmatched`. The ladder:
//!
//! 1. No tag could be determined → `unmatched` under a synthesized
//!    placeholder tag (the record must still satisfy per-plan uniqueness).
//! 2. Tag unknown to the register → `unmatched` ("over-count").
//! 3. Known but outside the plan's scope → `discrepancy`.
//! 4. Known and in scope → fuzzy-compare whatever attributes the scan
//!    carried; zero mismatches is `matched`, otherwise `discrepancy` with
//!    every mismatch noted.
//!
//! Pure module; the asset lookup happens in the ingestion service.

use uuid::Uuid;

use itam_common::models::{AssetSnapshot, MatchStatus};

use crate::ocr::ParsedTag;
use crate::scope::ScopeFilter;

/// Location/department the scanning client claims the asset was found at
/// (manual entry only; OCR tags do not carry these)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualContext {
    pub location_id: Option<i64>,
    pub department_id: Option<i64>,
}

/// Outcome of classifying one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Tag the record will be stored under; synthesized when none was
    /// recognized
    pub asset_tag: String,
    pub status: MatchStatus,
    pub note: Option<String>,
    pub matched_asset_id: Option<i64>,
}

/// Synthesize a unique placeholder tag for a scan whose tag could not be
/// determined at all.
pub fn placeholder_tag() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("UNKNOWN-{}", &suffix[..12])
}

/// Normalized fuzzy comparison: case-insensitive, whitespace/hyphen/
/// underscore stripped, equality or substring containment in either
/// direction.
pub fn fuzzy_match(a: &str, b: &str) -> bool {
    let na = normalize(a);
    let nb = normalize(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    na == nb || na.contains(&nb) || nb.contains(&na)
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// System-side rendering of an acquisition month, matching the unpadded
/// form printed on the tags ("2023/9", not "2023/09")
pub fn acquisition_label(date: chrono::NaiveDate) -> String {
    use chrono::Datelike;
    format!("{}/{}", date.year(), date.month())
}

/// Classify one scan.
///
/// `tag` is the resolved tag (parsed or manually entered), `asset` the
/// register lookup result for that tag, `scope` the plan's resolved scope.
/// `ocr` carries parsed label fields to compare; `manual` carries claimed
/// location/department ids from manual entry.
pub fn classify(
    tag: Option<&str>,
    asset: Option<&AssetSnapshot>,
    scope: &ScopeFilter,
    ocr: Option<&ParsedTag>,
    manual: ManualContext,
) -> Classification {
    let Some(tag) = tag else {
        return Classification {
            asset_tag: placeholder_tag(),
            status: MatchStatus::Unmatched,
            note: Some("tag not recognized".into()),
            matched_asset_id: None,
        };
    };

    let Some(asset) = asset else {
        return Classification {
            asset_tag: tag.to_string(),
            status: MatchStatus::Unmatched,
            note: Some("asset not found in system".into()),
            matched_asset_id: None,
        };
    };

    if !scope.matches(asset) {
        return Classification {
            asset_tag: tag.to_string(),
            status: MatchStatus::Discrepancy,
            note: Some("asset outside inventory scope".into()),
            matched_asset_id: Some(asset.id),
        };
    }

    let mut mismatches = Vec::new();

    if let Some(parsed) = ocr {
        if let Some(category) = &parsed.category {
            if !fuzzy_match(category, &asset.category_name) {
                mismatches.push(format!(
                    "category mismatch: tag[{}] vs system[{}]",
                    category, asset.category_name
                ));
            }
        }
        if let Some(name) = &parsed.name {
            if !fuzzy_match(name, &asset.name) {
                mismatches.push(format!(
                    "name mismatch: tag[{}] vs system[{}]",
                    name, asset.name
                ));
            }
        }
        if let Some(acquired) = &parsed.acquired {
            let system = acquisition_label(asset.acquired_on);
            if !fuzzy_match(acquired, &system) {
                mismatches.push(format!(
                    "acquisition mismatch: tag[{}] vs system[{}]",
                    acquired, system
                ));
            }
        }
    }

    if let (Some(claimed), Some(actual)) = (manual.location_id, asset.location_id) {
        if claimed != actual {
            mismatches.push(format!(
                "location mismatch: claimed[{}] vs system[{}]",
                claimed, actual
            ));
        }
    }
    if let Some(claimed) = manual.department_id {
        if claimed != asset.department_id {
            mismatches.push(format!(
                "department mismatch: claimed[{}] vs system[{}]",
                claimed, asset.department_id
            ));
        }
    }

    if mismatches.is_empty() {
        Classification {
            asset_tag: tag.to_string(),
            status: MatchStatus::Matched,
            note: None,
            matched_asset_id: Some(asset.id),
        }
    } else {
        Classification {
            asset_tag: tag.to_string(),
            status: MatchStatus::Discrepancy,
            note: Some(mismatches.join("; ")),
            matched_asset_id: Some(asset.id),
        }
    }
}
