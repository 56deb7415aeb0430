// ── Area resolution ──
//
// Turns the configured area name or position into the panel's stable area
// ID. Runs once at startup; the result never changes afterwards.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use inception_api::{AreaId, AreaSummary, PanelClient};

use crate::error::ResolveError;

/// How the user names the area to watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AreaSelector {
    /// 0-based position in the panel's area list.
    Index(usize),
    /// Exact, case-sensitive area name.
    Name(String),
}

impl fmt::Display for AreaSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Name(name) => write!(f, "{name:?}"),
        }
    }
}

impl From<&str> for AreaSelector {
    /// All-digit strings select by position; anything else by name.
    fn from(s: &str) -> Self {
        s.parse().map_or_else(|_| Self::Name(s.to_owned()), Self::Index)
    }
}

/// Pick the area a selector refers to from a listed set.
pub fn select_area<'a>(
    areas: &'a [AreaSummary],
    selector: &AreaSelector,
) -> Result<&'a AreaSummary, ResolveError> {
    match selector {
        AreaSelector::Index(index) => areas.get(*index).ok_or(ResolveError::IndexOutOfRange {
            index: *index,
            len: areas.len(),
        }),
        AreaSelector::Name(name) => areas
            .iter()
            .find(|a| &a.name == name)
            .ok_or_else(|| ResolveError::NotFound { name: name.clone() }),
    }
}

/// The configured selector plus its resolution, set at most once.
#[derive(Debug)]
pub struct AreaRef {
    selector: AreaSelector,
    resolved: OnceLock<AreaId>,
}

impl AreaRef {
    pub fn new(selector: AreaSelector) -> Self {
        Self {
            selector,
            resolved: OnceLock::new(),
        }
    }

    pub fn selector(&self) -> &AreaSelector {
        &self.selector
    }

    /// The resolved ID, or `None` before resolution.
    pub fn resolved_id(&self) -> Option<&AreaId> {
        self.resolved.get()
    }

    /// Resolve against the panel's area list.
    ///
    /// Once resolved, later calls return the cached ID without a request.
    pub async fn resolve(&self, client: &PanelClient) -> Result<AreaId, ResolveError> {
        if let Some(id) = self.resolved.get() {
            return Ok(id.clone());
        }

        let areas = client.list_areas().await?;
        debug!(count = areas.len(), selector = %self.selector, "listed panel areas");

        let area = select_area(&areas, &self.selector)?;
        let id = self.resolved.get_or_init(|| area.id.clone());
        info!(area_id = %id, name = %area.name, "area resolved");
        Ok(id.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn areas() -> Vec<AreaSummary> {
        serde_json::from_value(json!([
            {"Name": "Home", "ID": 7},
            {"Name": "Office", "ID": 3}
        ]))
        .unwrap()
    }

    #[test]
    fn by_name() {
        let areas = areas();
        let area = select_area(&areas, &AreaSelector::Name("Office".into())).unwrap();
        assert_eq!(area.id, AreaId::from("3"));
    }

    #[test]
    fn by_index() {
        let areas = areas();
        let area = select_area(&areas, &AreaSelector::Index(1)).unwrap();
        assert_eq!(area.id, AreaId::from("3"));
    }

    #[test]
    fn index_out_of_range() {
        let areas = areas();
        let err = select_area(&areas, &AreaSelector::Index(5)).unwrap_err();
        assert!(matches!(err, ResolveError::IndexOutOfRange { index: 5, len: 2 }));
    }

    #[test]
    fn unknown_name() {
        let areas = areas();
        let err = select_area(&areas, &AreaSelector::Name("Garage".into())).unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { ref name } if name == "Garage"));
    }

    #[test]
    fn name_match_is_case_sensitive() {
        let areas = areas();
        assert!(select_area(&areas, &AreaSelector::Name("office".into())).is_err());
    }

    #[test]
    fn selector_from_cli_string() {
        assert_eq!(AreaSelector::from("2"), AreaSelector::Index(2));
        assert_eq!(AreaSelector::from("Home"), AreaSelector::Name("Home".into()));
    }

    #[test]
    fn selector_from_config_value() {
        let index: AreaSelector = serde_json::from_value(json!(1)).unwrap();
        let name: AreaSelector = serde_json::from_value(json!("Office")).unwrap();
        assert_eq!(index, AreaSelector::Index(1));
        assert_eq!(name, AreaSelector::Name("Office".into()));
    }
}
