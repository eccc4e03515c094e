use crate::core::resolver::{ColumnMap, ColumnRole};
use crate::domain::model::RecordSet;
use std::collections::BTreeMap;
use std::fmt;

pub const ALL_SENTINEL: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterValue {
    #[default]
    All,
    Equals(String),
}

impl FilterValue {
    /// 將使用者選項轉成篩選值；"All" 代表不限制
    pub fn from_selection(selection: &str) -> Self {
        if selection == ALL_SENTINEL {
            FilterValue::All
        } else {
            FilterValue::Equals(selection.to_string())
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::All => f.write_str(ALL_SENTINEL),
            FilterValue::Equals(v) => f.write_str(v),
        }
    }
}

/// 每個邏輯欄位至多一個等值條件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    constraints: BTreeMap<ColumnRole, FilterValue>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: ColumnRole, value: FilterValue) -> Self {
        self.set(role, value);
        self
    }

    pub fn set(&mut self, role: ColumnRole, value: FilterValue) {
        self.constraints.insert(role, value);
    }

    pub fn get(&self, role: ColumnRole) -> &FilterValue {
        self.constraints.get(&role).unwrap_or(&FilterValue::All)
    }

    /// 非 All 的條件
    pub fn active(&self) -> impl Iterator<Item = (ColumnRole, &str)> {
        self.constraints.iter().filter_map(|(role, value)| match value {
            FilterValue::Equals(v) => Some((*role, v.as_str())),
            FilterValue::All => None,
        })
    }

    pub fn is_unconstrained(&self) -> bool {
        self.active().next().is_none()
    }
}

/// 套用所有等值條件（大小寫敏感）；未解析的欄位略過，輸出保留原始順序
pub fn apply_filters(set: &RecordSet, spec: &FilterSpec, columns: &ColumnMap) -> RecordSet {
    let predicates: Vec<(&str, &str)> = spec
        .active()
        .filter_map(|(role, value)| match columns.get(role) {
            Some(column) => Some((column, value)),
            None => {
                tracing::debug!("Ignoring {} filter: column not resolved", role);
                None
            }
        })
        .collect();

    if predicates.is_empty() {
        return set.clone();
    }

    let filtered = set.retain_where(|record| {
        predicates
            .iter()
            .all(|(column, value)| record.text(column).as_deref() == Some(*value))
    });

    tracing::debug!(
        "Filters {:?} kept {} of {} rows",
        predicates,
        filtered.len(),
        set.len()
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;

    fn tickets() -> RecordSet {
        let rows = [
            (1, "Open", "High"),
            (2, "Closed", "Low"),
            (3, "Open", "Medium"),
            (4, "In Progress", "High"),
            (5, "Open", "Low"),
        ];
        RecordSet::from_records(
            rows.iter()
                .map(|(id, status, priority)| {
                    Record::new()
                        .with("ticket_id", *id)
                        .with("Status", *status)
                        .with("priority", *priority)
                })
                .collect(),
        )
        .unwrap()
    }

    fn ids(set: &RecordSet) -> Vec<String> {
        set.iter().filter_map(|r| r.text("ticket_id")).collect()
    }

    #[test]
    fn test_all_status_high_priority_keeps_order() {
        let set = tickets();
        let columns = ColumnMap::detect(&set);
        let spec = FilterSpec::new()
            .with(ColumnRole::Status, FilterValue::from_selection("All"))
            .with(ColumnRole::Priority, FilterValue::from_selection("High"));

        let filtered = apply_filters(&set, &spec, &columns);
        assert_eq!(filtered.len(), 2);
        assert_eq!(ids(&filtered), vec!["1", "4"]);
    }

    #[test]
    fn test_filters_commute() {
        let set = tickets();
        let columns = ColumnMap::detect(&set);
        let status = FilterSpec::new().with(ColumnRole::Status, FilterValue::Equals("Open".into()));
        let priority =
            FilterSpec::new().with(ColumnRole::Priority, FilterValue::Equals("Low".into()));

        let a = apply_filters(&apply_filters(&set, &status, &columns), &priority, &columns);
        let b = apply_filters(&apply_filters(&set, &priority, &columns), &status, &columns);
        assert_eq!(a, b);
        assert_eq!(ids(&a), vec!["5"]);
    }

    #[test]
    fn test_unresolved_role_is_ignored() {
        let set = tickets();
        let columns = ColumnMap::detect(&set);
        let spec = FilterSpec::new().with(ColumnRole::Category, FilterValue::Equals("Network".into()));

        assert_eq!(apply_filters(&set, &spec, &columns), set);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let set = tickets();
        let columns = ColumnMap::detect(&set);
        let spec = FilterSpec::new().with(ColumnRole::Status, FilterValue::Equals("open".into()));

        assert!(apply_filters(&set, &spec, &columns).is_empty());
    }

    #[test]
    fn test_result_is_subsequence() {
        let set = tickets();
        let columns = ColumnMap::detect(&set);
        let spec = FilterSpec::new().with(ColumnRole::Status, FilterValue::Equals("Open".into()));

        let filtered = apply_filters(&set, &spec, &columns);
        let mut source = set.iter();
        for record in filtered.iter() {
            assert!(source.any(|r| r == record));
        }
    }
}
