use crate::domain::model::RecordSet;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

pub const UNKNOWN_LABEL: &str = "Unknown";

/// 分組計數的一列
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateRow {
    pub value: String,
    pub count: usize,
}

impl AggregateRow {
    pub fn new(value: impl Into<String>, count: usize) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

pub fn count(set: &RecordSet) -> usize {
    set.len()
}

/// 欄位字串表示等於 `value` 的列數；欄位不存在時為 0
pub fn count_where(set: &RecordSet, column: &str, value: &str) -> usize {
    if !set.has_column(column) {
        return 0;
    }
    set.iter()
        .filter(|r| r.text(column).as_deref() == Some(value))
        .count()
}

/// 欄位值落在 `values` 之中的列數
pub fn count_in(set: &RecordSet, column: &str, values: &[&str]) -> usize {
    if !set.has_column(column) {
        return 0;
    }
    set.iter()
        .filter(|r| {
            r.text(column)
                .map(|t| values.contains(&t.as_str()))
                .unwrap_or(false)
        })
        .count()
}

/// 依欄位分組計數，次數由多到少；同次數保留首次出現順序
pub fn value_counts(set: &RecordSet, column: &str) -> Vec<AggregateRow> {
    let mut rows: Vec<AggregateRow> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in set {
        let key = record
            .text(column)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());

        match index.get(&key) {
            Some(&i) => rows[i].count += 1,
            None => {
                index.insert(key.clone(), rows.len());
                rows.push(AggregateRow::new(key, 1));
            }
        }
    }

    // sort_by 是穩定排序
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// 欄位中出現過的非空值，排序後去重，用於篩選選項
pub fn distinct_values(set: &RecordSet, column: &str) -> Vec<String> {
    set.iter()
        .filter_map(|r| r.text(column))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
