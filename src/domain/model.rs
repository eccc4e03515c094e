use crate::utils::error::{DashError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 一筆資料列：欄位名稱到值的有序映射，欄位順序與資料表一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.data.insert(column.to_string(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column)
    }

    /// 欄位的字串表示；null 或缺欄位時回傳 None
    pub fn text(&self, column: &str) -> Option<String> {
        self.data.get(column).and_then(display_text)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

/// 值的顯示字串：字串原樣、數字以十進位表示、null 視為缺值
pub fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// 同一次載入的資料列集合；所有資料列欄位一致
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RecordSet {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    /// 以第一筆資料列的欄位建立集合
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let columns = records
            .first()
            .map(|r| r.columns().map(str::to_string).collect())
            .unwrap_or_default();

        let mut set = Self::new(columns);
        for record in records {
            set.push(record)?;
        }
        Ok(set)
    }

    pub fn push(&mut self, record: Record) -> Result<()> {
        let same_columns = record.data.len() == self.columns.len()
            && self.columns.iter().all(|c| record.data.contains_key(c));

        if !same_columns {
            return Err(DashError::ValidationError {
                message: format!(
                    "Record columns {:?} do not match record set columns {:?}",
                    record.columns().collect::<Vec<_>>(),
                    self.columns
                ),
            });
        }

        self.records.push(record);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 保留符合條件的資料列，順序不變
    pub fn retain_where<F>(&self, predicate: F) -> RecordSet
    where
        F: Fn(&Record) -> bool,
    {
        RecordSet {
            columns: self.columns.clone(),
            records: self.records.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    pub fn head(&self, n: usize) -> RecordSet {
        RecordSet {
            columns: self.columns.clone(),
            records: self.records.iter().take(n).cloned().collect(),
        }
    }

    /// 依給定欄位順序投影；不存在的欄位會被略過
    pub fn project(&self, columns: &[String]) -> RecordSet {
        let keep: Vec<String> = columns
            .iter()
            .filter(|c| self.has_column(c))
            .cloned()
            .collect();

        let records = self
            .records
            .iter()
            .map(|r| {
                let mut data = Map::new();
                for column in &keep {
                    data.insert(
                        column.clone(),
                        r.data.get(column).cloned().unwrap_or(Value::Null),
                    );
                }
                Record { data }
            })
            .collect();

        RecordSet {
            columns: keep,
            records,
        }
    }

    pub(crate) fn with_records(&self, records: Vec<Record>) -> RecordSet {
        RecordSet {
            columns: self.columns.clone(),
            records,
        }
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
