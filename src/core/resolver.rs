use crate::domain::model::{Record, RecordSet};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// 報表使用的邏輯欄位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Status,
    Priority,
    Category,
    Subject,
    Description,
    TicketId,
    CreatedAt,
    ResolvedAt,
    AssignedTo,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 9] = [
        ColumnRole::Status,
        ColumnRole::Priority,
        ColumnRole::Category,
        ColumnRole::Subject,
        ColumnRole::Description,
        ColumnRole::TicketId,
        ColumnRole::CreatedAt,
        ColumnRole::ResolvedAt,
        ColumnRole::AssignedTo,
    ];

    /// 候選欄名，依優先順序排列
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            ColumnRole::Status => &["status", "ticket_status", "state"],
            ColumnRole::Priority => &["priority", "ticket_priority"],
            ColumnRole::Category => &["category", "ticket_category", "type"],
            ColumnRole::Subject => &["subject", "title", "summary"],
            ColumnRole::Description => &["description", "details", "body"],
            ColumnRole::TicketId => &["ticket_id", "id", "ticket"],
            ColumnRole::CreatedAt => &["created_at", "created_date", "date_created"],
            ColumnRole::ResolvedAt => &["resolved_date", "closed_date", "date_resolved"],
            ColumnRole::AssignedTo => &["assigned_to", "assignee", "owner"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ColumnRole::Status => "Status",
            ColumnRole::Priority => "Priority",
            ColumnRole::Category => "Category",
            ColumnRole::Subject => "Subject",
            ColumnRole::Description => "Description",
            ColumnRole::TicketId => "Ticket ID",
            ColumnRole::CreatedAt => "Created",
            ColumnRole::ResolvedAt => "Resolved",
            ColumnRole::AssignedTo => "Assigned to",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 不分大小寫比對：依候選順序回傳第一個存在的實際欄名
pub fn resolve<S: AsRef<str>>(columns: &[S], candidates: &[&str]) -> Option<String> {
    let by_lower: HashMap<String, &str> = columns
        .iter()
        .map(|c| (c.as_ref().to_lowercase(), c.as_ref()))
        .collect();

    candidates
        .iter()
        .find_map(|name| by_lower.get(&name.to_lowercase()))
        .map(|actual| actual.to_string())
}

/// 一個資料集上每個邏輯欄位的解析結果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnMap {
    resolved: HashMap<ColumnRole, String>,
}

impl ColumnMap {
    pub fn detect(set: &RecordSet) -> Self {
        Self::detect_columns(set.columns())
    }

    pub fn detect_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        let resolved: HashMap<ColumnRole, String> = ColumnRole::ALL
            .iter()
            .filter_map(|role| resolve(columns, role.candidates()).map(|c| (*role, c)))
            .collect();

        tracing::debug!("Detected columns: {:?}", resolved);
        Self { resolved }
    }

    pub fn get(&self, role: ColumnRole) -> Option<&str> {
        self.resolved.get(&role).map(String::as_str)
    }

    pub fn is_resolved(&self, role: ColumnRole) -> bool {
        self.resolved.contains_key(&role)
    }

    /// 依邏輯欄位固定順序列出已解析的實際欄名
    pub fn resolved_columns(&self, order: &[ColumnRole]) -> Vec<String> {
        order
            .iter()
            .filter_map(|role| self.get(*role).map(str::to_string))
            .collect()
    }

    pub fn roles(&self) -> impl Iterator<Item = (ColumnRole, Option<&str>)> + '_ {
        ColumnRole::ALL.iter().map(move |role| (*role, self.get(*role)))
    }

    pub fn project(&self, record: &Record) -> TypedRecord {
        let mut roles = HashMap::new();
        let mut extra = Map::new();

        for (column, value) in &record.data {
            match self.role_of(column) {
                Some(role) => {
                    roles.insert(role, value.clone());
                }
                None => {
                    extra.insert(column.clone(), value.clone());
                }
            }
        }

        TypedRecord { roles, extra }
    }

    fn role_of(&self, column: &str) -> Option<ColumnRole> {
        // 同一欄可能被多個角色命中（例如 "id"），以 ALL 的順序為準
        ColumnRole::ALL
            .iter()
            .copied()
            .find(|role| self.get(*role) == Some(column))
    }
}

/// 以邏輯欄位存取的資料列；未解析的欄位留在 `extra`
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRecord {
    roles: HashMap<ColumnRole, Value>,
    pub extra: Map<String, Value>,
}

impl TypedRecord {
    pub fn value(&self, role: ColumnRole) -> Option<&Value> {
        self.roles.get(&role)
    }

    pub fn text(&self, role: ColumnRole) -> Option<String> {
        self.roles
            .get(&role)
            .and_then(crate::domain::model::display_text)
    }
}
