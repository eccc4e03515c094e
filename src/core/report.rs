use crate::core::aggregate::{self, AggregateRow};
use crate::core::filter::{apply_filters, FilterSpec};
use crate::core::resolver::{ColumnMap, ColumnRole};
use crate::core::section::Section;
use crate::domain::model::{Record, RecordSet};
use crate::domain::ports::TableSource;
use crate::utils::error::{DashError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::cmp::Ordering;

pub const STATUS_OPEN: &str = "Open";
pub const STATUS_IN_PROGRESS: &str = "In Progress";
pub const STATUS_RESOLVED: &str = "Resolved";
pub const STATUS_CLOSED: &str = "Closed";

pub type Chart = Section<Vec<AggregateRow>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KpiSnapshot {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub closed: usize,
}

impl KpiSnapshot {
    pub fn from_set(set: &RecordSet, columns: &ColumnMap) -> Self {
        let bucket = |value: &str| {
            columns
                .get(ColumnRole::Status)
                .map(|column| aggregate::count_where(set, column, value))
                .unwrap_or(0)
        };

        Self {
            total: aggregate::count(set),
            open: bucket(STATUS_OPEN),
            in_progress: bucket(STATUS_IN_PROGRESS),
            resolved: bucket(STATUS_RESOLVED),
            closed: bucket(STATUS_CLOSED),
        }
    }

    pub fn resolved_or_closed(&self) -> usize {
        self.resolved + self.closed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub preview_rows: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { preview_rows: 10 }
    }
}

/// 篩選後工單的彙總結果
#[derive(Debug, Clone, PartialEq)]
pub struct TicketReport {
    pub kpis: KpiSnapshot,
    pub by_status: Chart,
    pub by_priority: Chart,
    pub by_category: Chart,
    pub preview: RecordSet,
}

impl TicketReport {
    pub fn assemble(filtered: &RecordSet, columns: &ColumnMap, options: &ReportOptions) -> Self {
        let preview = match columns.get(ColumnRole::CreatedAt) {
            Some(column) => order_by_recency(filtered, column),
            None => filtered.clone(),
        }
        .head(options.preview_rows);

        Self {
            kpis: KpiSnapshot::from_set(filtered, columns),
            by_status: chart(filtered, columns, ColumnRole::Status),
            by_priority: chart(filtered, columns, ColumnRole::Priority),
            by_category: chart(filtered, columns, ColumnRole::Category),
            preview,
        }
    }

    pub fn total(&self) -> usize {
        self.kpis.total
    }
}

fn chart(set: &RecordSet, columns: &ColumnMap, role: ColumnRole) -> Chart {
    match columns.get(role) {
        Some(_) if set.is_empty() => Section::Unavailable(format!(
            "{} chart unavailable (no tickets to chart).",
            role.label()
        )),
        Some(column) => Section::Ready(aggregate::value_counts(set, column)),
        None => Section::Unavailable(format!(
            "{} chart unavailable (no {} column detected).",
            role.label(),
            role.label().to_lowercase()
        )),
    }
}

/// 每個可篩選欄位的選項；欄位未解析時為 None
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterOptions {
    pub status: Option<Vec<String>>,
    pub priority: Option<Vec<String>>,
    pub category: Option<Vec<String>>,
}

impl FilterOptions {
    pub fn from_set(set: &RecordSet, columns: &ColumnMap) -> Self {
        let options = |role: ColumnRole| {
            columns
                .get(role)
                .map(|column| aggregate::distinct_values(set, column))
        };

        Self {
            status: options(ColumnRole::Status),
            priority: options(ColumnRole::Priority),
            category: options(ColumnRole::Category),
        }
    }
}

/// IT 維運頁：載入、偵測欄位、篩選、彙總
#[derive(Debug, Clone)]
pub struct TicketPage {
    pub columns: ColumnMap,
    pub options: FilterOptions,
    pub filtered: RecordSet,
    pub report: TicketReport,
}

impl TicketPage {
    pub fn load(
        source: &dyn TableSource,
        table: &str,
        spec: &FilterSpec,
        options: &ReportOptions,
    ) -> Result<Self> {
        let tickets = source.load(table)?;
        Ok(Self::build(&tickets, spec, options))
    }

    pub fn build(tickets: &RecordSet, spec: &FilterSpec, options: &ReportOptions) -> Self {
        let columns = ColumnMap::detect(tickets);
        let filter_options = FilterOptions::from_set(tickets, &columns);
        let filtered = apply_filters(tickets, spec, &columns);
        let report = TicketReport::assemble(&filtered, &columns, options);

        tracing::info!(
            "📊 Ticket report: {} of {} tickets after filters",
            filtered.len(),
            tickets.len()
        );

        Self {
            columns,
            options: filter_options,
            filtered,
            report,
        }
    }
}

/// 依時間欄位由新到舊排序；同值維持原順序，缺值排最後
pub fn order_by_recency(set: &RecordSet, column: &str) -> RecordSet {
    let mut keyed: Vec<(RecencyKey, &Record)> = set
        .iter()
        .map(|r| (RecencyKey::of(r.get(column)), r))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| b.cmp(a));
    set.with_records(keyed.into_iter().map(|(_, r)| r.clone()).collect())
}

/// 第一個存在的欄位排序；都不存在時維持載入順序
pub fn order_by_first_present(set: &RecordSet, candidates: &[&str]) -> RecordSet {
    match candidates.iter().find(|c| set.has_column(c)) {
        Some(column) => order_by_recency(set, column),
        None => {
            tracing::debug!("No ordering column among {:?}; keeping load order", candidates);
            set.clone()
        }
    }
}

/// 必要欄位不存在時回傳 MissingColumn
pub fn require_column<'a>(set: &RecordSet, table: &str, column: &'a str) -> Result<&'a str> {
    if set.has_column(column) {
        Ok(column)
    } else {
        Err(DashError::MissingColumn {
            table: table.to_string(),
            role: capitalize(column),
        })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RecencyKey {
    Missing,
    Text(String),
    Number(f64),
    Time(NaiveDateTime),
}

impl RecencyKey {
    fn of(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => RecencyKey::Missing,
            Some(Value::Number(n)) => n
                .as_f64()
                .map(RecencyKey::Number)
                .unwrap_or(RecencyKey::Missing),
            Some(Value::String(s)) => match parse_timestamp(s.trim()) {
                Some(t) => RecencyKey::Time(t),
                None => RecencyKey::Text(s.clone()),
            },
            Some(other) => RecencyKey::Text(other.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            RecencyKey::Missing => 0,
            RecencyKey::Text(_) => 1,
            RecencyKey::Number(_) => 2,
            RecencyKey::Time(_) => 3,
        }
    }
}

impl Eq for RecencyKey {}

impl PartialOrd for RecencyKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecencyKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (RecencyKey::Text(a), RecencyKey::Text(b)) => a.cmp(b),
            (RecencyKey::Number(a), RecencyKey::Number(b)) => a.total_cmp(b),
            (RecencyKey::Time(a), RecencyKey::Time(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
