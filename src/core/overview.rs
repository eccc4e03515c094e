use crate::config::toml_config::TableNames;
use crate::core::aggregate;
use crate::core::report::{order_by_first_present, require_column, Chart};
use crate::core::section::Section;
use crate::domain::model::RecordSet;
use crate::domain::ports::TableSource;
use crate::utils::error::{DashError, Result};

const HIGH_SEVERITIES: [&str; 2] = ["High", "Critical"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverviewKpis {
    pub users: usize,
    pub incidents: usize,
    pub open_incidents: usize,
    pub high_critical_incidents: usize,
    pub tickets: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverviewOptions {
    pub recent_incidents: usize,
    pub dataset_preview: usize,
    pub ticket_preview: usize,
}

impl Default for OverviewOptions {
    fn default() -> Self {
        Self {
            recent_incidents: 10,
            dataset_preview: 5,
            ticket_preview: 5,
        }
    }
}

/// 首頁總覽：跨資料表的計數、事件圖表與最新資料預覽
#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub kpis: OverviewKpis,
    pub incidents_by_severity: Chart,
    pub incidents_by_status: Chart,
    pub recent_incidents: Section<RecordSet>,
    pub datasets_preview: Section<RecordSet>,
    pub tickets_preview: Section<RecordSet>,
}

impl Overview {
    pub fn assemble(source: &dyn TableSource, tables: &TableNames, options: &OverviewOptions) -> Self {
        tracing::info!("📊 Building overview");

        // 事件表只讀一次，失敗時所有事件區塊各自降級
        let incidents = load_if_exists(source, &tables.incidents);

        let (open_incidents, high_critical_incidents) = match &incidents {
            Ok(set) => (
                aggregate::count_where(set, "status", "Open"),
                aggregate::count_in(set, "severity", &HIGH_SEVERITIES),
            ),
            Err(_) => (0, 0),
        };

        let kpis = OverviewKpis {
            users: source.row_count(&tables.users),
            incidents: source.row_count(&tables.incidents),
            open_incidents,
            high_critical_incidents,
            tickets: source.row_count(&tables.tickets),
        };

        let incident_chart = |column: &str, name: &str| -> Chart {
            match &incidents {
                Ok(set) => Section::from_result(
                    name,
                    require_column(set, &tables.incidents, column)
                        .map(|column| aggregate::value_counts(set, column)),
                ),
                Err(e) => Section::from_error(name, e),
            }
        };

        let incidents_by_severity = incident_chart("severity", "severity chart");
        let incidents_by_status = incident_chart("status", "status chart");

        let recent_incidents = match &incidents {
            Ok(set) => Section::Ready(
                order_by_first_present(set, &["created_at", "id"]).head(options.recent_incidents),
            ),
            Err(e) => Section::from_error("recent incidents", e),
        };

        let datasets_preview = Section::from_result(
            "datasets preview",
            load_if_exists(source, &tables.datasets).map(|set| {
                order_by_first_present(&set, &["upload_date", "created_at", "id"])
                    .head(options.dataset_preview)
            }),
        );

        let tickets_preview = Section::from_result(
            "tickets preview",
            load_if_exists(source, &tables.tickets).map(|set| {
                order_by_first_present(&set, &["created_at", "created_date", "id"])
                    .head(options.ticket_preview)
            }),
        );

        Self {
            kpis,
            incidents_by_severity,
            incidents_by_status,
            recent_incidents,
            datasets_preview,
            tickets_preview,
        }
    }
}

fn load_if_exists(source: &dyn TableSource, table: &str) -> Result<RecordSet> {
    if !source.table_exists(table) {
        return Err(DashError::MissingTable {
            table: table.to_string(),
        });
    }
    source.load(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;
    use std::collections::HashMap;

    /// 記憶體內的資料表來源
    struct MemorySource {
        tables: HashMap<String, RecordSet>,
    }

    impl TableSource for MemorySource {
        fn table_exists(&self, table: &str) -> bool {
            self.tables.contains_key(table)
        }

        fn columns(&self, table: &str) -> Vec<String> {
            self.tables
                .get(table)
                .map(|t| t.columns().to_vec())
                .unwrap_or_default()
        }

        fn row_count(&self, table: &str) -> usize {
            self.tables.get(table).map(|t| t.len()).unwrap_or(0)
        }

        fn load(&self, table: &str) -> Result<RecordSet> {
            self.tables
                .get(table)
                .cloned()
                .ok_or_else(|| DashError::MissingTable {
                    table: table.to_string(),
                })
        }
    }

    fn incidents() -> RecordSet {
        let rows = [
            (1, "High", "Open", "2024-01-03"),
            (2, "Low", "Closed", "2024-01-09"),
            (3, "Critical", "Open", "2024-01-05"),
            (4, "High", "Resolved", "2024-01-01"),
        ];
        RecordSet::from_records(
            rows.iter()
                .map(|(id, severity, status, created)| {
                    Record::new()
                        .with("id", *id)
                        .with("severity", *severity)
                        .with("status", *status)
                        .with("created_at", *created)
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_overview_with_incidents_only() {
        let source = MemorySource {
            tables: HashMap::from([("cyber_incidents".to_string(), incidents())]),
        };
        let overview = Overview::assemble(&source, &TableNames::default(), &OverviewOptions::default());

        assert_eq!(overview.kpis.incidents, 4);
        assert_eq!(overview.kpis.open_incidents, 2);
        assert_eq!(overview.kpis.high_critical_incidents, 3);
        assert_eq!(overview.kpis.users, 0);
        assert_eq!(overview.kpis.tickets, 0);

        let severity = overview.incidents_by_severity.ready().unwrap();
        assert_eq!(severity[0].value, "High");
        assert_eq!(severity[0].count, 2);

        let recent = overview.recent_incidents.ready().unwrap();
        let ids: Vec<String> = recent.iter().filter_map(|r| r.text("id")).collect();
        assert_eq!(ids, vec!["2", "3", "1", "4"]);

        assert_eq!(
            overview.tickets_preview,
            Section::Unavailable("No it_tickets table found.".to_string())
        );
    }

    #[test]
    fn test_overview_missing_severity_column() {
        let without_severity = incidents().project(&["id".to_string(), "status".to_string()]);
        let source = MemorySource {
            tables: HashMap::from([("cyber_incidents".to_string(), without_severity)]),
        };
        let overview = Overview::assemble(&source, &TableNames::default(), &OverviewOptions::default());

        assert_eq!(overview.kpis.high_critical_incidents, 0);
        assert!(matches!(overview.incidents_by_severity, Section::Unavailable(_)));
        assert!(overview.incidents_by_status.is_ready());
    }

    #[test]
    fn test_overview_on_empty_database() {
        let source = MemorySource {
            tables: HashMap::new(),
        };
        let overview = Overview::assemble(&source, &TableNames::default(), &OverviewOptions::default());

        assert_eq!(overview.kpis, OverviewKpis::default());
        assert!(!overview.incidents_by_status.is_ready());
        assert!(!overview.recent_incidents.is_ready());
        assert!(!overview.datasets_preview.is_ready());
    }
}
