use crate::core::aggregate::AggregateRow;
use crate::core::chat;
use crate::core::filter::FilterSpec;
use crate::core::overview::Overview;
use crate::core::report::{Chart, FilterOptions, TicketPage};
use crate::core::resolver::{ColumnMap, ColumnRole};
use crate::core::section::Section;
use crate::domain::message::{ChatMessage, Role};
use crate::domain::model::{display_text, RecordSet};
use std::io::{self, Write};

const BAR_WIDTH: usize = 30;
const MAX_CELL_WIDTH: usize = 40;

pub fn heading<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "=".repeat(title.chars().count()))
}

fn subheading<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "-".repeat(title.chars().count()))
}

pub fn kpis<W: Write>(out: &mut W, metrics: &[(&str, usize)]) -> io::Result<()> {
    let width = metrics.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    for (label, value) in metrics {
        writeln!(out, "  {:<width$}  {}", label, value, width = width)?;
    }
    Ok(())
}

/// 水平長條圖；長度依最大值等比例縮放
pub fn bar_chart<W: Write>(out: &mut W, rows: &[AggregateRow]) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "  (no data)");
    }

    let label_width = rows.iter().map(|r| r.value.chars().count()).max().unwrap_or(0);
    let max = rows.iter().map(|r| r.count).max().unwrap_or(0).max(1);

    for row in rows {
        let len = (row.count * BAR_WIDTH).div_ceil(max);
        writeln!(
            out,
            "  {:<width$}  {} {}",
            row.value,
            "█".repeat(len),
            row.count,
            width = label_width
        )?;
    }
    Ok(())
}

pub fn chart<W: Write>(out: &mut W, title: &str, chart: &Chart) -> io::Result<()> {
    subheading(out, title)?;
    match chart {
        Section::Ready(rows) => bar_chart(out, rows),
        other => notice(out, other),
    }
}

fn notice<W: Write, T>(out: &mut W, section: &Section<T>) -> io::Result<()> {
    match section {
        Section::Ready(_) => Ok(()),
        Section::Unavailable(message) => writeln!(out, "  ℹ️  {}", message),
        Section::Failed(message) => writeln!(out, "  ⚠️  {}", message),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
        cut.push('…');
        cut
    }
}

/// 對齊的表格；null 顯示為空白
pub fn table<W: Write>(out: &mut W, set: &RecordSet) -> io::Result<()> {
    if set.is_empty() {
        return writeln!(out, "  (no rows)");
    }

    let header: Vec<String> = set.columns().iter().map(|c| truncate(c)).collect();
    let cells: Vec<Vec<String>> = set
        .iter()
        .map(|record| {
            set.columns()
                .iter()
                .map(|c| truncate(&record.get(c).and_then(display_text).unwrap_or_default()))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |row: &[String]| -> String {
        row.iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    writeln!(out, "  {}", line(&header[..]))?;
    writeln!(
        out,
        "  {}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    )?;
    for row in &cells {
        writeln!(out, "  {}", line(&row[..]))?;
    }
    Ok(())
}

pub fn section_table<W: Write>(
    out: &mut W,
    title: &str,
    section: &Section<RecordSet>,
) -> io::Result<()> {
    subheading(out, title)?;
    match section {
        Section::Ready(set) => table(out, set),
        other => notice(out, other),
    }
}

pub fn overview<W: Write>(out: &mut W, page: &Overview, username: &str) -> io::Result<()> {
    heading(out, "📊 Multi-Domain Intelligence Platform")?;
    writeln!(out, "Welcome, {}!", username)?;

    subheading(out, "Key metrics")?;
    kpis(
        out,
        &[
            ("Users", page.kpis.users),
            ("Cyber incidents", page.kpis.incidents),
            ("Open incidents", page.kpis.open_incidents),
            ("High/Critical incidents", page.kpis.high_critical_incidents),
            ("IT tickets", page.kpis.tickets),
        ],
    )?;

    chart(out, "Incidents by severity", &page.incidents_by_severity)?;
    chart(out, "Incidents by status", &page.incidents_by_status)?;
    section_table(out, "Recent incidents", &page.recent_incidents)?;
    section_table(out, "Datasets", &page.datasets_preview)?;
    section_table(out, "Latest IT tickets", &page.tickets_preview)
}

fn filter_options<W: Write>(
    out: &mut W,
    options: &FilterOptions,
    spec: &FilterSpec,
) -> io::Result<()> {
    let rows = [
        ("status", ColumnRole::Status, &options.status),
        ("priority", ColumnRole::Priority, &options.priority),
        ("category", ColumnRole::Category, &options.category),
    ];

    subheading(out, "Filters")?;
    for (key, role, values) in rows {
        match values {
            Some(values) => writeln!(
                out,
                "  {}={}  (options: All, {})",
                key,
                spec.get(role),
                values.join(", ")
            )?,
            None => writeln!(out, "  {}: not available (no {} column)", key, key)?,
        }
    }
    Ok(())
}

pub fn ticket_page<W: Write>(out: &mut W, page: &TicketPage, spec: &FilterSpec) -> io::Result<()> {
    heading(out, "🛠️ IT Operations")?;
    filter_options(out, &page.options, spec)?;

    let report = &page.report;
    subheading(out, "Ticket KPIs")?;
    kpis(
        out,
        &[
            ("Total tickets", report.kpis.total),
            ("Open", report.kpis.open),
            ("In Progress", report.kpis.in_progress),
            ("Resolved/Closed", report.kpis.resolved_or_closed()),
        ],
    )?;

    chart(out, "Tickets by status", &report.by_status)?;
    chart(out, "Tickets by priority", &report.by_priority)?;
    chart(out, "Tickets by category", &report.by_category)?;

    subheading(out, "Ticket preview")?;
    table(out, &report.preview)
}

pub fn column_map<W: Write>(out: &mut W, table_name: &str, columns: &ColumnMap) -> io::Result<()> {
    heading(out, &format!("Detected columns in {}", table_name))?;
    let width = ColumnRole::ALL
        .iter()
        .map(|r| r.label().chars().count())
        .max()
        .unwrap_or(0);

    for (role, column) in columns.roles() {
        writeln!(
            out,
            "  {:<width$}  {}",
            role.label(),
            column.unwrap_or("(not found)"),
            width = width
        )?;
    }
    Ok(())
}

pub fn transcript<W: Write>(out: &mut W, messages: &[ChatMessage]) -> io::Result<()> {
    writeln!(out, "Messages: {}", messages.len())?;
    for message in chat::history(messages) {
        let speaker = match message.role {
            Role::User => "🧑 You",
            _ => "🤖 Assistant",
        };
        writeln!(out, "{}: {}", speaker, message.content)?;
    }
    Ok(())
}
