use std::fmt::Write;

use anyhow::Result;
use parcel_engine::{
    db_types::{Order, Participant},
    order_objects::{OrderView, StatusChangeResult},
    status_registry::OrderStatus,
    ImportReport,
};
use parcel_server::data_objects::StatusListEntry;
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

/// Orders as a markdown table. Notes are moved below the table as numbered footnotes to keep the rows short.
pub fn format_orders(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No orders".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["Order id", "Client", "Country", "Origin", "Status", "Note", "Updated At"]);
    let mut notes = Vec::new();
    orders.iter().for_each(|order| {
        let note_ref = match order.note.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(note) => {
                notes.push(note.to_string());
                format!("{}^", notes.len())
            },
            None => String::default(),
        };
        table.add_row(row![
            order.order_id,
            order.client_name,
            order.country.as_deref().unwrap_or_default(),
            order.origin.as_deref().unwrap_or_default(),
            order.status,
            note_ref,
            order.updated_at.format("%Y-%m-%d %H:%M")
        ]);
    });
    markdown_style(&mut table);
    let footnotes =
        notes.iter().enumerate().map(|(i, note)| format!("^{}: {}", i + 1, note)).collect::<Vec<String>>().join("\n");
    if footnotes.is_empty() {
        format!("{table}\n")
    } else {
        format!("{table}\n## Notes\n{footnotes}")
    }
}

pub fn format_participants(participants: &[Participant]) -> String {
    if participants.is_empty() {
        return "No participants".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["Username", "Paid", "Since"]);
    participants.iter().for_each(|p| {
        let paid = if p.paid { "✅" } else { "❌" };
        table.add_row(row![format!("@{}", p.username), paid, p.created_at.format("%Y-%m-%d")]);
    });
    markdown_style(&mut table);
    table.to_string()
}

pub fn format_order_view(view: &OrderView) -> Result<String> {
    let order = &view.order;
    let mut f = String::new();
    writeln!(f, "Order id: {:15} Created {}", order.order_id.as_str(), order.created_at.format("%Y-%m-%d %H:%M"))?;
    writeln!(f, "Client: {}", order.client_name)?;
    if let Some(phone) = &order.phone {
        writeln!(f, "Phone: {phone}")?;
    }
    writeln!(f, "Country: {}", order.country.as_deref().unwrap_or("-"))?;
    writeln!(f, "Origin: {}", order.origin.as_deref().unwrap_or("-"))?;
    match &view.status {
        OrderStatus::Known(status) => writeln!(f, "Status: [{}] {}", status.index, status.label)?,
        OrderStatus::Raw(raw) => writeln!(f, "Status: {raw} (not in the status list)")?,
    }
    writeln!(f, "Note: {}", order.note.as_deref().unwrap_or("No note"))?;
    writeln!(f, "-----------------------------------------------------------------------------")?;
    f.write_str(&format_participants(&view.participants))?;
    Ok(f)
}

pub fn format_statuses(statuses: &[StatusListEntry]) -> String {
    let mut table = Table::new();
    table.set_titles(row!["#", "Status"]);
    statuses.iter().for_each(|s| {
        table.add_row(row![s.index, s.label]);
    });
    markdown_style(&mut table);
    table.to_string()
}

pub fn format_status_change(result: &StatusChangeResult) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "{} is now {}", result.order.order_id, result.order.status)?;
    match (&result.notifications, &result.notification_error) {
        (Some(report), _) => {
            let (sent, attempted, skipped) = (report.sent, report.attempted, report.skipped);
            writeln!(f, "📨 Notified {sent} of {attempted} subscribers ({skipped} skipped)")?;
            for failure in &report.failures {
                writeln!(f, "  ❌ {}: {} ({})", failure.user_id, failure.message, failure.kind)?;
            }
        },
        (None, Some(error)) => writeln!(f, "⚠️ Subscribers were not notified. {error}")?,
        (None, None) => writeln!(f, "Subscribers were not notified.")?,
    }
    Ok(f)
}

/// Every failed row, not just the first few the server summary lists.
pub fn format_import_errors(report: &ImportReport) -> String {
    if report.errors.is_empty() {
        return String::default();
    }
    let mut table = Table::new();
    table.set_titles(row!["Row", "Order id", "Reason"]);
    report.errors.iter().for_each(|e| {
        table.add_row(row![e.row, e.order_id, e.reason]);
    });
    markdown_style(&mut table);
    table.to_string()
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use parcel_engine::{db_types::OrderId, status_registry::KnownStatus};

    use super::*;

    fn order(order_id: &str, note: Option<&str>) -> Order {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        Order {
            id: 1,
            order_id: OrderId::from(order_id),
            client_name: "@alice_k".to_string(),
            phone: None,
            origin: Some("Seoul".to_string()),
            status: "🛒 Purchased".to_string(),
            note: note.map(String::from),
            country: Some("KR".to_string()),
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn empty_lists() {
        assert_eq!(format_orders(&[]), "No orders");
        assert_eq!(format_participants(&[]), "No participants");
        assert!(format_import_errors(&ImportReport::new(3)).is_empty());
    }

    #[test]
    fn notes_become_footnotes() {
        let text = format_orders(&[order("KR-1", Some("fragile")), order("KR-2", None)]);
        assert!(text.contains("| KR-1 "));
        assert!(text.contains("2024-03-01 12:30"));
        assert!(text.ends_with("## Notes\n^1: fragile"));
    }

    #[test]
    fn order_view_shows_the_status_index() {
        let view = OrderView {
            order: order("KR-1", None),
            status: OrderStatus::Known(KnownStatus { index: 0, label: "🛒 Purchased".to_string() }),
            participants: vec![],
        };
        let text = format_order_view(&view).unwrap();
        assert!(text.contains("Status: [0] 🛒 Purchased"));
        assert!(text.contains("Origin: Seoul"));
        assert!(text.ends_with("No participants"));
    }
}
