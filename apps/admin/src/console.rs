//! Terminal rendering and the stdin confirmation prompt.

use std::{
    fmt::Write as _,
    io::{self, BufRead, Write},
};

use chrono::FixedOffset;
use client_core::{Confirm, ConfirmationPrompt, PageView};
use serde_json::Value;
use shared::domain::{ActionAvailability, Order, StatusSummary, StretchData};

/// Asks y/N on stdin. EOF or a read error declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &ConfirmationPrompt) -> bool {
        print!("{} [y/N] ", prompt.message);
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => is_affirmative(&line),
        }
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn format_actions(availability: ActionAvailability) -> String {
    let mark = |enabled: bool, label: &'static str| if enabled { label } else { "-" };
    format!(
        "{} {} {}",
        mark(availability.dispatch, "dispatch"),
        mark(availability.fulfill, "fulfill"),
        mark(availability.cancel, "cancel"),
    )
}

pub fn render_page(
    view: &PageView<'_>,
    offset: &FixedOffset,
    availability: impl Fn(&Order) -> ActionAvailability,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<26} {:<16} {:<24} {:<10} {:>10}  ACTIONS",
        "ID", "DATE", "CUSTOMER", "STATUS", "TOTAL"
    );
    for order in view.rows.iter().copied() {
        let _ = writeln!(
            out,
            "{:<26} {:<16} {:<24} {:<10} {:>10.2}  {}",
            order.order_id.as_str(),
            order
                .order_date
                .with_timezone(offset)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            truncate(&order.customer_name(), 24),
            order.order_status.as_str(),
            order.total_price(),
            format_actions(availability(order)),
        );
    }
    if view.total == 0 {
        let _ = writeln!(out, "no orders match");
    } else {
        let _ = writeln!(
            out,
            "page {}/{} ({} orders, {} per page)",
            view.page + 1,
            view.total_pages,
            view.total,
            view.size
        );
    }
    out
}

pub fn render_order(order: &Order, offset: &FixedOffset) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Order {}", order.order_id);
    let _ = writeln!(
        out,
        "  placed:   {}",
        order.order_date.with_timezone(offset).format("%Y-%m-%d %H:%M %:z")
    );
    let _ = writeln!(out, "  status:   {}", order.order_status);
    let _ = writeln!(out, "  customer: {}", order.customer_name());
    if let Some(email) = &order.email {
        let _ = writeln!(out, "  email:    {email}");
    }
    if let Some(phone) = &order.phone {
        let _ = writeln!(out, "  phone:    {phone}");
    }
    let mut address = order.address.clone();
    if let Some(apartment) = order.apartment.as_deref().filter(|a| !a.is_empty()) {
        let _ = write!(address, ", {apartment}");
    }
    let _ = writeln!(out, "  address:  {address} {}", order.post_code);
    if order.cash_on_delivery == Some(true) {
        let _ = writeln!(out, "  payment:  cash on delivery");
    }
    if let Some(notes) = order.additional_information.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(out, "  notes:    {notes}");
    }
    let _ = writeln!(out, "  items:");
    for item in &order.products {
        let _ = writeln!(
            out,
            "    {} x{} @ {:.2}{} = {:.2}",
            item.title,
            item.quantity,
            item.unit_price(),
            if item.is_stitching { " (stitched)" } else { "" },
            item.line_total(),
        );
        for measurements in &item.stretch_data {
            write_measurements(&mut out, measurements, "      ");
        }
    }
    if let Some(measurements) = order.stretch_data.as_ref().filter(|m| !m.is_empty()) {
        let _ = writeln!(out, "  measurements:");
        write_measurements(&mut out, measurements, "    ");
    }
    let _ = writeln!(out, "  total:    {:.2}", order.total_price());
    out
}

fn write_measurements(out: &mut String, measurements: &StretchData, indent: &str) {
    for (title, fields) in measurements.sections() {
        let _ = writeln!(out, "{indent}{title}:");
        for (field, value) in fields {
            let _ = writeln!(
                out,
                "{indent}  {}: {}",
                field_label(field),
                measurement_value(value)
            );
        }
    }
    if let Some(height) = &measurements.height {
        let _ = writeln!(out, "{indent}Height: {}", measurement_value(height));
    }
    if let Some(weight) = &measurements.weight {
        let _ = writeln!(out, "{indent}Weight: {}", measurement_value(weight));
    }
}

/// `sleeveLength` -> `Sleeve Length`.
pub fn field_label(key: &str) -> String {
    let mut label = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if i == 0 {
            label.extend(ch.to_uppercase());
        } else if ch.is_uppercase() {
            label.push(' ');
            label.push(ch);
        } else {
            label.push(ch);
        }
    }
    label
}

fn measurement_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

pub fn render_summary(summary: &StatusSummary) -> String {
    format!(
        "total {}  pending {}  dispatched {}  fulfilled {}  cancelled {}\n",
        summary.total, summary.pending, summary.dispatched, summary.fulfilled, summary.cancelled
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('~');
    cut
}
