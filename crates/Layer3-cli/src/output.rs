//! Terminal / JSON rendering of audit records and summaries

use trail_foundation::{ActivitySummary, AuditRecord};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Print `records` as a table, or as a JSON array when `json` is set.
pub fn print_records(records: &[AuditRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else {
        print!("{}", render_records(records));
    }
    Ok(())
}

pub fn print_summary(summary: &ActivitySummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        print!("{}", render_summary(summary));
    }
    Ok(())
}

pub fn render_records(records: &[AuditRecord]) -> String {
    if records.is_empty() {
        return "No audit records found.\n".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{:<24} {:<16} {:<24} {:>9} {:<6} {}\n",
        "Time", "Actor", "Operation", "Duration", "Result", "Detail"
    ));
    out.push_str(&format!("{}\n", "-".repeat(96)));

    for record in records {
        out.push_str(&format!(
            "{:<24} {:<16} {:<24} {:>7}ms {:<6} {}\n",
            record.timestamp().format(TIME_FORMAT),
            truncate(record.actor(), 16),
            truncate(record.operation(), 24),
            record.duration_millis(),
            if record.succeeded() { "ok" } else { "FAIL" },
            record.detail().unwrap_or_default()
        ));
    }

    out.push_str(&format!("\n{} record(s)\n", records.len()));
    out
}

pub fn render_summary(summary: &ActivitySummary) -> String {
    if summary.is_empty() {
        return format!("No recorded activity for {}.\n", summary.actor);
    }

    let mut out = format!("\nActivity of {}\n\n", summary.actor);
    out.push_str(&format!(
        "  Operations:   {} ({} failed)\n",
        summary.total_operations, summary.failed_operations
    ));
    out.push_str(&format!(
        "  Avg duration: {:.1}ms\n",
        summary.average_execution_time
    ));
    if let (Some(first), Some(last)) = (summary.first_operation, summary.last_operation) {
        out.push_str(&format!("  First:        {}\n", first.format(TIME_FORMAT)));
        out.push_str(&format!("  Last:         {}\n", last.format(TIME_FORMAT)));
    }

    out.push_str("\n  By operation:\n");
    for (operation, count) in &summary.operation_counts {
        out.push_str(&format!("    {:<24} {}\n", operation, count));
    }
    out
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let kept: String = value.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}
