use crate::scheduler::GenerationOutcome;
use crate::types::Snapshot;
use crate::validator::Severity;
use colored::Colorize;

/// Generate a plain text report (with colors for terminal)
pub fn generate_text_report(outcome: &GenerationOutcome, snapshot: &Snapshot) -> String {
    let mut lines = Vec::new();

    lines.push("═".repeat(60));
    lines.push("               TIMETABLE REPORT".to_string());
    lines.push("═".repeat(60));
    lines.push(String::new());

    lines.push(format!("Term:        {}", outcome.store.term));
    lines.push(format!("Year:        {}", outcome.store.academic_year));
    lines.push(format!("Solve Time:  {}ms", outcome.solve_time_ms));
    lines.push(String::new());

    lines.push("─".repeat(40));
    lines.push("STAGES".to_string());
    lines.push("─".repeat(40));
    for report in &outcome.stage_reports {
        lines.push(format!("  {:<22} {}", report.stage, report.message));
    }
    lines.push(String::new());

    lines.push("─".repeat(40));
    if outcome.validation.is_clean() {
        lines.push("VALIDATION: PASSED".green().to_string());
    } else {
        lines.push(
            format!(
                "VALIDATION: {} FINDINGS",
                outcome.validation.conflicts.len()
            )
            .yellow()
            .to_string(),
        );
        for conflict in &outcome.validation.conflicts {
            let marker = match conflict.severity {
                Severity::Error => "!".red(),
                Severity::Warning => "~".yellow(),
            };
            lines.push(format!("  {} {}: {}", marker, conflict.rule, conflict.message));
        }
    }
    lines.push("─".repeat(40));
    lines.push(String::new());

    for table in outcome.store.timetables() {
        lines.push(format!(
            "{} (semester {})",
            table.section_name.bold(),
            table.semester
        ));
        if let Some(section_report) = crate::reporter::generate_section_report(
            &outcome.store,
            snapshot,
            &table.section_id,
        ) {
            // Drop the heading; the name was just printed
            for line in section_report.lines().skip(2) {
                lines.push(line.to_string());
            }
        }
        if !table.flagged_sessions.is_empty() {
            lines.push(format!(
                "  {} {} unresolved items",
                "⚠".yellow(),
                table.flagged_sessions.len()
            ));
        }
        lines.push(String::new());
    }

    lines.push("═".repeat(60));
    lines.join("\n")
}
