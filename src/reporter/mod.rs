mod json;
mod markdown;
mod text;

pub use json::*;
pub use markdown::*;
pub use text::*;

use crate::error::Result;
use crate::scheduler::GenerationOutcome;
use crate::store::ScheduleStore;
use crate::types::{SectionId, Snapshot, TeacherId};
use colored::Colorize;
use std::fs;
use std::path::Path;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Json,
    Markdown,
    Text,
}

/// Generate all reports and write to output directory
pub fn generate_reports(
    outcome: &GenerationOutcome,
    snapshot: &Snapshot,
    output_dir: &Path,
    formats: &[OutputFormat],
) -> Result<()> {
    fs::create_dir_all(output_dir)?;

    for format in formats {
        match format {
            OutputFormat::Json => {
                let json = generate_json_report(&outcome.store)?;
                fs::write(output_dir.join("timetables.json"), json)?;
            }
            OutputFormat::Markdown => {
                let md = generate_markdown_report(outcome, snapshot);
                fs::write(output_dir.join("timetables.md"), md)?;
            }
            OutputFormat::Text => {
                let txt = generate_text_report(outcome, snapshot);
                fs::write(output_dir.join("timetables.txt"), txt)?;
            }
        }
    }

    Ok(())
}

/// One section's weekly listing
pub fn generate_section_report(
    store: &ScheduleStore,
    snapshot: &Snapshot,
    section_id: &SectionId,
) -> Option<String> {
    let table = store.timetable(section_id)?;
    let mut lines = vec![
        format!(
            "# Timetable for {} (semester {}, {} term)",
            table.section_name, table.semester, table.term
        ),
        String::new(),
    ];

    for &day in &crate::types::Day::ALL {
        let mut entries: Vec<(crate::types::TimeOfDay, String)> = Vec::new();
        for session in table.theory_sessions.iter().filter(|s| s.day == day) {
            let subject = snapshot
                .subject(&session.subject)
                .map(|s| s.shortform.as_str())
                .unwrap_or("?");
            let teacher = session
                .teacher
                .as_ref()
                .and_then(|t| snapshot.teacher(t))
                .map(|t| t.shortform.as_str())
                .unwrap_or("TBD");
            let room = session
                .classroom
                .as_ref()
                .map(|c| c.0.as_str())
                .unwrap_or("TBD");
            let fixed = if session.is_fixed { " [fixed]" } else { "" };
            entries.push((
                session.start,
                format!(
                    "{}-{}  {} ({}) room {}{}",
                    session.start, session.end, subject, teacher, room, fixed
                ),
            ));
        }
        for session in table.lab_sessions.iter().filter(|s| s.day == day) {
            let batches: Vec<String> = session
                .batches
                .iter()
                .map(|b| {
                    let lab = snapshot
                        .lab(&b.lab)
                        .map(|l| l.shortform.as_str())
                        .unwrap_or("?");
                    format!("B{} {} @{}", b.batch_number, lab, b.lab_room)
                })
                .collect();
            entries.push((
                session.start,
                format!(
                    "{}-{}  LAB: {}",
                    session.start,
                    session.end,
                    batches.join(", ")
                ),
            ));
        }
        entries.sort_by_key(|(start, _)| *start);

        lines.push(format!("## {day}"));
        if entries.is_empty() {
            lines.push("  (free)".to_string());
        } else {
            for (_, entry) in entries {
                lines.push(format!("  {entry}"));
            }
        }
        lines.push(String::new());
    }

    Some(lines.join("\n"))
}

/// One teacher's engagements across every section
pub fn generate_teacher_report(
    store: &ScheduleStore,
    snapshot: &Snapshot,
    teacher_id: &TeacherId,
) -> Option<String> {
    let teacher = snapshot.teacher(teacher_id)?;
    let mut lines = vec![
        format!("# Schedule for {} ({})", teacher.name, teacher.shortform),
        String::new(),
    ];

    let mut entries: Vec<(crate::types::Day, crate::types::TimeOfDay, String)> = Vec::new();
    for table in store.timetables() {
        for session in &table.theory_sessions {
            if session.teacher.as_ref() == Some(teacher_id) {
                let subject = snapshot
                    .subject(&session.subject)
                    .map(|s| s.shortform.as_str())
                    .unwrap_or("?");
                entries.push((
                    session.day,
                    session.start,
                    format!(
                        "{} {}-{}: {} theory, section {}",
                        session.day, session.start, session.end, subject, table.section_name
                    ),
                ));
            }
        }
        for session in &table.lab_sessions {
            for batch in &session.batches {
                if batch.teachers().any(|t| t == teacher_id) {
                    let lab = snapshot
                        .lab(&batch.lab)
                        .map(|l| l.shortform.as_str())
                        .unwrap_or("?");
                    entries.push((
                        session.day,
                        session.start,
                        format!(
                            "{} {}-{}: {} lab batch {}, section {} @{}",
                            session.day,
                            session.start,
                            session.end,
                            lab,
                            batch.batch_number,
                            table.section_name,
                            batch.lab_room
                        ),
                    ));
                }
            }
        }
    }

    if entries.is_empty() {
        lines.push("No sessions assigned.".to_string());
    } else {
        entries.sort_by_key(|(day, start, _)| (*day, *start));
        for (_, _, entry) in entries {
            lines.push(format!("- {entry}"));
        }
    }

    Some(lines.join("\n"))
}

/// Print a quick post-run summary to stdout
pub fn print_summary(outcome: &GenerationOutcome) {
    println!();
    if outcome.validation.is_clean() {
        println!("{}", "✓ Timetables generated without findings".green().bold());
    } else {
        println!(
            "{}",
            format!(
                "⚠ Timetables generated with {} findings",
                outcome.validation.conflicts.len()
            )
            .yellow()
            .bold()
        );
    }
    println!();
    for report in &outcome.stage_reports {
        let marker = if report.flagged == 0 {
            "●".green()
        } else {
            "●".yellow()
        };
        println!("  {} {:<22} {}", marker, report.stage, report.message);
    }
    println!();
    let stats = &outcome.validation.statistics;
    println!("  Theory sessions: {}", stats.theory_sessions);
    println!("  Lab sessions:    {}", stats.lab_sessions);
    println!("  Flagged items:   {}", stats.flagged_sessions);
    if let Some(refinement) = &outcome.refinement {
        println!(
            "  Refiner:         {} ({} -> {} in {} iterations)",
            refinement.driver,
            refinement.initial_fitness,
            refinement.final_fitness,
            refinement.iterations
        );
    }
    println!("  Time:            {}ms", outcome.solve_time_ms);
    println!();
}
