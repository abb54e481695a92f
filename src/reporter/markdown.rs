use crate::scheduler::GenerationOutcome;
use crate::types::{Day, Flag, Snapshot};

/// Generate a markdown report of the full timetable set
pub fn generate_markdown_report(outcome: &GenerationOutcome, snapshot: &Snapshot) -> String {
    let mut lines = vec![
        "# Timetable Report".to_string(),
        String::new(),
        format!("Term: {} | Year: {}", outcome.store.term, outcome.store.academic_year),
        format!("Solve time: {}ms", outcome.solve_time_ms),
        String::new(),
    ];

    lines.push("## Summary\n".to_string());
    lines.push("| Metric | Value |".to_string());
    lines.push("|--------|-------|".to_string());
    lines.push(format!("| Sections | {} |", outcome.store.timetables().len()));
    lines.push(format!(
        "| Theory sessions | {} |",
        outcome.validation.statistics.theory_sessions
    ));
    lines.push(format!(
        "| Lab sessions | {} |",
        outcome.validation.statistics.lab_sessions
    ));
    lines.push(format!(
        "| Flagged items | {} |",
        outcome.validation.statistics.flagged_sessions
    ));
    lines.push(format!(
        "| Validator findings | {} |",
        outcome.validation.conflicts.len()
    ));
    if let Some(refinement) = &outcome.refinement {
        lines.push(format!(
            "| Refiner | {} ({} → {}) |",
            refinement.driver, refinement.initial_fitness, refinement.final_fitness
        ));
    }
    lines.push(String::new());

    if outcome.validation.is_clean() {
        lines.push("## Validation: ✅ PASSED\n".to_string());
    } else {
        lines.push("## Validation: ⚠️ FINDINGS\n".to_string());
        for conflict in &outcome.validation.conflicts {
            lines.push(format!("- **{}**: {}", conflict.rule, conflict.message));
        }
        lines.push(String::new());
    }

    for table in outcome.store.timetables() {
        lines.push(format!(
            "## Section {} (semester {})\n",
            table.section_name, table.semester
        ));
        lines.push("| Day | Time | Session | Teacher(s) | Room(s) |".to_string());
        lines.push("|-----|------|---------|------------|---------|".to_string());

        for &day in &Day::ALL {
            let mut rows: Vec<(crate::types::TimeOfDay, String)> = Vec::new();

            for session in table.theory_sessions.iter().filter(|s| s.day == day) {
                let subject = snapshot
                    .subject(&session.subject)
                    .map(|s| s.shortform.clone())
                    .unwrap_or_else(|| session.subject.0.clone());
                let marker = if session.is_fixed { " (fixed)" } else { "" };
                let teacher = session
                    .teacher
                    .as_ref()
                    .and_then(|t| snapshot.teacher(t))
                    .map(|t| t.shortform.clone())
                    .unwrap_or_else(|| "TBD".to_string());
                let room = session
                    .classroom
                    .as_ref()
                    .map(|c| c.0.clone())
                    .unwrap_or_else(|| "TBD".to_string());
                rows.push((
                    session.start,
                    format!(
                        "| {} | {}-{} | {}{} | {} | {} |",
                        day.short(),
                        session.start,
                        session.end,
                        subject,
                        marker,
                        teacher,
                        room
                    ),
                ));
            }

            for session in table.lab_sessions.iter().filter(|s| s.day == day) {
                let labs: Vec<String> = session
                    .batches
                    .iter()
                    .map(|b| {
                        let lab = snapshot
                            .lab(&b.lab)
                            .map(|l| l.shortform.clone())
                            .unwrap_or_else(|| b.lab.0.clone());
                        format!("B{}:{}", b.batch_number, lab)
                    })
                    .collect();
                let teachers: Vec<String> = session
                    .batches
                    .iter()
                    .flat_map(|b| b.teachers())
                    .map(|t| {
                        snapshot
                            .teacher(t)
                            .map(|t| t.shortform.clone())
                            .unwrap_or_else(|| t.0.clone())
                    })
                    .collect();
                let rooms: Vec<String> = session
                    .batches
                    .iter()
                    .map(|b| b.lab_room.0.clone())
                    .collect();
                rows.push((
                    session.start,
                    format!(
                        "| {} | {}-{} | Lab: {} | {} | {} |",
                        day.short(),
                        session.start,
                        session.end,
                        labs.join(" "),
                        teachers.join(" "),
                        rooms.join(" ")
                    ),
                ));
            }

            rows.sort_by_key(|(start, _)| *start);
            for (_, row) in rows {
                lines.push(row);
            }
        }
        lines.push(String::new());

        if !table.flagged_sessions.is_empty() {
            lines.push("### Unresolved items\n".to_string());
            for flag in &table.flagged_sessions {
                lines.push(format!("- {}", describe_flag(flag)));
            }
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

fn describe_flag(flag: &Flag) -> String {
    match flag {
        Flag::UnresolvedRound {
            round,
            intended_labs,
            reason,
        } => format!(
            "Lab round {} unplaced ({}): {}",
            round,
            intended_labs
                .iter()
                .map(|l| l.0.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            reason
        ),
        Flag::UnresolvedPlacement {
            subject,
            duration_minutes,
            reason,
        } => format!("{duration_minutes}min session of '{subject}' unplaced: {reason}"),
        Flag::CapabilityShortage {
            session,
            batch_number,
            lab,
            teacher_status,
        } => format!(
            "Session {session} batch {batch_number} ({lab}) short of teachers: {}",
            crate::validator::describe_status(*teacher_status)
        ),
        Flag::UnassignedClassroom { session, subject } => {
            format!("Session {session} ('{subject}') has no classroom")
        }
    }
}
