use crate::store::ScheduleStore;
use crate::types::{Snapshot, TeacherStatus};
use crate::validator::{describe_status, Conflict, Severity, Validate};

pub const RULE_HOUR_COVERAGE: &str = "HourCoverage";
pub const RULE_COMPLETENESS: &str = "AssignmentCompleteness";

/// Scheduled minutes vs required minutes per (section, subject).
///
/// Any difference is a finding; more than an hour either way is high
/// severity.
pub struct HourCoverage;

impl Validate for HourCoverage {
    fn name(&self) -> &'static str {
        RULE_HOUR_COVERAGE
    }

    fn validate(&self, store: &ScheduleStore, snapshot: &Snapshot) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for assignment in &snapshot.theory_assignments {
            let Some(subject) = snapshot.subject(&assignment.subject) else {
                continue;
            };
            if subject.is_project || subject.is_open_elective || subject.is_external_dept {
                continue;
            }
            let Some(table) = store.timetable(&assignment.section) else {
                continue;
            };

            let scheduled: i32 = table
                .theory_sessions
                .iter()
                .filter(|s| s.subject == subject.id)
                .map(|s| s.duration_minutes() as i32)
                .sum();
            let required = subject.minutes_per_week() as i32;
            let delta = scheduled - required;
            if delta == 0 {
                continue;
            }

            let severity = if delta.abs() > 60 {
                Severity::Error
            } else {
                Severity::Warning
            };
            conflicts.push(Conflict {
                rule: RULE_HOUR_COVERAGE,
                severity,
                message: format!(
                    "Section {} subject '{}' scheduled {}min of required {}min ({}min {})",
                    table.section_name,
                    subject.shortform,
                    scheduled,
                    required,
                    delta.abs(),
                    if delta < 0 { "short" } else { "over" },
                ),
                identity: format!(
                    "{RULE_HOUR_COVERAGE}:{}:{}",
                    assignment.section, subject.id
                ),
            });
        }

        conflicts
    }
}

/// Teacherless theory sessions and under-staffed lab batches
pub struct AssignmentCompleteness;

impl Validate for AssignmentCompleteness {
    fn name(&self) -> &'static str {
        RULE_COMPLETENESS
    }

    fn validate(&self, store: &ScheduleStore, snapshot: &Snapshot) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for table in store.timetables() {
            for session in &table.theory_sessions {
                let needs_teacher = snapshot
                    .subject(&session.subject)
                    .map(|s| s.requires_teacher && !s.is_external_dept)
                    .unwrap_or(true);
                if needs_teacher && session.teacher.is_none() {
                    conflicts.push(Conflict {
                        rule: RULE_COMPLETENESS,
                        severity: Severity::Warning,
                        message: format!(
                            "Theory session {} ({}) in section {} has no teacher",
                            session.id, session.subject, table.section_name
                        ),
                        identity: format!("{RULE_COMPLETENESS}:teacher:{}", session.id),
                    });
                }
            }

            for session in &table.lab_sessions {
                for batch in &session.batches {
                    if batch.teacher_status != TeacherStatus::TwoTeachers {
                        conflicts.push(Conflict {
                            rule: RULE_COMPLETENESS,
                            severity: Severity::Warning,
                            message: format!(
                                "Lab session {} batch {} ({}) in section {} is under-staffed: {}",
                                session.id,
                                batch.batch_number,
                                batch.lab,
                                table.section_name,
                                describe_status(batch.teacher_status),
                            ),
                            identity: format!(
                                "{RULE_COMPLETENESS}:batch:{}:{}",
                                session.id, batch.batch_number
                            ),
                        });
                    }
                }
            }
        }

        conflicts
    }
}
