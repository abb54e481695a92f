mod conflicts;
mod coverage;

pub use conflicts::*;
pub use coverage::*;

use crate::store::ScheduleStore;
use crate::types::{Snapshot, TeacherStatus, ValidationStatus};
use std::collections::BTreeSet;

/// How bad a finding is. Nothing here aborts the pipeline; errors are
/// findings a published timetable must not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One validator finding.
///
/// `identity` is a stable key `(resource, day, earlier_start,
/// later_start)` rendered as a string; the composition layer uses it
/// to collapse findings that multiple 30-minute segments of the same
/// clash would otherwise duplicate.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub rule: &'static str,
    pub severity: Severity,
    pub message: String,
    pub identity: String,
}

/// A single validation rule over the final store
pub trait Validate {
    fn name(&self) -> &'static str;
    fn validate(&self, store: &ScheduleStore, snapshot: &Snapshot) -> Vec<Conflict>;
}

/// The full rule set, in reporting order
pub fn validators() -> Vec<Box<dyn Validate>> {
    vec![
        Box::new(TeacherConflicts),
        Box::new(ClassroomConflicts),
        Box::new(LabRoomConflicts),
        Box::new(ConsecutiveLabs),
        Box::new(HourCoverage),
        Box::new(AssignmentCompleteness),
    ]
}

/// Aggregate numbers for the final report
#[derive(Debug, Clone, Default)]
pub struct ValidationStatistics {
    pub theory_sessions: usize,
    pub lab_sessions: usize,
    pub flagged_sessions: usize,
    pub teacher_conflicts: usize,
    pub classroom_conflicts: usize,
    pub lab_room_conflicts: usize,
    pub consecutive_lab_violations: usize,
    pub coverage_gaps: usize,
    pub unstaffed_batches: usize,
}

/// Result of running every validator over the store
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub conflicts: Vec<Conflict>,
    pub statistics: ValidationStatistics,
}

impl ValidationReport {
    pub fn status(&self) -> ValidationStatus {
        if self.conflicts.is_empty() {
            ValidationStatus::Passed
        } else {
            ValidationStatus::Warnings
        }
    }

    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Teacher + room double-bookings: the conflicts the refiner can
    /// repair by retiming sessions.
    pub fn resource_conflicts(&self) -> usize {
        self.statistics.teacher_conflicts
            + self.statistics.classroom_conflicts
            + self.statistics.lab_room_conflicts
    }
}

/// Run every validator and assemble the deduplicated report
pub fn validate_store(store: &ScheduleStore, snapshot: &Snapshot) -> ValidationReport {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut conflicts = Vec::new();

    for validator in validators() {
        for conflict in validator.validate(store, snapshot) {
            if seen.insert(conflict.identity.clone()) {
                conflicts.push(conflict);
            }
        }
    }

    let count = |rule: &str| conflicts.iter().filter(|c| c.rule == rule).count();
    let statistics = ValidationStatistics {
        theory_sessions: store.all_theory_sessions().count(),
        lab_sessions: store.all_lab_sessions().count(),
        flagged_sessions: store
            .timetables()
            .iter()
            .map(|t| t.flagged_sessions.len())
            .sum(),
        teacher_conflicts: count(RULE_TEACHER_CONFLICT),
        classroom_conflicts: count(RULE_CLASSROOM_CONFLICT),
        lab_room_conflicts: count(RULE_LAB_ROOM_CONFLICT),
        consecutive_lab_violations: count(RULE_CONSECUTIVE_LABS),
        coverage_gaps: count(RULE_HOUR_COVERAGE),
        unstaffed_batches: conflicts
            .iter()
            .filter(|c| c.rule == RULE_COMPLETENESS && c.message.contains("batch"))
            .count(),
    };

    ValidationReport {
        conflicts,
        statistics,
    }
}

/// Convenience for the refiner's flag reporting
pub fn describe_status(status: TeacherStatus) -> &'static str {
    match status {
        TeacherStatus::TwoTeachers => "2_teachers",
        TeacherStatus::OneTeacher => "1_teacher",
        TeacherStatus::NoTeachers => "no_teachers",
    }
}
