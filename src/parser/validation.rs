use crate::error::Result;
use crate::types::{ClassroomId, LabId, LabRoomId, SectionId, Snapshot, SubjectId, TeacherId, TimeOfDay};
use std::collections::HashSet;

/// Validation result with collected errors
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// Validate the snapshot before scheduling. Structural problems are
/// errors and abort; feasibility gaps (no capable teacher, no
/// compatible room) are warnings the pipeline will re-surface as
/// flags.
pub fn validate_snapshot(snapshot: &Snapshot) -> Result<ValidationResult> {
    let mut result = ValidationResult::default();

    check_duplicates(snapshot, &mut result);

    let section_ids: HashSet<&SectionId> = snapshot.sections.iter().map(|s| &s.id).collect();
    let subject_ids: HashSet<&SubjectId> = snapshot.subjects.iter().map(|s| &s.id).collect();
    let lab_ids: HashSet<&LabId> = snapshot.labs.iter().map(|l| &l.id).collect();
    let teacher_ids: HashSet<&TeacherId> = snapshot.teachers.iter().map(|t| &t.id).collect();

    for section in &snapshot.sections {
        if !(3..=8).contains(&section.semester) {
            result.add_error(format!(
                "Section '{}' has semester {} outside 3..=8",
                section.name, section.semester
            ));
        }
        if section.batch_count != 3 {
            result.add_error(format!(
                "Section '{}' declares {} batches; lab scheduling requires exactly 3",
                section.name, section.batch_count
            ));
        }
    }

    for subject in &snapshot.subjects {
        if subject.hours_per_week <= 0.0 || subject.max_hours_per_day <= 0.0 {
            result.add_error(format!(
                "Subject '{}' has non-positive hours ({}/wk, {}/day cap)",
                subject.id, subject.hours_per_week, subject.max_hours_per_day
            ));
        }
        if (subject.hours_per_week * 2.0).fract() != 0.0 {
            result.add_error(format!(
                "Subject '{}' hours_per_week {} is not a multiple of 0.5",
                subject.id, subject.hours_per_week
            ));
        }
        if let Some(slots) = &subject.fixed_schedule {
            for slot in slots {
                if let Err(e) = TimeOfDay::parse_12h(&slot.start)
                    .and_then(|_| TimeOfDay::parse_12h(&slot.end))
                {
                    result.add_error(format!(
                        "Subject '{}' fixed schedule has malformed time: {e}",
                        subject.id
                    ));
                }
            }
        }
    }

    for assignment in &snapshot.theory_assignments {
        if !section_ids.contains(&assignment.section) {
            result.add_error(format!(
                "Theory assignment references unknown section '{}'",
                assignment.section
            ));
        }
        if !subject_ids.contains(&assignment.subject) {
            result.add_error(format!(
                "Theory assignment references unknown subject '{}'",
                assignment.subject
            ));
        }
        if !teacher_ids.contains(&assignment.teacher) {
            result.add_error(format!(
                "Theory assignment references unknown teacher '{}'",
                assignment.teacher
            ));
        }
    }

    for assignment in &snapshot.lab_assignments {
        if !section_ids.contains(&assignment.section) {
            result.add_error(format!(
                "Lab assignment references unknown section '{}'",
                assignment.section
            ));
        }
        if !lab_ids.contains(&assignment.lab) {
            result.add_error(format!(
                "Lab assignment references unknown lab '{}'",
                assignment.lab
            ));
        }
        if !(1..=3).contains(&assignment.batch_number) {
            result.add_error(format!(
                "Lab assignment for '{}' has batch number {} outside 1..=3",
                assignment.lab, assignment.batch_number
            ));
        }
        for teacher in &assignment.preferred_teachers {
            if !teacher_ids.contains(teacher) {
                result.add_warning(format!(
                    "Lab assignment for '{}' prefers unknown teacher '{}'",
                    assignment.lab, teacher
                ));
            }
        }
    }

    for teacher in &snapshot.teachers {
        for subject in &teacher.subjects_taught {
            if !subject_ids.contains(subject) {
                result.add_warning(format!(
                    "Teacher '{}' lists unknown subject '{}'",
                    teacher.id, subject
                ));
            }
        }
        for lab in &teacher.labs_taught {
            if !lab_ids.contains(lab) {
                result.add_warning(format!(
                    "Teacher '{}' lists unknown lab '{}'",
                    teacher.id, lab
                ));
            }
        }
    }

    // Feasibility warnings: the pipeline degrades gracefully on
    // these, but the operator should hear about them up front.
    for lab in &snapshot.labs {
        if snapshot.lab_rooms_for_tag(&lab.required_equipment_tag).is_empty() {
            result.add_warning(format!(
                "Lab '{}' has no compatible lab room (tag '{}')",
                lab.id, lab.required_equipment_tag
            ));
        }
        if snapshot.teachers_for_lab(&lab.id).is_empty() {
            result.add_warning(format!("Lab '{}' has no capable teachers", lab.id));
        }
    }
    for subject in snapshot.subjects.iter().filter(|s| s.requires_teacher) {
        let assigned = snapshot
            .theory_assignments
            .iter()
            .any(|a| a.subject == subject.id);
        if !assigned && snapshot.teachers_for_subject(&subject.id).is_empty() {
            result.add_warning(format!("Subject '{}' has no capable teachers", subject.id));
        }
    }
    for section in &snapshot.sections {
        let has_theory = snapshot
            .theory_assignments
            .iter()
            .any(|a| a.section == section.id);
        if !has_theory {
            result.add_warning(format!(
                "Section '{}' has no theory assignments",
                section.name
            ));
        }
    }

    if !result.is_valid() {
        return Err(anyhow::anyhow!(
            "Snapshot validation failed with {} errors:\n{}",
            result.errors.len(),
            result.errors.join("\n")
        ));
    }

    Ok(result)
}

fn check_duplicates(snapshot: &Snapshot, result: &mut ValidationResult) {
    let mut sections: HashSet<&SectionId> = HashSet::new();
    for section in &snapshot.sections {
        if !sections.insert(&section.id) {
            result.add_error(format!("Duplicate section ID: '{}'", section.id));
        }
    }
    let mut subjects: HashSet<&SubjectId> = HashSet::new();
    for subject in &snapshot.subjects {
        if !subjects.insert(&subject.id) {
            result.add_error(format!("Duplicate subject ID: '{}'", subject.id));
        }
    }
    let mut labs: HashSet<&LabId> = HashSet::new();
    for lab in &snapshot.labs {
        if !labs.insert(&lab.id) {
            result.add_error(format!("Duplicate lab ID: '{}'", lab.id));
        }
    }
    let mut teachers: HashSet<&TeacherId> = HashSet::new();
    for teacher in &snapshot.teachers {
        if !teachers.insert(&teacher.id) {
            result.add_error(format!("Duplicate teacher ID: '{}'", teacher.id));
        }
    }
    let mut classrooms: HashSet<&ClassroomId> = HashSet::new();
    for room in &snapshot.classrooms {
        if !classrooms.insert(&room.id) {
            result.add_error(format!("Duplicate classroom ID: '{}'", room.id));
        }
    }
    let mut lab_rooms: HashSet<&LabRoomId> = HashSet::new();
    for room in &snapshot.lab_rooms {
        if !lab_rooms.insert(&room.id) {
            result.add_error(format!("Duplicate lab room ID: '{}'", room.id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Section, Teacher};

    fn minimal_snapshot() -> Snapshot {
        Snapshot {
            sections: vec![Section {
                id: SectionId("s-3a".into()),
                name: "3A".into(),
                semester: 3,
                batch_count: 3,
            }],
            subjects: vec![],
            labs: vec![],
            teachers: vec![],
            classrooms: vec![],
            lab_rooms: vec![],
            theory_assignments: vec![],
            lab_assignments: vec![],
        }
    }

    #[test]
    fn accepts_minimal_snapshot_with_warnings() {
        let result = validate_snapshot(&minimal_snapshot()).unwrap();
        assert!(result.is_valid());
        // No theory assignments for 3A
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn rejects_bad_batch_count() {
        let mut snapshot = minimal_snapshot();
        snapshot.sections[0].batch_count = 2;
        assert!(validate_snapshot(&snapshot).is_err());
    }

    #[test]
    fn rejects_duplicate_teacher_ids() {
        let mut snapshot = minimal_snapshot();
        let teacher = Teacher {
            id: TeacherId("t1".into()),
            shortform: "T1".into(),
            name: "Prof".into(),
            subjects_taught: vec![],
            labs_taught: vec![],
        };
        snapshot.teachers = vec![teacher.clone(), teacher];
        assert!(validate_snapshot(&snapshot).is_err());
    }

    #[test]
    fn rejects_dangling_assignment_references() {
        let mut snapshot = minimal_snapshot();
        snapshot.theory_assignments = vec![crate::types::TheoryAssignment {
            section: SectionId("nope".into()),
            subject: SubjectId("nope".into()),
            teacher: TeacherId("nope".into()),
        }];
        assert!(validate_snapshot(&snapshot).is_err());
    }
}
