use super::{
    Classroom, Lab, LabAssignment, LabId, LabRoom, Section, SectionId, Subject, SubjectId,
    Teacher, TeacherId, Term, TheoryAssignment,
};

/// Immutable read-only snapshot of the master data, provided by the
/// external persistence layer. All cross-references are by id.
#[derive(Debug)]
pub struct Snapshot {
    pub sections: Vec<Section>,
    pub subjects: Vec<Subject>,
    pub labs: Vec<Lab>,
    pub teachers: Vec<Teacher>,
    pub classrooms: Vec<Classroom>,
    pub lab_rooms: Vec<LabRoom>,
    pub theory_assignments: Vec<TheoryAssignment>,
    pub lab_assignments: Vec<LabAssignment>,
}

impl Snapshot {
    /// Sections of a term, sorted by name for deterministic iteration
    pub fn sections_for_term(&self, term: Term) -> Vec<&Section> {
        let mut sections: Vec<&Section> = self
            .sections
            .iter()
            .filter(|s| s.term() == term)
            .collect();
        sections.sort_by(|a, b| a.name.cmp(&b.name));
        sections
    }

    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| &s.id == id)
    }

    pub fn subject(&self, id: &SubjectId) -> Option<&Subject> {
        self.subjects.iter().find(|s| &s.id == id)
    }

    pub fn lab(&self, id: &LabId) -> Option<&Lab> {
        self.labs.iter().find(|l| &l.id == id)
    }

    pub fn teacher(&self, id: &TeacherId) -> Option<&Teacher> {
        self.teachers.iter().find(|t| &t.id == id)
    }

    /// Required labs of a semester, sorted by shortform. The sort
    /// fixes the rotation order.
    pub fn labs_for_semester(&self, semester: u8) -> Vec<&Lab> {
        let mut labs: Vec<&Lab> = self
            .labs
            .iter()
            .filter(|l| l.semester == semester)
            .collect();
        labs.sort_by(|a, b| a.shortform.cmp(&b.shortform));
        labs
    }

    /// Lab rooms declaring the tag, sorted by room number
    pub fn lab_rooms_for_tag(&self, tag: &str) -> Vec<&LabRoom> {
        let mut rooms: Vec<&LabRoom> = self
            .lab_rooms
            .iter()
            .filter(|r| r.supports(tag))
            .collect();
        rooms.sort_by(|a, b| a.number.cmp(&b.number));
        rooms
    }

    /// Teachers able to supervise the lab, sorted by id
    pub fn teachers_for_lab(&self, lab_id: &LabId) -> Vec<&Teacher> {
        let mut teachers: Vec<&Teacher> = self
            .teachers
            .iter()
            .filter(|t| t.can_supervise(lab_id))
            .collect();
        teachers.sort_by(|a, b| a.id.cmp(&b.id));
        teachers
    }

    /// Teachers able to take the subject's theory classes, sorted by id
    pub fn teachers_for_subject(&self, subject_id: &SubjectId) -> Vec<&Teacher> {
        let mut teachers: Vec<&Teacher> = self
            .teachers
            .iter()
            .filter(|t| t.can_teach(subject_id))
            .collect();
        teachers.sort_by(|a, b| a.id.cmp(&b.id));
        teachers
    }

    pub fn theory_assignments_for_section(&self, section: &SectionId) -> Vec<&TheoryAssignment> {
        self.theory_assignments
            .iter()
            .filter(|a| &a.section == section)
            .collect()
    }

    /// The declared teacher for a (section, subject) pair, if any
    pub fn assigned_teacher(&self, section: &SectionId, subject: &SubjectId) -> Option<&TeacherId> {
        self.theory_assignments
            .iter()
            .find(|a| &a.section == section && &a.subject == subject)
            .map(|a| &a.teacher)
    }

    /// Preferred teachers declared for a (section, lab) pair
    pub fn preferred_lab_teachers(&self, section: &SectionId, lab: &LabId) -> Vec<&TeacherId> {
        self.lab_assignments
            .iter()
            .filter(|a| &a.section == section && &a.lab == lab)
            .flat_map(|a| a.preferred_teachers.iter())
            .collect()
    }
}
