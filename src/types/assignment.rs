use super::{LabId, SectionId, SubjectId, TeacherId};
use serde::{Deserialize, Serialize};

/// Input: which teacher owns which theory subject for which section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TheoryAssignment {
    pub section: SectionId,
    pub subject: SubjectId,
    pub teacher: TeacherId,
}

/// Input: capability declaration for one batch of one section's lab.
///
/// Scheduling ignores the batch/lab pairing here (rotation decides
/// which batch runs which lab in which round); the preferred teachers
/// are a hint honored by stage S6 when both are free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabAssignment {
    pub section: SectionId,
    pub batch_number: u8,
    pub lab: LabId,
    #[serde(default)]
    pub preferred_teachers: Vec<TeacherId>,
}
