use super::{LabId, SubjectId, TeacherId};
use serde::{Deserialize, Serialize};

/// A teacher with their subject and lab capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub shortform: String,
    pub name: String,
    /// Subjects this teacher can take theory classes for
    #[serde(default)]
    pub subjects_taught: Vec<SubjectId>,
    /// Labs this teacher can supervise
    #[serde(default)]
    pub labs_taught: Vec<LabId>,
}

impl Teacher {
    pub fn can_teach(&self, subject_id: &SubjectId) -> bool {
        self.subjects_taught.contains(subject_id)
    }

    pub fn can_supervise(&self, lab_id: &LabId) -> bool {
        self.labs_taught.contains(lab_id)
    }
}
