use super::LabId;
use serde::{Deserialize, Serialize};

/// A laboratory course attached to a semester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lab {
    pub id: LabId,
    pub shortform: String,
    pub name: String,
    pub semester: u8,
    /// A lab room must declare this tag to host the lab
    pub required_equipment_tag: String,
}
