use super::{ClassroomId, LabRoomId};
use serde::{Deserialize, Serialize};

/// A generic theory classroom
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classroom {
    pub id: ClassroomId,
    pub number: String,
}

/// A lab room with its equipment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabRoom {
    pub id: LabRoomId,
    pub number: String,
    #[serde(default)]
    pub equipment_tags: Vec<String>,
}

impl LabRoom {
    /// Compatible iff the room declares the lab's required tag
    pub fn supports(&self, required_tag: &str) -> bool {
        self.equipment_tags.iter().any(|t| t == required_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_requires_declared_tag() {
        let room = LabRoom {
            id: LabRoomId("lr1".into()),
            number: "L-201".into(),
            equipment_tags: vec!["networking".into(), "workstations".into()],
        };
        assert!(room.supports("networking"));
        assert!(!room.supports("microprocessors"));
    }
}
