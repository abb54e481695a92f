use super::{
    overlaps, ClassroomId, Day, LabId, LabRoomId, SectionId, SessionId, SubjectId, TeacherId,
    TimeOfDay,
};
use serde::{Deserialize, Serialize};

/// Duration of every lab session in minutes
pub const LAB_SESSION_MINUTES: u16 = 120;

/// A scheduled theory class.
///
/// `teacher` and `classroom` stay `None` for documented reasons only:
/// fixed cross-departmental slots may have no in-department teacher,
/// projects need no classroom, and stage S5 flags classroom shortages
/// instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TheorySession {
    pub id: SessionId,
    pub section: SectionId,
    pub subject: SubjectId,
    pub teacher: Option<TeacherId>,
    pub classroom: Option<ClassroomId>,
    pub day: Day,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    /// Pre-declared slot; never moved by any stage or the refiner
    pub is_fixed: bool,
}

impl TheorySession {
    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes() - self.start.minutes()
    }

    pub fn overlaps_window(&self, day: Day, start: TimeOfDay, end: TimeOfDay) -> bool {
        self.day == day && overlaps(self.start, self.end, start, end)
    }
}

/// How many supervising teachers a lab batch ended up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeacherStatus {
    TwoTeachers,
    OneTeacher,
    NoTeachers,
}

impl TeacherStatus {
    pub fn of(teacher1: &Option<TeacherId>, teacher2: &Option<TeacherId>) -> TeacherStatus {
        match (teacher1.is_some(), teacher2.is_some()) {
            (true, true) => TeacherStatus::TwoTeachers,
            (false, false) => TeacherStatus::NoTeachers,
            _ => TeacherStatus::OneTeacher,
        }
    }
}

/// One batch of a section inside a lab session: which lab it performs,
/// where, and under whom. Batches are plain values inside the session;
/// navigation outward goes through the ids kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAssignment {
    /// 1..=3
    pub batch_number: u8,
    pub lab: LabId,
    pub lab_room: LabRoomId,
    pub teacher1: Option<TeacherId>,
    pub teacher2: Option<TeacherId>,
    pub teacher_status: TeacherStatus,
}

impl BatchAssignment {
    pub fn teachers(&self) -> impl Iterator<Item = &TeacherId> {
        self.teacher1.iter().chain(self.teacher2.iter())
    }
}

/// A synchronized multi-batch lab session: all three batches of the
/// section run in parallel for the same two-hour window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabSession {
    pub id: SessionId,
    pub section: SectionId,
    pub day: Day,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    /// Exactly 3, one per batch, in batch-number order
    pub batches: Vec<BatchAssignment>,
}

impl LabSession {
    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes() - self.start.minutes()
    }

    pub fn overlaps_window(&self, day: Day, start: TimeOfDay, end: TimeOfDay) -> bool {
        self.day == day && overlaps(self.start, self.end, start, end)
    }

    /// Adjacent means back-to-back on the same day, either side
    pub fn adjacent_to(&self, day: Day, start: TimeOfDay, end: TimeOfDay) -> bool {
        self.day == day && (self.end == start || self.start == end)
    }
}
