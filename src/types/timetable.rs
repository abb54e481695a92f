use super::{
    Day, LabId, LabSession, SectionId, SessionId, SubjectId, TeacherStatus, Term, TheorySession,
    TimeOfDay,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of the final validation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Passed,
    Warnings,
    Failed,
}

/// Per-stage counters carried in the generation metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageSummary {
    pub placed: u32,
    pub flagged: u32,
    pub message: String,
}

/// Bookkeeping written by the pipeline as stages complete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Highest stage number that has completed for this timetable
    pub current_step: u8,
    pub steps_completed: Vec<String>,
    pub is_complete: bool,
    pub validation_status: ValidationStatus,
    pub per_stage_summary: BTreeMap<String, StageSummary>,
    pub generated_at: String,
    pub algorithm_version: String,
    pub seed: u64,
}

impl Default for GenerationMetadata {
    fn default() -> Self {
        Self {
            current_step: 0,
            steps_completed: Vec::new(),
            is_complete: false,
            validation_status: ValidationStatus::Pending,
            per_stage_summary: BTreeMap::new(),
            generated_at: String::new(),
            algorithm_version: String::new(),
            seed: 0,
        }
    }
}

/// A static non-teaching row in the rendered timetable. Written into
/// the output for display; no scheduling stage reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Break {
    pub day: Day,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub label: String,
}

/// An unresolved item recorded by a stage instead of raising
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Flag {
    /// S3 exhausted every candidate window for a rotation round
    UnresolvedRound {
        round: u8,
        intended_labs: Vec<LabId>,
        reason: String,
    },
    /// S4 could not place a theory session of the given length
    UnresolvedPlacement {
        subject: SubjectId,
        duration_minutes: u16,
        reason: String,
    },
    /// S6 found fewer than two compatible free teachers for a batch
    CapabilityShortage {
        session: SessionId,
        batch_number: u8,
        lab: LabId,
        teacher_status: TeacherStatus,
    },
    /// S5 found no classroom free for the session's full duration
    UnassignedClassroom {
        session: SessionId,
        subject: SubjectId,
    },
}

/// The generated weekly timetable of one section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timetable {
    pub section_id: SectionId,
    pub section_name: String,
    pub semester: u8,
    pub term: Term,
    pub academic_year: String,
    pub theory_sessions: Vec<TheorySession>,
    pub lab_sessions: Vec<LabSession>,
    pub breaks: Vec<Break>,
    pub generation_metadata: GenerationMetadata,
    pub flagged_sessions: Vec<Flag>,
}

impl Timetable {
    pub fn new(
        section_id: SectionId,
        section_name: String,
        semester: u8,
        academic_year: String,
    ) -> Self {
        Self {
            section_id,
            section_name,
            semester,
            term: Term::of_semester(semester),
            academic_year,
            theory_sessions: Vec::new(),
            lab_sessions: Vec::new(),
            breaks: Vec::new(),
            generation_metadata: GenerationMetadata::default(),
            flagged_sessions: Vec::new(),
        }
    }

    /// Whether any session of this section touches the window
    pub fn occupies(&self, day: Day, start: TimeOfDay, end: TimeOfDay) -> bool {
        self.theory_sessions
            .iter()
            .any(|s| s.overlaps_window(day, start, end))
            || self
                .lab_sessions
                .iter()
                .any(|s| s.overlaps_window(day, start, end))
    }

    /// Minutes of theory + lab already scheduled on the day
    pub fn day_load_minutes(&self, day: Day) -> u16 {
        let theory: u16 = self
            .theory_sessions
            .iter()
            .filter(|s| s.day == day)
            .map(|s| s.duration_minutes())
            .sum();
        let lab: u16 = self
            .lab_sessions
            .iter()
            .filter(|s| s.day == day)
            .map(|s| s.duration_minutes())
            .sum();
        theory + lab
    }

    pub fn labs_on_day(&self, day: Day) -> usize {
        self.lab_sessions.iter().filter(|s| s.day == day).count()
    }

    pub fn theory_session(&self, id: &SessionId) -> Option<&TheorySession> {
        self.theory_sessions.iter().find(|s| &s.id == id)
    }

    pub fn lab_session(&self, id: &SessionId) -> Option<&LabSession> {
        self.lab_sessions.iter().find(|s| &s.id == id)
    }

    pub fn record_stage(&mut self, step: u8, name: &str, summary: StageSummary) {
        self.generation_metadata.current_step = step;
        let steps = &mut self.generation_metadata.steps_completed;
        if !steps.iter().any(|s| s == name) {
            steps.push(name.to_string());
        }
        self.generation_metadata
            .per_stage_summary
            .insert(name.to_string(), summary);
    }
}
