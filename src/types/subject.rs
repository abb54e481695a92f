use super::{Day, SubjectId};
use serde::{Deserialize, Serialize};

/// A theory subject offered in some semester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub shortform: String,
    pub name: String,
    pub semester: u8,
    /// Weekly teaching load in hours; may be fractional (multiples of 0.5)
    pub hours_per_week: f64,
    /// Cap on hours of this subject in a single day
    pub max_hours_per_day: f64,
    #[serde(default = "default_true")]
    pub requires_teacher: bool,
    #[serde(default)]
    pub is_project: bool,
    #[serde(default)]
    pub is_open_elective: bool,
    #[serde(default)]
    pub is_professional_elective: bool,
    #[serde(default)]
    pub is_external_dept: bool,
    /// Pre-declared weekly slots (cross-departmental electives);
    /// times are user-supplied 12-hour strings parsed by stage S2.
    #[serde(default)]
    pub fixed_schedule: Option<Vec<FixedSlot>>,
}

fn default_true() -> bool {
    true
}

/// One pre-declared weekly reservation of a fixed-schedule subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedSlot {
    pub day: Day,
    /// 12-hour clock, e.g. "09:30 AM"
    pub start: String,
    /// 12-hour clock, e.g. "11:00 AM"
    pub end: String,
}

impl Subject {
    /// Whether S4 places this subject's hours. Projects, open
    /// electives and external-department subjects are placed elsewhere
    /// or not at all; fixed-schedule subjects were placed by S2.
    pub fn needs_theory_placement(&self) -> bool {
        !self.is_project
            && !self.is_open_elective
            && !self.is_external_dept
            && self.fixed_schedule.is_none()
    }

    /// Weekly load in minutes
    pub fn minutes_per_week(&self) -> u16 {
        (self.hours_per_week * 60.0).round() as u16
    }

    /// Daily cap in minutes
    pub fn max_minutes_per_day(&self) -> u16 {
        (self.max_hours_per_day * 60.0).round() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(hours: f64, cap: f64) -> Subject {
        Subject {
            id: SubjectId("sub-1".into()),
            shortform: "DS".into(),
            name: "Data Structures".into(),
            semester: 3,
            hours_per_week: hours,
            max_hours_per_day: cap,
            requires_teacher: true,
            is_project: false,
            is_open_elective: false,
            is_professional_elective: false,
            is_external_dept: false,
            fixed_schedule: None,
        }
    }

    #[test]
    fn fractional_hours_convert_to_minutes() {
        assert_eq!(subject(3.5, 1.5).minutes_per_week(), 210);
        assert_eq!(subject(3.5, 1.5).max_minutes_per_day(), 90);
    }

    #[test]
    fn fixed_schedule_subjects_skip_theory_placement() {
        let mut s = subject(2.0, 1.0);
        assert!(s.needs_theory_placement());
        s.fixed_schedule = Some(vec![]);
        assert!(!s.needs_theory_placement());
    }
}
