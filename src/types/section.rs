use super::SectionId;
use serde::{Deserialize, Serialize};

/// Academic term, derived from semester parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    /// Semesters 3, 5, 7
    Odd,
    /// Semesters 4, 6, 8
    Even,
}

impl Term {
    pub fn of_semester(semester: u8) -> Term {
        if semester % 2 == 1 {
            Term::Odd
        } else {
            Term::Even
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Term::Odd => "odd",
            Term::Even => "even",
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A student cohort, e.g. "5A": semester 5, letter A.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    /// Display name like "3A"; the trailing letter orders sections
    /// within a semester.
    pub name: String,
    /// Semester 3..=8
    pub semester: u8,
    /// Number of lab sub-batches; always 3 in this department
    #[serde(default = "default_batch_count")]
    pub batch_count: u8,
}

fn default_batch_count() -> u8 {
    3
}

impl Section {
    pub fn term(&self) -> Term {
        Term::of_semester(self.semester)
    }

    /// Trailing letter of the name ('A', 'B', ...); sections with
    /// malformed names sort last.
    pub fn letter(&self) -> char {
        self.name.chars().last().unwrap_or('~')
    }

    /// Key for the lab-stage interleaving: letter first so 3A, 5A, 7A
    /// all get a pick at popular rooms before 3B does.
    pub fn interleave_key(&self) -> (char, u8) {
        (self.letter(), self.semester)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_follows_semester_parity() {
        assert_eq!(Term::of_semester(3), Term::Odd);
        assert_eq!(Term::of_semester(6), Term::Even);
    }

    #[test]
    fn interleave_orders_letter_before_semester() {
        let a5 = Section {
            id: SectionId("s-5a".into()),
            name: "5A".into(),
            semester: 5,
            batch_count: 3,
        };
        let b3 = Section {
            id: SectionId("s-3b".into()),
            name: "3B".into(),
            semester: 3,
            batch_count: 3,
        };
        assert!(a5.interleave_key() < b3.interleave_key());
    }
}
