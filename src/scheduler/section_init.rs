use crate::error::{Result, SchedulerError};
use crate::scheduler::{StageReport, STAGE_SECTION_INIT};
use crate::store::ScheduleStore;
use crate::types::{Break, Snapshot, StageSummary, Timetable};

/// Stage S1: materialize one empty timetable per section of the term.
pub fn run(store: &mut ScheduleStore, snapshot: &Snapshot) -> Result<StageReport> {
    let sections = snapshot.sections_for_term(store.term);
    if sections.is_empty() {
        return Err(SchedulerError::NoSectionsForTerm {
            term: store.term.to_string(),
        }
        .into());
    }

    for section in &sections {
        let mut timetable = Timetable::new(
            section.id.clone(),
            section.name.clone(),
            section.semester,
            store.academic_year.clone(),
        );
        timetable.record_stage(
            1,
            STAGE_SECTION_INIT,
            StageSummary {
                placed: 0,
                flagged: 0,
                message: "timetable initialized".to_string(),
            },
        );
        store.insert_timetable(timetable);
    }

    Ok(StageReport::success(
        STAGE_SECTION_INIT,
        format!("initialized {} section timetables", sections.len()),
        sections.len() as u32,
        0,
    ))
}

/// Write the static break rows into every timetable. Display-only;
/// no scheduling stage reads them.
pub fn write_breaks(store: &mut ScheduleStore, config: &crate::types::SchedulerConfig) {
    let (start, end) = config.lunch_break;
    for timetable in store.timetables_mut() {
        timetable.breaks = crate::types::Day::ALL
            .iter()
            .map(|&day| Break {
                day,
                start,
                end,
                label: "Lunch".to_string(),
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Section, SectionId, Term};

    fn section(name: &str, semester: u8) -> Section {
        Section {
            id: SectionId(format!("s-{name}")),
            name: name.to_string(),
            semester,
            batch_count: 3,
        }
    }

    fn empty_snapshot(sections: Vec<Section>) -> Snapshot {
        Snapshot {
            sections,
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
    fn creates_one_timetable_per_term_section() {
        let snapshot = empty_snapshot(vec![
            section("3A", 3),
            section("4A", 4), // even term, filtered out
            section("5A", 5),
        ]);
        let mut store = ScheduleStore::new(Term::Odd, "2025-26");
        let report = run(&mut store, &snapshot).unwrap();

        assert!(report.success);
        assert_eq!(store.timetables().len(), 2);
        assert_eq!(store.min_step(), 1);
    }

    #[test]
    fn fails_on_empty_term() {
        let snapshot = empty_snapshot(vec![section("4A", 4)]);
        let mut store = ScheduleStore::new(Term::Odd, "2025-26");
        let err = run(&mut store, &snapshot).unwrap_err();
        assert!(err.to_string().contains("odd"));
    }
}
