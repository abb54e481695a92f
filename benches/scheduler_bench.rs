use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dept_timetabler::scheduler::{generate_timetables, GenerateOptions};
use dept_timetabler::types::{
    Classroom, ClassroomId, Lab, LabId, LabRoom, LabRoomId, SchedulerConfig, Section, SectionId,
    Snapshot, Subject, SubjectId, Teacher, TeacherId, Term, TheoryAssignment,
};

fn subject(id: &str, semester: u8, hours: f64) -> Subject {
    Subject {
        id: SubjectId(id.to_string()),
        shortform: id.to_uppercase(),
        name: id.to_string(),
        semester,
        hours_per_week: hours,
        max_hours_per_day: 1.0,
        requires_teacher: true,
        is_project: false,
        is_open_elective: false,
        is_professional_elective: false,
        is_external_dept: false,
        fixed_schedule: None,
    }
}

/// Three semesters x two letters with labs, the size of a real term
fn department_snapshot() -> Snapshot {
    let mut sections = Vec::new();
    for semester in [3u8, 5, 7] {
        for letter in ["A", "B"] {
            sections.push(Section {
                id: SectionId(format!("sec-{semester}{letter}")),
                name: format!("{semester}{letter}"),
                semester,
                batch_count: 3,
            });
        }
    }

    let mut subjects = Vec::new();
    let mut theory_assignments = Vec::new();
    for (si, semester) in [3u8, 5, 7].iter().enumerate() {
        for n in 0..4 {
            let id = format!("sub{semester}{n}");
            subjects.push(subject(&id, *semester, if n == 0 { 4.0 } else { 3.0 }));
            for letter in ["A", "B"] {
                theory_assignments.push(TheoryAssignment {
                    section: SectionId(format!("sec-{semester}{letter}")),
                    subject: SubjectId(id.clone()),
                    teacher: TeacherId(format!("t{:02}", (si * 4 + n) % 12)),
                });
            }
        }
    }

    let mut labs = Vec::new();
    for semester in [3u8, 5, 7] {
        for n in 0..3 {
            labs.push(Lab {
                id: LabId(format!("lab{semester}{n}")),
                shortform: format!("L{semester}{n}"),
                name: format!("Lab {semester}-{n}"),
                semester,
                required_equipment_tag: format!("tag{n}"),
            });
        }
    }

    let teachers = (0..12)
        .map(|n| Teacher {
            id: TeacherId(format!("t{n:02}")),
            shortform: format!("T{n:02}"),
            name: format!("Teacher {n}"),
            subjects_taught: subjects.iter().map(|s| s.id.clone()).collect(),
            labs_taught: labs.iter().map(|l| l.id.clone()).collect(),
        })
        .collect();

    let classrooms = (0..6)
        .map(|n| Classroom {
            id: ClassroomId(format!("c{n}")),
            number: format!("10{n}"),
        })
        .collect();

    let lab_rooms = (0..9)
        .map(|n| LabRoom {
            id: LabRoomId(format!("lr{n}")),
            number: format!("L-{n}"),
            equipment_tags: vec![format!("tag{}", n % 3)],
        })
        .collect();

    Snapshot {
        sections,
        subjects,
        labs,
        teachers,
        classrooms,
        lab_rooms,
        theory_assignments,
        lab_assignments: vec![],
    }
}

fn bench_pipeline(c: &mut Criterion) {
    let snapshot = department_snapshot();
    let options = GenerateOptions {
        term: Term::Odd,
        academic_year: "2025-26".to_string(),
        seed: 42,
        refine: false,
        config: SchedulerConfig::default(),
    };

    c.bench_function("pipeline_full_term", |b| {
        b.iter(|| generate_timetables(black_box(&snapshot), black_box(&options), true).unwrap())
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
