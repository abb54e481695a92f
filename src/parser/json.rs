use crate::error::{Result, SchedulerError};
use crate::types::{
    Classroom, Lab, LabAssignment, LabRoom, SchedulerConfig, Section, Snapshot, Subject, Teacher,
    TheoryAssignment,
};
use std::fs;
use std::path::Path;

/// Load a full master-data snapshot from a directory of JSON files
pub fn load_snapshot_from_dir(dir: &Path) -> Result<Snapshot> {
    let sections: Vec<Section> = load_json_file(&dir.join("sections.json"))?;
    let subjects: Vec<Subject> = load_json_file(&dir.join("subjects.json"))?;
    let labs: Vec<Lab> = load_json_file(&dir.join("labs.json"))?;
    let teachers: Vec<Teacher> = load_json_file(&dir.join("teachers.json"))?;
    let classrooms: Vec<Classroom> = load_json_file(&dir.join("classrooms.json"))?;
    let lab_rooms: Vec<LabRoom> = load_json_file(&dir.join("lab_rooms.json"))?;
    let theory_assignments: Vec<TheoryAssignment> =
        load_json_file(&dir.join("theory_assignments.json"))?;
    let lab_assignments: Vec<LabAssignment> = load_json_file(&dir.join("lab_assignments.json"))?;

    Ok(Snapshot {
        sections,
        subjects,
        labs,
        teachers,
        classrooms,
        lab_rooms,
        theory_assignments,
        lab_assignments,
    })
}

/// Load config from TOML file, or use defaults
pub fn load_config_or_default(path: &Path) -> SchedulerConfig {
    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => SchedulerConfig::default(),
        }
    } else {
        SchedulerConfig::default()
    }
}

/// Generic JSON file loader
fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let path_str = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| SchedulerError::FileRead {
        path: path_str.clone(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| {
        SchedulerError::JsonParse {
            file: path_str,
            message: e.to_string(),
        }
        .into()
    })
}
