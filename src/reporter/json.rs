use crate::error::Result;
use crate::store::ScheduleStore;

/// Full timetable set as pretty JSON (the persisted output contract)
pub fn generate_json_report(store: &ScheduleStore) -> Result<String> {
    Ok(serde_json::to_string_pretty(store.timetables())?)
}

/// Summary statistics as JSON
#[derive(serde::Serialize)]
pub struct JsonSummary {
    pub sections: usize,
    pub theory_sessions: usize,
    pub lab_sessions: usize,
    pub flagged: usize,
    pub findings: usize,
    pub solve_time_ms: u64,
}

pub fn generate_json_summary(outcome: &crate::scheduler::GenerationOutcome) -> Result<String> {
    let summary = JsonSummary {
        sections: outcome.store.timetables().len(),
        theory_sessions: outcome.validation.statistics.theory_sessions,
        lab_sessions: outcome.validation.statistics.lab_sessions,
        flagged: outcome.validation.statistics.flagged_sessions,
        findings: outcome.validation.conflicts.len(),
        solve_time_ms: outcome.solve_time_ms,
    };

    Ok(serde_json::to_string_pretty(&summary)?)
}
