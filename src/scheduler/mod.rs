pub mod classroom_assigner;
pub mod fixed_slots;
pub mod lab_scheduler;
pub mod lab_teacher_assigner;
pub mod section_init;
pub mod theory_scheduler;

use crate::error::{Result, SchedulerError};
use crate::refiner::{self, RefineOutcome};
use crate::store::ScheduleStore;
use crate::types::{SchedulerConfig, Snapshot, StageSummary, Term};
use crate::validator::{validate_store, ValidationReport};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

pub const STAGE_SECTION_INIT: &str = "section_init";
pub const STAGE_FIXED_SLOTS: &str = "fixed_slot_blocker";
pub const STAGE_LAB_SCHEDULER: &str = "lab_scheduler";
pub const STAGE_THEORY_SCHEDULER: &str = "theory_scheduler";
pub const STAGE_CLASSROOM_ASSIGNER: &str = "classroom_assigner";
pub const STAGE_LAB_TEACHER_ASSIGNER: &str = "lab_teacher_assigner";
pub const STAGE_VALIDATOR: &str = "validator";
pub const STAGE_REFINER: &str = "meta_refiner";

/// Structured result of one pipeline stage
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: &'static str,
    pub success: bool,
    pub message: String,
    pub placed: u32,
    pub flagged: u32,
}

impl StageReport {
    pub fn success(stage: &'static str, message: String, placed: u32, flagged: u32) -> Self {
        Self {
            stage,
            success: true,
            message,
            placed,
            flagged,
        }
    }
}

/// Stage precondition: every timetable must have completed `required`
pub fn require_step(
    store: &ScheduleStore,
    stage: &'static str,
    required: u8,
) -> std::result::Result<(), SchedulerError> {
    let current = store.min_step();
    if store.timetables().is_empty() || current < required {
        return Err(SchedulerError::PreconditionFailure {
            stage: stage.to_string(),
            required,
            current,
        });
    }
    Ok(())
}

/// Knobs for one full generation run
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub term: Term,
    pub academic_year: String,
    pub seed: u64,
    pub refine: bool,
    pub config: SchedulerConfig,
}

/// Everything a caller needs after `generate_timetables`
#[derive(Debug)]
pub struct GenerationOutcome {
    pub store: ScheduleStore,
    pub stage_reports: Vec<StageReport>,
    pub validation: ValidationReport,
    pub refinement: Option<RefineOutcome>,
    pub solve_time_ms: u64,
}

/// Run the whole pipeline S1..S7, then the refiner when requested and
/// the validator found repairable conflicts.
pub fn generate_timetables(
    snapshot: &Snapshot,
    options: &GenerateOptions,
    quiet: bool,
) -> Result<GenerationOutcome> {
    let start_time = Instant::now();

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb
    };

    let mut store = ScheduleStore::new(options.term, options.academic_year.clone());
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let mut stage_reports = Vec::new();

    progress.set_message("Initializing sections...");
    progress.set_position(5);
    stage_reports.push(section_init::run(&mut store, snapshot)?);

    progress.set_message("Blocking fixed slots...");
    progress.set_position(15);
    stage_reports.push(fixed_slots::run(&mut store, snapshot)?);

    progress.set_message("Scheduling labs...");
    progress.set_position(25);
    stage_reports.push(lab_scheduler::run(
        &mut store,
        snapshot,
        &options.config,
        &mut rng,
    )?);

    progress.set_message("Scheduling theory...");
    progress.set_position(45);
    stage_reports.push(theory_scheduler::run(&mut store, snapshot)?);

    progress.set_message("Assigning classrooms...");
    progress.set_position(60);
    stage_reports.push(classroom_assigner::run(&mut store, snapshot)?);

    progress.set_message("Assigning lab teachers...");
    progress.set_position(70);
    stage_reports.push(lab_teacher_assigner::run(&mut store, snapshot)?);

    section_init::write_breaks(&mut store, &options.config);

    progress.set_message("Validating...");
    progress.set_position(80);
    let mut validation = validate_store(&store, snapshot);
    record_validation(&mut store, &validation);
    stage_reports.push(StageReport::success(
        STAGE_VALIDATOR,
        format!("{} findings", validation.conflicts.len()),
        0,
        validation.conflicts.len() as u32,
    ));

    let refinement = if options.refine && validation.resource_conflicts() > 0 {
        progress.set_message("Refining residual conflicts...");
        progress.set_position(85);
        let outcome = refiner::refine(&store, snapshot, &options.config, options.seed);
        store = outcome.store.clone();
        validation = validate_store(&store, snapshot);
        record_validation(&mut store, &validation);
        for timetable in store.timetables_mut() {
            timetable.record_stage(
                7,
                STAGE_REFINER,
                StageSummary {
                    placed: outcome.sessions_moved as u32,
                    flagged: 0,
                    message: format!(
                        "{} driver: fitness {} -> {} over {} iterations",
                        outcome.driver,
                        outcome.initial_fitness,
                        outcome.final_fitness,
                        outcome.iterations
                    ),
                },
            );
        }
        stage_reports.push(StageReport::success(
            STAGE_REFINER,
            format!(
                "fitness {} -> {}",
                outcome.initial_fitness, outcome.final_fitness
            ),
            outcome.sessions_moved as u32,
            0,
        ));
        Some(outcome)
    } else {
        None
    };

    let elapsed = start_time.elapsed();
    let status = validation.status();
    for timetable in store.timetables_mut() {
        let metadata = &mut timetable.generation_metadata;
        metadata.generated_at = chrono::Utc::now().to_rfc3339();
        metadata.algorithm_version = env!("CARGO_PKG_VERSION").to_string();
        metadata.seed = options.seed;
        metadata.is_complete = true;
        metadata.validation_status = status;
    }

    progress.set_position(100);
    progress.finish_with_message("Timetables generated");

    Ok(GenerationOutcome {
        store,
        stage_reports,
        validation,
        refinement,
        solve_time_ms: elapsed.as_millis() as u64,
    })
}

fn record_validation(store: &mut ScheduleStore, validation: &ValidationReport) {
    let findings = validation.conflicts.len() as u32;
    for timetable in store.timetables_mut() {
        timetable.record_stage(
            7,
            STAGE_VALIDATOR,
            StageSummary {
                placed: 0,
                flagged: findings,
                message: format!("{findings} findings across all sections"),
            },
        );
    }
}
