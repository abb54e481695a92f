//! Department Timetabler - constraint-based weekly timetable generator
//!
//! Generates globally conflict-free weekly timetables for a university
//! department running multiple class-sections across several semesters
//! at once.
//!
//! # Algorithm Overview
//!
//! A seven-stage pipeline feeds a shared schedule store:
//! 1. **Section Init**: one empty timetable per section of the term
//! 2. **Fixed Slot Blocker**: reserve pre-declared cross-dept slots
//! 3. **Lab Scheduler**: synchronized 3-batch lab sessions with batch
//!    rotation and dynamic room selection
//! 4. **Theory Scheduler**: duration-split theory hours, load-balanced
//! 5. **Classroom Assigner**: fixed sessions first, then regular
//! 6. **Lab Teacher Assigner**: two compatible teachers per batch
//! 7. **Validator**: exhaustive conflict report at 30-minute grain
//!
//! Residual teacher/room conflicts are repaired by a metaheuristic
//! refiner (evolutionary by default, swarm as the alternative).
//!
//! # Example
//!
//! ```no_run
//! use dept_timetabler::parser::load_snapshot_from_dir;
//! use dept_timetabler::scheduler::{generate_timetables, GenerateOptions};
//! use dept_timetabler::types::{SchedulerConfig, Term};
//! use std::path::Path;
//!
//! let snapshot = load_snapshot_from_dir(Path::new("./data/demo")).unwrap();
//! let options = GenerateOptions {
//!     term: Term::Odd,
//!     academic_year: "2025-26".to_string(),
//!     seed: 42,
//!     refine: true,
//!     config: SchedulerConfig::default(),
//! };
//! let outcome = generate_timetables(&snapshot, &options, false).unwrap();
//! println!("{} findings", outcome.validation.conflicts.len());
//! ```

pub mod error;
pub mod parser;
pub mod refiner;
pub mod reporter;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod validator;

pub use error::{Result, SchedulerError};
