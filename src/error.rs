use thiserror::Error;

/// Domain-specific errors for the timetable generator.
///
/// Domain infeasibility (no free window, too few teachers) is never an
/// error: it is recorded on the timetable as a flag and the pipeline
/// continues. Only malformed input and broken stage preconditions
/// surface here.
#[derive(Error, Debug)]
pub enum SchedulerError {
    // Input/Parse errors
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in '{file}': {message}")]
    JsonParse { file: String, message: String },

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Section '{section}' declares {count} lab batches; scheduling requires exactly 3")]
    InvalidBatchCount { section: String, count: u8 },

    #[error("Duplicate ID found: {id_type} '{id}'")]
    DuplicateId { id_type: String, id: String },

    #[error("{referrer} references unknown {id_type} '{id}'")]
    UnknownReference {
        referrer: String,
        id_type: String,
        id: String,
    },

    // Pipeline errors
    #[error("No sections found for the {term} term")]
    NoSectionsForTerm { term: String },

    #[error("Stage {stage} requires step {required} to have completed (current step: {current})")]
    PreconditionFailure {
        stage: String,
        required: u8,
        current: u8,
    },
}

/// Use anyhow::Result at application boundaries
pub type Result<T> = anyhow::Result<T>;
