use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors raised while composing the workshop schedule.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("lesson {lesson}: missing required field `{field}`")]
    MissingField { lesson: String, field: &'static str },
    #[error("lesson {lesson}: time {value} matches no accepted format")]
    InvalidTimeFormat { lesson: String, value: String },
    #[error(
        "lesson {lesson}: config has {tables} schedule table(s) but {dates} date(s) and {start_times} start time(s)"
    )]
    ScheduleMismatch {
        lesson: String,
        tables: usize,
        dates: usize,
        start_times: usize,
    },
    #[error("lesson {lesson}: found {tables} schedule table(s) but {links} permalink(s)")]
    PermalinkMismatch {
        lesson: String,
        tables: usize,
        links: usize,
    },
    #[error("lesson {lesson}: malformed schedule: {reason}")]
    MalformedSchedule { lesson: String, reason: String },
    #[error("lesson {lesson}: cannot read schedule fragment {}: {source}", .path.display())]
    MissingFragment {
        lesson: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ScheduleError {
    pub fn malformed<L: Into<String>, R: Into<String>>(lesson: L, reason: R) -> Self {
        ScheduleError::MalformedSchedule {
            lesson: lesson.into(),
            reason: reason.into(),
        }
    }

    /// Identifier of the lesson the error concerns, when there is one.
    pub fn lesson(&self) -> Option<&str> {
        match self {
            ScheduleError::MissingField { lesson, .. }
            | ScheduleError::InvalidTimeFormat { lesson, .. }
            | ScheduleError::ScheduleMismatch { lesson, .. }
            | ScheduleError::PermalinkMismatch { lesson, .. }
            | ScheduleError::MalformedSchedule { lesson, .. }
            | ScheduleError::MissingFragment { lesson, .. } => Some(lesson),
            ScheduleError::Io(_) | ScheduleError::Yaml(_) => None,
        }
    }
}
