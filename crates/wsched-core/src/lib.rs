//! Core library for composing a workshop's merged schedule from per-lesson fragments.

pub mod error;
pub mod fragment;
pub mod layout;
pub mod lesson;
pub mod logging;
pub mod pipeline;
pub mod settings;
pub mod time;

pub use error::ScheduleError;
pub use fragment::{ScheduleRow, ScheduleTable, parse_fragment};
pub use layout::{
    ComposedSchedule, LessonSchedule, RenderedFragment, RowAccumulator, compose_schedule,
    render_lesson,
};
pub use lesson::{LessonEntry, WorkshopConfig};
pub use logging::{LoggingDestination, LoggingError, init_logging};
pub use pipeline::{
    LessonSummary, RunOptions, RunReport, StageProgressCallback, StageProgressEvent,
    StageProgressEventKind, list_lessons, load_schedules, run, run_with_progress,
};
pub use settings::{
    RuntimeOverrides, Settings, SettingsError, SettingsLoadResult, SettingsSource,
    apply_runtime_overrides, load_settings, save_settings,
};
pub use time::StartTime;
