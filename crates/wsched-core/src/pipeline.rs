use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::error::ScheduleError;
use crate::fragment::parse_fragment;
use crate::layout::{LessonSchedule, compose_schedule};
use crate::lesson::WorkshopConfig;
use crate::settings::{ResolvedPaths, Settings};
use crate::time::StartTime;

/// Inputs for one compositor run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub site_root: PathBuf,
    pub settings: Settings,
    /// Compose the document but leave the output file untouched.
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(site_root: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
            settings: Settings::default(),
            dry_run: false,
        }
    }

    pub fn paths(&self) -> ResolvedPaths {
        self.settings.resolve(&self.site_root)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: PathBuf,
    pub lessons: usize,
    pub fragments: usize,
    pub written: bool,
    pub document: String,
}

/// Per-lesson overview used by `--list-lessons`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonSummary {
    pub gh_name: String,
    pub title: String,
    pub tables: usize,
    pub start_times: Vec<String>,
}

pub type StageProgressCallback = Arc<dyn Fn(StageProgressEvent) + Send + Sync + 'static>;

#[derive(Debug, Clone)]
pub struct StageProgressEvent {
    pub kind: StageProgressEventKind,
    pub stage: Option<String>,
    pub elapsed_ms: f64,
    pub stage_elapsed_ms: Option<f64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageProgressEventKind {
    Begin,
    End,
    Note,
}

#[derive(Clone)]
struct StageLogger {
    program_start: Instant,
    stage_start: Instant,
    current_stage: Option<String>,
    callback: Option<StageProgressCallback>,
}

impl StageLogger {
    fn new(callback: Option<StageProgressCallback>) -> Self {
        let start = Instant::now();
        Self {
            program_start: start,
            stage_start: start,
            current_stage: None,
            callback,
        }
    }

    fn begin(&mut self, name: &str) {
        let since_start = self.program_start.elapsed();
        info!(stage = name, elapsed_ms = %format_ms(since_start), "BEGIN");
        self.stage_start = Instant::now();
        self.current_stage = Some(name.to_string());
        self.emit(
            StageProgressEventKind::Begin,
            None,
            Some(format!("Starting {name}")),
        );
    }

    fn end(&mut self, name: &str) {
        let stage_elapsed = self.stage_start.elapsed();
        info!(
            stage = name,
            elapsed_ms = %format_ms(self.program_start.elapsed()),
            stage_ms = %format_ms(stage_elapsed),
            "END"
        );
        self.emit(
            StageProgressEventKind::End,
            Some(stage_elapsed.as_secs_f64() * 1_000.0),
            Some(format!("Finished {name} (Δ {} ms)", format_ms(stage_elapsed))),
        );
        self.current_stage = None;
    }

    fn note(&mut self, message: impl Into<String>) {
        let text = message.into();
        info!(stage = self.current_stage.as_deref(), "{text}");
        self.emit(
            StageProgressEventKind::Note,
            Some(self.stage_start.elapsed().as_secs_f64() * 1_000.0),
            Some(text),
        );
    }

    fn emit(&self, kind: StageProgressEventKind, stage_elapsed_ms: Option<f64>, message: Option<String>) {
        if let Some(cb) = &self.callback {
            cb(StageProgressEvent {
                kind,
                stage: self.current_stage.clone(),
                elapsed_ms: self.program_start.elapsed().as_secs_f64() * 1_000.0,
                stage_elapsed_ms,
                message,
            });
        }
    }
}

fn format_ms(d: std::time::Duration) -> String {
    format!("{:.3}", d.as_secs_f64() * 1_000.0)
}

pub fn run(options: &RunOptions) -> Result<RunReport, ScheduleError> {
    run_inner(options, None)
}

pub fn run_with_progress(
    options: &RunOptions,
    callback: StageProgressCallback,
) -> Result<RunReport, ScheduleError> {
    run_inner(options, Some(callback))
}

fn run_inner(
    options: &RunOptions,
    callback: Option<StageProgressCallback>,
) -> Result<RunReport, ScheduleError> {
    let mut logger = StageLogger::new(callback);
    let paths = options.paths();

    logger.begin("Load workshop config");
    let config = WorkshopConfig::load(&paths.config)?;
    logger.note(format!(
        "{} lesson(s) declared in {}",
        config.lessons.len(),
        paths.config.display()
    ));
    logger.end("Load workshop config");

    logger.begin("Read lesson schedules");
    let schedules = load_schedules(&config, &paths)?;
    logger.end("Read lesson schedules");

    logger.begin("Compose schedule");
    let composed = compose_schedule(&schedules)?;
    logger.note(format!(
        "{} fragment(s) from {} lesson(s)",
        composed.fragments, composed.lessons
    ));
    logger.end("Compose schedule");

    let written = if options.dry_run {
        warn!(path = %paths.output.display(), "Dry run; output not written");
        false
    } else {
        logger.begin("Write output");
        write_output(&paths.output, &composed.html)?;
        logger.note(format!("Wrote {}", paths.output.display()));
        logger.end("Write output");
        true
    };

    Ok(RunReport {
        output: paths.output,
        lessons: composed.lessons,
        fragments: composed.fragments,
        written,
        document: composed.html,
    })
}

/// Read and scrape the raw schedule fragment of every lesson, in config order.
pub fn load_schedules(
    config: &WorkshopConfig,
    paths: &ResolvedPaths,
) -> Result<Vec<LessonSchedule>, ScheduleError> {
    config
        .lessons
        .iter()
        .map(|lesson| -> Result<LessonSchedule, ScheduleError> {
            let path = paths.fragment_path(&lesson.gh_name);
            let html = fs::read_to_string(&path).map_err(|source| ScheduleError::MissingFragment {
                lesson: lesson.gh_name.clone(),
                path: path.clone(),
                source,
            })?;
            let tables = parse_fragment(&lesson.gh_name, &html)?;
            Ok(LessonSchedule {
                lesson: lesson.clone(),
                tables,
            })
        })
        .collect()
}

/// Summaries of every lesson without composing or writing anything.
pub fn list_lessons(options: &RunOptions) -> Result<Vec<LessonSummary>, ScheduleError> {
    let paths = options.paths();
    let config = WorkshopConfig::load(&paths.config)?;
    let schedules = load_schedules(&config, &paths)?;

    Ok(schedules
        .into_iter()
        .map(|schedule| LessonSummary {
            tables: schedule.tables.len(),
            start_times: schedule
                .lesson
                .start_times
                .iter()
                .map(|start| match start {
                    StartTime::Clock(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect(),
            gh_name: schedule.lesson.gh_name,
            title: schedule.lesson.title,
        })
        .collect())
}

fn write_output(path: &Path, document: &str) -> Result<(), ScheduleError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, document)?;
    Ok(())
}
