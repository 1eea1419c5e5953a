//! Lesson entries declared in the workshop's `_config.yml`.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

use crate::error::ScheduleError;
use crate::time::StartTime;

/// Ordered lessons making up the workshop.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkshopConfig {
    pub lessons: Vec<LessonEntry>,
}

/// One lesson with its dates and start times already expanded to lists.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonEntry {
    pub title: String,
    pub gh_name: String,
    pub dates: Vec<String>,
    pub start_times: Vec<StartTime>,
}

#[derive(Debug, Deserialize)]
struct RawSiteConfig {
    #[serde(default)]
    lessons: Option<Vec<RawLessonEntry>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLessonEntry {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default, rename = "gh-name")]
    gh_name: Option<Value>,
    #[serde(default)]
    date: Option<Value>,
    #[serde(default, rename = "start-time")]
    start_time: Option<Value>,
}

impl WorkshopConfig {
    /// Read and validate the lesson list from a Jekyll site configuration file.
    pub fn load(path: &Path) -> Result<Self, ScheduleError> {
        let raw = fs::read_to_string(path)?;
        let config = Self::from_yaml(&raw)?;
        debug!(path = %path.display(), lessons = config.lessons.len(), "Loaded workshop config");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ScheduleError> {
        let site: RawSiteConfig = serde_yaml::from_str(raw)?;
        let entries = site.lessons.ok_or_else(|| ScheduleError::MissingField {
            lesson: "_config.yml".to_string(),
            field: "lessons",
        })?;

        let lessons = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| LessonEntry::from_raw(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { lessons })
    }
}

impl LessonEntry {
    fn from_raw(index: usize, raw: RawLessonEntry) -> Result<Self, ScheduleError> {
        let gh_name = raw.gh_name.as_ref().and_then(scalar_text);
        let label = gh_name
            .clone()
            .unwrap_or_else(|| format!("#{}", index + 1));

        let missing = |field: &'static str| ScheduleError::MissingField {
            lesson: label.clone(),
            field,
        };

        let gh_name = gh_name.ok_or_else(|| missing("gh-name"))?;
        let title = raw
            .title
            .as_ref()
            .and_then(scalar_text)
            .ok_or_else(|| missing("title"))?;
        let date = raw.date.ok_or_else(|| missing("date"))?;
        let start_time = raw.start_time.ok_or_else(|| missing("start-time"))?;

        let dates = one_or_many(date)
            .iter()
            .map(|value| scalar_text(value).unwrap_or_else(|| render_value(value)))
            .collect();
        let start_times = one_or_many(start_time)
            .into_iter()
            .map(start_time_from_value)
            .collect();

        Ok(Self {
            title,
            gh_name,
            dates,
            start_times,
        })
    }
}

fn one_or_many(value: Value) -> Vec<Value> {
    match value {
        Value::Sequence(items) => items,
        other => vec![other],
    }
}

/// Strings, numbers and booleans rendered as text; `None` for null and collections.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn render_value(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|text| text.trim().to_string())
        .unwrap_or_else(|_| format!("{value:?}"))
}

fn start_time_from_value(value: Value) -> StartTime {
    match value {
        Value::String(text) => StartTime::Clock(text),
        Value::Number(ref number) => match number.as_i64() {
            Some(minutes) => StartTime::Minutes(minutes),
            None => StartTime::Unsupported(number.to_string()),
        },
        other => StartTime::Unsupported(render_value(&other)),
    }
}
