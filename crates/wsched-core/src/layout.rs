//! Re-anchoring of lesson schedules and composition of the merged document.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::error::ScheduleError;
use crate::fragment::ScheduleTable;
use crate::lesson::LessonEntry;
use crate::time::{format_clock, normalize, normalize_clock, offset_minutes, shift};

/// Fragments placed side by side in one `<div class="row">`.
pub const FRAGMENTS_PER_ROW: usize = 2;

const VOID_ELEMENTS: [&str; 6] = ["br", "hr", "img", "input", "link", "meta"];

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>|[^<]+").expect("token pattern"));

/// A lesson together with the tables scraped from its raw fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonSchedule {
    pub lesson: LessonEntry,
    pub tables: Vec<ScheduleTable>,
}

/// One table, shifted and ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFragment {
    pub title: String,
    pub date: String,
    pub permalink: String,
    /// `(HH:MM, session)` pairs after shifting.
    pub rows: Vec<(String, String)>,
}

/// Merged schedule markup plus counts for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedSchedule {
    pub html: String,
    pub lessons: usize,
    pub fragments: usize,
}

impl RenderedFragment {
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<div class=\"col-md-6\">");
        html.push_str(&format!(
            "<a href=\"{}\"><h3>{}</h3></a><h4>{}</h4>",
            escape_html(&self.permalink),
            escape_html(&self.title),
            escape_html(&self.date)
        ));
        html.push_str("<table class=\"table table-striped\">");
        for (time, session) in &self.rows {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                escape_html(time),
                escape_html(session)
            ));
        }
        html.push_str("</table></div>");
        html
    }
}

/// Packs fragments into rows of [`FRAGMENTS_PER_ROW`].
#[derive(Debug, Default)]
pub struct RowAccumulator {
    markup: String,
    in_row: usize,
    placed: usize,
}

impl RowAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &RenderedFragment) {
        if self.in_row == 0 {
            self.markup.push_str("<div class=\"row\">");
        }
        self.markup.push_str(&fragment.to_html());
        self.in_row += 1;
        self.placed += 1;

        if self.in_row == FRAGMENTS_PER_ROW {
            self.markup.push_str("</div>");
            self.in_row = 0;
        }
    }

    pub fn placed(&self) -> usize {
        self.placed
    }

    /// Close any half-filled row and wrap everything in the schedule container.
    pub fn finish(mut self) -> String {
        if self.in_row > 0 {
            debug!(fragments = self.in_row, "Closing final partial row");
            self.markup.push_str("</div>");
        }
        format!("<div class=\"schedule\">{}</div>", self.markup)
    }
}

/// Shift every table of a lesson to its declared start time.
pub fn render_lesson(schedule: &LessonSchedule) -> Result<Vec<RenderedFragment>, ScheduleError> {
    let LessonSchedule { lesson, tables } = schedule;
    let name = lesson.gh_name.as_str();

    if lesson.dates.len() != tables.len() || lesson.start_times.len() != tables.len() {
        return Err(ScheduleError::ScheduleMismatch {
            lesson: name.to_string(),
            tables: tables.len(),
            dates: lesson.dates.len(),
            start_times: lesson.start_times.len(),
        });
    }

    let multi_day = tables.len() > 1;
    let mut fragments = Vec::with_capacity(tables.len());

    for (index, ((table, date), start_time)) in tables
        .iter()
        .zip(&lesson.dates)
        .zip(&lesson.start_times)
        .enumerate()
    {
        let first = table
            .rows
            .first()
            .ok_or_else(|| ScheduleError::malformed(name, format!("table {} has no rows", index + 1)))?;

        let declared = normalize(name, start_time)?;
        let original = normalize_clock(name, &first.time)?;
        let offset = offset_minutes(declared, original);
        debug!(
            lesson = name,
            table = index + 1,
            declared = %format_clock(declared),
            original = %format_clock(original),
            offset,
            "Computed table offset"
        );

        let rows = table
            .rows
            .iter()
            .map(|row| -> Result<(String, String), ScheduleError> {
                let time = normalize_clock(name, &row.time)?;
                Ok((format_clock(shift(time, offset)), row.session.clone()))
            })
            .collect::<Result<Vec<_>, ScheduleError>>()?;

        let title = if multi_day {
            format!("Day {} - {}", index + 1, lesson.title)
        } else {
            lesson.title.clone()
        };

        fragments.push(RenderedFragment {
            title,
            date: date.clone(),
            permalink: table.permalink.clone(),
            rows,
        });
    }

    Ok(fragments)
}

/// Compose every lesson, in order, into one pretty-printed document.
pub fn compose_schedule(schedules: &[LessonSchedule]) -> Result<ComposedSchedule, ScheduleError> {
    let mut rows = RowAccumulator::new();

    for schedule in schedules {
        let fragments = render_lesson(schedule)?;
        info!(
            lesson = %schedule.lesson.gh_name,
            tables = fragments.len(),
            "Composed lesson schedule"
        );
        for fragment in &fragments {
            rows.push(fragment);
        }
    }

    let fragments = rows.placed();
    let html = prettify(&rows.finish());

    Ok(ComposedSchedule {
        html,
        lessons: schedules.len(),
        fragments,
    })
}

/// Put each tag and text run on its own line, indented one space per level.
pub fn prettify(html: &str) -> String {
    let mut out = String::with_capacity(html.len() * 2);
    let mut depth = 0usize;

    for token in TOKEN_RE.find_iter(html).map(|m| m.as_str()) {
        if token.starts_with("</") {
            depth = depth.saturating_sub(1);
            push_line(&mut out, depth, token);
        } else if token.starts_with('<') {
            push_line(&mut out, depth, token);
            if !is_void_or_self_closing(token) && !token.starts_with("<!") {
                depth += 1;
            }
        } else {
            let text = token.trim();
            if !text.is_empty() {
                push_line(&mut out, depth, text);
            }
        }
    }

    out
}

fn push_line(out: &mut String, depth: usize, content: &str) {
    out.extend(std::iter::repeat_n(' ', depth));
    out.push_str(content);
    out.push('\n');
}

fn is_void_or_self_closing(tag: &str) -> bool {
    if tag.ends_with("/>") {
        return true;
    }
    let name: String = tag
        .trim_start_matches('<')
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    VOID_ELEMENTS.contains(&name.as_str())
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::ScheduleRow;
    use crate::time::StartTime;

    fn lesson(title: &str, gh_name: &str, dates: &[&str], starts: Vec<StartTime>) -> LessonEntry {
        LessonEntry {
            title: title.to_string(),
            gh_name: gh_name.to_string(),
            dates: dates.iter().map(|d| d.to_string()).collect(),
            start_times: starts,
        }
    }

    fn table(permalink: &str, rows: &[(&str, &str)]) -> ScheduleTable {
        ScheduleTable {
            rows: rows
                .iter()
                .map(|(time, session)| ScheduleRow::new(*time, *session))
                .collect(),
            permalink: permalink.to_string(),
        }
    }

    fn intro() -> LessonSchedule {
        LessonSchedule {
            lesson: lesson("Intro", "intro", &["2024-01-01"], vec!["9:30 am".into()]),
            tables: vec![table("/intro/", &[("10:00", "Welcome"), ("10:15", "Break")])],
        }
    }

    #[test]
    fn test_single_table_keeps_title_and_shifts_rows() {
        let fragments = render_lesson(&intro()).unwrap();
        assert_eq!(fragments.len(), 1);
        let fragment = &fragments[0];
        assert_eq!(fragment.title, "Intro");
        assert_eq!(fragment.date, "2024-01-01");
        assert_eq!(fragment.permalink, "/intro/");
        assert_eq!(
            fragment.rows,
            vec![
                ("09:30".to_string(), "Welcome".to_string()),
                ("09:45".to_string(), "Break".to_string()),
            ]
        );
    }

    #[test]
    fn test_multi_day_titles_and_independent_offsets() {
        let schedule = LessonSchedule {
            lesson: lesson(
                "Python",
                "python-novice",
                &["2024-01-02", "2024-01-03"],
                vec![StartTime::Minutes(540), "13:00".into()],
            ),
            tables: vec![
                table("/py/1/", &[("10:00", "Setup"), ("11:00", "Lists")]),
                table("/py/2/", &[("09:00", "Loops"), ("09:30", "Functions")]),
            ],
        };

        let fragments = render_lesson(&schedule).unwrap();
        assert_eq!(fragments[0].title, "Day 1 - Python");
        assert_eq!(fragments[1].title, "Day 2 - Python");
        assert_eq!(fragments[0].rows[0].0, "09:00");
        assert_eq!(fragments[0].rows[1].0, "10:00");
        assert_eq!(fragments[1].rows[0].0, "13:00");
        assert_eq!(fragments[1].rows[1].0, "13:30");
    }

    #[test]
    fn test_date_count_mismatch_is_rejected() {
        let schedule = LessonSchedule {
            lesson: lesson(
                "Shell",
                "shell-novice",
                &["2024-01-01"],
                vec!["09:00".into(), "09:00".into()],
            ),
            tables: vec![
                table("/a/", &[("09:00", "A")]),
                table("/b/", &[("09:00", "B")]),
            ],
        };

        let err = render_lesson(&schedule).unwrap_err();
        match err {
            ScheduleError::ScheduleMismatch {
                lesson,
                tables,
                dates,
                start_times,
            } => {
                assert_eq!(lesson, "shell-novice");
                assert_eq!((tables, dates, start_times), (2, 1, 2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_row_time_is_rejected() {
        let mut schedule = intro();
        schedule.tables[0].rows[1].time = "quarter past".to_string();
        let err = render_lesson(&schedule).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidTimeFormat { .. }), "{err:?}");
    }

    #[test]
    fn test_rows_pair_and_dangling_row_is_closed() {
        let fragment = render_lesson(&intro()).unwrap().remove(0);
        let mut rows = RowAccumulator::new();
        for _ in 0..3 {
            rows.push(&fragment);
        }
        assert_eq!(rows.placed(), 3);
        let html = rows.finish();

        assert_eq!(html.matches("<div class=\"row\">").count(), 2);
        assert_eq!(html.matches("<div").count(), html.matches("</div>").count());
        assert!(html.starts_with("<div class=\"schedule\">"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let schedules = vec![intro(), intro()];
        let first = compose_schedule(&schedules).unwrap();
        let second = compose_schedule(&schedules).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.fragments, 2);
        assert_eq!(first.lessons, 2);
        assert_eq!(first.html.matches("<div class=\"row\">").count(), 1);
    }

    #[test]
    fn test_fragment_escapes_text() {
        let fragment = RenderedFragment {
            title: "R & Friends".to_string(),
            date: "<today>".to_string(),
            permalink: "/r/?a=1&b=2".to_string(),
            rows: vec![("09:00".to_string(), "Q&A".to_string())],
        };
        let html = fragment.to_html();
        assert!(html.contains("R &amp; Friends"));
        assert!(html.contains("&lt;today&gt;"));
        assert!(html.contains("href=\"/r/?a=1&amp;b=2\""));
        assert!(html.contains("<td>Q&amp;A</td>"));
    }

    #[test]
    fn test_prettify_indents_by_depth() {
        let pretty = prettify("<div class=\"row\"><h3>Intro</h3><br></div>");
        assert_eq!(
            pretty,
            "<div class=\"row\">\n <h3>\n  Intro\n </h3>\n <br>\n</div>\n"
        );
    }
}
