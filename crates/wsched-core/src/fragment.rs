//! Scraping of a lesson's raw `schedule.html` fragment.
//!
//! Only the fixed shape lesson repositories ship is understood: one or more
//! `<table>` blocks whose data rows carry a time cell followed by a session
//! cell, plus exactly one `<a href>` per table, in the same order.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::error::ScheduleError;

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern"));
static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<table\b[^>]*>(.*?)</table\s*>").expect("table pattern"));
static ROW_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<tr\b[^>]*>").expect("row start pattern"));
// `</tr>` may be omitted; a row then ends at the enclosing section's end tag.
static ROW_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(?:tr|thead|tbody|tfoot)\s*>").expect("row end pattern")
});
static CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(td|th)\b[^>]*>(.*?)</(?:td|th)\s*>").expect("cell pattern")
});
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\shref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("link pattern")
});
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("entity pattern")
});

/// One `(time, session)` row as written in the source schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub time: String,
    pub session: String,
}

impl ScheduleRow {
    pub fn new<T: Into<String>, S: Into<String>>(time: T, session: S) -> Self {
        Self {
            time: time.into(),
            session: session.into(),
        }
    }
}

/// One day of a lesson's schedule and the link back to the lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleTable {
    pub rows: Vec<ScheduleRow>,
    pub permalink: String,
}

/// Extract every schedule table from a raw fragment, paired with its permalink.
pub fn parse_fragment(lesson: &str, html: &str) -> Result<Vec<ScheduleTable>, ScheduleError> {
    let html = COMMENT_RE.replace_all(html, "");

    let bodies: Vec<&str> = TABLE_RE
        .captures_iter(&html)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    if bodies.is_empty() {
        return Err(ScheduleError::malformed(lesson, "no schedule table found"));
    }

    let links: Vec<String> = LINK_RE
        .captures_iter(&html)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| decode_entities(m.as_str().trim()))
        })
        .collect();
    if links.len() != bodies.len() {
        return Err(ScheduleError::PermalinkMismatch {
            lesson: lesson.to_string(),
            tables: bodies.len(),
            links: links.len(),
        });
    }

    let tables = bodies
        .into_iter()
        .zip(links)
        .enumerate()
        .map(|(index, (body, permalink))| -> Result<ScheduleTable, ScheduleError> {
            let rows = parse_rows(lesson, index, body)?;
            Ok(ScheduleTable { rows, permalink })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        lesson,
        tables = tables.len(),
        rows = tables.iter().map(|t| t.rows.len()).sum::<usize>(),
        "Parsed schedule fragment"
    );
    Ok(tables)
}

fn parse_rows(lesson: &str, table: usize, body: &str) -> Result<Vec<ScheduleRow>, ScheduleError> {
    let mut rows = Vec::new();

    for inner in row_bodies(body) {
        let cells: Vec<Captures<'_>> = CELL_RE.captures_iter(inner).collect();

        // Header rows carry only <th> cells.
        let has_data = cells
            .iter()
            .any(|cell| cell[1].eq_ignore_ascii_case("td"));
        if !has_data {
            continue;
        }

        if cells.len() < 2 {
            return Err(ScheduleError::malformed(
                lesson,
                format!(
                    "table {} row {} has {} cell(s), expected a time and a session",
                    table + 1,
                    rows.len() + 1,
                    cells.len()
                ),
            ));
        }

        rows.push(ScheduleRow {
            time: cell_text(&cells[0][2]),
            session: cell_text(&cells[1][2]),
        });
    }

    if rows.is_empty() {
        return Err(ScheduleError::malformed(
            lesson,
            format!("table {} has no rows", table + 1),
        ));
    }

    Ok(rows)
}

/// Content of each `<tr>`, bounded by its end tag or else by the next row start.
fn row_bodies(body: &str) -> Vec<&str> {
    let starts: Vec<(usize, usize)> = ROW_START_RE
        .find_iter(body)
        .map(|m| (m.start(), m.end()))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &(_, content_start))| {
            let limit = starts.get(i + 1).map_or(body.len(), |&(next, _)| next);
            let segment = &body[content_start..limit];
            ROW_END_RE
                .find(segment)
                .map_or(segment, |end| &segment[..end.start()])
        })
        .collect()
}

/// Visible text of a cell with whitespace collapsed.
pub fn cell_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;

    for ch in raw.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    normalize_ws(&decode_entities(&out))
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> String {
    ENTITY_RE
        .replace_all(s, |caps: &Captures<'_>| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or(name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "ndash" => Some('\u{2013}'),
                    "mdash" => Some('\u{2014}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
