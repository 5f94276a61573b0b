//! Tolerant line parser for sensor telemetry
//!
//! Lines look like `ID:7 X:120 Y:80 Z:30`, but the sensor firmware is loose about
//! separators (`:`, `=`, whitespace), label case and surrounding text. Every field
//! is optional; a missing match is a valid outcome, never an error.
//!
//! Z is resolved through an ordered list of independent matchers, first hit wins:
//! 1. labelled `Z`
//! 2. first signed number after the matched `Y` field
//! 3. combined `X .. Y .. <number>` pattern

use crate::domain::types::{Number, ParsedRecord};
use regex::{Match, Regex};
use std::sync::OnceLock;

/// Signed integer or decimal, ASCII digits only (what `f64::from_str` accepts)
const NUM: &str = r"(-?[0-9]+(?:\.[0-9]+)?)";

fn labelled(label: &str) -> Regex {
    // Standalone label, optional spaces, optional ':' or '=', optional spaces, number
    Regex::new(&format!(r"(?i)\b{}\b\s*[:=]?\s*{}", label, NUM)).expect("valid field pattern")
}

fn id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| labelled("ID"))
}

fn x_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| labelled("X"))
}

fn y_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| labelled("Y"))
}

fn z_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| labelled("Z"))
}

fn bare_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NUM).expect("valid number pattern"))
}

fn xyz_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)\bX\b\s*[:=]?\s*{n}[^0-9]+\bY\b\s*[:=]?\s*{n}[^0-9]+{n}",
            n = NUM
        ))
        .expect("valid xyz pattern")
    })
}

fn to_number(text: &str) -> Option<Number> {
    text.parse::<f64>().ok().map(Number::from_f64)
}

/// Find a labelled field; returns the whole match (for position) and its value
fn find_labelled<'a>(re: &Regex, line: &'a str) -> Option<(Match<'a>, Number)> {
    let caps = re.captures(line)?;
    let whole = caps.get(0)?;
    let value = to_number(caps.get(1)?.as_str())?;
    Some((whole, value))
}

/// Value of a labelled field (`ID`, `X`, ...) anywhere in the line
pub fn labelled_value(re: &Regex, line: &str) -> Option<Number> {
    find_labelled(re, line).map(|(_, value)| value)
}

/// Z tier 1: explicit `Z` label
pub fn z_labelled(line: &str) -> Option<Number> {
    labelled_value(z_pattern(), line)
}

/// Z tier 2: first signed number after byte offset `y_end`
pub fn z_after_y(line: &str, y_end: usize) -> Option<Number> {
    let rest = line.get(y_end..)?;
    bare_number().find(rest).and_then(|m| to_number(m.as_str()))
}

/// Z tier 3: `X <n> .. Y <n> .. <n>`, third number
pub fn z_from_xyz_pattern(line: &str) -> Option<Number> {
    let caps = xyz_pattern().captures(line)?;
    to_number(caps.get(3)?.as_str())
}

/// Parser holding the configured danger sentinel
#[derive(Debug, Clone)]
pub struct LineParser {
    danger_id: i64,
    danger: Regex,
}

impl LineParser {
    pub fn new(danger_id: i64) -> Self {
        let pattern = format!(r"(?i)\bID[:=\s]*{}\b", regex::escape(&danger_id.to_string()));
        Self { danger_id, danger: Regex::new(&pattern).expect("valid danger pattern") }
    }

    pub fn danger_id(&self) -> i64 {
        self.danger_id
    }

    /// True if the line carries `ID <sentinel>` as a standalone field
    pub fn has_danger_marker(&self, line: &str) -> bool {
        self.danger.is_match(line)
    }

    pub fn parse(&self, line: &str) -> ParsedRecord {
        let danger_marker = self.has_danger_marker(line);

        let (Some((_, x)), Some((y_match, y))) =
            (find_labelled(x_pattern(), line), find_labelled(y_pattern(), line))
        else {
            return ParsedRecord::passthrough(line, danger_marker);
        };

        let object_id = labelled_value(id_pattern(), line).map(|id| id.trunc());

        let z = z_labelled(line)
            .or_else(|| z_after_y(line, y_match.end()))
            .or_else(|| z_from_xyz_pattern(line));

        ParsedRecord {
            raw: line.to_string(),
            object_id,
            x: Some(x),
            y: Some(y),
            z,
            danger_marker,
        }
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new(1)
    }
}
