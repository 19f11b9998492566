use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// What happens to a task's stdout/stderr.
///
/// - `Log`: capture both streams and forward each line as a `debug` event
///   tagged with the task name (default).
/// - `Inherit`: let the child write straight to our own stdout/stderr.
/// - `Null`: discard everything, like running the test module quietly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Log,
    Inherit,
    Null,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Log
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(OutputMode::Log),
            "inherit" => Ok(OutputMode::Inherit),
            "null" => Ok(OutputMode::Null),
            other => Err(format!(
                "invalid output mode: {other} (expected \"log\", \"inherit\" or \"null\")"
            )),
        }
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
