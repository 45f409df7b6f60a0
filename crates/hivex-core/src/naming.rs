use crate::model::{AxisKind, AxisPoint, RunIdentity};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunNameError {
    #[error("run name '{name}' has no task_<n> segment")]
    MissingTask { name: String },
    #[error("run name '{name}' has no id_<n> segment")]
    MissingId { name: String },
    #[error("run name '{name}' has an out of range {field} value")]
    OutOfRange { name: String, field: &'static str },
}

fn axis_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(pattern|difficulty)_(\d+)").expect("static regex"))
}

fn task_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"task_(\d+)").expect("static regex"))
}

fn id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"id_(\d+)").expect("static regex"))
}

fn agent_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"agent_count_(\d+)").expect("static regex"))
}

/// Captured number of the first match, `None` when absent.
/// `Some(Err(()))` when the digits do not fit a u32.
fn first_number(re: &Regex, name: &str, group: usize) -> Option<Result<u32, ()>> {
    re.captures(name)
        .and_then(|c| c.get(group))
        .map(|m| m.as_str().parse::<u32>().map_err(|_| ()))
}

pub fn parse_axis(name: &str) -> Option<AxisPoint> {
    let caps = axis_re().captures(name)?;
    let kind = AxisKind::parse(caps.get(1)?.as_str())?;
    let value = caps.get(2)?.as_str().parse().ok()?;
    Some(AxisPoint { kind, value })
}

pub fn parse_task(name: &str) -> Option<u32> {
    first_number(task_re(), name, 1).and_then(Result::ok)
}

pub fn parse_run_id(name: &str) -> Option<u32> {
    first_number(id_re(), name, 1).and_then(Result::ok)
}

pub fn parse_agent_count(name: &str) -> Option<u32> {
    first_number(agent_count_re(), name, 1).and_then(Result::ok)
}

pub fn env_name(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}

pub fn is_scalability_run(name: &str) -> bool {
    name.contains("agent_count")
}

/// Parses `{env}_{pattern|difficulty}_{n}_task_{t}_..._id_{i}[_agent_count_{c}]`.
pub fn parse_run_name(name: &str) -> Result<RunIdentity, RunNameError> {
    let task = match first_number(task_re(), name, 1) {
        None => {
            return Err(RunNameError::MissingTask {
                name: name.to_string(),
            })
        }
        Some(Err(())) => {
            return Err(RunNameError::OutOfRange {
                name: name.to_string(),
                field: "task",
            })
        }
        Some(Ok(v)) => v,
    };
    let run_id = match first_number(id_re(), name, 1) {
        None => {
            return Err(RunNameError::MissingId {
                name: name.to_string(),
            })
        }
        Some(Err(())) => {
            return Err(RunNameError::OutOfRange {
                name: name.to_string(),
                field: "id",
            })
        }
        Some(Ok(v)) => v,
    };
    Ok(RunIdentity {
        env_name: env_name(name).to_string(),
        axis: parse_axis(name),
        task,
        run_id,
        agent_count: parse_agent_count(name),
    })
}
