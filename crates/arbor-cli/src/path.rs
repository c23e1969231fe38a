//! Path segment parsing
//!
//! A segment is `Name` or `Name:arg1,arg2`. Arguments are read as integer,
//! float, bool, then text.

use anyhow::{bail, Result};
use arbor_core::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub args: Vec<Value>,
}

pub fn parse_segment(raw: &str) -> Result<Segment> {
    let (name, args) = match raw.split_once(':') {
        Some((name, args)) => (name, args.split(',').map(parse_arg).collect()),
        None => (raw, Vec::new()),
    };
    if name.is_empty() {
        bail!("empty member name in segment {raw:?}");
    }
    Ok(Segment {
        name: name.to_string(),
        args,
    })
}

fn parse_arg(raw: &str) -> Value {
    if let Ok(v) = raw.parse::<i64>() {
        return Value::Int(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        return Value::Float(v);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        text => Value::Text(text.to_string()),
    }
}
