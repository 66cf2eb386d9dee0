//! Bounded rendering of values for failure records and diffs

use super::Value;
use std::fmt::Write;

/// Nesting levels rendered before collapsing to `[…]`
pub const RENDER_DEPTH_LIMIT: usize = 8;

const INDENT: &str = "  ";

pub(super) fn render(value: &Value) -> String {
    let mut out = String::new();
    write_block(&mut out, value, 0);
    out
}

/// Single-line rendering, used for log lines and short messages
pub fn render_inline(value: &Value) -> String {
    let mut out = String::new();
    write_inline(&mut out, value, 0);
    out
}

fn write_block(out: &mut String, value: &Value, depth: usize) {
    if depth >= RENDER_DEPTH_LIMIT && is_compound(value) {
        out.push_str("[…]");
        return;
    }
    match value {
        Value::Array(items) if !items.is_empty() => {
            out.push_str("[\n");
            for item in items.iter() {
                push_indent(out, depth + 1);
                write_block(out, item, depth + 1);
                out.push_str(",\n");
            }
            push_indent(out, depth);
            out.push(']');
        }
        Value::Object(map) if !map.is_empty() => {
            out.push_str("{\n");
            for (key, item) in map.iter() {
                push_indent(out, depth + 1);
                let _ = write!(out, "{}: ", key);
                write_block(out, item, depth + 1);
                out.push_str(",\n");
            }
            push_indent(out, depth);
            out.push('}');
        }
        Value::Error(err) => {
            let _ = write!(out, "{} {{\n", err.constructor());
            if err.name != err.constructor() {
                push_indent(out, depth + 1);
                let _ = write!(out, "name: {:?},\n", err.name);
            }
            push_indent(out, depth + 1);
            let _ = write!(out, "message: {:?},\n", err.message);
            push_indent(out, depth);
            out.push('}');
        }
        scalar => write_inline(out, scalar, depth),
    }
}

fn write_inline(out: &mut String, value: &Value, depth: usize) {
    if depth >= RENDER_DEPTH_LIMIT && is_compound(value) {
        out.push_str("[…]");
        return;
    }
    match value {
        Value::Undefined => out.push_str("undefined"),
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Number(n) => out.push_str(&format_number(*n)),
        Value::String(s) => {
            let _ = write!(out, "{s:?}");
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_inline(out, item, depth + 1);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                out.push_str(if i > 0 { ", " } else { " " });
                let _ = write!(out, "{key}: ");
                write_inline(out, item, depth + 1);
            }
            out.push_str(if map.is_empty() { "}" } else { " }" });
        }
        Value::Error(err) => {
            let _ = write!(out, "{}({:?})", err.constructor(), err.message);
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 && n.is_sign_negative() {
        "-0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn is_compound(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_) | Value::Error(_))
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}
