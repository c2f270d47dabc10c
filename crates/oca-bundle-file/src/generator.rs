//! OCAfile text generation.
//!
//! Output is canonical: keywords upper-case, two-space indentation, every
//! value quoted, one blank line between commands. Parsing the output yields
//! the same commands.

use std::fmt::Write as _;

use crate::ast::{CommandKind, OcaFile, Property, PropertyValue};

const INDENT: &str = "  ";

/// Render an OCAfile.
pub fn generate(file: &OcaFile) -> String {
    let mut out = String::new();
    if let Some(name) = &file.name {
        let _ = writeln!(out, "--name={}", header_value(name));
    }

    for (i, command) in file.commands.iter().enumerate() {
        if i > 0 || file.name.is_some() {
            out.push('\n');
        }
        match &command.kind {
            CommandKind::AddClassification(value) => {
                let _ = writeln!(out, "ADD CLASSIFICATION {}", quote(value));
            }
            CommandKind::AddAttribute(attrs) => {
                out.push_str("ADD ATTRIBUTE");
                for (j, (name, ty)) in attrs.iter().enumerate() {
                    if j > 0 {
                        out.push_str(" \\\n   ");
                    }
                    let _ = write!(out, " {name}={ty}");
                }
                out.push('\n');
            }
            CommandKind::AddOverlay { name, properties } => {
                let _ = writeln!(out, "ADD OVERLAY {name}");
                write_block(&mut out, properties, 1);
            }
        }
    }
    out
}

fn write_block(out: &mut String, properties: &[Property], depth: usize) {
    for property in properties {
        out.push_str(&INDENT.repeat(depth));
        out.push_str(&key(&property.key));
        match &property.value {
            PropertyValue::Empty => {}
            PropertyValue::Text(text) => {
                out.push('=');
                out.push_str(&quote(text));
            }
            PropertyValue::Array(items) => {
                let items: Vec<String> = items.iter().map(|i| quote(i)).collect();
                let _ = write!(out, "=[{}]", items.join(", "));
            }
            PropertyValue::Block(children) => {
                out.push('\n');
                write_block(out, children, depth + 1);
                continue;
            }
        }
        out.push('\n');
    }
}

/// Keys are written bare unless they would not read back as the same key.
fn key(key: &str) -> String {
    let plain = !key.is_empty()
        && !key.starts_with('#')
        && !key.starts_with('"')
        && !key.chars().any(|c| c.is_whitespace() || c == '=');
    if plain {
        key.to_string()
    } else {
        quote(key)
    }
}

/// The header value is written bare when the parser would read the same
/// text back from the trimmed rest of the line.
fn header_value(name: &str) -> String {
    let plain = !name.is_empty()
        && name.trim() == name
        && !name.starts_with('"')
        && !name.ends_with('\\')
        && !name.chars().any(char::is_control);
    if plain {
        name.to_string()
    } else {
        quote(name)
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
