//! Canonical serialization.
//!
//! Output is deterministic and matches the conformance suite's expected
//! form: one node per line, four-space indentation by default, arguments
//! before properties, properties deduplicated rightmost-wins (key order
//! of first appearance), strings bare whenever they re-lex as the same
//! identifier, numbers in decimal, floats by their preserved original
//! text, and a terminating newline.

use std::io::{self, Write};

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use smol_str::SmolStr;

use crate::base::chars::{is_disallowed, is_newline, is_valid_identifier};
use crate::doc::{Document, NodeHandle, Property, Value};

/// Serialization configuration.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// One level of indentation.
    pub indent: SmolStr,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: SmolStr::new_static("    "),
        }
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(mut self, indent: &str) -> Self {
        self.indent = SmolStr::new(indent);
        self
    }
}

/// Serialize `doc` to a writer in canonical form.
pub fn serialize<W: Write>(doc: &Document, mut writer: W, options: &SerializeOptions) -> io::Result<()> {
    for &root in doc.roots() {
        write_node(doc, root, 0, &mut writer, options)?;
    }
    Ok(())
}

/// Serialize `doc` to a byte vector.
pub fn serialize_to_bytes(doc: &Document, options: &SerializeOptions) -> Vec<u8> {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = serialize(doc, &mut out, options);
    out
}

/// Canonical rendering of a single value (the serializer's scalar forms).
pub fn value_to_string(doc: &Document, value: &Value) -> String {
    let mut out = Vec::new();
    let _ = write_value(doc, &mut out, value);
    String::from_utf8(out).unwrap_or_default()
}

fn write_node<W: Write>(
    doc: &Document,
    node: NodeHandle,
    depth: usize,
    out: &mut W,
    options: &SerializeOptions,
) -> io::Result<()> {
    for _ in 0..depth {
        out.write_all(options.indent.as_bytes())?;
    }
    if let Some(ty) = doc.type_annotation(node) {
        out.write_all(b"(")?;
        write_string(out, ty)?;
        out.write_all(b")")?;
    }
    write_string(out, doc.name(node))?;

    for arg in doc.arguments(node) {
        out.write_all(b" ")?;
        if !arg.type_annotation.is_none() {
            out.write_all(b"(")?;
            write_string(out, doc.text(arg.type_annotation))?;
            out.write_all(b")")?;
        }
        write_value(doc, out, &arg.value)?;
    }

    // Rightmost occurrence wins; keys keep their first-appearance order.
    let mut winners: IndexMap<&str, &Property, FxBuildHasher> = IndexMap::default();
    for prop in doc.properties(node) {
        winners.insert(doc.text(prop.name), prop);
    }
    for (name, prop) in &winners {
        out.write_all(b" ")?;
        write_string(out, name)?;
        out.write_all(b"=")?;
        if !prop.type_annotation.is_none() {
            out.write_all(b"(")?;
            write_string(out, doc.text(prop.type_annotation))?;
            out.write_all(b")")?;
        }
        write_value(doc, out, &prop.value)?;
    }

    if doc.first_child(node).is_some() {
        out.write_all(b" {\n")?;
        for child in doc.children(node) {
            write_node(doc, child, depth + 1, out, options)?;
        }
        for _ in 0..depth {
            out.write_all(options.indent.as_bytes())?;
        }
        out.write_all(b"}")?;
    }
    out.write_all(b"\n")
}

fn write_value<W: Write>(doc: &Document, out: &mut W, value: &Value) -> io::Result<()> {
    match value {
        Value::String(r) => write_string(out, doc.text(*r)),
        Value::Integer(i) => write!(out, "{i}"),
        Value::Float { value, original } => {
            let text = doc.text(*original);
            if text.is_empty() {
                write_float_fallback(out, *value)
            } else {
                out.write_all(text.as_bytes())
            }
        }
        Value::Bool(true) => out.write_all(b"#true"),
        Value::Bool(false) => out.write_all(b"#false"),
        Value::Null => out.write_all(b"#null"),
        Value::Inf => out.write_all(b"#inf"),
        Value::NegInf => out.write_all(b"#-inf"),
        Value::Nan => out.write_all(b"#nan"),
    }
}

/// Minimal decimal with at least one fractional digit, for floats that
/// lost their source text.
fn write_float_fallback<W: Write>(out: &mut W, value: f64) -> io::Result<()> {
    if value.is_nan() {
        return out.write_all(b"#nan");
    }
    if value.is_infinite() {
        return out.write_all(if value > 0.0 { b"#inf" } else { b"#-inf" });
    }
    if value == value.trunc() && value.abs() < 1e15 {
        write!(out, "{value:.1}")
    } else {
        write!(out, "{value}")
    }
}

/// Render a string bare when it would re-lex as the same identifier,
/// quoted with minimal escapes otherwise.
fn write_string<W: Write>(out: &mut W, s: &str) -> io::Result<()> {
    if s.is_ascii() && is_valid_identifier(s) {
        return out.write_all(s.as_bytes());
    }
    out.write_all(b"\"")?;
    for c in s.chars() {
        match c {
            '\n' => out.write_all(b"\\n")?,
            '\r' => out.write_all(b"\\r")?,
            '\t' => out.write_all(b"\\t")?,
            '\\' => out.write_all(b"\\\\")?,
            '"' => out.write_all(b"\\\"")?,
            c if is_disallowed(c) || is_newline(c) => {
                write!(out, "\\u{{{:X}}}", c as u32)?;
            }
            c => {
                let mut buf = [0u8; 4];
                out.write_all(c.encode_utf8(&mut buf).as_bytes())?;
            }
        }
    }
    out.write_all(b"\"")
}
