//! Reactivity document emitter and parser.
//!
//! The document is a single `data` element with the run parameters as
//! attributes and one `transcript` child carrying the sequence and the
//! per-base value vectors, wrapped at 60 items per line. The format is
//! fixed and shallow, so both directions are handled with plain string
//! scanning rather than a generic XML stack.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

pub const TOOL_NORM: &str = "rf-norm";
pub const TOOL_SILICO: &str = "rf-silico";
pub const TOOL_MODCALL: &str = "rf-modcall";

const WRAP: usize = 60;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    Malformed(String),
    #[error("{0}")]
    BadValues(String),
}

/// Which value vectors a document carries, keyed by the producing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// rf-norm: `reactivity`
    Reactivity,
    /// rf-silico: `probability` + `shannon`
    ProbShannon,
    /// rf-modcall: `score` + `ratio`
    ScoreRatio,
}

impl ValueKind {
    pub fn for_tool(tool: &str) -> Option<Self> {
        match tool {
            TOOL_NORM => Some(Self::Reactivity),
            TOOL_SILICO => Some(Self::ProbShannon),
            TOOL_MODCALL => Some(Self::ScoreRatio),
            _ => None,
        }
    }

    pub fn element_names(self) -> (&'static str, Option<&'static str>) {
        match self {
            Self::Reactivity => ("reactivity", None),
            Self::ProbShannon => ("probability", Some("shannon")),
            Self::ScoreRatio => ("score", Some("ratio")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileHeader {
    pub combined: bool,
    pub tool: String,
    /// Value of the `reactive` (or `keep`, for modcall) attribute.
    pub reactive: String,
    pub keep_attr: bool,
    pub scoring: Option<String>,
    pub norm: Option<String>,
    pub win: Option<String>,
    pub offset: Option<String>,
    pub remap: Option<String>,
    pub max: Option<String>,
    pub pseudo: Option<String>,
    pub maxumut: Option<String>,
    pub algorithm: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub header: ProfileHeader,
    pub kind: ValueKind,
    pub id: String,
    pub sequence: String,
    pub values1: Vec<f64>,
    pub values2: Option<Vec<f64>>,
    pub errors1: Option<Vec<f64>>,
    pub errors2: Option<Vec<f64>>,
}

pub fn write_profile(path: &Path, profile: &Profile, decimals: usize) -> anyhow::Result<()> {
    use anyhow::Context;

    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;

    let h = &profile.header;
    write!(w, "<data combined=\"{}\"", bool_attr(h.combined))?;
    write!(w, " tool=\"{}\"", escape(&h.tool))?;
    let reactive_attr = if h.keep_attr { "keep" } else { "reactive" };
    write!(w, " {}=\"{}\"", reactive_attr, escape(&h.reactive))?;
    for (name, value) in [
        ("scoring", &h.scoring),
        ("norm", &h.norm),
        ("win", &h.win),
        ("offset", &h.offset),
        ("remap", &h.remap),
        ("max", &h.max),
        ("pseudo", &h.pseudo),
        ("maxumut", &h.maxumut),
        ("algorithm", &h.algorithm),
    ] {
        if let Some(value) = value {
            write!(w, " {}=\"{}\"", name, escape(value))?;
        }
    }
    writeln!(w, ">")?;

    writeln!(
        w,
        "\t<transcript id=\"{}\" length=\"{}\">",
        escape(&profile.id),
        profile.sequence.len()
    )?;
    writeln!(w, "\t\t<sequence>")?;
    let seq = &profile.sequence;
    let mut start = 0;
    while start < seq.len() {
        let end = (start + WRAP).min(seq.len());
        writeln!(w, "\t\t\t{}", &seq[start..end])?;
        start = end;
    }
    writeln!(w, "\t\t</sequence>")?;

    let (name1, name2) = profile.kind.element_names();
    write_values(&mut w, name1, &profile.values1, decimals)?;
    if let (Some(name2), Some(values2)) = (name2, &profile.values2) {
        write_values(&mut w, name2, values2, decimals)?;
    }
    if let Some(errors1) = &profile.errors1 {
        write_values(&mut w, &format!("{}-error", name1), errors1, decimals)?;
    }
    if let (Some(name2), Some(errors2)) = (name2, &profile.errors2) {
        write_values(&mut w, &format!("{}-error", name2), errors2, decimals)?;
    }

    writeln!(w, "\t</transcript>")?;
    writeln!(w, "</data>")?;
    w.flush()?;
    Ok(())
}

fn write_values<W: Write>(w: &mut W, name: &str, values: &[f64], decimals: usize) -> std::io::Result<()> {
    writeln!(w, "\t\t<{}>", name)?;
    let chunks = values.len().div_ceil(WRAP).max(1);
    for (i, chunk) in values.chunks(WRAP).enumerate() {
        let line = chunk
            .iter()
            .map(|&v| format_value(v, decimals))
            .collect::<Vec<_>>()
            .join(",");
        if i + 1 < chunks {
            writeln!(w, "\t\t\t{},", line)?;
        } else {
            writeln!(w, "\t\t\t{}", line)?;
        }
    }
    writeln!(w, "\t\t</{}>", name)?;
    Ok(())
}

pub fn format_value(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.*}", decimals, value)
    }
}

pub fn bool_attr(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

pub fn read_profile(path: &Path) -> Result<Profile, XmlError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| XmlError::Io(format!("failed to read {}: {}", path.display(), e)))?;
    parse_profile(&content).map_err(|e| prefix_path(e, path))
}

/// Pull just the transcript identifier out of a document; used when
/// enumerating combiner inputs.
pub fn read_transcript_id(path: &Path) -> Result<String, XmlError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| XmlError::Io(format!("failed to read {}: {}", path.display(), e)))?;
    let attrs = tag_attributes(&content, "transcript").map_err(|e| prefix_path(e, path))?;
    attrs
        .get("id")
        .cloned()
        .ok_or_else(|| XmlError::Malformed(format!("{}: transcript lacks an id", path.display())))
}

pub fn parse_profile(content: &str) -> Result<Profile, XmlError> {
    let attrs = tag_attributes(content, "data")?;
    let tool = attrs
        .get("tool")
        .cloned()
        .ok_or_else(|| XmlError::Malformed("data element lacks a tool attribute".to_string()))?;
    let kind = ValueKind::for_tool(&tool)
        .ok_or_else(|| XmlError::Malformed(format!("unknown tool {:?}", tool)))?;
    let (reactive, keep_attr) = match (attrs.get("reactive"), attrs.get("keep")) {
        (Some(r), _) => (r.clone(), false),
        (None, Some(k)) => (k.clone(), true),
        (None, None) => {
            return Err(XmlError::Malformed(
                "data element lacks a reactive/keep attribute".to_string(),
            ));
        }
    };

    let t_attrs = tag_attributes(content, "transcript")?;
    let id = t_attrs
        .get("id")
        .cloned()
        .ok_or_else(|| XmlError::Malformed("transcript lacks an id attribute".to_string()))?;
    let length: usize = t_attrs
        .get("length")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| XmlError::Malformed("transcript lacks a numeric length".to_string()))?;

    let sequence: String = element_text(content, "sequence")
        .ok_or_else(|| XmlError::Malformed("missing <sequence> element".to_string()))?
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if sequence.len() != length {
        return Err(XmlError::Malformed(format!(
            "sequence length {} does not match declared length {}",
            sequence.len(),
            length
        )));
    }
    if let Some(bad) = sequence.chars().find(|c| !"ACGTUN".contains(*c)) {
        return Err(XmlError::Malformed(format!(
            "unexpected sequence character {:?}",
            bad
        )));
    }

    let (name1, name2) = kind.element_names();
    let values1 = parse_values(content, name1, length)?;
    let values2 = match name2 {
        Some(name2) => Some(parse_values(content, name2, length)?),
        None => None,
    };
    let errors1 = parse_optional_values(content, &format!("{}-error", name1), length)?;
    let errors2 = match name2 {
        Some(name2) => parse_optional_values(content, &format!("{}-error", name2), length)?,
        None => None,
    };

    let header = ProfileHeader {
        combined: attrs.get("combined").map(|v| v == "TRUE").unwrap_or(false),
        tool,
        reactive,
        keep_attr,
        scoring: attrs.get("scoring").cloned(),
        norm: attrs.get("norm").cloned(),
        win: attrs.get("win").cloned(),
        offset: attrs.get("offset").cloned(),
        remap: attrs.get("remap").cloned(),
        max: attrs.get("max").cloned(),
        pseudo: attrs.get("pseudo").cloned(),
        maxumut: attrs.get("maxumut").cloned(),
        algorithm: attrs.get("algorithm").cloned(),
    };

    Ok(Profile {
        header,
        kind,
        id,
        sequence,
        values1,
        values2,
        errors1,
        errors2,
    })
}

fn parse_values(content: &str, name: &str, expected: usize) -> Result<Vec<f64>, XmlError> {
    let text = element_text(content, name)
        .ok_or_else(|| XmlError::Malformed(format!("missing <{}> element", name)))?;
    let mut out = Vec::with_capacity(expected);
    for token in text.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token == "NaN" {
            out.push(f64::NAN);
        } else {
            out.push(token.parse::<f64>().map_err(|_| {
                XmlError::BadValues(format!("invalid value {:?} in <{}>", token, name))
            })?);
        }
    }
    if out.len() != expected {
        return Err(XmlError::BadValues(format!(
            "<{}> carries {} values for a {}-base transcript",
            name,
            out.len(),
            expected
        )));
    }
    Ok(out)
}

fn parse_optional_values(
    content: &str,
    name: &str,
    expected: usize,
) -> Result<Option<Vec<f64>>, XmlError> {
    if element_text(content, name).is_none() {
        return Ok(None);
    }
    parse_values(content, name, expected).map(Some)
}

fn element_text<'a>(content: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("<{}>", name);
    let close = format!("</{}>", name);
    let start = content.find(&open)? + open.len();
    let end = content[start..].find(&close)? + start;
    Some(&content[start..end])
}

fn tag_attributes(content: &str, tag: &str) -> Result<HashMap<String, String>, XmlError> {
    let open = format!("<{} ", tag);
    let start = content
        .find(&open)
        .ok_or_else(|| XmlError::Malformed(format!("missing <{}> element", tag)))?
        + open.len();
    let rest = &content[start..];
    let end = rest
        .find('>')
        .ok_or_else(|| XmlError::Malformed(format!("unterminated <{}> element", tag)))?;

    let mut attrs = HashMap::new();
    let mut s = rest[..end].trim();
    while !s.is_empty() {
        let eq = s
            .find('=')
            .ok_or_else(|| XmlError::Malformed(format!("malformed attribute in <{}>", tag)))?;
        let key = s[..eq].trim().to_string();
        let after = s[eq + 1..].trim_start();
        let quoted = after.strip_prefix('"').ok_or_else(|| {
            XmlError::Malformed(format!("unquoted attribute value in <{}>", tag))
        })?;
        let endq = quoted
            .find('"')
            .ok_or_else(|| XmlError::Malformed(format!("unterminated attribute in <{}>", tag)))?;
        attrs.insert(key, unescape(&quoted[..endq]));
        s = quoted[endq + 1..].trim_start();
    }
    Ok(attrs)
}

fn prefix_path(err: XmlError, path: &Path) -> XmlError {
    let prefix = |msg: String| format!("{}: {}", path.display(), msg);
    match err {
        XmlError::Io(msg) => XmlError::Io(msg),
        XmlError::Malformed(msg) => XmlError::Malformed(prefix(msg)),
        XmlError::BadValues(msg) => XmlError::BadValues(prefix(msg)),
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}
