// src/rules/template.rs

//! `{placeholder}` templates used for paths, params and shell commands.
//!
//! A template is parsed once into literal and placeholder segments. Rendering
//! asks a lookup closure for the value of each placeholder; list values fan
//! out into the cartesian product of all combinations, which is how a path
//! like `"{dir}/{fixtures}.h5"` expands into one path per configured fixture.

use std::fmt;

use crate::errors::{FixturedagError, Result};

/// Value substituted for a single placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Substitution {
    One(String),
    Many(Vec<String>),
}

impl Substitution {
    fn values(&self) -> &[String] {
        match self {
            Substitution::One(v) => std::slice::from_ref(v),
            Substitution::Many(vs) => vs.as_slice(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source`, treating `{{` and `}}` as literal braces.
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(FixturedagError::template(source, "unclosed '{'"));
                    }
                    let name = name.trim().to_string();
                    if !is_valid_placeholder(&name) {
                        return Err(FixturedagError::template(
                            source,
                            format!("invalid placeholder '{{{name}}}'"),
                        ));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => {
                    return Err(FixturedagError::template(source, "unmatched '}'"));
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in order of appearance (repeats included).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Render every combination of placeholder values.
    ///
    /// Each distinct placeholder name is looked up once, so a list-valued
    /// name used twice in the same template takes the same value in both
    /// positions.
    pub fn expand<F>(&self, mut lookup: F) -> Result<Vec<String>>
    where
        F: FnMut(&str) -> Result<Substitution>,
    {
        let mut names: Vec<&str> = Vec::new();
        let mut values: Vec<Substitution> = Vec::new();
        for name in self.placeholders() {
            if !names.contains(&name) {
                values.push(lookup(name)?);
                names.push(name);
            }
        }

        if values.iter().any(|v| v.values().is_empty()) {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        let mut cursor = vec![0usize; values.len()];
        loop {
            let mut out = String::new();
            for segment in &self.segments {
                match segment {
                    Segment::Literal(text) => out.push_str(text),
                    Segment::Placeholder(name) => {
                        let idx = names
                            .iter()
                            .position(|n| n == name)
                            .unwrap_or_default();
                        out.push_str(&values[idx].values()[cursor[idx]]);
                    }
                }
            }
            results.push(out);

            // Odometer-style advance, last placeholder varies fastest.
            let mut pos = cursor.len();
            loop {
                if pos == 0 {
                    return Ok(results);
                }
                pos -= 1;
                cursor[pos] += 1;
                if cursor[pos] < values[pos].values().len() {
                    break;
                }
                cursor[pos] = 0;
            }
        }
    }

    /// Render a template that must produce exactly one string.
    ///
    /// List values are joined with a single space, the way shell commands
    /// expect `{input}` to look.
    pub fn render<F>(&self, mut lookup: F) -> Result<String>
    where
        F: FnMut(&str) -> Result<Substitution>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => match lookup(name)? {
                    Substitution::One(v) => out.push_str(&v),
                    Substitution::Many(vs) => out.push_str(&vs.join(" ")),
                },
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Escape braces so a value survives being parsed as a template again.
pub fn escape_braces(value: &str) -> String {
    value.replace('{', "{{").replace('}', "}}")
}

fn is_valid_placeholder(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
