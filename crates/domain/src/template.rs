//! Placeholder substitution for `{{name}}` templates.
//!
//! The same engine builds request values (paths, header values) and expected
//! values (header literals, body markers), so both sides of a test case are
//! formatted from one source.
//!
//! Distinct placeholder names are numbered in order of first occurrence and
//! bound positionally to the arguments. A name used several times consumes a
//! single argument:
//!
//! ```
//! use conformance_domain::tmpl;
//!
//! let host = tmpl!("{{cid}}.ipfs.{{host}}", "bafy", "example.com").unwrap();
//! assert_eq!(host, "bafy.ipfs.example.com");
//!
//! let range = tmpl!("bytes {{start}}-{{end}}/{{length}}", 0, 99, 1000).unwrap();
//! assert_eq!(range, "bytes 0-99/1000");
//! ```

use std::fmt;
use std::ops::Range;

use crate::error::{DomainError, DomainResult};

/// Formats a template with positional arguments.
///
/// Expands to [`fmt`]; every argument must implement `Display`. Wrap raw
/// bytes in [`Raw`] to render them verbatim.
#[macro_export]
macro_rules! tmpl {
    ($template:expr $(, $arg:expr)* $(,)?) => {
        $crate::template::fmt($template, &[$(&$arg as &dyn ::std::fmt::Display),*])
    };
}

/// A `{{name}}` marker found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// The trimmed name between the braces.
    pub name: String,
    /// Byte range of the whole marker, braces included.
    pub span: Range<usize>,
}

/// Renders a byte buffer verbatim as text (lossy for invalid UTF-8).
#[derive(Debug, Clone, Copy)]
pub struct Raw<'a>(pub &'a [u8]);

impl fmt::Display for Raw<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.0))
    }
}

/// Scans a template for `{{name}}` markers, left to right.
///
/// Empty or whitespace-only markers are left as literal text, and scanning
/// stops at an unclosed `{{`.
#[must_use]
pub fn parse_placeholders(input: &str) -> Vec<Placeholder> {
    let mut placeholders = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if ch != '{' || !matches!(chars.peek(), Some((_, '{'))) {
            continue;
        }
        chars.next();

        let mut name = String::new();
        let mut closed = false;
        while let Some((_, ch)) = chars.next() {
            if ch == '}' {
                if let Some(&(end_idx, '}')) = chars.peek() {
                    chars.next();
                    let trimmed = name.trim();
                    if !trimmed.is_empty() {
                        placeholders.push(Placeholder {
                            name: trimmed.to_string(),
                            span: i..end_idx + 1,
                        });
                    }
                    closed = true;
                    break;
                }
            }
            name.push(ch);
        }

        if !closed {
            break;
        }
    }

    placeholders
}

/// Returns the distinct placeholder names in order of first occurrence.
#[must_use]
pub fn placeholder_names(input: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for placeholder in parse_placeholders(input) {
        if !names.contains(&placeholder.name) {
            names.push(placeholder.name);
        }
    }
    names
}

/// Substitutes the template's placeholders with `args`.
///
/// # Errors
///
/// Returns [`DomainError::TemplateArity`] when the number of distinct
/// placeholder names differs from `args.len()`.
pub fn fmt(template: &str, args: &[&dyn fmt::Display]) -> DomainResult<String> {
    let placeholders = parse_placeholders(template);
    let names = placeholder_names(template);

    if names.len() != args.len() {
        return Err(DomainError::TemplateArity {
            template: template.to_string(),
            expected: names.len(),
            got: args.len(),
        });
    }

    let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
    let mut out = String::with_capacity(template.len());
    let mut last_end = 0;

    for placeholder in &placeholders {
        out.push_str(&template[last_end..placeholder.span.start]);
        if let Some(index) = names.iter().position(|n| *n == placeholder.name) {
            out.push_str(&rendered[index]);
        }
        last_end = placeholder.span.end;
    }
    out.push_str(&template[last_end..]);

    Ok(out)
}
