//! Strict field extraction from upstream JSON bodies.
//!
//! The video path names the fields it reads as [`FieldPath`]s. Every step must
//! exist: a page list without pages or a play URL without `durl` (e.g. paid
//! content) is an upstream contract violation and becomes
//! [`BilibiliError::MissingField`] naming the missing prefix. The live path is
//! tolerant instead and reads into all-optional response structs (see `live`).

use serde_json::Value;
use std::fmt;

use super::error::BilibiliError;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Key(&'static str),
    Index(usize),
}

/// A named path into a JSON body, e.g. `data.durl[0].url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath {
    api: &'static str,
    steps: &'static [Step],
}

impl FieldPath {
    #[must_use]
    pub const fn new(api: &'static str, steps: &'static [Step]) -> Self {
        Self { api, steps }
    }

    #[must_use]
    pub const fn api(&self) -> &'static str {
        self.api
    }

    /// Descend, failing on the first missing step.
    pub fn strict<'a>(&self, root: &'a Value) -> Result<&'a Value, BilibiliError> {
        let mut current = root;
        for (depth, step) in self.steps.iter().enumerate() {
            current = descend(current, *step).ok_or_else(|| BilibiliError::MissingField {
                api: self.api,
                path: render(&self.steps[..=depth]),
            })?;
        }
        Ok(current)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self.steps))
    }
}

fn descend(value: &Value, step: Step) -> Option<&Value> {
    match step {
        Step::Key(key) => value.as_object()?.get(key),
        Step::Index(idx) => value.as_array()?.get(idx),
    }
}

fn render(steps: &[Step]) -> String {
    let mut out = String::new();
    for step in steps {
        match step {
            Step::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Step::Index(idx) => {
                out.push('[');
                out.push_str(&idx.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Read a JSON scalar as text: strings verbatim, numbers in their decimal form.
#[must_use]
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
