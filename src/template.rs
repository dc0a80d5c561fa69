//! Placeholder interpolation for connection profiles
//!
//! Profiles may reference `{{ env.NAME }}` so secrets stay out of the file,
//! and `{{ vars.path }}` for values supplied by the caller.

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// `{{ name.path }}`
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}")
        .expect("template pattern is valid")
});

/// Values available to placeholders
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Environment variables (`env.NAME`)
    pub env: HashMap<String, String>,
    /// Caller supplied values (`vars.a.b`, or `a.b`)
    pub vars: Value,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context over the process environment
    pub fn from_env() -> Self {
        Self {
            env: std::env::vars().collect(),
            vars: Value::Null,
        }
    }

    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn set_vars(&mut self, vars: Value) -> &mut Self {
        self.vars = vars;
        self
    }

    /// Look up a dotted path
    pub fn get(&self, path: &str) -> Option<Value> {
        let parts: Vec<&str> = path.split('.').collect();
        match parts.as_slice() {
            ["env", name] => self.env.get(*name).cloned().map(Value::String),
            ["vars", rest @ ..] => get_nested_value(&self.vars, rest).cloned(),
            _ => get_nested_value(&self.vars, &parts).cloned(),
        }
    }
}

fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, part| match current {
        Value::Object(map) => map.get(*part),
        _ => None,
    })
}

/// Render every placeholder; undefined names are an error listing all of them
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut missing = Vec::new();
    let rendered = TEMPLATE_REGEX.replace_all(template, |cap: &Captures| {
        let name = &cap[1];
        match ctx.get(name) {
            Some(value) => value_to_string(&value),
            None => {
                missing.push(name.to_string());
                cap[0].to_string()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Render known placeholders and leave the others untouched
pub fn render_optional(template: &str, ctx: &TemplateContext) -> String {
    TEMPLATE_REGEX
        .replace_all(template, |cap: &Captures| match ctx.get(&cap[1]) {
            Some(value) => value_to_string(&value),
            None => cap[0].to_string(),
        })
        .into_owned()
}

pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Names referenced by a template, in order of appearance
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}
