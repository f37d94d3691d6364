//! Cache-path templates.
//!
//! A step's cache path is configured as a template with `{name}`
//! placeholders and resolved against the invocation variables at request
//! time, e.g. `reports/{slug}/page-{page}.json`. Template syntax is
//! deliberately minimal; anything fancier belongs in the caller.

use crate::vars::Vars;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Template resolution errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A placeholder named a variable the invocation does not define.
    #[error("template references undefined variable '{0}'")]
    UndefinedVar(String),

    /// A placeholder named a variable that is not a string, number, or bool.
    #[error("variable '{0}' cannot be used in a path")]
    UnsupportedValue(String),

    /// A `{` without a matching `}`.
    #[error("unclosed placeholder in template '{0}'")]
    Unclosed(String),
}

/// Resolve `template` against `vars`, producing a concrete path.
pub fn resolve(template: &str, vars: &Vars) -> Result<PathBuf, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| TemplateError::Unclosed(template.to_string()))?;
        let name = &after[..close];

        let value = vars
            .get(name)
            .ok_or_else(|| TemplateError::UndefinedVar(name.to_string()))?;
        match value {
            Value::String(s) => out.push_str(s),
            Value::Number(n) => out.push_str(&n.to_string()),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            _ => return Err(TemplateError::UnsupportedValue(name.to_string())),
        }

        rest = &after[close + 1..];
    }
    out.push_str(rest);

    Ok(PathBuf::from(out))
}
