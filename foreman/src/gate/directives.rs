//! Custom validation directives
//!
//! Task notes may embed extra gate commands as `VALIDATE: 'cmd'` or
//! `VALIDATE: "cmd"`. They run as custom gates after the standard set.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"VALIDATE:\s*(?:'([^']*)'|"([^"]*)")"#).unwrap());

/// One extra validation command extracted from task notes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationDirective {
    pub command: String,
    pub package: String,
}

/// Extract every `VALIDATE:` directive from a notes field, in source
/// order.
pub fn parse_custom_validations(notes: &str, package: &str) -> Vec<ValidationDirective> {
    DIRECTIVE
        .captures_iter(notes)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|command| ValidationDirective {
            command: command.as_str().to_string(),
            package: package.to_string(),
        })
        .collect()
}
