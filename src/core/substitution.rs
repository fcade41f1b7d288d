// src/core/substitution.rs

//! `\$NAME` substitution.

use crate::models::VariableBinding;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;

lazy_static! {
    // `\$NAME`: a literal backslash, a dollar sign, then letters, digits or underscores.
    static ref VARIABLE_RE: Regex =
        Regex::new(r"\\\$([A-Za-z0-9_]+)").expect("variable pattern is valid");
}

/// Builds the name -> value table for a set of bindings. A later binding of the same
/// name replaces an earlier one.
pub fn binding_table(bindings: &[VariableBinding]) -> HashMap<String, String> {
    bindings
        .iter()
        .map(|b| (b.name.clone(), b.value.clone()))
        .collect()
}

/// Replaces every `\$NAME` token whose name is bound. Unknown tokens are left untouched,
/// and substituted text is not expanded again.
pub fn substitute(line: &str, bindings: &HashMap<String, String>) -> String {
    VARIABLE_RE
        .replace_all(line, |caps: &Captures<'_>| {
            let token = caps.get(0).map_or("", |m| m.as_str());
            caps.get(1)
                .and_then(|name| bindings.get(name.as_str()))
                .map_or_else(|| token.to_string(), String::clone)
        })
        .into_owned()
}

/// Substitutes each line of a script independently.
pub fn substitute_script(script: &[String], bindings: &HashMap<String, String>) -> Vec<String> {
    script.iter().map(|line| substitute(line, bindings)).collect()
}
