//! Path template compilation and matching.
//!
//! # Responsibilities
//! - Compile `:name` segments into named captures
//! - Match whole request paths (anchored at both ends)
//!
//! # Design Decisions
//! - Literal template text is escaped, so `.` or `+` match themselves
//! - A named segment matches one or more non-`/` characters
//! - Captured values are returned as they appear in the path (no decoding)

use std::collections::HashMap;

use regex::Regex;

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    regex: Regex,
    names: Vec<String>,
}

impl PathPattern {
    /// Compile a template such as `/users/:id/posts/:post`.
    pub fn compile(template: &str) -> Result<Self, regex::Error> {
        let mut pattern = String::with_capacity(template.len() + 16);
        let mut names = Vec::new();
        pattern.push('^');

        let mut rest = template;
        while let Some(colon) = rest.find(':') {
            let (literal, after) = rest.split_at(colon);
            pattern.push_str(&regex::escape(literal));

            let name_len = after[1..]
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len() - 1);
            if name_len == 0 {
                // A lone ':' is literal text.
                pattern.push_str(&regex::escape(":"));
                rest = &after[1..];
                continue;
            }

            let name = &after[1..1 + name_len];
            pattern.push_str(&format!("(?P<{}>[^/]+)", name));
            names.push(name.to_string());
            rest = &after[1 + name_len..];
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push('$');

        Ok(Self {
            template: template.to_string(),
            regex: Regex::new(&pattern)?,
            names,
        })
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Names of the captured segments, in template order.
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    /// Match a full path, returning the named segments on success.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}
