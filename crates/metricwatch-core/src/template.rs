//! Text templates with `<key>` placeholders
//!
//! Three kinds of placeholder are understood:
//!
//! - `<key>`: replaced by a scalar value
//! - `<main:sub>`: replaced by whatever a supplier returns for `sub`, or `null`
//! - `<key>...</key>`: the whole span is replaced by whatever a supplier
//!   returns for the enclosed raw text, which lets the supplier repeat the
//!   fragment once per item
//!
//! Inserted values are literal text, nothing is escaped.

use std::collections::BTreeMap;
use std::fmt;

use regex::{Captures, Regex};
use tracing::warn;

/// Text printed for namespaced keys without a value
pub const NULL_TEXT: &str = "null";

/// A template being rendered
///
/// Each substitution consumes the template and returns the rewritten one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
}

impl Template {
    /// Create a template from its source text
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Replace every `<key>` by `value`
    pub fn replace(self, key: &str, value: impl fmt::Display) -> Self {
        let marker = format!("<{key}>");
        let value = strip_trailing_zeros(&value.to_string());

        Self {
            text: self.text.replace(&marker, &value),
        }
    }

    /// Replace every `<main_key:sub>` by what `supplier` returns for `sub`
    ///
    /// The template is scanned once, text inserted by the supplier is not
    /// scanned again.
    pub fn replace_keys<F, V>(self, main_key: &str, supplier: F) -> Self
    where
        F: Fn(&str) -> Option<V>,
        V: fmt::Display,
    {
        let pattern = format!("<{}:([^>]+)>", regex::escape(main_key));
        let regex = match Regex::new(&pattern) {
            Ok(regex) => regex,
            Err(e) => {
                warn!(main_key, error = %e, "Template key cannot be matched");
                return self;
            }
        };

        let text = regex
            .replace_all(&self.text, |caps: &Captures<'_>| match supplier(&caps[1]) {
                Some(value) => strip_trailing_zeros(&value.to_string()),
                None => NULL_TEXT.to_string(),
            })
            .into_owned();

        Self { text }
    }

    /// Replace every `<name>` and `<name:sub>` by what `supplier` returns
    ///
    /// The template is scanned once, so inserted text is never rewritten by
    /// this call. Placeholders the supplier returns `None` for are left as
    /// they are.
    pub fn replace_placeholders<F>(self, supplier: F) -> Self
    where
        F: FnMut(&str, Option<&str>) -> Option<String>,
    {
        self.replace_all(&[], supplier, |_, inner| inner.to_string())
    }

    /// Replace `<key>...</key>` spans of `containers` and every other
    /// `<name>` or `<name:sub>` placeholder in one scan
    ///
    /// `container` receives the container key and the enclosed raw text.
    /// `placeholder` works as in [`Template::replace_placeholders`]. Inserted
    /// text is never scanned again. An unclosed container tag is handed to
    /// `placeholder` like any other `<name>`.
    pub fn replace_all<F, C>(self, containers: &[&str], mut placeholder: F, mut container: C) -> Self
    where
        F: FnMut(&str, Option<&str>) -> Option<String>,
        C: FnMut(&str, &str) -> String,
    {
        let mut alternatives: Vec<String> = containers
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let key = regex::escape(key);
                format!("<{key}>(?s:(?P<c{i}>.*?))</{key}>")
            })
            .collect();
        alternatives.push(r"<(?P<name>[A-Za-z_][A-Za-z0-9_]*)(?::(?P<sub>[^<>]+))?>".to_string());

        let regex = match Regex::new(&alternatives.join("|")) {
            Ok(regex) => regex,
            Err(e) => {
                warn!(error = %e, "Template placeholders cannot be matched");
                return self;
            }
        };

        let text = regex
            .replace_all(&self.text, |caps: &Captures<'_>| {
                let span = containers
                    .iter()
                    .enumerate()
                    .find_map(|(i, key)| caps.name(&format!("c{i}")).map(|inner| (*key, inner)));
                if let Some((key, inner)) = span {
                    return container(key, inner.as_str());
                }

                let sub = caps.name("sub").map(|m| m.as_str());
                match caps.name("name").and_then(|name| placeholder(name.as_str(), sub)) {
                    Some(value) => strip_trailing_zeros(&value),
                    None => caps[0].to_string(),
                }
            })
            .into_owned();

        Self { text }
    }

    /// Replace every `<main_key:sub>` by the entry `sub` of `entries`
    pub fn replace_keys_from_map(self, main_key: &str, entries: &BTreeMap<String, String>) -> Self {
        self.replace_keys(main_key, |sub| entries.get(sub))
    }

    /// Replace each `<key>...</key>` span by what `supplier` returns for the enclosed text
    ///
    /// Scanning resumes after the inserted text. Nested spans of the same key
    /// are not supported. An opening tag without closing tag stops the scan
    /// and leaves the rest of the template untouched.
    pub fn replace_container<F>(self, key: &str, mut supplier: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        let opening = format!("<{key}>");
        let closing = format!("</{key}>");
        let mut text = self.text;
        let mut from = 0;

        while let Some(relative_start) = text[from..].find(&opening) {
            let start = from + relative_start;
            let inner_start = start + opening.len();

            let Some(relative_end) = text[inner_start..].find(&closing) else {
                warn!(key, position = start, "Template container is not closed");
                break;
            };
            let inner_end = inner_start + relative_end;

            let replacement = supplier(&text[inner_start..inner_end]);
            text.replace_range(start..inner_end + closing.len(), &replacement);

            from = start + replacement.len();
        }

        Self { text }
    }

    /// Rendered text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consume the template, returning the rendered text
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Template {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Drop trailing zero decimals of numbers: `12.50` → `12.5`, `12.00` → `12`
///
/// Anything that is not a plain decimal number is returned unchanged.
pub fn strip_trailing_zeros(value: &str) -> String {
    let is_plain_decimal = value.contains('.')
        && !value.contains(['e', 'E'])
        && value.parse::<f64>().is_ok();

    if !is_plain_decimal {
        return value.to_string();
    }

    let trimmed = value.trim_end_matches('0');
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);

    match trimmed {
        "" | "-" | "+" => "0".to_string(),
        other => other.to_string(),
    }
}
