// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config error diagnostics.
//!
//! Figment errors are mapped onto [`ConfigError`] and, when the offending key
//! can be found in a TOML source, given a miette span. Keys are located by a
//! line scan of the table headers, which covers `[server]` style sections,
//! the `[[bots]]` array of tables, and quoted keys in the free-form
//! `[sessions]` table.

#![allow(unused_assignments)] // triggered by the miette derive

use std::ops::Range;
use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a known key needs before it is offered as a fix.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}` in {table}")]
    #[diagnostic(
        code(huddle::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Where the key was found, e.g. `[[bots]]`.
        table: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid value for `{key}`: {detail}")]
    #[diagnostic(code(huddle::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path of the value, e.g. `sessions.t-1`.
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}` in {table}")]
    #[diagnostic(code(huddle::config::missing_key))]
    MissingKey { key: String, table: String },

    /// Semantic check failed after a successful parse.
    #[error("validation error: {message}")]
    #[diagnostic(code(huddle::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(huddle::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Map every error inside a `figment::Error` to a [`ConfigError`].
///
/// `toml_sources` holds `(path, content)` pairs used to attach spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            let source = source_for(&error, toml_sources);
            let content = source.map(|(_, content)| content.as_str());

            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = locate(source, &path, field);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        table: table_label(&path, content),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: field.to_string(),
                    table: table_label(&path, content),
                },
                Kind::InvalidType(actual, expected) => {
                    let (span, src) = match path.split_last() {
                        Some((field, parent)) => locate(source, parent, field),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: dotted(&path),
                        detail: format!("found {actual}"),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Pick the TOML source an error came from. A single supplied source is
/// used for errors whose origin is not a file (inline strings).
fn source_for<'a>(
    error: &figment::Error,
    sources: &'a [(String, String)],
) -> Option<&'a (String, String)> {
    match error.metadata.as_ref().and_then(|m| m.source.as_ref()) {
        Some(figment::Source::File(file)) => sources
            .iter()
            .find(|(p, _)| Path::new(p) == file.as_path())
            .or_else(|| sources.iter().find(|(p, _)| file.ends_with(p))),
        _ if sources.len() == 1 => sources.first(),
        _ => None,
    }
}

fn locate(
    source: Option<&(String, String)>,
    table: &[String],
    field: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some((name, content)) = source else {
        return (None, None);
    };
    match find_key_offset(content, table, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Dotted key path with array indexes left out, e.g. `bots.post_url`.
fn dotted(path: &[String]) -> String {
    names(path).collect::<Vec<_>>().join(".")
}

fn names(path: &[String]) -> impl Iterator<Item = &str> {
    path.iter()
        .map(String::as_str)
        .filter(|segment| segment.parse::<usize>().is_err())
}

/// Human label for the table a path points into: `[server]`, `[[bots]]`,
/// or `the top level`.
fn table_label(path: &[String], content: Option<&str>) -> String {
    let name: Vec<&str> = names(path).collect();
    if name.is_empty() {
        return "the top level".to_string();
    }
    let indexed = path.iter().any(|s| s.parse::<usize>().is_ok());
    let array = indexed
        || content.is_some_and(|c| tables(c).iter().any(|t| t.array && t.name == name));
    if array {
        format!("[[{}]]", name.join("."))
    } else {
        format!("[{}]", name.join("."))
    }
}

/// One table body of a TOML document.
#[derive(Debug)]
struct TableSpan<'a> {
    name: Vec<&'a str>,
    array: bool,
    body: Range<usize>,
}

/// Split a document at its table headers. The first entry is the top-level
/// table, which has an empty name.
fn tables(content: &str) -> Vec<TableSpan<'_>> {
    let mut tables = vec![TableSpan {
        name: Vec::new(),
        array: false,
        body: 0..content.len(),
    }];
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if let Some((header, array)) = parse_header(line) {
            if let Some(previous) = tables.last_mut() {
                previous.body.end = offset;
            }
            tables.push(TableSpan {
                name: header
                    .split('.')
                    .map(|part| part.trim().trim_matches('"'))
                    .collect(),
                array,
                body: offset + line.len()..content.len(),
            });
        }
        offset += line.len();
    }
    tables
}

fn parse_header(line: &str) -> Option<(&str, bool)> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("[[") {
        return rest.split_once("]]").map(|(name, _)| (name, true));
    }
    trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .map(|(name, _)| (name, false))
}

/// The key assigned on a `key = value` line and its column. Quoted keys
/// report the column of the text inside the quotes.
fn line_key(line: &str) -> Option<(&str, usize)> {
    let body = line.trim_start();
    let indent = line.len() - body.len();
    if body.starts_with('#') {
        return None;
    }
    let (raw, _) = body.split_once('=')?;
    let raw = raw.trim_end();
    match raw.strip_prefix('"').and_then(|k| k.strip_suffix('"')) {
        Some(key) => Some((key, indent + 1)),
        None => Some((raw, indent)),
    }
}

/// Byte offset of `field` inside the table named by `path`.
///
/// Numeric path segments select one entry of an array of tables
/// (`["bots", "1"]` is the second `[[bots]]`). Without an index every entry
/// is searched in document order.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let name: Vec<&str> = names(path).collect();
    let index = path.iter().find_map(|s| s.parse::<usize>().ok());

    let mut candidates: Vec<TableSpan<'_>> = tables(content)
        .into_iter()
        .filter(|t| t.name == name)
        .collect();
    if let Some(index) = index {
        if candidates.iter().all(|t| t.array) {
            candidates = candidates.into_iter().skip(index).take(1).collect();
        }
    }

    candidates.into_iter().find_map(|table| {
        let mut offset = table.body.start;
        for line in content[table.body].split_inclusive('\n') {
            match line_key(line) {
                Some((key, column)) if key == field => return Some(offset + column),
                _ => {}
            }
            offset += line.len();
        }
        None
    })
}

/// Closest known key by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print each error to stderr with miette's graphical report handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"log = "top"

[server]
port = 3000

[[bots]]
id = "echo"
post_url = "http://a"

[[bots]]
id = "relay"
# post_ulr = "commented out"
post_ulr = "http://b"

[sessions]
"t-1" = "alice"
plain = "bob"
"#;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    fn at(offset: Option<usize>, len: usize) -> &'static str {
        let offset = offset.expect("key located");
        &DOC[offset..offset + len]
    }

    #[test]
    fn locates_key_in_plain_section() {
        assert_eq!(at(find_key_offset(DOC, &path(&["server"]), "port"), 4), "port");
        assert_eq!(at(find_key_offset(DOC, &[], "log"), 3), "log");
        assert!(find_key_offset(DOC, &path(&["server"]), "id").is_none());
    }

    #[test]
    fn locates_key_in_indexed_array_entry() {
        let first = find_key_offset(DOC, &path(&["bots", "0"]), "id").unwrap();
        let second = find_key_offset(DOC, &path(&["bots", "1"]), "id").unwrap();
        assert!(second > first);
        assert_eq!(&DOC[second..second + 12], r#"id = "relay""#);
        assert!(find_key_offset(DOC, &path(&["bots", "0"]), "post_ulr").is_none());
        assert!(find_key_offset(DOC, &path(&["bots", "5"]), "id").is_none());
    }

    #[test]
    fn unindexed_array_search_skips_comments() {
        let offset = find_key_offset(DOC, &path(&["bots"]), "post_ulr").unwrap();
        assert_eq!(&DOC[offset..offset + 21], r#"post_ulr = "http://b""#);
    }

    #[test]
    fn locates_quoted_and_bare_keys_in_free_form_table() {
        assert_eq!(at(find_key_offset(DOC, &path(&["sessions"]), "t-1"), 3), "t-1");
        assert_eq!(at(find_key_offset(DOC, &path(&["sessions"]), "plain"), 5), "plain");
    }

    #[test]
    fn table_labels_distinguish_arrays() {
        assert_eq!(table_label(&path(&["bots"]), Some(DOC)), "[[bots]]");
        assert_eq!(table_label(&path(&["bots", "1"]), None), "[[bots]]");
        assert_eq!(table_label(&path(&["server"]), Some(DOC)), "[server]");
        assert_eq!(table_label(&[], Some(DOC)), "the top level");
    }

    #[test]
    fn suggestions_need_a_close_match() {
        let valid = ["id", "post_url", "verification_token", "events", "active"];
        assert_eq!(suggest_key("post_ulr", &valid), Some("post_url".to_string()));
        assert_eq!(suggest_key("qqqq", &valid), None);
    }
}
