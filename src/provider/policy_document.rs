//! # Policy Documents
//!
//! Rendering and parsing of Vault ACL policy text.
//!
//! Only the part of the HCL policy language the provider manages is modelled:
//! a sequence of blocks of the form
//!
//! ```text
//! path "secret/data/app/*" { capabilities = ["read","list"] }
//! ```
//!
//! `#`, `//` and `/* */` comments are skipped, and keys other than
//! `capabilities` inside a block are ignored on parse.

use regex::Regex;
use std::collections::BTreeSet;
use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::LazyLock;
use thiserror::Error;

static PATH_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\Apath\s+"((?:[^"\\]|\\.)*)"\s*\{"#)
        .expect("PATH_HEADER regex is valid - this should never happen")
});

static CAPABILITIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(?:\A|[\s;])capabilities\s*=\s*\[((?:\s*"(?:[^"\\]|\\.)*"\s*,?)*\s*)\]"#)
        .expect("CAPABILITIES regex is valid - this should never happen")
});

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"((?:[^"\\]|\\.)*)""#)
        .expect("QUOTED regex is valid - this should never happen")
});

/// One `path` block of an ACL policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    pub path: String,
    pub capabilities: Vec<String>,
}

impl PolicyRule {
    pub fn new<I, S>(path: impl Into<String>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }

    /// Identity of the rule when policies are compared
    pub fn prefix(&self) -> &str {
        rule_prefix(&self.path)
    }

    pub fn capability_set(&self) -> BTreeSet<&str> {
        self.capabilities.iter().map(String::as_str).collect()
    }
}

/// Path up to, not including, the first `*`
pub fn rule_prefix(path: &str) -> &str {
    path.find('*').map_or(path, |idx| &path[..idx])
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyParseError {
    #[error("expected a path block at offset {offset}")]
    ExpectedPathBlock { offset: usize },

    #[error("block for path \"{path}\" is not terminated")]
    UnterminatedBlock { path: String },
}

/// Render rules as policy text, one block per rule joined by newlines
pub fn render(rules: &[PolicyRule]) -> String {
    rules
        .iter()
        .map(|rule| {
            let capabilities = rule
                .capabilities
                .iter()
                .map(|c| format!("\"{}\"", escape(c)))
                .collect::<Vec<_>>()
                .join(",");
            format!(
                "path \"{}\" {{ capabilities = [{capabilities}] }}",
                escape(&rule.path)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse policy text back into rules, in document order
///
/// # Errors
/// Returns `PolicyParseError` when the text contains anything other than
/// comments and `path` blocks, or when a block is not closed.
pub fn parse(text: &str) -> Result<Vec<PolicyRule>, PolicyParseError> {
    let mut rules = Vec::new();
    let mut rest = skip_trivia(text);

    while !rest.is_empty() {
        let offset = text.len() - rest.len();
        let header = PATH_HEADER
            .captures(rest)
            .ok_or(PolicyParseError::ExpectedPathBlock { offset })?;
        let path = unescape(&header[1]);
        let header_end = header.get(0).map_or(0, |m| m.end());

        let Some((body, remaining)) = split_block(&rest[header_end..]) else {
            return Err(PolicyParseError::UnterminatedBlock { path });
        };

        let capabilities = CAPABILITIES
            .captures(&body)
            .map(|caps| {
                QUOTED
                    .captures_iter(&caps[1])
                    .map(|q| unescape(&q[1]))
                    .collect()
            })
            .unwrap_or_default();

        rules.push(PolicyRule { path, capabilities });
        rest = skip_trivia(remaining);
    }

    Ok(rules)
}

/// Replace the rule sharing `rule`'s prefix, or append it
///
/// Every other rule with the same prefix is dropped so the document keeps one
/// block per prefix.
pub fn upsert_rule(rules: &mut Vec<PolicyRule>, rule: PolicyRule) {
    let prefix = rule.prefix().to_string();
    match rules.iter().position(|r| r.prefix() == prefix) {
        Some(idx) => {
            rules[idx] = rule;
            let mut seen = false;
            rules.retain(|r| {
                if r.prefix() != prefix {
                    return true;
                }
                let keep = !seen;
                seen = true;
                keep
            });
        }
        None => rules.push(rule),
    }
}

/// Drop rules whose prefix is not listed
pub fn retain_prefixes(rules: &mut Vec<PolicyRule>, prefixes: &BTreeSet<String>) {
    rules.retain(|r| prefixes.contains(r.prefix()));
}

fn skip_trivia(mut rest: &str) -> &str {
    loop {
        rest = rest.trim_start();
        if rest.starts_with('#') || rest.starts_with("//") {
            rest = rest.find('\n').map_or("", |idx| &rest[idx + 1..]);
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.find("*/").map_or("", |idx| &after[idx + 2..]);
        } else {
            return rest;
        }
    }
}

/// Split the text following a block's `{` into its comment-free body and
/// whatever follows the matching `}`
fn split_block(text: &str) -> Option<(String, &str)> {
    let mut body = String::new();
    let mut depth = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => {
                body.push(c);
                while let Some((_, s)) = chars.next() {
                    body.push(s);
                    if s == '\\' {
                        if let Some((_, escaped)) = chars.next() {
                            body.push(escaped);
                        }
                    } else if s == '"' {
                        break;
                    }
                }
            }
            '#' => skip_line(&mut chars, &mut body),
            '/' if matches!(chars.peek(), Some((_, '/'))) => skip_line(&mut chars, &mut body),
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut previous = ' ';
                for (_, s) in chars.by_ref() {
                    if previous == '*' && s == '/' {
                        break;
                    }
                    previous = s;
                }
                body.push(' ');
            }
            '{' => {
                depth += 1;
                body.push(c);
            }
            '}' if depth == 0 => return Some((body, &text[idx + 1..])),
            '}' => {
                depth -= 1;
                body.push(c);
            }
            _ => body.push(c),
        }
    }

    None
}

fn skip_line(chars: &mut Peekable<CharIndices<'_>>, body: &mut String) {
    for (_, c) in chars.by_ref() {
        if c == '\n' {
            break;
        }
    }
    body.push('\n');
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
