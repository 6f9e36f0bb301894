use anyhow::{Context, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::{Captures, Regex};
use serde::Serialize;

pub const RAW_CONTENT_HOST: &str = "https://raw.githubusercontent.com";

/// Characters left as-is by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlFix {
    pub original: String,
    pub fixed: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub content: String,
    pub fixes: Vec<UrlFix>,
}

impl RewriteResult {
    pub fn changed(&self) -> bool {
        !self.fixes.is_empty()
    }
}

/// Rewrites raw-content URLs of one repository branch so that the final path
/// segment is percent-encoded.
#[derive(Debug, Clone)]
pub struct UrlFixer {
    prefix: String,
    pattern: Regex,
}

impl UrlFixer {
    pub fn new(owner: &str, repo: &str, branch: &str) -> Result<Self> {
        let prefix = format!("{RAW_CONTENT_HOST}/{owner}/{repo}/{branch}/");
        let escaped = regex::escape(&prefix);
        // A URL that is a whole JSON string value runs to the closing quote
        // and may contain spaces. Anywhere else it stops at whitespace, a
        // quote, `)` or an angle bracket.
        let source = format!(
            r#""{escaped}((?:[^"\\\r\n]|\\.)*)"|{escaped}([^\s"')<>]+)"#
        );
        let pattern = Regex::new(&source)
            .with_context(|| format!("failed to compile URL pattern for {prefix}"))?;
        Ok(Self { prefix, pattern })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn rewrite(&self, content: &str) -> RewriteResult {
        let mut fixes = Vec::new();
        let rewritten = self.pattern.replace_all(content, |caps: &Captures<'_>| {
            let (path, quoted) = match (caps.get(1), caps.get(2)) {
                (Some(path), _) => (path.as_str(), true),
                (None, Some(path)) => (path.as_str(), false),
                (None, None) => ("", false),
            };
            let original = format!("{}{path}", self.prefix);
            // A path holding a JSON escape is left as written.
            let fixed = if path.contains('\\') {
                tracing::debug!(url = %original, "skipping URL with JSON escape");
                original.clone()
            } else {
                format!("{}{}", self.prefix, encode_last_segment(path))
            };
            if fixed != original {
                fixes.push(UrlFix {
                    original,
                    fixed: fixed.clone(),
                });
            }
            if quoted { format!("\"{fixed}\"") } else { fixed }
        });

        RewriteResult {
            content: rewritten.into_owned(),
            fixes,
        }
    }
}

/// Encode the segment after the last `/`, leaving every earlier segment byte-identical.
pub fn encode_last_segment(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((head, last)) => format!("{head}/{}", encode_segment(last)),
        None => encode_segment(path),
    }
}

/// Percent-encode one path segment. Existing escapes are decoded first so an
/// already-encoded segment comes back unchanged.
pub fn encode_segment(segment: &str) -> String {
    if segment.is_empty() {
        return String::new();
    }
    match percent_decode_str(segment).decode_utf8() {
        Ok(decoded) => utf8_percent_encode(&decoded, URI_COMPONENT).to_string(),
        Err(_) => segment.to_string(),
    }
}
