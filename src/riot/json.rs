//! Path-aware JSON decoding for Riot API responses.

use super::errors::RiotApiError;
use serde::de::DeserializeOwned;

/// Characters of the offending line shown on either side of the error column.
const SNIPPET_RADIUS: usize = 12;

/// Decode a response body, turning serde failures into [`RiotApiError::ParseFailed`]
/// with the JSON path of the offending field and a snippet around it.
pub fn decode_body<T: DeserializeOwned>(
    body: &str,
    status: u16,
    url: &str,
) -> Result<T, RiotApiError> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.inner();
        let (line, column) = (inner.line(), inner.column());

        let message = inner.to_string();
        let location = format!(" at line {line} column {column}");
        let message = message.strip_suffix(&location).unwrap_or(&message);

        let mut description = String::new();
        if !path.is_empty() && path != "." {
            description.push_str(&format!("at '{path}': "));
        }
        description.push_str(&describe_mismatch(message));
        description.push_str(&format!(" (line {line} col {column})\n"));
        description.push_str(&snippet(body, line, column));

        RiotApiError::ParseFailed {
            status,
            url: url.to_owned(),
            source: anyhow::anyhow!(description),
        }
    })
}

/// Rewrite "invalid type: null, expected i64" as "expected i64, got null".
fn describe_mismatch(message: &str) -> String {
    if let Some(rest) = message.strip_prefix("invalid type: ")
        && let Some((actual, expected)) = rest.split_once(", expected ")
    {
        return format!("expected {}, got {}", expected.trim(), actual);
    }
    message.to_owned()
}

/// Excerpt of the line containing the error with a caret under the column.
///
/// Works on chars, summoner names are frequently non-ASCII.
fn snippet(body: &str, line: usize, column: usize) -> String {
    let Some(text) = body.lines().nth(line.saturating_sub(1)) else {
        return "(no such line)".to_owned();
    };
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return "(empty line)".to_owned();
    }

    let at = column.saturating_sub(1).min(chars.len() - 1);
    let start = at.saturating_sub(SNIPPET_RADIUS);
    let end = (at + SNIPPET_RADIUS).min(chars.len());
    let excerpt: String = chars[start..end].iter().collect();
    let caret = " ".repeat(at - start) + "^";

    format!("...{excerpt}...\n   {caret}")
}
