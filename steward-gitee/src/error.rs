//! Mapping Gitee failures onto [`ClientError`].

use steward_core::ClientError;

/// Classifies a non-success HTTP response.
///
/// Gitee reports "already exists" conditions (branch, repository, member)
/// as 400/409/422 with a message naming the conflict.
pub(crate) fn classify(status: u16, url: &str, body: &str) -> ClientError {
    let message = error_message(body);
    match status {
        404 => ClientError::NotFound {
            what: strip_query(url).to_string(),
        },
        409 => ClientError::AlreadyExists { what: message },
        400 | 422 if mentions_existence(&message) => ClientError::AlreadyExists { what: message },
        _ => ClientError::Http {
            status,
            url: strip_query(url).to_string(),
            message,
        },
    }
}

/// `message` field of a Gitee error body, or the trimmed body itself.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn mentions_existence(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already exist") || lower.contains("has existed") || message.contains("已存在")
}

/// Drops the query string so tokens never reach logs.
pub(crate) fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
