//! Bot API wire types.

use serde::Deserialize;

/// Telegram's limit on media captions, in characters.
pub const MAX_CAPTION_CHARS: usize = 1024;

/// Envelope of every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResponseParameters {
    #[serde(default)]
    pub retry_after: Option<u64>,
}

/// The subset of a sent message we care about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub message_id: i64,
}

/// Truncates `caption` to at most [`MAX_CAPTION_CHARS`] characters.
pub fn clamp_caption(caption: &str) -> &str {
    match caption.char_indices().nth(MAX_CAPTION_CHARS) {
        Some((idx, _)) => &caption[..idx],
        None => caption,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_caption_untouched() {
        assert_eq!(clamp_caption("report.pdf"), "report.pdf");
        assert_eq!(clamp_caption(""), "");
    }

    #[test]
    fn long_caption_clamped_on_char_boundary() {
        let caption = "é".repeat(MAX_CAPTION_CHARS + 10);
        let clamped = clamp_caption(&caption);
        assert_eq!(clamped.chars().count(), MAX_CAPTION_CHARS);

        let exact = "x".repeat(MAX_CAPTION_CHARS);
        assert_eq!(clamp_caption(&exact), exact);
    }

    #[test]
    fn parses_flood_wait() {
        let resp: ApiResponse<Message> = serde_json::from_str(
            r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 7","parameters":{"retry_after":7}}"#,
        )
        .unwrap();
        assert!(!resp.ok);
        assert!(resp.result.is_none());
        assert_eq!(resp.error_code, Some(429));
        assert_eq!(resp.parameters.unwrap().retry_after, Some(7));
    }

    #[test]
    fn parses_sent_message() {
        let resp: ApiResponse<Message> = serde_json::from_str(
            r#"{"ok":true,"result":{"message_id":42,"chat":{"id":-100123},"date":0}}"#,
        )
        .unwrap();
        assert_eq!(resp.result, Some(Message { message_id: 42 }));
    }
}
