use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use scraper::Html;
use tracing::debug;

use crate::api::models::MessagePart;

/// base64url with optional padding; message bodies arrive either way.
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const TEXT_PLAIN: &str = "text/plain";
const TEXT_HTML: &str = "text/html";

/// Best readable text for a message payload.
///
/// Multipart payloads prefer the first `text/plain` child that carries
/// data, then the first non-empty result from a nested multipart child,
/// then the first `text/html` child rendered as text. Single-part payloads
/// decode `text/plain` as-is and render `text/html`. Anything else yields an
/// empty string.
pub fn message_body(payload: &MessagePart) -> String {
    if let Some(parts) = &payload.parts {
        if let Some(data) = parts
            .iter()
            .filter(|part| part.mime_type == TEXT_PLAIN)
            .find_map(MessagePart::body_data)
        {
            return decode_body(data);
        }

        if let Some(nested) = parts
            .iter()
            .filter(|part| part.parts.is_some())
            .map(message_body)
            .find(|body| !body.is_empty())
        {
            return nested;
        }

        if let Some(data) = parts
            .iter()
            .filter(|part| part.mime_type == TEXT_HTML)
            .find_map(MessagePart::body_data)
        {
            return html_to_text(&decode_body(data));
        }

        return String::new();
    }

    match (payload.mime_type.as_str(), payload.body_data()) {
        (TEXT_PLAIN, Some(data)) => decode_body(data),
        (TEXT_HTML, Some(data)) => html_to_text(&decode_body(data)),
        _ => String::new(),
    }
}

/// Text nodes of an HTML document, each trimmed, empty ones dropped, joined
/// with newlines. Script and style contents are not text.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| matches!(element.name(), "script" | "style"))
            });
            if hidden {
                return None;
            }
            let trimmed = text.trim();
            (!trimmed.is_empty()).then_some(trimmed)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_body(data: &str) -> String {
    match BODY_ENGINE.decode(data.trim()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            debug!("skipping undecodable body data: {err}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};

    use super::*;
    use crate::api::models::PartBody;

    fn part(mime_type: &str, data: Option<&str>) -> MessagePart {
        MessagePart {
            mime_type: mime_type.to_string(),
            body: Some(PartBody {
                data: data.map(|raw| URL_SAFE_NO_PAD.encode(raw)),
                ..PartBody::default()
            }),
            ..MessagePart::default()
        }
    }

    fn multipart(mime_type: &str, parts: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            mime_type: mime_type.to_string(),
            parts: Some(parts),
            ..MessagePart::default()
        }
    }

    #[test]
    fn html_only_multipart_renders_text_nodes() {
        let payload = multipart(
            "multipart/alternative",
            vec![part("text/html", Some("<p>Hello</p><p>World</p>"))],
        );
        assert_eq!(message_body(&payload), "Hello\nWorld");
    }

    #[test]
    fn prefers_plain_text_over_html() {
        let payload = multipart(
            "multipart/alternative",
            vec![
                part("text/html", Some("<b>rich</b>")),
                part("text/plain", Some("plain body")),
            ],
        );
        assert_eq!(message_body(&payload), "plain body");
    }

    #[test]
    fn plain_part_without_data_is_skipped() {
        let payload = multipart(
            "multipart/alternative",
            vec![
                part("text/plain", None),
                part("text/html", Some("<div>fallback</div>")),
            ],
        );
        assert_eq!(message_body(&payload), "fallback");
    }

    #[test]
    fn recurses_into_nested_multipart_before_html() {
        let payload = multipart(
            "multipart/mixed",
            vec![
                part("text/html", Some("<p>outer html</p>")),
                multipart(
                    "multipart/alternative",
                    vec![part("text/plain", Some("inner plain"))],
                ),
            ],
        );
        assert_eq!(message_body(&payload), "inner plain");
    }

    #[test]
    fn single_part_payloads() {
        assert_eq!(message_body(&part("text/plain", Some("just text"))), "just text");
        assert_eq!(
            message_body(&part("text/html", Some("<h1>Title</h1> <p> body </p>"))),
            "Title\nbody"
        );
        assert_eq!(message_body(&part("image/png", Some("binary"))), "");
        assert_eq!(message_body(&MessagePart::default()), "");
    }

    #[test]
    fn accepts_padded_and_unpadded_data() {
        let padded = MessagePart {
            mime_type: "text/plain".to_string(),
            body: Some(PartBody {
                data: Some(URL_SAFE.encode("ab")),
                ..PartBody::default()
            }),
            ..MessagePart::default()
        };
        assert_eq!(message_body(&padded), "ab");
        assert_eq!(message_body(&part("text/plain", Some("ab"))), "ab");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let payload = MessagePart {
            mime_type: "text/plain".to_string(),
            body: Some(PartBody {
                data: Some(URL_SAFE_NO_PAD.encode([b'o', b'k', 0xff])),
                ..PartBody::default()
            }),
            ..MessagePart::default()
        };
        assert_eq!(message_body(&payload), "ok\u{fffd}");
    }

    #[test]
    fn html_to_text_ignores_scripts_and_styles() {
        let html = "<html><head><style>p { color: red; }</style></head>\
                    <body><script>var x = 1;</script><p>Visible</p></body></html>";
        assert_eq!(html_to_text(html), "Visible");
    }
}
