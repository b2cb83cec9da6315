//! Call-answer markup.
//!
//! An inbound call is answered with TwiML that connects the call audio to
//! this server's `/media-stream` WebSocket, carrying the agent id in the
//! stream URL query.

use url::Url;

use super::{TelephonyError, TelephonyResult};

/// Path of the media-stream WebSocket endpoint.
pub const MEDIA_STREAM_PATH: &str = "/media-stream";

/// `wss://{host}/media-stream?agent={agent}` with the agent percent-encoded.
pub fn media_stream_url(host: &str, agent: &str) -> TelephonyResult<String> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(TelephonyError::InvalidUrl("empty host".to_string()));
    }

    let mut url = Url::parse(&format!("wss://{}{}", host, MEDIA_STREAM_PATH))
        .map_err(|e| TelephonyError::InvalidUrl(format!("{}: {}", host, e)))?;
    url.query_pairs_mut().append_pair("agent", agent);
    Ok(url.to_string())
}

/// TwiML answering an inbound call.
///
/// When `fallback` is set a `<Say>` follows the `<Connect>`, so the caller
/// hears it if the stream is closed by the relay.
pub fn incoming_call_twiml(
    host: &str,
    agent: &str,
    fallback: Option<&str>,
) -> TelephonyResult<String> {
    let stream_url = media_stream_url(host, agent)?;

    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str("<Response><Connect><Stream url=\"");
    xml.push_str(&escape_xml(&stream_url));
    xml.push_str("\" /></Connect>");
    if let Some(message) = fallback.filter(|m| !m.trim().is_empty()) {
        xml.push_str("<Say>");
        xml.push_str(&escape_xml(message));
        xml.push_str("</Say>");
    }
    xml.push_str("</Response>");
    Ok(xml)
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_stream_url() {
        assert_eq!(
            media_stream_url("relay.example.com", "andrea").unwrap(),
            "wss://relay.example.com/media-stream?agent=andrea"
        );
        assert_eq!(
            media_stream_url("localhost:5050", "michela").unwrap(),
            "wss://localhost:5050/media-stream?agent=michela"
        );
    }

    #[test]
    fn test_agent_is_percent_encoded() {
        let url = media_stream_url("h.example", "a&b=c").unwrap();
        assert_eq!(url, "wss://h.example/media-stream?agent=a%26b%3Dc");
    }

    #[test]
    fn test_empty_host_rejected() {
        assert!(matches!(
            media_stream_url("  ", "michela"),
            Err(TelephonyError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_incoming_call_twiml() {
        let xml = incoming_call_twiml("relay.example.com", "michela", None).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Connect>\
             <Stream url=\"wss://relay.example.com/media-stream?agent=michela\" />\
             </Connect></Response>"
        );
    }

    #[test]
    fn test_fallback_say_is_escaped() {
        let xml =
            incoming_call_twiml("h.example", "michela", Some("Sorry <we> can't talk")).unwrap();
        assert!(xml.ends_with(
            "</Connect><Say>Sorry &lt;we&gt; can&apos;t talk</Say></Response>"
        ));
    }

    #[test]
    fn test_blank_fallback_is_omitted() {
        let xml = incoming_call_twiml("h.example", "michela", Some("  ")).unwrap();
        assert!(!xml.contains("<Say>"));
    }
}
