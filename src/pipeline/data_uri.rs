//! `data:<mime>;base64,<payload>` handling for uploaded documents.
//!
//! Only the wrapper is checked; payloads are never decoded.

/// A parsed base64 data URI, borrowing from the original string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime_type: &'a str,
    pub payload: &'a str,
}

/// Strict parse: requires the `data:` scheme, a MIME type, the `;base64`
/// marker and a non-empty payload.
pub fn parse_data_uri(uri: &str) -> Result<DataUri<'_>, String> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| "document must be a data URI (data:<mime>;base64,<data>)".to_string())?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URI has no payload separator".to_string())?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| "data URI must use base64 encoding".to_string())?;
    if mime_type.is_empty() {
        return Err("data URI has no MIME type".into());
    }
    if payload.is_empty() {
        return Err("data URI payload is empty".into());
    }
    Ok(DataUri { mime_type, payload })
}

/// Lenient split used on the self-hosted path: everything after the first
/// comma, or `None` when there is no comma or nothing after it.
pub fn base64_payload(uri: &str) -> Option<&str> {
    uri.split_once(',')
        .map(|(_, payload)| payload)
        .filter(|payload| !payload.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_png_data_uri() {
        let uri = parse_data_uri("data:image/png;base64,AAAA").unwrap();
        assert_eq!(uri.mime_type, "image/png");
        assert_eq!(uri.payload, "AAAA");
    }

    #[test]
    fn rejects_plain_text() {
        assert!(parse_data_uri("hello").is_err());
    }

    #[test]
    fn rejects_non_base64_uri() {
        assert!(parse_data_uri("data:text/plain,hola").is_err());
    }

    #[test]
    fn rejects_missing_mime_and_empty_payload() {
        assert!(parse_data_uri("data:;base64,AAAA").is_err());
        let err = parse_data_uri("data:application/pdf;base64,").unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn payload_is_borrowed_undecoded() {
        let uri = parse_data_uri("data:application/pdf;base64,JVBERi0x").unwrap();
        assert_eq!(uri.mime_type, "application/pdf");
        assert_eq!(uri.payload, "JVBERi0x");
    }

    #[test]
    fn lenient_payload_split() {
        assert_eq!(base64_payload("data:image/png;base64,AAAA"), Some("AAAA"));
        assert_eq!(base64_payload("no-comma"), None);
        assert_eq!(base64_payload("data:image/png;base64,"), None);
    }
}
