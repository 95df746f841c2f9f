//! Benchmark message formats.
//!
//! Messages are bare UTF-8 text. There is no length prefix and no
//! delimiter: a single transport read is taken to be one message. This holds
//! for the closed-loop exchange on a quiet link but is not guaranteed by
//! stream sockets in general.

use crate::error::{Error, Result};

/// Identifier the benchmark client puts in its requests.
pub const DEFAULT_CLIENT_ID: &str = "Rust client";

/// Size of the buffer used for a single read of one message.
pub const MAX_MESSAGE_SIZE: usize = 8192;

const ECHO_MARKER: &str = " [Server Echo - Msg#";
const TIME_MARKER: &str = " - Time:";

/// A client request: `"Message #<seq> from <origin>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    seq: u64,
    text: String,
}

impl Request {
    /// Builds the request for sequence number `seq`.
    #[must_use]
    pub fn new(seq: u64, origin: &str) -> Self {
        Self {
            seq,
            text: format!("Message #{seq} from {origin}"),
        }
    }

    /// Returns the sequence number.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Returns the request text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the request payload bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Builds the server's echo of `received`.
///
/// Format: `"<received> [Server Echo - Msg#<n> - Time:<unix-ms>]"`.
#[must_use]
pub fn encode_echo(received: &str, message_number: u64, unix_ms: i64) -> String {
    format!("{received}{ECHO_MARKER}{message_number}{TIME_MARKER}{unix_ms}]")
}

/// A parsed echo response, borrowing from the response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoResponse<'a> {
    /// Text the server received and echoed back.
    pub echoed: &'a str,
    /// Per-session message index assigned by the server (1-based).
    pub message_number: u64,
    /// Server wall clock at response time, in milliseconds since the epoch.
    pub timestamp_ms: i64,
}

impl<'a> EchoResponse<'a> {
    /// Parses an echo response.
    ///
    /// The metadata suffix is located from the right, so echoed text that
    /// itself contains the marker still parses.
    ///
    /// # Errors
    /// Returns an error if the text is not in echo format.
    pub fn parse(text: &'a str) -> Result<Self> {
        let body = text
            .strip_suffix(']')
            .ok_or_else(|| Error::malformed("missing closing bracket"))?;
        let (echoed, meta) = body
            .rsplit_once(ECHO_MARKER)
            .ok_or_else(|| Error::malformed("missing echo marker"))?;
        let (number, time) = meta
            .split_once(TIME_MARKER)
            .ok_or_else(|| Error::malformed("missing time field"))?;

        let message_number = number.parse().map_err(|_| Error::InvalidField {
            field: "message number",
            value: number.to_string(),
        })?;
        let timestamp_ms = time.parse().map_err(|_| Error::InvalidField {
            field: "timestamp",
            value: time.to_string(),
        })?;

        Ok(Self {
            echoed,
            message_number,
            timestamp_ms,
        })
    }

    /// Returns true if this response echoes `request` verbatim.
    #[must_use]
    pub fn echoes(&self, request: &Request) -> bool {
        self.echoed == request.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_format() {
        let request = Request::new(7, "X");
        assert_eq!(request.as_str(), "Message #7 from X");
        assert_eq!(request.seq(), 7);
        assert_eq!(request.len(), 17);
        assert!(!request.is_empty());
    }

    #[test]
    fn test_encode_echo() {
        let echo = encode_echo("Message #1 from Rust client", 1, 1_700_000_000_000);
        assert_eq!(
            echo,
            "Message #1 from Rust client [Server Echo - Msg#1 - Time:1700000000000]"
        );
    }

    #[test]
    fn test_parse_echo() {
        let request = Request::new(3, DEFAULT_CLIENT_ID);
        let text = encode_echo(request.as_str(), 42, 1_234);
        let response = EchoResponse::parse(&text).unwrap();

        assert_eq!(response.echoed, "Message #3 from Rust client");
        assert_eq!(response.message_number, 42);
        assert_eq!(response.timestamp_ms, 1_234);
        assert!(response.echoes(&request));
        assert!(!response.echoes(&Request::new(4, DEFAULT_CLIENT_ID)));
    }

    #[test]
    fn test_parse_echo_of_echo() {
        let inner = encode_echo("hello", 1, 10);
        let outer = encode_echo(&inner, 2, 20);
        let response = EchoResponse::parse(&outer).unwrap();

        assert_eq!(response.echoed, inner);
        assert_eq!(response.message_number, 2);
    }

    #[test]
    fn test_parse_rejects_plain_text() {
        assert!(matches!(
            EchoResponse::parse("Message #1 from X"),
            Err(Error::MalformedResponse { .. })
        ));
        assert!(matches!(
            EchoResponse::parse("hi [Server Echo - Msg#abc - Time:1]"),
            Err(Error::InvalidField { field: "message number", .. })
        ));
        assert!(matches!(
            EchoResponse::parse("hi [Server Echo - Msg#1]"),
            Err(Error::MalformedResponse { .. })
        ));
    }
}
