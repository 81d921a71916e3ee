//! Protocol operation tokens and line classification.
//!
//! Every inbound line starts with one of ten operation tokens. Classification
//! is a case-insensitive prefix match: the first character narrows the
//! candidate set, then the full token is verified. `P` is ambiguous among
//! PING, PONG and PUB and is checked in that fixed order.
//!
//! # Example
//!
//! ```
//! use natslink::protocol::Operation;
//!
//! assert_eq!(Operation::classify("INFO {\"proto\":1}"), Some(Operation::Info));
//! assert_eq!(Operation::classify("msg updates 1 5"), Some(Operation::Message));
//! assert_eq!(Operation::classify("hello"), None);
//! ```

/// A protocol operation, identified by its wire token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `CONNECT` - client handshake/auth payload.
    Connect,
    /// `SUB` - subscribe to a subject.
    Subscribe,
    /// `UNSUB` - drop a subscription.
    Unsubscribe,
    /// `PUB` - publish a payload to a subject.
    Publish,
    /// `MSG` - delivered message: header line plus a payload line.
    Message,
    /// `INFO` - server handshake information.
    Info,
    /// `PING` - keepalive probe.
    Ping,
    /// `PONG` - keepalive reply.
    Pong,
    /// `+OK` - acknowledgment in verbose mode.
    Ok,
    /// `-ERR` - protocol or authorization error.
    Err,
}

impl Operation {
    /// The wire token for this operation.
    pub const fn token(self) -> &'static str {
        match self {
            Operation::Connect => "CONNECT",
            Operation::Subscribe => "SUB",
            Operation::Unsubscribe => "UNSUB",
            Operation::Publish => "PUB",
            Operation::Message => "MSG",
            Operation::Info => "INFO",
            Operation::Ping => "PING",
            Operation::Pong => "PONG",
            Operation::Ok => "+OK",
            Operation::Err => "-ERR",
        }
    }

    /// Classify a protocol line by its leading token.
    ///
    /// Returns `None` for lines shorter than two bytes or lines that match
    /// no known token. A line shorter than a candidate token is a non-match,
    /// never an error. Pure function, no allocation.
    pub fn classify(line: &str) -> Option<Operation> {
        if line.len() < 2 {
            return None;
        }

        let matches = |op: Operation| {
            let token = op.token().as_bytes();
            line.as_bytes()
                .get(..token.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(token))
        };

        match line.as_bytes()[0].to_ascii_uppercase() {
            b'C' => matches(Operation::Connect).then_some(Operation::Connect),
            b'S' => matches(Operation::Subscribe).then_some(Operation::Subscribe),
            b'U' => matches(Operation::Unsubscribe).then_some(Operation::Unsubscribe),
            b'M' => matches(Operation::Message).then_some(Operation::Message),
            b'I' => matches(Operation::Info).then_some(Operation::Info),
            b'+' => matches(Operation::Ok).then_some(Operation::Ok),
            b'-' => matches(Operation::Err).then_some(Operation::Err),
            b'P' => {
                if matches(Operation::Ping) {
                    Some(Operation::Ping)
                } else if matches(Operation::Pong) {
                    Some(Operation::Pong)
                } else if matches(Operation::Publish) {
                    Some(Operation::Publish)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_every_token() {
        let cases = [
            ("CONNECT {}", Operation::Connect),
            ("SUB updates 1", Operation::Subscribe),
            ("UNSUB 1", Operation::Unsubscribe),
            ("PUB updates 5", Operation::Publish),
            ("MSG updates 1 5", Operation::Message),
            ("INFO {\"proto\":1}", Operation::Info),
            ("PING", Operation::Ping),
            ("PONG", Operation::Pong),
            ("+OK", Operation::Ok),
            ("-ERR 'Unknown Protocol Operation'", Operation::Err),
        ];

        for (line, expected) in cases {
            assert_eq!(Operation::classify(line), Some(expected), "line: {line}");
        }
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(Operation::classify("info {}"), Some(Operation::Info));
        assert_eq!(Operation::classify("Msg a 1 2"), Some(Operation::Message));
        assert_eq!(Operation::classify("pInG"), Some(Operation::Ping));
        assert_eq!(Operation::classify("-err oops"), Some(Operation::Err));
    }

    #[test]
    fn test_classify_p_ambiguity_order() {
        assert_eq!(Operation::classify("PING"), Some(Operation::Ping));
        assert_eq!(Operation::classify("PONG"), Some(Operation::Pong));
        assert_eq!(Operation::classify("PUB a 3"), Some(Operation::Publish));
        // PUBLISH still hits the PUB prefix.
        assert_eq!(Operation::classify("PUBLISH a 3"), Some(Operation::Publish));
    }

    #[test]
    fn test_classify_short_lines() {
        assert_eq!(Operation::classify(""), None);
        assert_eq!(Operation::classify("P"), None);
        // Two bytes clears the length gate but matches no token.
        assert_eq!(Operation::classify("PO"), None);
        assert_eq!(Operation::classify("+O"), None);
    }

    #[test]
    fn test_classify_unknown_lines() {
        assert_eq!(Operation::classify("hello world"), None);
        assert_eq!(Operation::classify("  PING"), None);
        assert_eq!(Operation::classify("42"), None);
        assert_eq!(Operation::classify("\u{00e9}\u{00e9}"), None);
    }

    #[test]
    fn test_classify_prefix_only() {
        // Anything after the token is ignored by classification.
        assert_eq!(Operation::classify("PINGPONG"), Some(Operation::Ping));
        assert_eq!(Operation::classify("INFOrmal"), Some(Operation::Info));
    }
}
