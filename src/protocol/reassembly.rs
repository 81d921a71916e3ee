//! Stream-to-frame reassembly.
//!
//! The transport delivers bytes in arbitrary chunks: a read may end in the
//! middle of a line, between a MSG header and its payload, or squarely on a
//! frame boundary. [`reassemble`] splits each chunk on newlines and walks the
//! lines through a two-state machine (idle / awaiting-payload), emitting
//! complete frames and handing any unterminated tail back to the caller as a
//! [`PendingFrame`] to be threaded into the next call.
//!
//! A MSG frame spans two lines: a header (`MSG <subject> <sid> <len>`)
//! followed by a verbatim payload line. The payload is never classified - a
//! payload that happens to read `PING` stays a payload. A complete MSG frame
//! is emitted as `header + '\n' + payload` in a single string; every other
//! operation is a one-line frame.
//!
//! # Example
//!
//! ```
//! use natslink::protocol::reassemble;
//!
//! let (frames, carry) = reassemble("PING\r\nMSG updates 1 5\r\nhe", None);
//! assert_eq!(frames, vec!["PING\r".to_string()]);
//! let (frames, carry) = reassemble("llo\r\n", carry);
//! assert_eq!(frames, vec!["MSG updates 1 5\r\nhello\r".to_string()]);
//! assert!(carry.is_none());
//! ```

use super::Operation;

/// Unfinished trailing data carried from one reassembly pass to the next.
///
/// `resolved_header == false` holds raw unterminated text (a partial header,
/// a partial one-line frame, or noise) that is glued to the next chunk's
/// first line and reclassified. `resolved_header == true` holds a fully
/// assembled MSG frame whose payload line was not newline-terminated; the
/// next chunk's first line extends its payload and is never reclassified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFrame {
    /// Carried text: a raw line, or a complete `header\npayload` frame.
    pub text: String,
    /// Whether `text` is an assembled MSG frame rather than a raw line.
    pub resolved_header: bool,
}

/// Split a chunk into complete protocol frames.
///
/// Returns the frames completed by this chunk, in stream order, plus the new
/// carry-over for any unterminated trailing data. The caller owns the carry
/// and must thread it into the next call for the same connection; calls for
/// one stream must be serialized, but the function itself keeps no state.
///
/// An empty chunk yields no frames and returns the carry untouched.
pub fn reassemble(
    chunk: &str,
    carry: Option<PendingFrame>,
) -> (Vec<String>, Option<PendingFrame>) {
    if chunk.is_empty() {
        return (Vec::new(), carry);
    }

    let mut frames: Vec<String> = Vec::new();
    let mut carry = carry;

    // `awaiting` holds a MSG header whose payload is the next line.
    let mut awaiting: Option<String> = None;
    // Text the carry would hold if the stream stopped at the current line.
    // A payload line deliberately leaves the header here: that is what makes
    // a chunk ending right after `MSG ...\n` retract the assembled frame.
    let mut last_text = String::new();
    let mut emitted_last = false;
    let mut resolved_last = false;

    for piece in chunk.split('\n') {
        emitted_last = false;
        resolved_last = false;

        let line = match carry.take() {
            Some(pending) if pending.resolved_header => {
                // Continuation of an already-assembled frame: extend its
                // payload verbatim, no classification.
                let frame = format!("{}{}", pending.text, piece);
                last_text.clone_from(&frame);
                frames.push(frame);
                emitted_last = true;
                resolved_last = true;
                continue;
            }
            Some(pending) => format!("{}{}", pending.text, piece),
            None => piece.to_string(),
        };

        if let Some(header) = awaiting.take() {
            // Payload line: completes the MSG frame, taken verbatim.
            last_text.clone_from(&header);
            frames.push(format!("{header}\n{line}"));
            emitted_last = true;
            resolved_last = true;
            continue;
        }

        last_text.clone_from(&line);
        match Operation::classify(&line) {
            Some(Operation::Message) => awaiting = Some(line),
            Some(_) => {
                frames.push(line);
                emitted_last = true;
            }
            // Blank line or protocol noise: dropped, but still the carry
            // candidate if the stream stops here.
            None => {}
        }
    }

    // If the last processed line is non-empty the stream stopped mid-frame.
    // When that line already resolved into an emitted frame, retract the
    // frame into the carry so the next chunk can extend it; otherwise carry
    // the raw text for reclassification.
    let new_carry = if last_text.is_empty() {
        None
    } else if emitted_last {
        frames.pop().map(|text| PendingFrame {
            text,
            resolved_header: resolved_last,
        })
    } else {
        Some(PendingFrame {
            text: last_text,
            resolved_header: false,
        })
    };

    (frames, new_carry)
}
