//! Length-prefixed frame encoding.
//!
//! Every unit on the wire is `<8-digit zero-padded decimal byte
//! length><UTF-8 JSON text>`, with no delimiter between header and payload
//! and no terminator. The length counts *bytes* of the UTF-8 payload, not
//! characters; `str::len` gives exactly that count, which the tests pin
//! for 1-, 2-, 3- and 4-byte code points.
//!
//! One frame maps to one WebSocket text message. WebSocket messages are
//! atomic, so no reassembly across partial reads is needed at this layer.

use crate::error::LinkError;

/// Width of the decimal length header, in ASCII characters.
pub const HEADER_LEN: usize = 8;

/// Largest payload representable by the 8-digit header.
pub const MAX_PAYLOAD_BYTES: usize = 99_999_999;

/// Encodes a payload byte length as the 8-character decimal header.
///
/// # Errors
///
/// Returns [`LinkError::FrameOverflow`] when `byte_len` does not fit in
/// 8 decimal digits. Such payloads are not a supported message size.
pub fn encode_length(byte_len: usize) -> Result<String, LinkError> {
    if byte_len > MAX_PAYLOAD_BYTES {
        return Err(LinkError::FrameOverflow { len: byte_len });
    }
    Ok(format!("{byte_len:08}"))
}

/// Assembles one frame: length header followed by the payload.
///
/// # Errors
///
/// Returns [`LinkError::FrameOverflow`] when the payload exceeds
/// [`MAX_PAYLOAD_BYTES`].
pub fn frame(payload: &str) -> Result<String, LinkError> {
    let header = encode_length(payload.len())?;
    let mut out = String::with_capacity(HEADER_LEN + payload.len());
    out.push_str(&header);
    out.push_str(payload);
    Ok(out)
}

/// Splits a frame into its declared length and payload.
///
/// The declared length is validated against the actual payload byte
/// length; a disagreeing frame is rejected rather than dispatched.
///
/// # Errors
///
/// Returns [`LinkError::FrameTruncated`] when the frame is shorter than
/// the header, [`LinkError::FrameHeader`] when the header is not an
/// 8-digit decimal number, and [`LinkError::FrameLengthMismatch`] when
/// the declared and actual payload lengths disagree.
pub fn decode(frame: &str) -> Result<(usize, &str), LinkError> {
    let Some((header, payload)) = frame.split_at_checked(HEADER_LEN) else {
        return Err(LinkError::FrameTruncated { len: frame.len() });
    };
    if !header.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LinkError::FrameHeader(header.to_string()));
    }
    let declared: usize = header
        .parse()
        .map_err(|_| LinkError::FrameHeader(header.to_string()))?;
    if declared != payload.len() {
        return Err(LinkError::FrameLengthMismatch {
            declared,
            actual: payload.len(),
        });
    }
    Ok((declared, payload))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn encode_length_pads_to_eight() {
        let Ok(zero) = encode_length(0) else {
            panic!("zero must encode");
        };
        assert_eq!(zero, "00000000");

        let Ok(small) = encode_length(255) else {
            panic!("255 must encode");
        };
        assert_eq!(small, "00000255");
    }

    #[test]
    fn encode_length_rejects_oversize() {
        assert!(encode_length(MAX_PAYLOAD_BYTES).is_ok());
        assert!(matches!(
            encode_length(MAX_PAYLOAD_BYTES + 1),
            Err(LinkError::FrameOverflow { .. })
        ));
    }

    #[test]
    fn round_trip_ascii() {
        let payload = r#"{"type":"answer"}"#;
        let Ok(framed) = frame(payload) else {
            panic!("frame failed");
        };
        let Ok((declared, decoded)) = decode(&framed) else {
            panic!("decode failed");
        };
        assert_eq!(declared, payload.len());
        assert_eq!(decoded, payload);
    }

    #[test]
    fn length_counts_bytes_not_chars() {
        // 1-, 2-, 3- and 4-byte UTF-8 code points.
        assert_eq!("a".len(), 1);
        assert_eq!("é".len(), 2);
        assert_eq!("€".len(), 3);
        assert_eq!("🜁".len(), 4);

        let payload = "aé€🜁";
        let Ok(framed) = frame(payload) else {
            panic!("frame failed");
        };
        assert!(framed.starts_with("00000010"));
        let Ok((declared, decoded)) = decode(&framed) else {
            panic!("decode failed");
        };
        assert_eq!(declared, 10);
        assert_eq!(decoded, payload);
    }

    #[test]
    fn decode_rejects_truncated_frame() {
        assert!(matches!(
            decode("0000"),
            Err(LinkError::FrameTruncated { len: 4 })
        ));
    }

    #[test]
    fn decode_rejects_non_decimal_header() {
        assert!(matches!(
            decode("aaaaaaaa{}"),
            Err(LinkError::FrameHeader(_))
        ));
        // a sign is not a digit, even though str::parse would accept it
        assert!(matches!(
            decode("+0000002{}"),
            Err(LinkError::FrameHeader(_))
        ));
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        assert!(matches!(
            decode("00000005{}"),
            Err(LinkError::FrameLengthMismatch {
                declared: 5,
                actual: 2
            })
        ));
    }
}
