//! Embedded payload decoding
//!
//! Payloads are either bare base64 or `data:` URLs as produced by the
//! capture application's blob serialization.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;

/// Standard alphabet, padding optional
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a payload could not be turned into playable media
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("payload decoded to zero bytes")]
    Empty,

    #[error("handle limit of {0} reached")]
    RegistryFull(usize),

    #[error("decode task failed: {0}")]
    TaskFailed(String),
}

/// Binary media ready to be registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMedia {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Decode a stored payload.
///
/// Bare base64 is tagged with `default_media_type`; a `data:` URL carries
/// its own type.
pub fn decode_payload(payload: &str, default_media_type: &str) -> Result<DecodedMedia, DecodeError> {
    let trimmed = payload.trim();

    let media = match strip_prefix_ignore_case(trimmed, "data:") {
        Some(rest) => decode_data_url(rest, default_media_type)?,
        None => DecodedMedia {
            media_type: default_media_type.to_string(),
            bytes: decode_base64(trimmed)?,
        },
    };

    if media.bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(media)
}

fn decode_data_url(rest: &str, default_media_type: &str) -> Result<DecodedMedia, DecodeError> {
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| DecodeError::InvalidDataUrl("missing ','".to_string()))?;

    let mut params = header.split(';').map(str::trim);
    let media_type = match params.next() {
        Some(mime) if !mime.is_empty() => mime.to_ascii_lowercase(),
        _ => default_media_type.to_string(),
    };
    let is_base64 = params.any(|param| param.eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        decode_base64(data)?
    } else {
        urlencoding::decode_binary(data.as_bytes()).into_owned()
    };

    Ok(DecodedMedia { media_type, bytes })
}

fn decode_base64(data: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    PAYLOAD_ENGINE
        .decode(compact.as_bytes())
        .map_err(|e| DecodeError::InvalidBase64(e.to_string()))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &value[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_base64_uses_default_type() {
        let media = decode_payload("GkXfow==", "video/webm").unwrap();
        assert_eq!(media.media_type, "video/webm");
        assert_eq!(media.bytes, vec![0x1A, 0x45, 0xDF, 0xA3]);
    }

    #[test]
    fn test_unpadded_and_wrapped_base64() {
        let media = decode_payload("GkXf\now", "video/webm").unwrap();
        assert_eq!(media.bytes, vec![0x1A, 0x45, 0xDF, 0xA3]);
    }

    #[test]
    fn test_data_url_carries_type() {
        let media = decode_payload("data:video/mp4;base64,AAAAIGZ0eXA=", "video/webm").unwrap();
        assert_eq!(media.media_type, "video/mp4");
        assert_eq!(&media.bytes[4..8], b"ftyp");
    }

    #[test]
    fn test_data_url_with_codecs_param() {
        let media =
            decode_payload("DATA:video/webm;codecs=vp9;base64,GkXfow==", "video/mp4").unwrap();
        assert_eq!(media.media_type, "video/webm");
        assert_eq!(media.bytes.len(), 4);
    }

    #[test]
    fn test_percent_encoded_data_url() {
        let media = decode_payload("data:,hello%20world", "video/webm").unwrap();
        assert_eq!(media.media_type, "video/webm");
        assert_eq!(media.bytes, b"hello world");
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(matches!(
            decode_payload("%%% not base64 %%%", "video/webm"),
            Err(DecodeError::InvalidBase64(_))
        ));
        assert!(matches!(
            decode_payload("data:video/webm;base64", "video/webm"),
            Err(DecodeError::InvalidDataUrl(_))
        ));
        assert_eq!(decode_payload("", "video/webm"), Err(DecodeError::Empty));
        assert_eq!(decode_payload("data:video/webm;base64,", "video/webm"), Err(DecodeError::Empty));
    }
}
