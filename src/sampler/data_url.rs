// Decoding of `data:<mime>;base64,<payload>` strings produced by browser file readers

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::SampleError;

/// Split a data URL into its media type and decoded bytes.
pub fn decode(contents: &str) -> Result<(String, Vec<u8>), SampleError> {
    let (header, payload) = contents.split_once(',').ok_or_else(|| {
        SampleError::Encoding(
            "expected a data URL of the form data:<type>;base64,<payload>".to_string(),
        )
    })?;

    let media_type = header
        .strip_prefix("data:")
        .unwrap_or(header)
        .trim_end_matches(";base64")
        .to_string();

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| SampleError::Encoding(format!("invalid base64 payload: {}", e)))?;

    Ok((media_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_csv_data_url() {
        let (media_type, bytes) = decode("data:text/csv;base64,YSxiCjEsMgo=").unwrap();
        assert_eq!(media_type, "text/csv");
        assert_eq!(bytes, b"a,b\n1,2\n");
    }

    #[test]
    fn test_missing_comma() {
        let err = decode("not a data url").unwrap_err();
        assert!(err.to_string().contains("data URL"));
    }

    #[test]
    fn test_bad_base64() {
        assert!(matches!(
            decode("data:text/plain;base64,@@@"),
            Err(SampleError::Encoding(_))
        ));
    }
}
