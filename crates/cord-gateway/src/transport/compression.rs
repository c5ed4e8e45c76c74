//! zlib decompression of binary frames

use std::io::Read;

use flate2::read::ZlibDecoder;

use super::TransportError;

/// Inflate a compressed frame into its JSON text
pub fn inflate(data: &[u8]) -> Result<String, TransportError> {
    let mut text = String::new();
    ZlibDecoder::new(data).read_to_string(&mut text)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_inflate() {
        let json = r#"{"op":11}"#;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(inflate(&compressed).unwrap(), json);
    }

    #[test]
    fn test_inflate_garbage() {
        assert!(matches!(
            inflate(b"definitely not zlib"),
            Err(TransportError::Decompress(_))
        ));
    }
}
