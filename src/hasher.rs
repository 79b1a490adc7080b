//! Content hashing for leaf nodes.

use md5::{Digest, Md5};
use std::io::Read;

/// Stream a reader through MD5 and return the lowercase hex digest.
///
/// The content is never materialized in memory; reads happen in 64 KiB
/// chunks.
pub fn md5_hex(reader: &mut dyn Read) -> std::io::Result<String> {
    let mut hasher = Md5::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_md5_hex_known_digest() {
        let mut reader = Cursor::new(b"hi".to_vec());
        assert_eq!(
            md5_hex(&mut reader).unwrap(),
            "49f68a5c8493ec2c0bf489821c21fc3b"
        );
    }

    #[test]
    fn test_md5_hex_empty_input() {
        let mut reader = Cursor::new(Vec::new());
        assert_eq!(
            md5_hex(&mut reader).unwrap(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_md5_hex_spans_chunk_boundary() {
        // Larger than one read buffer so the streaming path is exercised.
        let data = vec![0xabu8; 3 * 64 * 1024 + 17];
        let mut reader = Cursor::new(data.clone());
        let streamed = md5_hex(&mut reader).unwrap();

        let mut hasher = Md5::new();
        hasher.update(&data);
        assert_eq!(streamed, hex::encode(hasher.finalize()));
    }
}
