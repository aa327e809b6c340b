//! Streaming copy with a BLAKE3 content digest.

use std::io::{self, Read, Write};

const CHUNK: usize = 64 * 1024;

/// Buffer capacity to reserve for a stream that claims `declared` bytes.
///
/// Declared sizes come from callers and may be wrong, so at most one chunk
/// is reserved up front.
pub fn initial_capacity(declared: u64) -> usize {
    declared.min(CHUNK as u64) as usize
}

/// Copy `src` into `dst`, returning the byte count and hex BLAKE3 digest.
pub fn copy_hashed<W: Write + ?Sized>(
    src: &mut dyn Read,
    dst: &mut W,
) -> io::Result<(u64, String)> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; CHUNK];
    let mut total = 0u64;
    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        dst.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok((total, hex::encode(hasher.finalize().as_bytes())))
}
