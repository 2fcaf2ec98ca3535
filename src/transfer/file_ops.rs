//! Module `file_ops`
//!
//! Moves bytes between the data connection and local sinks or sources in
//! bounded chunks. Bytes are copied unchanged regardless of transfer mode.

use std::io::{ErrorKind, Read, Write};

/// Buffer size used when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Copies `reader` into `writer` until `reader` reports end of stream.
///
/// Returns the number of bytes written. The first read or write error ends
/// the copy; nothing is retried.
pub fn pump<R, W>(reader: &mut R, writer: &mut W, buffer_size: usize) -> std::io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..n])?;
        total += n as u64;
    }

    writer.flush()?;
    Ok(total)
}
