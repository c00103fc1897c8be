use std::io::{ErrorKind, Read, Result};

/// This function reads as many bytes as are available to fill the buffer, possibly performing
/// multiple reads to do so (and also retrying if required to deal with EINTR).
///
/// Unlike the standard Read::read_exact() method, reaching EOF before the buffer is full is not
/// an error: the number of bytes actually read is returned instead.  This is what we want when
/// sniffing magic numbers at the start of a stream that may be shorter than the magic itself.
///
/// # Return value
///
///  - the number of bytes placed into the buffer, which is `buf.len()` unless EOF was reached
///  - in case of underlying errors from the Read implementation, the error is returned directly
pub(crate) fn read_upto(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}
