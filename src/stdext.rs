use core::fmt;
use core::fmt::Write;

/// Unbuffered stdout, for hosts that don't hand the command an output stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stdout;

impl Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        write_all(s.as_bytes(), |bytes| unsafe {
            libc::write(libc::STDOUT_FILENO, bytes.as_ptr().cast(), bytes.len())
        })
    }
}

/// Feed `bytes` to a `write(2)`-like function until all of it is written.
/// Partial writes may end anywhere, including inside a UTF-8 sequence.
fn write_all(mut bytes: &[u8], mut write: impl FnMut(&[u8]) -> isize) -> fmt::Result {
    while !bytes.is_empty() {
        let r = write(bytes);
        if r < 0 {
            let errno = errno();
            if errno == libc::EINTR {
                continue;
            }
            warn!(errno, "writing to stdout failed");
            return Err(fmt::Error);
        }
        if r == 0 {
            return Err(fmt::Error);
        }
        bytes = &bytes[(r as usize)..];
    }
    Ok(())
}

fn errno() -> i32 {
    // SAFETY: the calling thread's errno location is always valid.
    unsafe { *libc::__errno_location() }
}
