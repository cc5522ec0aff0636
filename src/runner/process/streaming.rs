//! Streaming helpers for subprocess output forwarding.

use std::io::{self, Read, Write};

/// Forwarding statistics for a child output stream.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub(super) struct ForwardStats {
    pub(super) bytes_read: u64,
    pub(super) write_failed: bool,
}

struct CountingReader<'a, R> {
    inner: &'a mut R,
    read: u64,
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        self.read = self.read.saturating_add(count as u64);
        Ok(count)
    }
}

/// Copy `reader` into `writer` until end of stream.
///
/// When the writer fails the rest of the stream is drained so the child never
/// blocks on a full pipe.
pub(super) fn forward_child_output<R, W>(
    mut reader: R,
    mut writer: W,
    stream_name: &'static str,
) -> ForwardStats
where
    R: Read,
    W: Write,
{
    let mut stats = ForwardStats::default();
    let mut counting = CountingReader {
        inner: &mut reader,
        read: 0,
    };
    if let Err(err) = io::copy(&mut counting, &mut writer) {
        stats.write_failed = true;
        tracing::debug!(
            "Failed to write child {stream_name} output to parent: {err}; discarding remaining bytes"
        );
        if let Err(drain_err) = io::copy(&mut counting, &mut io::sink()) {
            tracing::debug!(
                "Failed to drain child {stream_name} output after writer closed: {drain_err}"
            );
        }
    }
    stats.bytes_read = counting.read;
    stats
}
