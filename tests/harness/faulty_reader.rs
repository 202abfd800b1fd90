#![allow(dead_code)]

use std::io::{Error, ErrorKind, Read, Result};

/// Wraps a byte source and misbehaves in a controlled way.
pub struct FaultyReader<R: Read> {
    inner: R,
    fault: Fault,
    calls: usize,
    delivered: usize,
}

#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Never hand out more than `n` bytes per read call.
    ShortReads(usize),
    /// Fail every `n`-th read call with `ErrorKind::Interrupted`.
    InterruptedEvery(usize),
    /// Report end of data after `n` bytes have been delivered.
    EofAfter(usize),
    /// Fail with `ErrorKind::BrokenPipe` after `n` bytes have been delivered.
    BrokenAfter(usize),
}

impl<R: Read> FaultyReader<R> {
    pub fn new(inner: R, fault: Fault) -> Self {
        Self {
            inner,
            fault,
            calls: 0,
            delivered: 0,
        }
    }

    /// Number of `read` calls seen so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn read_at_most(&mut self, buf: &mut [u8], max: usize) -> Result<usize> {
        let len = buf.len().min(max);
        let n = self.inner.read(&mut buf[..len])?;
        self.delivered += n;
        Ok(n)
    }
}

impl<R: Read> Read for FaultyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.calls += 1;
        match self.fault {
            Fault::ShortReads(n) => self.read_at_most(buf, n.max(1)),
            Fault::InterruptedEvery(n) if n != 0 && self.calls % n == 0 => {
                Err(Error::from(ErrorKind::Interrupted))
            }
            Fault::InterruptedEvery(_) => self.read_at_most(buf, usize::MAX),
            Fault::EofAfter(n) => {
                let left = n.saturating_sub(self.delivered);
                if left == 0 {
                    return Ok(0);
                }
                self.read_at_most(buf, left)
            }
            Fault::BrokenAfter(n) => {
                let left = n.saturating_sub(self.delivered);
                if left == 0 {
                    return Err(Error::new(ErrorKind::BrokenPipe, "simulated source failure"));
                }
                self.read_at_most(buf, left)
            }
        }
    }
}
