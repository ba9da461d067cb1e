use crate::errors::*;
use flate2::write::GzDecoder;
use std::io::prelude::*;
use tracing::{trace, warn};

/// Pull source of decompressed bytes over a gzip-compressed reader.
///
/// Compressed input is read in bounded chunks and written into a flate2 write-side decoder whose
/// inner `Vec` collects the output. Each call to [`Decompressor::next_chunk`] hands that output
/// back to the caller, so only one chunk's worth of decompressed data is held here at a time.
pub struct Decompressor<R: Read> {
    source: R,
    decoder: GzDecoder<Vec<u8>>,
    read_buf: Vec<u8>,
    compressed_in: u64,
    decompressed_out: u64,
    // The first gzip member has been fully decoded, including its trailer
    member_done: bool,
    ignored_trailing: u64,
    finished: bool,
}

impl<R: Read> Decompressor<R> {
    pub fn new(source: R) -> Decompressor<R> {
        Decompressor {
            source,
            decoder: GzDecoder::new(Vec::new()),
            read_buf: Vec::new(),
            compressed_in: 0,
            decompressed_out: 0,
            member_done: false,
            ignored_trailing: 0,
            finished: false,
        }
    }

    /// Reads up to `max_size` compressed bytes and returns whatever they decompress to, which
    /// may be empty or larger than `max_size`. Returns `Ok(None)` once the source is exhausted
    /// and all decompressed output has been handed out.
    pub fn next_chunk(&mut self, max_size: usize) -> Result<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }
        if max_size == 0 {
            return Err(ErrorKind::InvalidConfig("chunk size must be non-zero".into()).into());
        }
        if self.read_buf.len() < max_size {
            self.read_buf.resize(max_size, 0);
        }

        let n = read_retrying(&mut self.source, &mut self.read_buf[..max_size])?;
        if n == 0 {
            let consumed = self.compressed_in;
            // Verifies the CRC32 and length trailer, failing on a truncated stream
            self.decoder
                .try_finish()
                .chain_err(|| ErrorKind::Decompression(consumed))?;
            self.finished = true;

            if self.ignored_trailing > 0 {
                warn!(
                    bytes = self.ignored_trailing,
                    "ignored data after the end of the gzip stream"
                );
            }

            let rest = self.take_output();
            trace!(decompressed = rest.len(), "compressed source exhausted");
            return Ok(if rest.is_empty() { None } else { Some(rest) });
        }

        self.compressed_in += n as u64;
        self.decode(n)?;

        let out = self.take_output();
        trace!(compressed = n, decompressed = out.len(), "decoded chunk");
        Ok(Some(out))
    }

    /// Total compressed bytes read from the source so far
    pub fn compressed_bytes(&self) -> u64 {
        self.compressed_in
    }

    /// Total decompressed bytes handed out so far
    pub fn decompressed_bytes(&self) -> u64 {
        self.decompressed_out
    }

    /// Bytes read after the end of the gzip member that were not decoded
    pub fn ignored_trailing_bytes(&self) -> u64 {
        self.ignored_trailing
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    fn decode(&mut self, n: usize) -> Result<()> {
        let consumed = self.compressed_in;
        let mut input = &self.read_buf[..n];

        while !input.is_empty() {
            if self.member_done {
                self.ignored_trailing += input.len() as u64;
                break;
            }

            // flate2 reports the number of input bytes parsed, and 0 once the member and its
            // trailer are complete
            let written = self
                .decoder
                .write(input)
                .chain_err(|| ErrorKind::Decompression(consumed))?;
            if written == 0 {
                self.member_done = true;
                continue;
            }
            input = &input[written..];
        }

        // The decoder keeps output in an internal buffer until flushed to the inner writer
        self.decoder
            .flush()
            .chain_err(|| ErrorKind::Decompression(consumed))?;
        Ok(())
    }

    fn take_output(&mut self) -> Vec<u8> {
        let out = std::mem::take(self.decoder.get_mut());
        self.decompressed_out += out.len() as u64;
        out
    }
}

fn read_retrying<R: Read>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    loop {
        match source.read(buf) {
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}
