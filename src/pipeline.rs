use crate::config::Config;
use crate::decompress::Decompressor;
use crate::errors::*;
use crate::framer::{Framer, Truncation};
use bytes::Bytes;
use std::io::Read;
use tracing::{debug, warn};

/// Totals for a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub objects: u64,
    pub compressed_bytes: u64,
    pub decompressed_bytes: u64,
    /// Set when the stream ended partway through an object
    pub truncated: Option<Truncation>,
}

/// Drives a [`Decompressor`] into a [`Framer`], yielding complete objects from a gzip stream.
pub struct Pipeline<R: Read> {
    source: Decompressor<R>,
    framer: Framer,
    chunk_size: usize,
    objects: u64,
    exhausted: bool,
    failed: bool,
}

impl<R: Read> Pipeline<R> {
    pub fn new(reader: R, config: &Config) -> Result<Pipeline<R>> {
        config.validate()?;

        Ok(Pipeline {
            source: Decompressor::new(reader),
            framer: Framer::with_delimiters(config.delimiters),
            chunk_size: config.chunk_size,
            objects: 0,
            exhausted: false,
            failed: false,
        })
    }

    /// Returns the next complete object, pulling more compressed input as needed. `Ok(None)`
    /// means the stream has ended; check [`Pipeline::truncated`] for a dangling object.
    pub fn next_object(&mut self) -> Result<Option<Bytes>> {
        let result = self.advance();
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn advance(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(object) = self.framer.next_object()? {
                self.objects += 1;
                debug!(
                    index = self.objects,
                    len = object.len(),
                    "extracted object"
                );
                return Ok(Some(object));
            }

            if self.exhausted {
                return Ok(None);
            }

            match self.source.next_chunk(self.chunk_size)? {
                Some(chunk) => self.framer.extend(&chunk),
                None => self.exhausted = true,
            }
        }
    }

    /// The partial object left over once the stream is exhausted
    pub fn truncated(&self) -> Option<Truncation> {
        if self.exhausted {
            self.framer.pending()
        } else {
            None
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            objects: self.objects,
            compressed_bytes: self.source.compressed_bytes(),
            decompressed_bytes: self.source.decompressed_bytes(),
            truncated: self.truncated(),
        }
    }

    /// Pushes every object to `emit` until the stream ends. Errors from the decompressor, the
    /// framer or `emit` stop the run immediately.
    pub fn run<F>(mut self, mut emit: F) -> Result<Summary>
    where
        F: FnMut(Bytes) -> Result<()>,
    {
        while let Some(object) = self.next_object()? {
            emit(object)?;
        }

        let summary = self.summary();
        if let Some(ref truncation) = summary.truncated {
            warn!(%truncation, "stream ended inside an object");
        }
        Ok(summary)
    }
}

impl<R: Read> Iterator for Pipeline<R> {
    type Item = Result<Bytes>;

    /// Stops after the first error
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.next_object().transpose()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::errors::ErrorKind;
    use crate::pipeline::Pipeline;
    use flate2::write::GzEncoder;
    use std::io::prelude::*;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn iterates_objects() {
        let compressed = gzip(b"{\"a\":1}\n{\"b\":2}\n");
        let pipeline = Pipeline::new(&compressed[..], &Config::default()).unwrap();

        let objects = pipeline.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(objects, vec![&b"{\"a\":1}"[..], &b"{\"b\":2}"[..]]);
    }

    #[test]
    fn iterator_stops_after_error() {
        let compressed = gzip(b"{\"a\":1} oops {\"b\":2}");
        let mut pipeline = Pipeline::new(&compressed[..], &Config::default()).unwrap();

        assert!(pipeline.next().unwrap().is_ok());
        assert!(pipeline.next().unwrap().is_err());
        assert!(pipeline.next().is_none());
    }

    #[test]
    fn truncated_only_after_exhaustion() {
        let compressed = gzip(b"{\"a\":1} {\"b\":");
        let mut pipeline = Pipeline::new(&compressed[..], &Config::default()).unwrap();

        assert!(pipeline.next_object().unwrap().is_some());
        assert!(pipeline.truncated().is_none());
        assert!(pipeline.next_object().unwrap().is_none());

        let truncation = pipeline.truncated().unwrap();
        assert_eq!(truncation.start, 8);
        assert_eq!(truncation.pending, 5);
    }

    #[test]
    fn rejects_invalid_config() {
        let compressed = gzip(b"{}");
        let err = Pipeline::new(&compressed[..], &Config::new().chunk_size(0))
            .err()
            .unwrap();
        match *err.kind() {
            ErrorKind::InvalidConfig(_) => (),
            ref other => panic!("unexpected error kind: {:?}", other),
        }
    }
}
