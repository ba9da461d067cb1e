pub mod config;
pub mod decompress;
pub mod framer;
pub mod pipeline;

pub mod errors {
    error_chain::error_chain! {
        foreign_links {
            IoError(std::io::Error);
            JsonError(serde_json::Error);
        }

        errors {
            Decompression(offset: u64) {
                description("malformed gzip stream")
                display("malformed gzip stream (detected after {} compressed bytes)", offset)
            }
            Framing(byte: u8, position: u64) {
                description("unexpected byte where an object should start")
                display("expected an object to start at offset {} but found byte 0x{:02x}", position, byte)
            }
            TruncatedObject(start: u64, pending: usize) {
                description("stream ended inside an object")
                display("stream ended inside an object starting at offset {} ({} bytes pending)", start, pending)
            }
            InvalidConfig(reason: String) {
                description("invalid configuration")
                display("invalid configuration: {}", reason)
            }
        }
    }
}

pub use crate::config::{Config, Delimiters, DEFAULT_CHUNK_SIZE};
pub use crate::decompress::Decompressor;
pub use crate::framer::{Framer, Truncation};
pub use crate::pipeline::{Pipeline, Summary};
