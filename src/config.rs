use crate::errors::*;
use error_chain::bail;

/// Number of compressed bytes requested from the source per read
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Bytes that open and close a top-level object
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Delimiters {
    pub open: u8,
    pub close: u8,
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters {
            open: b'{',
            close: b'}',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub chunk_size: usize,
    pub delimiters: Delimiters,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chunk_size: DEFAULT_CHUNK_SIZE,
            delimiters: Delimiters::default(),
        }
    }
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Config {
        self.chunk_size = chunk_size;
        self
    }

    pub fn delimiters(mut self, open: u8, close: u8) -> Config {
        self.delimiters = Delimiters { open, close };
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!(ErrorKind::InvalidConfig("chunk size must be non-zero".into()));
        }

        let Delimiters { open, close } = self.delimiters;
        if open == close {
            bail!(ErrorKind::InvalidConfig(format!(
                "open and close delimiters are both 0x{:02x}",
                open
            )));
        }
        for &byte in [open, close].iter() {
            // these carry meaning for the framer's whitespace and string handling
            if is_whitespace(byte) || byte == b'"' || byte == b'\\' {
                bail!(ErrorKind::InvalidConfig(format!(
                    "0x{:02x} cannot be used as a delimiter",
                    byte
                )));
            }
        }

        Ok(())
    }
}

/// Whitespace allowed between top-level objects
pub(crate) fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}
