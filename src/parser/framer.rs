//! Word framing for the legacy profile stream.
//!
//! The stream is a sequence of unsigned machine words, but neither the word
//! width nor the byte order is written down anywhere. [`WordReader::detect`]
//! works both out from the preamble once; everything after that reads plain
//! `u64` words and never looks at width or order again.

use crate::utils::config::{CORRUPT_PROFILE, MIN_HEADER_WORDS, PROFILE_MAGIC};
use crate::utils::error::ProfileError;
use log::debug;
use object::endian::{Endian, Endianness};
use std::io::{ErrorKind, Read};

/// Width of a single word in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordWidth {
    Four,
    Eight,
}

impl WordWidth {
    pub fn bytes(self) -> usize {
        match self {
            WordWidth::Four => 4,
            WordWidth::Eight => 8,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }
}

/// Detected layout of a profile stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordLayout {
    pub width: WordWidth,
    pub order: Endianness,
}

impl std::fmt::Display for WordLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let order = match self.order {
            Endianness::Little => "little-endian",
            Endianness::Big => "big-endian",
        };
        write!(f, "{}-bit {}", self.width.bits(), order)
    }
}

/// Result of trying to read one word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordRead {
    Word(u64),
    /// End of stream exactly on a word boundary
    End,
}

/// Reads words with an already resolved width and byte order
pub struct WordReader<R> {
    inner: R,
    layout: WordLayout,
}

impl<R: Read> WordReader<R> {
    /// Inspect the preamble and return a framed reader plus the header word count
    ///
    /// # Errors
    /// * `ProfileError::Format` - bad magic, truncated preamble or a header
    ///   word count below the minimum
    /// * `ProfileError::Io` - the underlying reader failed
    pub fn detect(inner: R) -> Result<(Self, u64), ProfileError> {
        let mut reader = WordReader {
            inner,
            layout: WordLayout {
                width: WordWidth::Four,
                order: Endianness::Little,
            },
        };

        let magic = reader.header_word()?;
        if magic != PROFILE_MAGIC {
            return Err(ProfileError::format(CORRUPT_PROFILE));
        }

        let mut count = reader.header_word()?;
        if count == 0 {
            // Two zero 32-bit words are one zero 64-bit magic.
            reader.layout.width = WordWidth::Eight;
            count = reader.header_word()?;
        }

        let width = reader.layout.width;
        if count >> (width.bits() / 2) != 0 {
            // Reinterpret the little-endian bytes already read as big-endian.
            reader.layout.order = Endianness::Big;
            count = reader.decode(&Endianness::Little.write_u64_bytes(count)[..width.bytes()]);
        }

        if count < MIN_HEADER_WORDS {
            return Err(ProfileError::format(CORRUPT_PROFILE));
        }

        debug!("Detected {} profile, {} header words", reader.layout, count);

        Ok((reader, count))
    }

    pub fn layout(&self) -> WordLayout {
        self.layout
    }

    /// Read one word, reporting a clean end of stream as [`WordRead::End`]
    ///
    /// A word cut short by the end of the stream is a format error.
    pub fn next_word(&mut self) -> Result<WordRead, ProfileError> {
        let size = self.layout.width.bytes();
        let mut buf = [0u8; 8];
        let mut filled = 0;

        while filled < size {
            match self.inner.read(&mut buf[filled..size]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ProfileError::Io(e)),
            }
        }

        match filled {
            0 => Ok(WordRead::End),
            n if n == size => Ok(WordRead::Word(self.decode(&buf[..size]))),
            n => Err(ProfileError::format(format!(
                "unexpected end of profile inside a word ({} of {} bytes)",
                n, size
            ))),
        }
    }

    /// Read one word that must be present
    pub fn read_word(&mut self, what: &str) -> Result<u64, ProfileError> {
        match self.next_word()? {
            WordRead::Word(w) => Ok(w),
            WordRead::End => Err(ProfileError::format(format!(
                "unexpected end of profile reading {}",
                what
            ))),
        }
    }

    /// Read exactly `n` words
    pub fn read_words(&mut self, n: u64, what: &str) -> Result<Vec<u64>, ProfileError> {
        // Cap the up-front allocation; the stream length bounds the rest.
        let mut words = Vec::with_capacity(n.min(1024) as usize);
        for _ in 0..n {
            words.push(self.read_word(what)?);
        }
        Ok(words)
    }

    fn header_word(&mut self) -> Result<u64, ProfileError> {
        match self.next_word() {
            Ok(WordRead::Word(w)) => Ok(w),
            Ok(WordRead::End) | Err(ProfileError::Format(_)) => {
                Err(ProfileError::format("truncated profile header"))
            }
            Err(e) => Err(e),
        }
    }

    fn decode(&self, bytes: &[u8]) -> u64 {
        let order = self.layout.order;
        match self.layout.width {
            WordWidth::Four => {
                u64::from(order.read_u32_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            WordWidth::Eight => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&bytes[..8]);
                order.read_u64_bytes(b)
            }
        }
    }
}
