//! Line sources for the two tile container formats.
//!
//! Both containers carry the same text content. The parser only ever asks
//! for the next line, so it runs unchanged against either source.

use bzip2::read::BzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::warn;

use crate::config::TerrainConfig;

/// Size of the decompressed block the bzip2 source buffers at a time.
pub const BZIP2_BLOCK_SIZE: usize = 64 * 1024;

/// Longest token the bzip2 source hands out, newline included.
pub const MAX_TOKEN_LEN: usize = 255;

/// A stream of text lines from a tile file.
pub trait TileSource {
    /// Next line, or `None` once the source is exhausted.
    ///
    /// A returned line may keep its trailing newline.
    fn next_line(&mut self) -> Option<String>;
}

/// Uncompressed tile text.
pub struct PlainSource<R> {
    reader: R,
}

impl PlainSource<BufReader<File>> {
    /// Open an uncompressed tile file.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> PlainSource<R> {
    /// Wrap an already open reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> TileSource for PlainSource<R> {
    fn next_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(e) => {
                warn!("stopped reading tile: {}", e);
                None
            }
        }
    }
}

/// Bzip2-compressed tile text.
///
/// Decompressed bytes are pulled a block at a time into a fixed buffer and
/// handed out as tokens ending at a newline or at [`MAX_TOKEN_LEN`] bytes,
/// whichever comes first.
pub struct Bzip2Source<R: Read> {
    decoder: BzDecoder<R>,
    block: Box<[u8]>,
    pos: usize,
    filled: usize,
    finished: bool,
}

impl Bzip2Source<BufReader<File>> {
    /// Open a bzip2-compressed tile file.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> Bzip2Source<R> {
    /// Wrap a reader positioned at the start of a bzip2 stream.
    pub fn new(reader: R) -> Self {
        Self {
            decoder: BzDecoder::new(reader),
            block: vec![0u8; BZIP2_BLOCK_SIZE].into_boxed_slice(),
            pos: 0,
            filled: 0,
            finished: false,
        }
    }

    /// Refill the block once it has been consumed. Returns false at the end
    /// of the stream or on a decode error.
    fn refill(&mut self) -> bool {
        if self.pos < self.filled {
            return true;
        }
        if self.finished {
            return false;
        }
        match self.decoder.read(&mut self.block) {
            Ok(0) => {
                self.finished = true;
                false
            }
            Ok(n) => {
                self.pos = 0;
                self.filled = n;
                true
            }
            Err(e) => {
                warn!("stopped reading compressed tile: {}", e);
                self.finished = true;
                false
            }
        }
    }
}

impl<R: Read> TileSource for Bzip2Source<R> {
    fn next_line(&mut self) -> Option<String> {
        let mut token = Vec::new();
        while token.len() < MAX_TOKEN_LEN && self.refill() {
            let byte = self.block[self.pos];
            self.pos += 1;
            if byte == 0 {
                break;
            }
            token.push(byte);
            if byte == b'\n' {
                break;
            }
        }
        if token.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&token).into_owned())
        }
    }
}

/// On-disk container of a tile file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// Plain text.
    Plain,
    /// Text inside a bzip2 stream.
    Bzip2,
}

impl Container {
    /// File suffix for this container.
    pub fn suffix(self, config: &TerrainConfig) -> &str {
        match self {
            Container::Plain => &config.plain_suffix,
            Container::Bzip2 => &config.compressed_suffix,
        }
    }

    /// Open a file as a line source of this container.
    pub fn open(self, path: &Path) -> std::io::Result<Box<dyn TileSource>> {
        Ok(match self {
            Container::Plain => Box::new(PlainSource::open(path)?),
            Container::Bzip2 => Box::new(Bzip2Source::open(path)?),
        })
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Container::Plain => write!(f, "plain"),
            Container::Bzip2 => write!(f, "bzip2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::{Cursor, Write};

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn drain(source: &mut dyn TileSource) -> Vec<String> {
        std::iter::from_fn(|| source.next_line()).collect()
    }

    #[test]
    fn test_plain_lines() {
        let mut source = PlainSource::new(Cursor::new("1\n-2\n3"));
        assert_eq!(drain(&mut source), vec!["1\n", "-2\n", "3"]);
        assert!(source.next_line().is_none());
    }

    #[test]
    fn test_bzip2_lines() {
        let mut source = Bzip2Source::new(Cursor::new(compress(b"122\n47\n123\n48\n")));
        assert_eq!(drain(&mut source), vec!["122\n", "47\n", "123\n", "48\n"]);
        assert!(source.next_line().is_none());
    }

    #[test]
    fn test_bzip2_long_token_is_split() {
        let long = "7".repeat(MAX_TOKEN_LEN + 10);
        let mut source = Bzip2Source::new(Cursor::new(compress(format!("{}\n", long).as_bytes())));
        let first = source.next_line().unwrap();
        assert_eq!(first.len(), MAX_TOKEN_LEN);
        assert_eq!(source.next_line().unwrap(), format!("{}\n", "7".repeat(10)));
        assert!(source.next_line().is_none());
    }

    #[test]
    fn test_bzip2_spans_blocks() {
        let mut text = String::new();
        for i in 0..20_000 {
            text.push_str(&format!("{}\n", i));
        }
        assert!(text.len() > BZIP2_BLOCK_SIZE);

        let mut source = Bzip2Source::new(Cursor::new(compress(text.as_bytes())));
        let lines = drain(&mut source);
        assert_eq!(lines.len(), 20_000);
        assert_eq!(lines[19_999], "19999\n");
    }

    #[test]
    fn test_corrupt_bzip2_ends_quietly() {
        let mut source = Bzip2Source::new(Cursor::new(b"not bzip2 at all".to_vec()));
        assert!(source.next_line().is_none());
    }

    #[test]
    fn test_container_suffix() {
        let config = TerrainConfig::default();
        assert_eq!(Container::Plain.suffix(&config), ".sdf");
        assert_eq!(Container::Bzip2.suffix(&config), ".sdf.bz");
    }
}
