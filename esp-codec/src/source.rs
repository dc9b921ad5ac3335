//! Packet intake from hex text.
//!
//! One packet per line, as contiguous hex digits. Whitespace inside a line is
//! ignored so `tcpdump -xx` style byte groups can be pasted as is; anything
//! after `#` is a comment; blank lines are skipped.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use crate::error::{CodecError, Result};

/// A packet read from the input, with the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexPacket {
    pub line: usize,
    pub bytes: Vec<u8>,
}

/// Decodes one input line. `Ok(None)` for blank and comment-only lines.
pub fn parse_line(line: usize, text: &str) -> Result<Option<Vec<u8>>> {
    let content = text.split_once('#').map_or(text, |(before, _)| before);
    let digits: String = content.split_whitespace().collect();
    if digits.is_empty() {
        return Ok(None);
    }
    hex::decode(&digits)
        .map(Some)
        .map_err(|source| CodecError::InvalidHex { line, source })
}

type BoxedInput = Box<dyn AsyncRead + Unpin + Send>;

/// Streams packets out of a hex text source line by line.
pub struct HexPacketReader<R> {
    path: PathBuf,
    lines: Lines<BufReader<R>>,
    line: usize,
}

impl<R: AsyncRead + Unpin> HexPacketReader<R> {
    /// `path` only names the source in errors.
    pub fn new(path: impl Into<PathBuf>, reader: R) -> Self {
        Self {
            path: path.into(),
            lines: BufReader::new(reader).lines(),
            line: 0,
        }
    }

    /// Next packet, or `None` at end of input.
    pub async fn next_packet(&mut self) -> Result<Option<HexPacket>> {
        loop {
            let Some(text) = self
                .lines
                .next_line()
                .await
                .map_err(|e| CodecError::input_read(&self.path, e))?
            else {
                return Ok(None);
            };
            self.line += 1;
            if let Some(bytes) = parse_line(self.line, &text)? {
                return Ok(Some(HexPacket {
                    line: self.line,
                    bytes,
                }));
            }
        }
    }
}

impl HexPacketReader<BoxedInput> {
    /// Opens `path`, or stdin when `path` is `-`.
    pub async fn open(path: &Path) -> Result<Self> {
        let input: BoxedInput = if path.as_os_str() == "-" {
            Box::new(tokio::io::stdin())
        } else {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| CodecError::input_read(path, e))?;
            Box::new(file)
        };
        Ok(Self::new(path, input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_skips_blank_and_comments() {
        assert_eq!(parse_line(1, "").unwrap(), None);
        assert_eq!(parse_line(2, "   # just a note").unwrap(), None);
        assert_eq!(
            parse_line(3, "00 01 0a ff # trailing note").unwrap(),
            Some(vec![0x00, 0x01, 0x0a, 0xff])
        );
    }

    #[test]
    fn parse_line_reports_bad_hex_with_line_number() {
        let err = parse_line(7, "0g").unwrap_err();
        assert!(matches!(err, CodecError::InvalidHex { line: 7, .. }));

        let err = parse_line(8, "abc").unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidHex {
                line: 8,
                source: hex::FromHexError::OddLength
            }
        ));
    }

    #[tokio::test]
    async fn reader_streams_packets() {
        let text: &[u8] = b"0102\n# skip\n\n  03 04 \n";
        let mut reader = HexPacketReader::new("inline", text);

        assert_eq!(
            reader.next_packet().await.unwrap(),
            Some(HexPacket {
                line: 1,
                bytes: vec![1, 2]
            })
        );
        assert_eq!(
            reader.next_packet().await.unwrap(),
            Some(HexPacket {
                line: 4,
                bytes: vec![3, 4]
            })
        );
        assert_eq!(reader.next_packet().await.unwrap(), None);
    }

    #[tokio::test]
    async fn dash_opens_stdin() {
        let reader = HexPacketReader::open(Path::new("-")).await.unwrap();
        assert_eq!(reader.path, PathBuf::from("-"));
    }

    #[tokio::test]
    async fn open_missing_file_is_an_input_error() {
        let err = HexPacketReader::open(Path::new("/nonexistent/packets.hex"))
            .await
            .err()
            .expect("file does not exist");
        assert!(matches!(err, CodecError::InputRead { .. }));
    }
}
