use super::types::{ParseError, ParseErrorKind};

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkScan {
    pub chunks: Vec<Vec<u8>>,
    pub remainder: Vec<u8>,
}

impl ChunkScan {
    pub fn terminal(&self) -> bool {
        self.chunks.last().is_some_and(|chunk| chunk.is_empty())
    }
}

/// Extracts every complete chunked-encoding chunk from `buffer`. The
/// terminal (size-zero) chunk is reported as an empty payload and its
/// marker is left in the remainder, so callers can detect completion
/// without losing bytes. An incomplete trailing chunk stays in the
/// remainder untouched.
pub fn extract_chunks(buffer: &[u8]) -> Result<ChunkScan, ParseError> {
    let mut chunks = Vec::new();
    let mut cursor = 0;

    while cursor < buffer.len() {
        let Some(line_end) = find_crlf(buffer, cursor) else {
            break;
        };

        let line = std::str::from_utf8(&buffer[cursor..line_end]).map_err(|_| ParseError {
            kind: ParseErrorKind::InvalidChunkSize,
            offset: cursor,
        })?;
        let size_str = line
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .trim_start_matches("0x");

        if size_str.is_empty() {
            cursor = line_end + CRLF.len();
            continue;
        }

        let size = usize::from_str_radix(size_str, 16).map_err(|_| ParseError {
            kind: ParseErrorKind::InvalidChunkSize,
            offset: cursor,
        })?;

        if size == 0 {
            chunks.push(Vec::new());
            return Ok(ChunkScan {
                chunks,
                remainder: buffer[cursor..].to_vec(),
            });
        }

        let data_start = line_end + CRLF.len();
        // A declared size near usize::MAX is hostile, not pending data.
        let Some(span_end) = data_start
            .checked_add(size)
            .and_then(|end| end.checked_add(CRLF.len()))
        else {
            return Err(ParseError {
                kind: ParseErrorKind::InvalidChunkSize,
                offset: cursor,
            });
        };
        if span_end > buffer.len() {
            break;
        }
        let data_end = data_start + size;
        if &buffer[data_end..data_end + CRLF.len()] != CRLF {
            return Err(ParseError {
                kind: ParseErrorKind::InvalidChunkTerminator,
                offset: data_end,
            });
        }

        chunks.push(buffer[data_start..data_end].to_vec());
        cursor = data_end + CRLF.len();
    }

    Ok(ChunkScan {
        chunks,
        remainder: buffer[cursor..].to_vec(),
    })
}

fn find_crlf(buffer: &[u8], start: usize) -> Option<usize> {
    twoway::find_bytes(&buffer[start..], CRLF).map(|offset| start + offset)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::extract_chunks;
    use crate::types::ParseErrorKind;

    #[test]
    fn extracts_two_chunks_and_terminal() {
        let scan = extract_chunks(b"5\r\nhello\r\n5\r\nworld\r\n0\r\n\r\n").unwrap();
        assert_eq!(scan.chunks, vec![b"hello".to_vec(), b"world".to_vec(), Vec::new()]);
        assert_eq!(scan.remainder, b"0\r\n\r\n".to_vec());
        assert!(scan.terminal());
    }

    #[test]
    fn terminal_only_input_yields_empty_chunk() {
        let scan = extract_chunks(b"0\r\n\r\n").unwrap();
        assert_eq!(scan.chunks, vec![Vec::<u8>::new()]);
        assert!(scan.terminal());
    }

    #[test]
    fn incomplete_chunk_stays_in_remainder() {
        let scan = extract_chunks(b"5\r\nhel").unwrap();
        assert!(scan.chunks.is_empty());
        assert_eq!(scan.remainder, b"5\r\nhel".to_vec());
        assert!(!scan.terminal());
    }

    #[test]
    fn incomplete_size_line_stays_in_remainder() {
        let scan = extract_chunks(b"1f").unwrap();
        assert!(scan.chunks.is_empty());
        assert_eq!(scan.remainder, b"1f".to_vec());
    }

    #[test]
    fn skips_blank_size_lines() {
        let scan = extract_chunks(b"\r\n3\r\nabc\r\n").unwrap();
        assert_eq!(scan.chunks, vec![b"abc".to_vec()]);
        assert!(scan.remainder.is_empty());
    }

    #[test]
    fn accepts_chunk_extensions() {
        let scan = extract_chunks(b"3;ext=1\r\nabc\r\n").unwrap();
        assert_eq!(scan.chunks, vec![b"abc".to_vec()]);
    }

    #[test]
    fn rejects_malformed_size_line() {
        let error = extract_chunks(b"zz\r\nabc\r\n").unwrap_err();
        assert_matches!(error.kind, ParseErrorKind::InvalidChunkSize);
    }

    #[test]
    fn rejects_overflowing_declared_size() {
        let error = extract_chunks(b"ffffffffffffffff\r\n").unwrap_err();
        assert_matches!(error.kind, ParseErrorKind::InvalidChunkSize);
    }

    #[test]
    fn rejects_missing_chunk_terminator() {
        let error = extract_chunks(b"3\r\nabcXX").unwrap_err();
        assert_matches!(error.kind, ParseErrorKind::InvalidChunkTerminator);
    }

    #[test]
    fn extraction_is_fragmentation_independent() {
        let input = b"4\r\nwiki\r\n5\r\npedia\r\n0\r\n\r\n";
        for split in 0..input.len() {
            let mut buffer = input[..split].to_vec();
            let first = extract_chunks(&buffer).unwrap();
            let mut body: Vec<u8> = first.chunks.concat();

            buffer = first.remainder;
            buffer.extend_from_slice(&input[split..]);
            let second = extract_chunks(&buffer).unwrap();
            body.extend(second.chunks.concat());

            assert_eq!(body, b"wikipedia".to_vec(), "split at {split}");
            assert!(second.terminal());
        }
    }
}
