use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::device::error::DeviceError;

/// Frames the raw device byte stream into lines.
///
/// The delimiter is not included in the yielded frames.
#[derive(Debug, Clone)]
pub(crate) struct LinesCodec {
    /// How far we have looked for a delimiter into the buffer
    cursor: usize,

    /// How to delimit incoming byte streams.
    delimiter: u8,
}

impl LinesCodec {
    pub(crate) fn new(delimiter: u8) -> Self {
        Self {
            cursor: 0,
            delimiter,
        }
    }
}

impl Default for LinesCodec {
    fn default() -> Self {
        Self::new(b'\n')
    }
}

impl Decoder for LinesCodec {
    type Item = Vec<u8>;
    type Error = DeviceError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let read_to = src.len();

        let look_at = &src[self.cursor..read_to];

        if let Some(position) = look_at.iter().position(|&byte| byte == self.delimiter) {
            // Since we might "start late" in the buffer (from the cursor),
            // the "global" position within the buffer has to be calculated.
            let actual_position = self.cursor + position;

            // Next time we start over.
            self.cursor = 0;

            // Split at the delimiter, getting a slice of the bytes before it.
            let line = src.split_to(actual_position);

            // Discard the delimiter by advancing the source buffer beyond it.
            src.advance(1);

            Ok(Some(line[..].to_vec()))
        } else {
            // No full frame yet.
            // The next call gets the same buffer with possibly more data,
            // so the bytes we already looked at need not be re-read.
            self.cursor = read_to;

            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut LinesCodec, buf: &mut BytesMut) -> Vec<Vec<u8>> {
        let mut frames = vec![];
        while let Some(frame) = codec.decode(buf).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn splits_lines_and_drops_delimiter() {
        let mut codec = LinesCodec::default();
        let mut buf = BytesMut::from(&b"{\"a\":1}\n{\"b\":2}\n"[..]);

        let frames = decode_all(&mut codec, &mut buf);

        assert_eq!(frames, vec![b"{\"a\":1}".to_vec(), b"{\"b\":2}".to_vec()]);
    }

    #[test]
    fn partial_line_yields_nothing_until_completed() {
        let mut codec = LinesCodec::default();
        let mut buf = BytesMut::from(&b"{\"a\""[..]);

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b":1}\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(b"{\"a\":1}".to_vec()));
    }

    #[test]
    fn empty_line_yields_empty_frame() {
        let mut codec = LinesCodec::default();
        let mut buf = BytesMut::from(&b"\n"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(vec![]));
    }
}
