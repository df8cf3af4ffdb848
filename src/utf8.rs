use crate::buffer::Buffer;
use crate::parser_diagnostics::FatalError;

/// Decodes UTF-8 on top of a [`Buffer`], one code point at a time.
///
/// Decoding is deliberately loose: malformed input never fails, it only
/// yields odd characters. Positions stay in bytes so that they can be fed
/// back to [`Utf8Decoder::set_pos`].
#[derive(Debug)]
pub struct Utf8Decoder {
    buffer: Buffer,
}

impl Utf8Decoder {
    /// Wraps `buffer`, consuming a leading byte order mark if present.
    pub fn new(mut buffer: Buffer) -> Result<Self, FatalError> {
        if buffer.peek()? == Some(0xEF) {
            buffer.read()?;
            let b1 = buffer.read()?;
            let b2 = buffer.read()?;
            if b1 != Some(0xBB) || b2 != Some(0xBF) {
                return Err(FatalError::IllegalByteOrderMark);
            }
        }
        Ok(Utf8Decoder { buffer })
    }

    pub fn read(&mut self) -> Result<Option<char>, FatalError> {
        // Continuation bytes cannot start a character; skip them.
        let lead = loop {
            match self.buffer.read()? {
                None => return Ok(None),
                Some(b) if b & 0xC0 == 0x80 => continue,
                Some(b) => break u32::from(b),
            }
        };
        let cp = if lead < 0x80 {
            lead
        } else if lead & 0xF0 == 0xF0 {
            let c1 = lead & 0x07;
            let c2 = self.continuation()?;
            let c3 = self.continuation()?;
            let c4 = self.continuation()?;
            (c1 << 18) | (c2 << 12) | (c3 << 6) | c4
        } else if lead & 0xE0 == 0xE0 {
            let c1 = lead & 0x0F;
            let c2 = self.continuation()?;
            let c3 = self.continuation()?;
            (c1 << 12) | (c2 << 6) | c3
        } else {
            let c1 = lead & 0x1F;
            let c2 = self.continuation()?;
            (c1 << 6) | c2
        };
        Ok(Some(
            char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER),
        ))
    }

    /// Low six bits of the next byte; a missing byte contributes nothing.
    fn continuation(&mut self) -> Result<u32, FatalError> {
        Ok(self.buffer.read()?.map_or(0, |b| u32::from(b & 0x3F)))
    }

    pub fn peek(&mut self) -> Result<Option<char>, FatalError> {
        let pos = self.pos();
        let ch = self.read()?;
        self.set_pos(pos)?;
        Ok(ch)
    }

    pub fn peek_byte(&mut self) -> Result<Option<u8>, FatalError> {
        self.buffer.peek()
    }

    pub fn pos(&self) -> usize {
        self.buffer.pos()
    }

    pub fn set_pos(&mut self, pos: usize) -> Result<(), FatalError> {
        self.buffer.set_pos(pos)
    }

    pub fn slice(&mut self, beg: usize, end: usize) -> Result<String, FatalError> {
        self.buffer.slice(beg, end)
    }
}
