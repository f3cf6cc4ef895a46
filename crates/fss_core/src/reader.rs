use std::io::{self, Read, Seek, SeekFrom};

/// Fixed-width little-endian field reader over a seekable stream.
pub struct LittleEndianReader<R> {
    inner: R,
}

impl<R: Read + Seek> LittleEndianReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_i16(&mut self) -> io::Result<i16> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf)?;
        Ok(i16::from_le_bytes(buf))
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        self.ensure_remaining(n as u64, "byte run")?;
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read an `n`-byte field holding a NUL-terminated string. The whole
    /// field is consumed; bytes after the first NUL are ignored.
    pub fn read_fixed_string(&mut self, n: usize) -> io::Result<String> {
        let bytes = self.read_bytes(n)?;
        Ok(text_from_field(&bytes))
    }

    pub fn skip(&mut self, n: u64) -> io::Result<()> {
        self.ensure_remaining(n, "skipped bytes")?;
        self.inner.seek(SeekFrom::Current(n as i64))?;
        Ok(())
    }

    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    pub fn len(&mut self) -> io::Result<u64> {
        let cur = self.position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(cur))?;
        Ok(end)
    }

    pub fn is_empty(&mut self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn remaining(&mut self) -> io::Result<u64> {
        let cur = self.position()?;
        Ok(self.len()?.saturating_sub(cur))
    }

    /// Fail with `UnexpectedEof` unless at least `n` bytes are left.
    pub fn ensure_remaining(&mut self, n: u64, what: &str) -> io::Result<()> {
        let remaining = self.remaining()?;
        if remaining < n {
            let pos = self.position()?;
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated {what} at pos={pos}: need {n} bytes, {remaining} left"),
            ));
        }
        Ok(())
    }
}

/// Decode a fixed-width text field up to its first NUL. Old scenario files
/// were written by DOS tools, so invalid UTF-8 is replaced rather than
/// rejected.
pub fn text_from_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Encode `text` into exactly `width` bytes, truncating or NUL-padding.
pub fn field_from_text(text: &str, width: usize) -> Vec<u8> {
    let mut out = text.as_bytes().to_vec();
    out.truncate(width);
    out.resize(width, 0);
    out
}
