//! Byte-order aware wire reader and writer
//!
//! Every multi-byte field of the setup exchange goes through one of these,
//! so the negotiated byte order is carried by the session instead of being
//! looked up at each call site.

use super::*;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Reads protocol fields from a stream in a fixed byte order
pub struct WireReader<R> {
    inner: R,
    byte_order: ByteOrder,
    consumed: usize,
}

impl<R: Read> WireReader<R> {
    pub fn new(inner: R, byte_order: ByteOrder) -> Self {
        WireReader {
            inner,
            byte_order,
            consumed: 0,
        }
    }

    /// Number of bytes consumed so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn read_u8(&mut self, field: &'static str) -> SetupResult<u8> {
        let value = self
            .inner
            .read_u8()
            .map_err(|e| SetupError::from_read(e, field))?;
        self.consumed += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self, field: &'static str) -> SetupResult<u16> {
        let value = match self.byte_order {
            ByteOrder::MSBFirst => self.inner.read_u16::<BigEndian>(),
            ByteOrder::LSBFirst => self.inner.read_u16::<LittleEndian>(),
        }
        .map_err(|e| SetupError::from_read(e, field))?;
        self.consumed += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self, field: &'static str) -> SetupResult<u32> {
        let value = match self.byte_order {
            ByteOrder::MSBFirst => self.inner.read_u32::<BigEndian>(),
            ByteOrder::LSBFirst => self.inner.read_u32::<LittleEndian>(),
        }
        .map_err(|e| SetupError::from_read(e, field))?;
        self.consumed += 4;
        Ok(value)
    }

    pub fn read_bool(&mut self, field: &'static str) -> SetupResult<bool> {
        Ok(self.read_u8(field)? != 0)
    }

    pub fn read_bytes(&mut self, len: usize, field: &'static str) -> SetupResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| SetupError::from_read(e, field))?;
        self.consumed += len;
        Ok(buf)
    }

    /// Read and discard `len` unused bytes
    pub fn skip(&mut self, len: usize, field: &'static str) -> SetupResult<()> {
        let mut buf = [0u8; 8];
        let mut left = len;
        while left > 0 {
            let n = left.min(buf.len());
            self.inner
                .read_exact(&mut buf[..n])
                .map_err(|e| SetupError::from_read(e, field))?;
            self.consumed += n;
            left -= n;
        }
        Ok(())
    }

    /// Skip the padding that follows a `len`-byte string
    pub fn skip_padding(&mut self, len: usize, field: &'static str) -> SetupResult<()> {
        self.skip(pad(len), field)
    }

    /// Read `len` bytes followed by their padding
    pub fn read_padded(&mut self, len: usize, field: &'static str) -> SetupResult<Vec<u8>> {
        let bytes = self.read_bytes(len, field)?;
        self.skip_padding(len, field)?;
        Ok(bytes)
    }
}

/// Writes protocol fields in a fixed byte order
pub struct WireWriter<W> {
    inner: W,
    byte_order: ByteOrder,
}

impl<W: Write> WireWriter<W> {
    pub fn new(inner: W, byte_order: ByteOrder) -> Self {
        WireWriter { inner, byte_order }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.inner.write_u8(value)
    }

    pub fn write_u16(&mut self, value: u16) -> io::Result<()> {
        match self.byte_order {
            ByteOrder::MSBFirst => self.inner.write_u16::<BigEndian>(value),
            ByteOrder::LSBFirst => self.inner.write_u16::<LittleEndian>(value),
        }
    }

    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        match self.byte_order {
            ByteOrder::MSBFirst => self.inner.write_u32::<BigEndian>(value),
            ByteOrder::LSBFirst => self.inner.write_u32::<LittleEndian>(value),
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    /// Write `bytes` followed by zero padding up to a 4-byte boundary
    pub fn write_padded(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)?;
        self.inner.write_all(&[0u8; 3][..pad(bytes.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_both_orders() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc];

        let mut msb = WireReader::new(Cursor::new(&data[..]), ByteOrder::MSBFirst);
        assert_eq!(msb.read_u16("a").unwrap(), 0x1234);
        assert_eq!(msb.read_u32("b").unwrap(), 0x56789abc);

        let mut lsb = WireReader::new(Cursor::new(&data[..]), ByteOrder::LSBFirst);
        assert_eq!(lsb.read_u16("a").unwrap(), 0x3412);
        assert_eq!(lsb.read_u32("b").unwrap(), 0xbc9a7856);
        assert_eq!(lsb.consumed(), 6);
    }

    #[test]
    fn test_writer_matches_reader() {
        for order in [ByteOrder::MSBFirst, ByteOrder::LSBFirst] {
            let mut writer = WireWriter::new(Vec::new(), order);
            writer.write_u8(0xfe).unwrap();
            writer.write_u16(0xbeef).unwrap();
            writer.write_u32(0xdeadbeef).unwrap();
            let bytes = writer.into_inner();
            assert_eq!(bytes.len(), 7);

            let mut reader = WireReader::new(Cursor::new(bytes), order);
            assert_eq!(reader.read_u8("a").unwrap(), 0xfe);
            assert_eq!(reader.read_u16("b").unwrap(), 0xbeef);
            assert_eq!(reader.read_u32("c").unwrap(), 0xdeadbeef);
        }
    }

    #[test]
    fn test_short_read_names_field() {
        let mut reader = WireReader::new(Cursor::new(vec![1u8, 2, 3]), ByteOrder::LSBFirst);
        match reader.read_u32("release number") {
            Err(SetupError::ShortRead { field }) => assert_eq!(field, "release number"),
            other => panic!("expected short read, got {:?}", other),
        }
    }

    #[test]
    fn test_padded_string() {
        let mut writer = WireWriter::new(Vec::new(), ByteOrder::LSBFirst);
        writer.write_padded(b"hello").unwrap();
        writer.write_u8(9).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(bytes.len(), 9);
        assert_eq!(&bytes[5..8], &[0, 0, 0]);

        let mut reader = WireReader::new(Cursor::new(bytes), ByteOrder::LSBFirst);
        assert_eq!(reader.read_padded(5, "s").unwrap(), b"hello");
        assert_eq!(reader.read_u8("tail").unwrap(), 9);
        assert_eq!(reader.consumed(), 9);
    }

    #[test]
    fn test_skip_long_run() {
        let mut reader = WireReader::new(Cursor::new(vec![0u8; 21]), ByteOrder::MSBFirst);
        reader.skip(20, "unused").unwrap();
        assert_eq!(reader.consumed(), 20);
        assert!(reader.skip(2, "unused").unwrap_err().is_short_read());
    }
}
