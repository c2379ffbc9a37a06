use crate::error::BinaryError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Cursor over an immutable byte buffer. The plain `read_*`/`write_*` methods
/// are big-endian, matching the datagram header; the `_le` variants exist for
/// message bodies that are little-endian on the wire instead.
#[derive(Debug, Clone)]
pub struct BinaryReader {
    buffer: Bytes,
}

impl BinaryReader {
    pub fn new(buffer: Bytes) -> Self {
        Self { buffer }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.remaining()
    }

    fn require(&self, needed: usize) -> Result<(), BinaryError> {
        if self.buffer.remaining() < needed {
            return Err(BinaryError::UnexpectedEof {
                needed,
                remaining: self.buffer.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, BinaryError> {
        self.require(1)?;
        Ok(self.buffer.get_u8())
    }

    pub fn read_i8(&mut self) -> Result<i8, BinaryError> {
        self.require(1)?;
        Ok(self.buffer.get_i8())
    }

    pub fn read_bool(&mut self) -> Result<bool, BinaryError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, BinaryError> {
        self.require(2)?;
        Ok(self.buffer.get_u16())
    }

    pub fn read_i16(&mut self) -> Result<i16, BinaryError> {
        self.require(2)?;
        Ok(self.buffer.get_i16())
    }

    pub fn read_u32(&mut self) -> Result<u32, BinaryError> {
        self.require(4)?;
        Ok(self.buffer.get_u32())
    }

    pub fn read_i32(&mut self) -> Result<i32, BinaryError> {
        self.require(4)?;
        Ok(self.buffer.get_i32())
    }

    pub fn read_u64(&mut self) -> Result<u64, BinaryError> {
        self.require(8)?;
        Ok(self.buffer.get_u64())
    }

    pub fn read_i64(&mut self) -> Result<i64, BinaryError> {
        self.require(8)?;
        Ok(self.buffer.get_i64())
    }

    pub fn read_f32(&mut self) -> Result<f32, BinaryError> {
        self.require(4)?;
        Ok(self.buffer.get_f32())
    }

    pub fn read_f64(&mut self) -> Result<f64, BinaryError> {
        self.require(8)?;
        Ok(self.buffer.get_f64())
    }

    pub fn read_u16_le(&mut self) -> Result<u16, BinaryError> {
        self.require(2)?;
        Ok(self.buffer.get_u16_le())
    }

    pub fn read_i16_le(&mut self) -> Result<i16, BinaryError> {
        self.require(2)?;
        Ok(self.buffer.get_i16_le())
    }

    pub fn read_u32_le(&mut self) -> Result<u32, BinaryError> {
        self.require(4)?;
        Ok(self.buffer.get_u32_le())
    }

    pub fn read_i32_le(&mut self) -> Result<i32, BinaryError> {
        self.require(4)?;
        Ok(self.buffer.get_i32_le())
    }

    pub fn read_u64_le(&mut self) -> Result<u64, BinaryError> {
        self.require(8)?;
        Ok(self.buffer.get_u64_le())
    }

    pub fn read_i64_le(&mut self) -> Result<i64, BinaryError> {
        self.require(8)?;
        Ok(self.buffer.get_i64_le())
    }

    pub fn read_f32_le(&mut self) -> Result<f32, BinaryError> {
        self.require(4)?;
        Ok(self.buffer.get_f32_le())
    }

    pub fn read_f64_le(&mut self) -> Result<f64, BinaryError> {
        self.require(8)?;
        Ok(self.buffer.get_f64_le())
    }

    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<(), BinaryError> {
        self.require(out.len())?;
        self.buffer.copy_to_slice(out);
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes, BinaryError> {
        self.require(len)?;
        Ok(self.buffer.copy_to_bytes(len))
    }

    /// Consumes every remaining byte, used to lift a message body out from
    /// under a fixed-size header.
    pub fn read_rest(&mut self) -> Bytes {
        let len = self.buffer.remaining();
        self.buffer.copy_to_bytes(len)
    }
}

/// Growable byte sink; mirrors `BinaryReader`'s method names so codec code
/// reads symmetrically.
#[derive(Debug, Clone, Default)]
pub struct BinaryWriter {
    buffer: BytesMut,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), BinaryError> {
        self.buffer.put_u8(value);
        Ok(())
    }

    pub fn write_i8(&mut self, value: i8) -> Result<(), BinaryError> {
        self.buffer.put_i8(value);
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), BinaryError> {
        self.write_u8(value as u8)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), BinaryError> {
        self.buffer.put_u16(value);
        Ok(())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<(), BinaryError> {
        self.buffer.put_i16(value);
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), BinaryError> {
        self.buffer.put_u32(value);
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), BinaryError> {
        self.buffer.put_i32(value);
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), BinaryError> {
        self.buffer.put_u64(value);
        Ok(())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), BinaryError> {
        self.buffer.put_i64(value);
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<(), BinaryError> {
        self.buffer.put_f32(value);
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<(), BinaryError> {
        self.buffer.put_f64(value);
        Ok(())
    }

    pub fn write_u16_le(&mut self, value: u16) -> Result<(), BinaryError> {
        self.buffer.put_u16_le(value);
        Ok(())
    }

    pub fn write_i16_le(&mut self, value: i16) -> Result<(), BinaryError> {
        self.buffer.put_i16_le(value);
        Ok(())
    }

    pub fn write_u32_le(&mut self, value: u32) -> Result<(), BinaryError> {
        self.buffer.put_u32_le(value);
        Ok(())
    }

    pub fn write_i32_le(&mut self, value: i32) -> Result<(), BinaryError> {
        self.buffer.put_i32_le(value);
        Ok(())
    }

    pub fn write_u64_le(&mut self, value: u64) -> Result<(), BinaryError> {
        self.buffer.put_u64_le(value);
        Ok(())
    }

    pub fn write_i64_le(&mut self, value: i64) -> Result<(), BinaryError> {
        self.buffer.put_i64_le(value);
        Ok(())
    }

    pub fn write_f32_le(&mut self, value: f32) -> Result<(), BinaryError> {
        self.buffer.put_f32_le(value);
        Ok(())
    }

    pub fn write_f64_le(&mut self, value: f64) -> Result<(), BinaryError> {
        self.buffer.put_f64_le(value);
        Ok(())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), BinaryError> {
        self.buffer.put_slice(data);
        Ok(())
    }

    pub fn freeze(self) -> Bytes {
        self.buffer.freeze()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_primitives() {
        let mut writer = BinaryWriter::new();
        writer.write_u16(0xBEEF).unwrap();
        writer.write_i8(-5).unwrap();
        writer.write_f32(3.5).unwrap();
        writer.write_bytes(&[1, 2, 3]).unwrap();

        let mut reader = BinaryReader::new(writer.freeze());
        assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
        assert_eq!(reader.read_i8().unwrap(), -5);
        assert_eq!(reader.read_f32().unwrap(), 3.5);
        assert_eq!(reader.read_bytes(3).unwrap().as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn little_endian_variants_round_trip_and_disagree_with_big_endian() {
        let mut writer = BinaryWriter::new();
        writer.write_u32_le(0x01020304).unwrap();
        writer.write_f64_le(-12.5).unwrap();
        let bytes = writer.freeze();

        let mut reader = BinaryReader::new(bytes.clone());
        assert_eq!(reader.read_u32_le().unwrap(), 0x01020304);
        assert_eq!(reader.read_f64_le().unwrap(), -12.5);

        let mut big_endian_reader = BinaryReader::new(bytes);
        assert_ne!(big_endian_reader.read_u32().unwrap(), 0x01020304);
    }

    #[test]
    fn reports_unexpected_eof() {
        let mut reader = BinaryReader::new(Bytes::from_static(&[0u8]));
        assert!(matches!(
            reader.read_u32(),
            Err(BinaryError::UnexpectedEof { .. })
        ));
    }
}
