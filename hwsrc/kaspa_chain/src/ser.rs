//! Binary serialization primitives: a write stream, a read stream and the variable-length
//! integer used for list and byte-vector lengths.

use byteorder::{LittleEndian, ReadBytesExt};
use derive_more::Display;
use std::io;

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum Error {
    #[display(fmt = "Unexpected end of data")]
    UnexpectedEnd,
    #[display(fmt = "Malformed data: {}", _0)]
    MalformedData(String),
    #[display(fmt = "Data not fully consumed")]
    UnreadData,
}

impl From<io::Error> for Error {
    fn from(_: io::Error) -> Self { Error::UnexpectedEnd }
}

pub trait Serializable {
    fn serialize(&self, stream: &mut Stream);
}

pub trait Deserializable: Sized {
    fn deserialize<R: io::Read>(reader: &mut Reader<R>) -> Result<Self, Error>;
}

/// A growable byte sink values are appended to in wire order.
#[derive(Default)]
pub struct Stream {
    buffer: Vec<u8>,
}

impl Stream {
    pub fn new() -> Stream { Stream::default() }

    pub fn append<T: Serializable>(&mut self, value: &T) -> &mut Self {
        value.serialize(self);
        self
    }

    pub fn append_slice(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    /// Length-prefixed byte vector.
    pub fn append_var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.append(&CompactInteger::from(bytes.len()));
        self.append_slice(bytes)
    }

    /// Length-prefixed list.
    pub fn append_list<T: Serializable>(&mut self, list: &[T]) -> &mut Self {
        self.append(&CompactInteger::from(list.len()));
        for item in list {
            self.append(item);
        }
        self
    }

    pub fn out(self) -> Vec<u8> { self.buffer }
}

impl Serializable for u8 {
    fn serialize(&self, stream: &mut Stream) { stream.buffer.push(*self); }
}

impl Serializable for u16 {
    fn serialize(&self, stream: &mut Stream) { stream.buffer.extend_from_slice(&self.to_le_bytes()); }
}

impl Serializable for u32 {
    fn serialize(&self, stream: &mut Stream) { stream.buffer.extend_from_slice(&self.to_le_bytes()); }
}

impl Serializable for u64 {
    fn serialize(&self, stream: &mut Stream) { stream.buffer.extend_from_slice(&self.to_le_bytes()); }
}

pub struct Reader<R> {
    source: R,
}

impl<R: io::Read> Reader<R> {
    pub fn new(source: R) -> Reader<R> { Reader { source } }

    pub fn read<T: Deserializable>(&mut self) -> Result<T, Error> { T::deserialize(self) }

    pub fn read_u8(&mut self) -> Result<u8, Error> { Ok(self.source.read_u8()?) }

    pub fn read_u16(&mut self) -> Result<u16, Error> { Ok(self.source.read_u16::<LittleEndian>()?) }

    pub fn read_u32(&mut self) -> Result<u32, Error> { Ok(self.source.read_u32::<LittleEndian>()?) }

    pub fn read_u64(&mut self) -> Result<u64, Error> { Ok(self.source.read_u64::<LittleEndian>()?) }

    pub fn read_slice(&mut self, out: &mut [u8]) -> Result<(), Error> {
        self.source.read_exact(out)?;
        Ok(())
    }

    pub fn read_var_bytes(&mut self, max_len: usize) -> Result<Vec<u8>, Error> {
        let len = self.read::<CompactInteger>()?.as_usize();
        if len > max_len {
            return Err(Error::MalformedData(format!(
                "Byte vector of {} bytes exceeds the {} bytes limit",
                len, max_len
            )));
        }
        let mut bytes = vec![0u8; len];
        self.read_slice(&mut bytes)?;
        Ok(bytes)
    }

    pub fn read_list<T: Deserializable>(&mut self, max_len: usize) -> Result<Vec<T>, Error> {
        let len = self.read::<CompactInteger>()?.as_usize();
        if len > max_len {
            return Err(Error::MalformedData(format!(
                "List of {} items exceeds the {} items limit",
                len, max_len
            )));
        }
        let mut list = Vec::with_capacity(len);
        for _ in 0..len {
            list.push(self.read()?);
        }
        Ok(list)
    }

    fn is_finished(&mut self) -> bool {
        let mut probe = [0u8; 1];
        !matches!(self.source.read(&mut probe), Ok(n) if n > 0)
    }
}

impl Deserializable for u8 {
    fn deserialize<R: io::Read>(reader: &mut Reader<R>) -> Result<Self, Error> { reader.read_u8() }
}

impl Deserializable for u16 {
    fn deserialize<R: io::Read>(reader: &mut Reader<R>) -> Result<Self, Error> { reader.read_u16() }
}

impl Deserializable for u32 {
    fn deserialize<R: io::Read>(reader: &mut Reader<R>) -> Result<Self, Error> { reader.read_u32() }
}

impl Deserializable for u64 {
    fn deserialize<R: io::Read>(reader: &mut Reader<R>) -> Result<Self, Error> { reader.read_u64() }
}

/// A variable-length integer: values below `0xfd` take one byte, larger values are prefixed
/// with `0xfd`/`0xfe`/`0xff` and use 2/4/8 little-endian bytes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CompactInteger(u64);

impl CompactInteger {
    pub fn as_usize(&self) -> usize { self.0 as usize }
}

impl From<usize> for CompactInteger {
    fn from(i: usize) -> Self { CompactInteger(i as u64) }
}

impl From<u64> for CompactInteger {
    fn from(i: u64) -> Self { CompactInteger(i) }
}

impl From<CompactInteger> for u64 {
    fn from(i: CompactInteger) -> Self { i.0 }
}

impl Serializable for CompactInteger {
    fn serialize(&self, stream: &mut Stream) {
        match self.0 {
            0..=0xfc => {
                stream.append(&(self.0 as u8));
            },
            0xfd..=0xffff => {
                stream.append(&0xfdu8).append(&(self.0 as u16));
            },
            0x10000..=0xffff_ffff => {
                stream.append(&0xfeu8).append(&(self.0 as u32));
            },
            _ => {
                stream.append(&0xffu8).append(&self.0);
            },
        }
    }
}

impl Deserializable for CompactInteger {
    fn deserialize<R: io::Read>(reader: &mut Reader<R>) -> Result<Self, Error> {
        let value = match reader.read_u8()? {
            0xff => reader.read_u64()?,
            0xfe => reader.read_u32()? as u64,
            0xfd => reader.read_u16()? as u64,
            flag => flag as u64,
        };
        Ok(CompactInteger(value))
    }
}

pub fn serialize<T: Serializable>(value: &T) -> Vec<u8> {
    let mut stream = Stream::new();
    stream.append(value);
    stream.out()
}

pub fn deserialize<T: Deserializable>(data: &[u8]) -> Result<T, Error> {
    let mut reader = Reader::new(data);
    let value = reader.read()?;
    if !reader.is_finished() {
        return Err(Error::UnreadData);
    }
    Ok(value)
}
