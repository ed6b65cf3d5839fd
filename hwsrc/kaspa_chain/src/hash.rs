use crate::ser::{Deserializable, Error, Reader, Serializable, Stream};
use std::io;
use std::str::FromStr;
use std::{fmt, ops};

/// A 32-byte hash (transaction id). Displayed as lowercase hex in byte order,
/// without endianness reversal.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct H256([u8; 32]);

impl H256 {
    pub fn from_slice(slice: &[u8]) -> Result<H256, Error> {
        if slice.len() != 32 {
            return Err(Error::MalformedData(format!(
                "Expected a 32 bytes hash, found {} bytes",
                slice.len()
            )));
        }
        let mut hash = H256::default();
        hash.0.copy_from_slice(slice);
        Ok(hash)
    }

    pub fn to_hex(&self) -> String { hex::encode(self.0) }

    pub fn as_bytes(&self) -> &[u8; 32] { &self.0 }
}

impl From<[u8; 32]> for H256 {
    fn from(bytes: [u8; 32]) -> Self { H256(bytes) }
}

impl ops::Deref for H256 {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target { &self.0 }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.to_hex()) }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.to_hex()) }
}

impl FromStr for H256 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| Error::MalformedData(e.to_string()))?;
        H256::from_slice(&bytes)
    }
}

impl Serializable for H256 {
    fn serialize(&self, stream: &mut Stream) { stream.append_slice(&self.0); }
}

impl Deserializable for H256 {
    fn deserialize<R: io::Read>(reader: &mut Reader<R>) -> Result<Self, Error> {
        let mut hash = H256::default();
        reader.read_slice(&mut hash.0)?;
        Ok(hash)
    }
}

/// A 20-byte subnetwork identifier. The all-zero id denotes the native subnetwork
/// ordinary value transfers belong to.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct SubnetworkId([u8; 20]);

impl SubnetworkId {
    pub fn native() -> SubnetworkId { SubnetworkId::default() }

    pub fn is_native(&self) -> bool { self.0.iter().all(|byte| *byte == 0) }

    pub fn from_slice(slice: &[u8]) -> Result<SubnetworkId, Error> {
        if slice.len() != 20 {
            return Err(Error::MalformedData(format!(
                "Expected a 20 bytes subnetwork id, found {} bytes",
                slice.len()
            )));
        }
        let mut id = SubnetworkId::default();
        id.0.copy_from_slice(slice);
        Ok(id)
    }

    pub fn to_hex(&self) -> String { hex::encode(self.0) }
}

impl fmt::Debug for SubnetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.to_hex()) }
}

impl fmt::Display for SubnetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.to_hex()) }
}

impl FromStr for SubnetworkId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| Error::MalformedData(e.to_string()))?;
        SubnetworkId::from_slice(&bytes)
    }
}

impl Serializable for SubnetworkId {
    fn serialize(&self, stream: &mut Stream) { stream.append_slice(&self.0); }
}

impl Deserializable for SubnetworkId {
    fn deserialize<R: io::Read>(reader: &mut Reader<R>) -> Result<Self, Error> {
        let mut id = SubnetworkId::default();
        reader.read_slice(&mut id.0)?;
        Ok(id)
    }
}
