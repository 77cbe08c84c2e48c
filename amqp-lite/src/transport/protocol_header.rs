//! The eight bytes that open every AMQP, TLS or SASL exchange:
//! `"AMQP"`, a protocol id and a three byte version

use amqp_lite_types::definitions::{MAJOR, MINOR, REVISION};
use bytes::Bytes;

const MAGIC: &[u8; 4] = b"AMQP";
const VERSION: [u8; 3] = [MAJOR, MINOR, REVISION];

/// Layer announced by a protocol header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolId {
    /// AMQP framing
    Amqp,
    /// TLS negotiation
    Tls,
    /// SASL negotiation
    Sasl,
}

impl ProtocolId {
    /// Wire value
    pub fn code(self) -> u8 {
        match self {
            ProtocolId::Amqp => 0,
            ProtocolId::Tls => 2,
            ProtocolId::Sasl => 3,
        }
    }

    /// Id for a wire value, if it is one this engine knows
    pub fn from_code(code: u8) -> Option<Self> {
        [ProtocolId::Amqp, ProtocolId::Tls, ProtocolId::Sasl]
            .into_iter()
            .find(|id| id.code() == code)
    }
}

/// A protocol header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolHeader {
    /// Layer that follows the header
    pub id: ProtocolId,
    /// Major, minor and revision number
    pub version: [u8; 3],
}

impl ProtocolHeader {
    /// Header with an explicit version
    pub fn new(id: ProtocolId, major: u8, minor: u8, revision: u8) -> Self {
        Self {
            id,
            version: [major, minor, revision],
        }
    }

    fn current(id: ProtocolId) -> Self {
        Self {
            id,
            version: VERSION,
        }
    }

    /// `AMQP 0 1 0 0`
    pub fn amqp() -> Self {
        Self::current(ProtocolId::Amqp)
    }

    /// `AMQP 2 1 0 0`
    pub fn tls() -> Self {
        Self::current(ProtocolId::Tls)
    }

    /// `AMQP 3 1 0 0`
    pub fn sasl() -> Self {
        Self::current(ProtocolId::Sasl)
    }

    /// Announces AMQP framing
    pub fn is_amqp(&self) -> bool {
        self.id == ProtocolId::Amqp
    }

    /// Announces TLS
    pub fn is_tls(&self) -> bool {
        self.id == ProtocolId::Tls
    }

    /// Announces SASL
    pub fn is_sasl(&self) -> bool {
        self.id == ProtocolId::Sasl
    }

    /// Whether the version is 1.0.0
    pub fn is_supported_version(&self) -> bool {
        self.version == VERSION
    }

    /// Reads a header, `None` when the magic or the protocol id is unknown
    pub fn parse(bytes: &[u8; 8]) -> Option<Self> {
        let (magic, rest) = bytes.split_at(4);
        if magic != MAGIC {
            return None;
        }
        let id = ProtocolId::from_code(rest[0])?;
        Some(Self::new(id, rest[1], rest[2], rest[3]))
    }

    /// Wire form
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(MAGIC);
        bytes[4] = self.id.code();
        bytes[5..].copy_from_slice(&self.version);
        bytes
    }
}

impl From<ProtocolHeader> for [u8; 8] {
    fn from(header: ProtocolHeader) -> Self {
        header.to_bytes()
    }
}

impl From<ProtocolHeader> for Bytes {
    fn from(header: ProtocolHeader) -> Self {
        Bytes::copy_from_slice(&header.to_bytes())
    }
}

/// The unparsed bytes are returned on failure
impl TryFrom<[u8; 8]> for ProtocolHeader {
    type Error = [u8; 8];

    fn try_from(bytes: [u8; 8]) -> Result<Self, Self::Error> {
        Self::parse(&bytes).ok_or(bytes)
    }
}
