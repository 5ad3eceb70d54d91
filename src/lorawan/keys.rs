//! LoRaWAN session keys and device addressing
//!
//! - NwkSKey authenticates the frame (MIC)
//! - AppSKey encrypts the application payload (FRMPayload)
//! - DevAddr identifies the device; printed MSB-first, transmitted LSB-first

use std::fmt;

use super::EncodeError;

/// 4-byte device address, stored MSB-first (the order hex dumps print it).
///
/// The wire format and the cipher/MIC blocks both want the reversed order;
/// [`DevAddr::to_wire`] performs that reversal explicitly so the convention
/// stays in one auditable place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevAddr([u8; 4]);

impl DevAddr {
    pub fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Parse from the usual 8-hex-digit form, e.g. `"260B7AC6"`.
    pub fn from_hex(s: &str) -> Result<Self, EncodeError> {
        let bytes = hex::decode(s).map_err(|_| EncodeError::InvalidAddressLength(s.len() / 2))?;
        Self::try_from(bytes.as_slice())
    }

    /// Reconstruct from the LSB-first order found in a received frame.
    pub fn from_wire(wire: [u8; 4]) -> Self {
        let mut bytes = wire;
        bytes.reverse();
        Self(bytes)
    }

    /// MSB-first bytes, as printed.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// LSB-first bytes: address byte 3 first, byte 0 last. This is the order
    /// used both on the wire (offset 1..5) and inside the counter/auth blocks.
    pub fn to_wire(&self) -> [u8; 4] {
        let mut wire = self.0;
        wire.reverse();
        wire
    }
}

impl TryFrom<&[u8]> for DevAddr {
    type Error = EncodeError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 4] = value
            .try_into()
            .map_err(|_| EncodeError::InvalidAddressLength(value.len()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for DevAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

/// 16-byte AES-128 session key. Opaque: `Debug` redacts the bytes so keys
/// never end up in logs.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SessionKey([u8; 16]);

impl SessionKey {
    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Parse from the usual 32-hex-digit form.
    pub fn from_hex(s: &str) -> Result<Self, EncodeError> {
        let bytes = hex::decode(s).map_err(|_| EncodeError::InvalidKeyLength(s.len() / 2))?;
        Self::try_from(bytes.as_slice())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl TryFrom<&[u8]> for SessionKey {
    type Error = EncodeError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 16] = value
            .try_into()
            .map_err(|_| EncodeError::InvalidKeyLength(value.len()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey(****)")
    }
}

/// The session key pair an external session manager supplies per device.
#[derive(Debug, Clone, Copy)]
pub struct SessionKeys {
    pub nwk_s_key: SessionKey,
    pub app_s_key: SessionKey,
}
