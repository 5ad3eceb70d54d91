pub mod crypto;
pub mod encoder;
pub mod keys;

use std::fmt;

use thiserror::Error;

pub use encoder::UplinkBuilder;
pub use keys::{DevAddr, SessionKey, SessionKeys};

/// LoRaWAN MAC Header (MHDR) - Message Type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MType {
    JoinRequest,
    JoinAccept,
    UnconfirmedDataUp,
    UnconfirmedDataDown,
    ConfirmedDataUp,
    ConfirmedDataDown,
    RejoinRequest,
    Proprietary,
}

impl MType {
    /// The MHDR byte for this type: MType(3 bits) | RFU(3 bits) | Major(2 bits),
    /// Major = 0b00 (LoRaWAN R1).
    pub fn mhdr(self) -> u8 {
        let mtype: u8 = match self {
            MType::JoinRequest => 0b000,
            MType::JoinAccept => 0b001,
            MType::UnconfirmedDataUp => 0b010,
            MType::UnconfirmedDataDown => 0b011,
            MType::ConfirmedDataUp => 0b100,
            MType::ConfirmedDataDown => 0b101,
            MType::RejoinRequest => 0b110,
            MType::Proprietary => 0b111,
        };
        mtype << 5
    }
}

impl TryFrom<u8> for MType {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match (value >> 5) & 0x07 {
            0b000 => Ok(MType::JoinRequest),
            0b001 => Ok(MType::JoinAccept),
            0b010 => Ok(MType::UnconfirmedDataUp),
            0b011 => Ok(MType::UnconfirmedDataDown),
            0b100 => Ok(MType::ConfirmedDataUp),
            0b101 => Ok(MType::ConfirmedDataDown),
            0b110 => Ok(MType::RejoinRequest),
            0b111 => Ok(MType::Proprietary),
            _ => unreachable!(),
        }
    }
}

impl fmt::Display for MType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MType::JoinRequest => write!(f, "JoinRequest"),
            MType::JoinAccept => write!(f, "JoinAccept"),
            MType::UnconfirmedDataUp => write!(f, "UnconfirmedDataUp"),
            MType::UnconfirmedDataDown => write!(f, "UnconfirmedDataDown"),
            MType::ConfirmedDataUp => write!(f, "ConfirmedDataUp"),
            MType::ConfirmedDataDown => write!(f, "ConfirmedDataDown"),
            MType::RejoinRequest => write!(f, "RejoinRequest"),
            MType::Proprietary => write!(f, "Proprietary"),
        }
    }
}

/// Frame direction byte, as it appears in the counter and auth blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    Uplink = 0x00,
    Downlink = 0x01,
}

/// Input-validation failures of the encoder core.
///
/// All of these are detected before any cryptographic work begins and none
/// are retryable; the assembler either returns a complete frame or one of
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Block cipher input was not exactly 16 bytes (programming error).
    #[error("cipher block must be 16 bytes, got {0}")]
    InvalidBlockLength(usize),

    /// Session key was not exactly 16 bytes.
    #[error("session key must be 16 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Device address was not exactly 4 bytes.
    #[error("device address must be 4 bytes, got {0}")]
    InvalidAddressLength(usize),

    /// Plaintext would need more than 255 counter blocks.
    #[error("payload of {0} bytes exceeds the 255-block keystream limit")]
    PayloadTooLarge(usize),

    /// Pre-MIC frame over 255 bytes would wrap the auth block length byte.
    #[error("frame of {0} bytes overflows the 8-bit MIC length field")]
    FrameTooLarge(usize),
}

/// Frame Control byte (FCtrl) for uplink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FCtrl {
    pub adr: bool,
    pub adr_ack_req: bool,
    pub ack: bool,
    pub class_b: bool,
    pub f_opts_len: u8,
}

/// Decoded uplink data frame. `frm_payload` is still encrypted; decrypt it
/// with [`crypto::decrypt_frm_payload`] and the AppSKey.
#[derive(Debug, Clone)]
pub struct UplinkFrame {
    pub mtype: MType,
    pub dev_addr: DevAddr,
    pub fctrl: FCtrl,
    pub fcnt: u16,
    pub f_opts: Vec<u8>,
    pub f_port: Option<u8>,
    pub frm_payload: Vec<u8>,
    pub mic: [u8; 4],
}

impl fmt::Display for UplinkFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} DevAddr={} FCnt={} FPort={} Payload={} bytes MIC={}",
            self.mtype,
            self.dev_addr,
            self.fcnt,
            self.f_port.map(|p| p.to_string()).unwrap_or("-".to_string()),
            self.frm_payload.len(),
            hex::encode(self.mic),
        )
    }
}

/// Decode an uplink data frame (raw PHYPayload bytes).
///
/// Only unconfirmed data up is accepted; everything else this crate does
/// not emit and the decoder rejects by message type.
pub fn decode_uplink(data: &[u8]) -> anyhow::Result<UplinkFrame> {
    if data.is_empty() {
        return Err(anyhow::anyhow!("Empty PHY payload"));
    }

    let mtype = MType::try_from(data[0])?;
    if mtype != MType::UnconfirmedDataUp {
        return Err(anyhow::anyhow!("Not an unconfirmed uplink: {}", mtype));
    }

    // Minimum: MHDR(1) + DevAddr(4) + FCtrl(1) + FCnt(2) + MIC(4) = 12 bytes
    if data.len() < 12 {
        return Err(anyhow::anyhow!(
            "Data frame too short: {} bytes (minimum 12)",
            data.len()
        ));
    }

    // DevAddr is little-endian on the wire
    let dev_addr = DevAddr::from_wire(data[1..5].try_into()?);

    // FCtrl
    let fctrl_byte = data[5];
    let fctrl = FCtrl {
        adr: (fctrl_byte & 0x80) != 0,
        adr_ack_req: (fctrl_byte & 0x40) != 0,
        ack: (fctrl_byte & 0x20) != 0,
        class_b: (fctrl_byte & 0x10) != 0,
        f_opts_len: fctrl_byte & 0x0F,
    };

    // FCnt (16-bit, little-endian)
    let fcnt = u16::from_le_bytes(data[6..8].try_into()?);

    // FOpts
    let f_opts_end = 8 + fctrl.f_opts_len as usize;
    if f_opts_end > data.len() - 4 {
        return Err(anyhow::anyhow!(
            "FOpts length {} exceeds available data",
            fctrl.f_opts_len
        ));
    }
    let f_opts = data[8..f_opts_end].to_vec();

    // FPort + FRMPayload (optional, only present if there's data beyond FOpts + MIC)
    let mic_start = data.len() - 4;
    let (f_port, frm_payload) = if f_opts_end < mic_start {
        let f_port = Some(data[f_opts_end]);
        let frm_payload = data[f_opts_end + 1..mic_start].to_vec();
        (f_port, frm_payload)
    } else {
        (None, vec![])
    };

    // MIC (last 4 bytes)
    let mic: [u8; 4] = data[mic_start..].try_into()?;

    Ok(UplinkFrame {
        mtype,
        dev_addr,
        fctrl,
        fcnt,
        f_opts,
        f_port,
        frm_payload,
        mic,
    })
}

/// Recompute the MIC of a received uplink frame and compare it against the
/// trailing 4 bytes.
///
/// `fcnt` is the full 32-bit counter the session manager tracks; its low 16
/// bits should match the wire FCnt field.
pub fn verify_uplink_mic(data: &[u8], nwk_s_key: &SessionKey, fcnt: u32) -> anyhow::Result<bool> {
    if data.len() < 12 {
        return Err(anyhow::anyhow!(
            "Data frame too short: {} bytes (minimum 12)",
            data.len()
        ));
    }

    let dev_addr = DevAddr::from_wire(data[1..5].try_into()?);
    let mic_start = data.len() - 4;
    let expected = crypto::compute_mic(
        &data[..mic_start],
        nwk_s_key,
        &dev_addr,
        fcnt,
        Direction::Uplink,
    );
    Ok(expected[..] == data[mic_start..])
}
