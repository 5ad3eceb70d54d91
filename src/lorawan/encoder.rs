//! LoRaWAN uplink frame assembler
//!
//! Composes the complete PHYPayload for an unconfirmed data uplink:
//!
//!   MHDR(1)=0x40 | DevAddr(4,LE) | FCtrl(1)=0x00 | FCnt(2,LE) | FPort(1) |
//!   FRMPayload(N, encrypted with AppSKey) | MIC(4, CMAC with NwkSKey)
//!
//! Pure composition: the cryptography lives in [`crate::lorawan::crypto`]
//! and each stage returns its bytes by value, so no stage ever observes
//! another's partial state. Either a complete frame comes back or an
//! [`EncodeError`] does; there is no partial-success state.

use super::crypto;
use super::keys::{DevAddr, SessionKeys};
use super::{Direction, EncodeError, MType};

/// Header bytes before the FRMPayload: MHDR + DevAddr + FCtrl + FCnt + FPort.
const HEADER_LEN: usize = 9;

/// Largest pre-MIC frame the auth block's 8-bit length field can describe.
const MAX_FRAME_LEN: usize = 255;

/// Parameters for building an unconfirmed uplink data frame
#[derive(Debug, Clone)]
pub struct UplinkBuilder {
    /// Device address
    pub dev_addr: DevAddr,
    /// Full 32-bit frame counter, managed by the caller's session state.
    /// Only the low 16 bits reach the wire header.
    pub fcnt: u32,
    /// FPort (application port, 1-223 for application data)
    pub f_port: u8,
    /// Application payload (plaintext)
    pub payload: Vec<u8>,
}

impl UplinkBuilder {
    pub fn new(dev_addr: DevAddr, fcnt: u32, f_port: u8, payload: Vec<u8>) -> Self {
        Self {
            dev_addr,
            fcnt,
            f_port,
            payload,
        }
    }

    /// Build the complete PHYPayload bytes, ready to transmit.
    ///
    /// FRMPayload is encrypted with the AppSKey, the MIC computed with the
    /// NwkSKey over everything assembled before it. Total length is always
    /// `9 + payload.len() + 4`.
    pub fn build(&self, keys: &SessionKeys) -> Result<Vec<u8>, EncodeError> {
        let pre_mic_len = HEADER_LEN + self.payload.len();
        if pre_mic_len > MAX_FRAME_LEN {
            return Err(EncodeError::FrameTooLarge(pre_mic_len));
        }

        let mut frame = Vec::with_capacity(pre_mic_len + 4);

        // MHDR: unconfirmed data up, LoRaWAN R1
        frame.push(MType::UnconfirmedDataUp.mhdr());

        // DevAddr (4 bytes, reversed: byte 3 first)
        frame.extend_from_slice(&self.dev_addr.to_wire());

        // FCtrl: ADR=0, ACK=0, FPending=0, FOptsLen=0
        frame.push(0x00);

        // FCnt (low 16 bits, little-endian)
        frame.extend_from_slice(&(self.fcnt as u16).to_le_bytes());

        // FPort (always present, even for an empty payload)
        frame.push(self.f_port);

        // FRMPayload, encrypted under the AppSKey
        let encrypted = crypto::encrypt_frm_payload(
            &self.payload,
            &keys.app_s_key,
            &self.dev_addr,
            self.fcnt,
            Direction::Uplink,
        )?;
        frame.extend_from_slice(&encrypted);

        // MIC over everything assembled so far, under the NwkSKey
        let mic = crypto::compute_mic(
            &frame,
            &keys.nwk_s_key,
            &self.dev_addr,
            self.fcnt,
            Direction::Uplink,
        );
        frame.extend_from_slice(&mic);

        Ok(frame)
    }
}
