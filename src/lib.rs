//! LoRaWAN uplink data frame encoder
//!
//! Builds a complete, ready-to-transmit PHYPayload (unconfirmed data up)
//! from plaintext application data, a session key pair, and frame metadata.
//! The cryptographic core — the FRMPayload counter-mode cipher and the
//! CMAC-AES128 MIC — lives in [`lorawan::crypto`]; [`lorawan::encoder`]
//! composes the frame; [`lorawan::decode_uplink`] and
//! [`lorawan::verify_uplink_mic`] cover the receive path.
//!
//! The core is synchronous and stateless: every operation is a pure function
//! over its explicit inputs. Frame counters are supplied by the caller's
//! session state, never tracked here.

pub mod config;
pub mod lorawan;
