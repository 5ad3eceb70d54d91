//! LoRaWAN frame cryptography: FRMPayload cipher and MIC
//!
//! Both constructions are built on single AES-128 block encryptions
//! (LoRaWAN 1.0.x, sections 4.3.3 and 4.4):
//!
//! - FRMPayload encryption: a keystream of encrypted counter blocks
//!   (`A_i`, first byte 0x01), XORed against the plaintext. Length
//!   preserving; decryption is the same operation.
//! - MIC: CMAC-AES128 (RFC 4493) over an auth block (`B0`, first byte
//!   0x49) prepended to the full unauthenticated frame, truncated to
//!   the first 4 bytes.
//!
//! Block layout shared by A_i and B0:
//!   | first | 00 00 00 00 | dir | DevAddr(rev,4) | FCnt(LE,4) | 00 | last |

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use cmac::{Cmac, Mac};

use super::keys::{DevAddr, SessionKey};
use super::{Direction, EncodeError};

/// AES-128 block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// Ceiling on the counter-block index (it occupies a single byte).
const MAX_CIPHER_BLOCKS: usize = 255;

/// Encrypt one 16-byte block with AES-128 (ECB, no padding). Pure; this is
/// the kernel both the payload cipher and CMAC reduce to.
///
/// Inputs of any other length are a programming error and fail before any
/// cryptographic work.
pub fn encrypt_block(key: &[u8], block: &[u8]) -> Result<[u8; BLOCK_LEN], EncodeError> {
    let key: &[u8; BLOCK_LEN] = key
        .try_into()
        .map_err(|_| EncodeError::InvalidKeyLength(key.len()))?;
    let block: &[u8; BLOCK_LEN] = block
        .try_into()
        .map_err(|_| EncodeError::InvalidBlockLength(block.len()))?;

    let cipher = Aes128::new(key.into());
    let mut out = aes::Block::from(*block);
    cipher.encrypt_block(&mut out);

    let mut encrypted = [0u8; BLOCK_LEN];
    encrypted.copy_from_slice(&out);
    Ok(encrypted)
}

/// Synthesize the 16-byte block template shared by the counter block (A_i,
/// `first = 0x01`, `last = i`) and the auth block (B0, `first = 0x49`,
/// `last = frame length`).
///
/// The full 32-bit frame counter goes in, even though the wire header only
/// carries its low 16 bits.
fn header_block(first: u8, direction: Direction, dev_addr: &DevAddr, fcnt: u32, last: u8) -> [u8; BLOCK_LEN] {
    let mut block = [0u8; BLOCK_LEN];
    block[0] = first;
    // block[1..5] are zero
    block[5] = direction as u8;
    block[6..10].copy_from_slice(&dev_addr.to_wire());
    block[10..14].copy_from_slice(&fcnt.to_le_bytes());
    // block[14] is zero
    block[15] = last;
    block
}

/// Encrypt (or decrypt) a FRMPayload.
///
/// Counter blocks are indexed from 1; for each 16-byte chunk of plaintext
/// the encrypted counter block is XORed in, with only the first
/// `min(16, remaining)` keystream bytes applied. Output length equals input
/// length; a zero-length plaintext performs zero block encryptions.
pub fn encrypt_frm_payload(
    plaintext: &[u8],
    key: &SessionKey,
    dev_addr: &DevAddr,
    fcnt: u32,
    direction: Direction,
) -> Result<Vec<u8>, EncodeError> {
    if plaintext.len().div_ceil(BLOCK_LEN) > MAX_CIPHER_BLOCKS {
        return Err(EncodeError::PayloadTooLarge(plaintext.len()));
    }

    let mut out = Vec::with_capacity(plaintext.len());
    for (i, chunk) in plaintext.chunks(BLOCK_LEN).enumerate() {
        let a_block = header_block(0x01, direction, dev_addr, fcnt, (i + 1) as u8);
        let keystream = encrypt_block(key.as_bytes(), &a_block)?;
        out.extend(chunk.iter().zip(keystream.iter()).map(|(p, k)| p ^ k));
    }
    Ok(out)
}

/// Decrypt a FRMPayload. XOR against the same keystream is an involution,
/// so this is [`encrypt_frm_payload`] under a receive-path name.
pub fn decrypt_frm_payload(
    ciphertext: &[u8],
    key: &SessionKey,
    dev_addr: &DevAddr,
    fcnt: u32,
    direction: Direction,
) -> Result<Vec<u8>, EncodeError> {
    encrypt_frm_payload(ciphertext, key, dev_addr, fcnt, direction)
}

/// Compute the 4-byte MIC over a frame (everything except the MIC itself).
///
/// CMAC-AES128 over `B0 || frame`, truncated to the first 4 bytes of the
/// 16-byte tag. B0 byte 15 carries the frame length truncated to 8 bits;
/// the assembler rejects frames over 255 bytes before reaching this point.
pub fn compute_mic(
    frame: &[u8],
    key: &SessionKey,
    dev_addr: &DevAddr,
    fcnt: u32,
    direction: Direction,
) -> [u8; 4] {
    let b0 = header_block(0x49, direction, dev_addr, fcnt, (frame.len() & 0xFF) as u8);

    let mut mac = <Cmac<Aes128> as Mac>::new(key.as_bytes().into());
    mac.update(&b0);
    mac.update(frame);
    let tag = mac.finalize().into_bytes();

    let mut mic = [0u8; 4];
    mic.copy_from_slice(&tag[..4]);
    mic
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked-example session (same tuple as the encoder golden vector)
    fn dev_addr() -> DevAddr {
        DevAddr::from_hex("260B7AC6").unwrap()
    }

    fn app_s_key() -> SessionKey {
        SessionKey::from_hex("2E1B2E2E88363E2216485BA8FDC2CC14").unwrap()
    }

    fn nwk_s_key() -> SessionKey {
        SessionKey::from_hex("F34B7EC4653C9E7805AC21442E1B472B").unwrap()
    }

    #[test]
    fn test_encrypt_block_fips197_vector() {
        // FIPS-197 appendix C.1
        let key = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let block = hex::decode("00112233445566778899aabbccddeeff").unwrap();
        let out = encrypt_block(&key, &block).unwrap();
        assert_eq!(hex::encode(out), "69c4e0d86a7b0430d8cdb78070b4c55a");
    }

    #[test]
    fn test_encrypt_block_rejects_bad_lengths() {
        assert_eq!(
            encrypt_block(&[0u8; 16], &[0u8; 15]),
            Err(EncodeError::InvalidBlockLength(15))
        );
        assert_eq!(
            encrypt_block(&[0u8; 16], &[0u8; 17]),
            Err(EncodeError::InvalidBlockLength(17))
        );
        assert_eq!(
            encrypt_block(&[0u8; 12], &[0u8; 16]),
            Err(EncodeError::InvalidKeyLength(12))
        );
    }

    #[test]
    fn test_counter_block_layout() {
        let block = header_block(0x01, Direction::Uplink, &dev_addr(), 0x0A0B0C0D, 3);
        assert_eq!(
            block,
            [
                0x01, // cipher block marker
                0x00, 0x00, 0x00, 0x00,
                0x00, // uplink
                0xC6, 0x7A, 0x0B, 0x26, // DevAddr reversed
                0x0D, 0x0C, 0x0B, 0x0A, // FCnt, 32-bit little-endian
                0x00,
                0x03, // block index
            ]
        );
    }

    #[test]
    fn test_auth_block_direction_and_length() {
        let block = header_block(0x49, Direction::Downlink, &dev_addr(), 10, 20);
        assert_eq!(block[0], 0x49);
        assert_eq!(block[5], 0x01);
        assert_eq!(block[15], 20);
    }

    #[test]
    fn test_encrypt_frm_payload_known_vector() {
        let out =
            encrypt_frm_payload(b"HELLOWORLD!", &app_s_key(), &dev_addr(), 10, Direction::Uplink)
                .unwrap();
        assert_eq!(hex::encode(out), "c8274552df511c4e038c11");
    }

    #[test]
    fn test_encrypt_preserves_length() {
        for len in [0usize, 1, 15, 16, 17, 32, 100, 246] {
            let plaintext = vec![0xA5u8; len];
            let out = encrypt_frm_payload(
                &plaintext,
                &app_s_key(),
                &dev_addr(),
                7,
                Direction::Uplink,
            )
            .unwrap();
            assert_eq!(out.len(), len);
        }
    }

    #[test]
    fn test_empty_plaintext_yields_empty_output() {
        let out =
            encrypt_frm_payload(&[], &app_s_key(), &dev_addr(), 0, Direction::Uplink).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_decrypt_is_involution() {
        let plaintext = b"exactly sixteen!and then some more bytes".to_vec();
        let ct = encrypt_frm_payload(&plaintext, &app_s_key(), &dev_addr(), 42, Direction::Uplink)
            .unwrap();
        assert_ne!(ct, plaintext);
        let pt = decrypt_frm_payload(&ct, &app_s_key(), &dev_addr(), 42, Direction::Uplink).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn test_full_fcnt_feeds_keystream() {
        // Keystream for a 16-byte block at FCnt 0x0001FFFF: the high counter
        // bits never reach the wire header but must reach the counter block.
        let out = encrypt_frm_payload(
            &[0u8; 16],
            &app_s_key(),
            &dev_addr(),
            0x0001_FFFF,
            Direction::Uplink,
        )
        .unwrap();
        assert_eq!(hex::encode(&out), "02e546e8f86f698e5a78fcdfe47fc743");

        let low_only = encrypt_frm_payload(
            &[0u8; 16],
            &app_s_key(),
            &dev_addr(),
            0x0000_FFFF,
            Direction::Uplink,
        )
        .unwrap();
        assert_ne!(out, low_only);
    }

    #[test]
    fn test_payload_too_large() {
        // 255 blocks * 16 = 4080 bytes is the index ceiling; one more byte
        // would need block index 256.
        let at_limit = vec![0u8; 255 * 16];
        assert!(encrypt_frm_payload(
            &at_limit,
            &app_s_key(),
            &dev_addr(),
            0,
            Direction::Uplink
        )
        .is_ok());

        let over = vec![0u8; 255 * 16 + 1];
        assert_eq!(
            encrypt_frm_payload(&over, &app_s_key(), &dev_addr(), 0, Direction::Uplink),
            Err(EncodeError::PayloadTooLarge(over.len()))
        );
    }

    #[test]
    fn test_mic_known_vector() {
        // Pre-MIC frame for the worked example (header + encrypted payload).
        let frame = hex::decode("40c67a0b26000a0001c8274552df511c4e038c11").unwrap();
        let mic = compute_mic(&frame, &nwk_s_key(), &dev_addr(), 10, Direction::Uplink);
        assert_eq!(hex::encode(mic), "90867720");
    }

    #[test]
    fn test_mic_avalanche_on_key() {
        let frame = b"some frame bytes".to_vec();
        let base = compute_mic(&frame, &nwk_s_key(), &dev_addr(), 10, Direction::Uplink);

        let mut mutated = *nwk_s_key().as_bytes();
        mutated[0] ^= 0x01;
        let other = compute_mic(
            &frame,
            &SessionKey::new(mutated),
            &dev_addr(),
            10,
            Direction::Uplink,
        );
        assert_ne!(base, other);
    }

    #[test]
    fn test_mic_avalanche_on_dev_addr() {
        let frame = b"some frame bytes".to_vec();
        let base = compute_mic(&frame, &nwk_s_key(), &dev_addr(), 10, Direction::Uplink);

        let mut mutated = *dev_addr().as_bytes();
        mutated[3] ^= 0x80;
        let other = compute_mic(
            &frame,
            &nwk_s_key(),
            &DevAddr::new(mutated),
            10,
            Direction::Uplink,
        );
        assert_ne!(base, other);
    }

    #[test]
    fn test_mic_avalanche_on_fcnt() {
        let frame = b"some frame bytes".to_vec();
        let base = compute_mic(&frame, &nwk_s_key(), &dev_addr(), 10, Direction::Uplink);
        let other = compute_mic(&frame, &nwk_s_key(), &dev_addr(), 11, Direction::Uplink);
        assert_ne!(base, other);

        // High counter bits matter too, even though the wire FCnt is 16-bit.
        let widened = compute_mic(&frame, &nwk_s_key(), &dev_addr(), 0x0001_000A, Direction::Uplink);
        assert_ne!(base, widened);
    }

    #[test]
    fn test_mic_covers_empty_frame() {
        let mic = compute_mic(&[], &nwk_s_key(), &dev_addr(), 0, Direction::Uplink);
        assert_ne!(mic, [0u8; 4]);
    }
}
