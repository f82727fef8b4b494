// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * MTPZ crypto primitives: raw RSA-1024, the SHA-1 key-derivation
 * expansion and the AES-CBC confirmation block.
 *
 * Copyright (c) 2025 Code Construct
 */

use aes::Aes128;
use cbc::cipher::{block_padding::NoPadding, BlockModeEncrypt, KeyIvInit};
use num_bigint::BigUint;
use rand::RngCore;
use sha1::{Digest, Sha1};

use crate::keys::Keys;
use crate::HandshakeError;

/// RSA modulus size in bytes (1024 bits).
pub const RSA_MODULUS_SIZE: usize = 128;
/// SHA-1 digest length.
pub const HASH_SIZE: usize = 20;
/// Rounds of the concatenate-and-hash session-key expansion.
pub const KEY_DERIVATION_CONST: usize = 107;

/// Nonce length contributed by the host.
pub const HOST_NONCE_SIZE: usize = 16;
/// Challenge length contributed by the device.
pub const DEVICE_CHALLENGE_SIZE: usize = 20;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;

/// SHA-1 of `parts`, concatenated.
pub fn sha1_concat(parts: &[&[u8]]) -> [u8; HASH_SIZE] {
    let mut h = Sha1::new();
    for p in parts {
        h.update(p);
    }
    h.finalize().into()
}

/// The fixed signature block: `01`, zero fill, `80`, then the digest.
pub fn signature_block(digest: &[u8; HASH_SIZE]) -> [u8; RSA_MODULUS_SIZE] {
    let mut block = [0u8; RSA_MODULUS_SIZE];
    block[0] = 0x01;
    block[RSA_MODULUS_SIZE - HASH_SIZE - 1] = 0x80;
    block[RSA_MODULUS_SIZE - HASH_SIZE..].copy_from_slice(digest);
    block
}

fn to_fixed(v: BigUint) -> [u8; RSA_MODULUS_SIZE] {
    let bytes = v.to_bytes_be();
    let mut out = [0u8; RSA_MODULUS_SIZE];
    out[RSA_MODULUS_SIZE - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Raw RSA private-key operation over a padded signature block.
pub fn rsa_sign(digest: &[u8; HASH_SIZE], keys: &Keys) -> [u8; RSA_MODULUS_SIZE] {
    let m = BigUint::from_bytes_be(&signature_block(digest));
    to_fixed(m.modpow(&keys.private_exponent, &keys.modulus))
}

/// Raw RSA public-key operation.
pub fn rsa_public(
    block: &[u8],
    exponent: &BigUint,
    modulus: &BigUint,
) -> [u8; RSA_MODULUS_SIZE] {
    let m = BigUint::from_bytes_be(block);
    to_fixed(m.modpow(exponent, modulus))
}

/// Verifies a signature over `digest` against a raw RSA public key.
pub fn rsa_verify(
    signature: &[u8],
    digest: &[u8; HASH_SIZE],
    exponent: &BigUint,
    modulus: &BigUint,
) -> bool {
    rsa_public(signature, exponent, modulus) == signature_block(digest)
}

/// PKCS#1 v1.5 type-2 encryption against a raw RSA public key.
///
/// The padding stream comes from `rng`, with zero bytes skipped as the
/// format requires.
pub fn rsa_encrypt(
    message: &[u8],
    exponent: &BigUint,
    modulus: &BigUint,
    rng: &mut dyn RngCore,
) -> Result<[u8; RSA_MODULUS_SIZE], HandshakeError> {
    let pad_len = RSA_MODULUS_SIZE
        .checked_sub(message.len() + 3)
        .filter(|l| *l >= 8)
        .ok_or(HandshakeError::PasswordTooLong)?;

    let mut block = [0u8; RSA_MODULUS_SIZE];
    block[1] = 0x02;
    for b in &mut block[2..2 + pad_len] {
        *b = loop {
            let candidate = (rng.next_u32() & 0xff) as u8;
            if candidate != 0 {
                break candidate;
            }
        };
    }
    block[2 + pad_len] = 0x00;
    block[3 + pad_len..].copy_from_slice(message);

    Ok(rsa_public(&block, exponent, modulus))
}

/// Derives the AES-128 session key from the mutual nonces and the OEM seed.
///
/// `h = SHA1(seed)`, then [`KEY_DERIVATION_CONST`] rounds of
/// `h = SHA1(h || seed)` where `seed = challenge || nonce || oem_seed`;
/// the key is the first 16 bytes of the final digest.
pub fn derive_session_key(
    device_challenge: &[u8; DEVICE_CHALLENGE_SIZE],
    host_nonce: &[u8; HOST_NONCE_SIZE],
    oem_seed: &[u8; 20],
) -> [u8; 16] {
    let mut seed = Vec::with_capacity(DEVICE_CHALLENGE_SIZE + HOST_NONCE_SIZE + 20);
    seed.extend_from_slice(device_challenge);
    seed.extend_from_slice(host_nonce);
    seed.extend_from_slice(oem_seed);

    let mut h = sha1_concat(&[&seed]);
    for _ in 0..KEY_DERIVATION_CONST {
        h = sha1_concat(&[&h, &seed]);
    }
    let mut key = [0u8; 16];
    key.copy_from_slice(&h[..16]);
    key
}

/// The leg-3 confirmation: the device challenge zero-padded to 32 bytes,
/// AES-128-CBC encrypted under the session key with a zero IV.
pub fn confirmation_block(
    session_key: &[u8; 16],
    device_challenge: &[u8; DEVICE_CHALLENGE_SIZE],
) -> Vec<u8> {
    let mut block = [0u8; 32];
    block[..DEVICE_CHALLENGE_SIZE].copy_from_slice(device_challenge);
    let iv = [0u8; 16];
    Aes128CbcEnc::new(session_key.into(), (&iv).into())
        .encrypt_padded_vec::<NoPadding>(&block)
}
