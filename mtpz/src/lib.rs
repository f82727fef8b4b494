// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * MTPZ "trusted application" handshake for Zune-class devices.
 *
 * Copyright (c) 2025 Code Construct
 */

#![forbid(unsafe_code)]

//! # MTPZ
//!
//! Zune-class devices refuse privileged operations (media metadata writes,
//! WiFi configuration, PC GUID) until the host completes a three-leg
//! vendor handshake: certificate exchange, an RSA-1024 signed
//! challenge/response, and a keyed confirmation derived from the mutual
//! nonces. [`TrustedApp`] drives the handshake over an open
//! [`mtp::Session`] and leaves it in the secure-session state.
//!
//! The host key material comes from a `.mtpz-data` bundle ([`Keys`]); its
//! distribution is outside the scope of this crate.

pub mod crypto;
mod keys;

use log::{debug, info, trace};
use num_bigint::BigUint;
use rand::RngCore;
use thiserror::Error;

use mtp::{OperationCode, Session, UsbTransport};

pub use keys::Keys;

use crypto::{
    DEVICE_CHALLENGE_SIZE, HOST_NONCE_SIZE, RSA_MODULUS_SIZE,
};

/// Handshake leg 1: host certificate out, device certificate and
/// challenge back.
const LEG_CERTIFICATE: OperationCode = OperationCode(0x1000);
/// Handshake leg 2: signed challenge response exchange.
const LEG_CHALLENGE_RESPONSE: OperationCode = OperationCode(0x1001);
/// Handshake leg 3: keyed confirmation; an OK reply enables the secure
/// session.
const LEG_CONFIRMATION: OperationCode = OperationCode(0x1002);

/// Operation window a device must advertise to be considered
/// MTPZ-capable.
const PROBE_OPERATIONS: core::ops::RangeInclusive<u16> = 0x1000..=0x1004;

/// Tag opening every MTPZ message payload.
const MESSAGE_TAG: [u8; 5] = [0x02, 0x01, 0x01, 0x00, 0x00];
/// Size of the leg-1 reply header: tag, length, status, device challenge
/// and device modulus.
const MESSAGE_HEADER_SIZE: usize =
    MESSAGE_TAG.len() + 2 + 1 + DEVICE_CHALLENGE_SIZE + RSA_MODULUS_SIZE;

/// A `.mtpz-data` bundle failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyFileError {
    /// The bundle could not be read.
    #[error("cannot read key bundle: {0}")]
    Io(#[from] std::io::Error),
    /// The bundle deviates from the five-field colon form.
    #[error("malformed key bundle: {0}")]
    Malformed(&'static str),
}

/// A handshake failure. Terminal for the [`TrustedApp`], not for the
/// session beneath it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandshakeError {
    /// The device does not advertise the MTPZ operations.
    #[error("device does not support mtpz")]
    NotSupported,
    /// A device message deviated from the expected framing.
    #[error("unexpected device message: {0}")]
    UnexpectedMessage(&'static str),
    /// The device's signed reply failed verification.
    #[error("device signature verification failed")]
    VerificationFailed,
    /// The trusted app was poisoned by an earlier failure and must be
    /// re-created.
    #[error("trusted app is no longer valid")]
    Invalid,
    /// A password too long for one RSA block.
    #[error("password exceeds the rsa block capacity")]
    PasswordTooLong,
}

/// Any MTPZ failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Key bundle failure.
    #[error("key file: {0}")]
    KeyFile(#[from] KeyFileError),
    /// Handshake failure.
    #[error("handshake: {0}")]
    Handshake(#[from] HandshakeError),
    /// Failure of an underlying MTP operation.
    #[error(transparent)]
    Mtp(#[from] mtp::Error),
}

/// MTPZ result type.
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
enum State {
    KeysLoaded,
    Confirmed,
    Failed,
}

/// The trusted-application actor: created once per session, drives the
/// handshake, then hands out RSA helpers bound to the device key.
///
/// State machine: `Created → KeysLoaded → DeviceChallenged → Confirmed`.
/// Any failure is terminal — the value answers [`HandshakeError::Invalid`]
/// from then on and a new `TrustedApp` must be created. A second
/// [`authenticate`](Self::authenticate) on a confirmed app is a no-op.
pub struct TrustedApp {
    keys: Keys,
    state: State,
    /// The device's RSA-1024 public modulus, learnt in leg 1.
    device_modulus: Option<BigUint>,
}

impl std::fmt::Debug for TrustedApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustedApp")
            .field("state", &self.state)
            .field("has_device_key", &self.device_modulus.is_some())
            .finish_non_exhaustive()
    }
}

impl TrustedApp {
    /// Whether `info` advertises the MTPZ operation window.
    ///
    /// A negative probe is not an error; the caller simply skips the
    /// handshake.
    pub fn probe(info: &mtp::message::DeviceInfo) -> bool {
        PROBE_OPERATIONS
            .clone()
            .all(|op| info.supports_operation(OperationCode(op)))
    }

    /// Creates a trusted app from a `.mtpz-data` bundle on disk.
    pub fn create(mtpz_data_path: impl AsRef<std::path::Path>) -> Result<Self> {
        let keys = Keys::load(mtpz_data_path)?;
        Ok(Self::with_keys(keys))
    }

    /// Creates a trusted app from already-parsed keys.
    pub fn with_keys(keys: Keys) -> Self {
        Self {
            keys,
            state: State::KeysLoaded,
            device_modulus: None,
        }
    }

    /// Whether the handshake has completed.
    pub fn is_confirmed(&self) -> bool {
        matches!(self.state, State::Confirmed)
    }

    /// Whether leg 1 has stored the device's public key.
    pub fn has_device_key(&self) -> bool {
        self.device_modulus.is_some()
    }

    /// Runs the three-leg handshake, leaving `session` secure.
    ///
    /// Idempotent once confirmed. Any failure poisons this value.
    pub fn authenticate<T: UsbTransport>(&mut self, session: &mut Session<T>) -> Result<()> {
        self.authenticate_with_rng(session, &mut rand::thread_rng())
    }

    /// [`authenticate`](Self::authenticate) with a caller-supplied nonce
    /// source.
    pub fn authenticate_with_rng<T: UsbTransport>(
        &mut self,
        session: &mut Session<T>,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        match self.state {
            State::Confirmed => return Ok(()),
            State::Failed => return Err(HandshakeError::Invalid.into()),
            State::KeysLoaded => {}
        }
        match self.run_handshake(session, rng) {
            Ok(key) => {
                self.state = State::Confirmed;
                session.enable_secure_session(key);
                info!("secure session enabled");
                Ok(())
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    fn run_handshake<T: UsbTransport>(
        &mut self,
        session: &mut Session<T>,
        rng: &mut dyn RngCore,
    ) -> Result<[u8; 16]> {
        // Leg 1: certificates. The reply header carries the device
        // challenge and the device's RSA modulus, then its certificate.
        debug!("mtpz leg 1: sending host certificate");
        let leg1 = build_message(&self.keys.certificate);
        let reply = session
            .vendor_request(LEG_CERTIFICATE, &[], Some(&leg1))?
            .ok_or(HandshakeError::UnexpectedMessage("missing certificate reply"))?;
        let body = parse_message(&reply)?;
        if body.len() < DEVICE_CHALLENGE_SIZE + RSA_MODULUS_SIZE {
            return Err(HandshakeError::UnexpectedMessage("certificate reply too short").into());
        }
        debug_assert_eq!(
            MESSAGE_TAG.len() + 3 + DEVICE_CHALLENGE_SIZE + RSA_MODULUS_SIZE,
            MESSAGE_HEADER_SIZE
        );
        let mut challenge = [0u8; DEVICE_CHALLENGE_SIZE];
        challenge.copy_from_slice(&body[..DEVICE_CHALLENGE_SIZE]);
        let modulus = BigUint::from_bytes_be(
            &body[DEVICE_CHALLENGE_SIZE..DEVICE_CHALLENGE_SIZE + RSA_MODULUS_SIZE],
        );
        trace!(
            "device challenge and key received, {} certificate bytes follow",
            body.len() - DEVICE_CHALLENGE_SIZE - RSA_MODULUS_SIZE
        );
        self.device_modulus = Some(modulus.clone());

        // Leg 2: host-signed response over the device challenge and a
        // fresh host nonce; the device replies in kind, swapped order.
        let mut nonce = [0u8; HOST_NONCE_SIZE];
        rng.fill_bytes(&mut nonce);
        let digest = crypto::sha1_concat(&[&challenge, &nonce]);
        let signature = crypto::rsa_sign(&digest, &self.keys);
        let mut leg2_body = Vec::with_capacity(HOST_NONCE_SIZE + RSA_MODULUS_SIZE);
        leg2_body.extend_from_slice(&nonce);
        leg2_body.extend_from_slice(&signature);
        debug!("mtpz leg 2: sending signed challenge response");
        let reply = session
            .vendor_request(LEG_CHALLENGE_RESPONSE, &[], Some(&build_message(&leg2_body)))?
            .ok_or(HandshakeError::UnexpectedMessage("missing challenge reply"))?;
        let body = parse_message(&reply)?;
        if body.len() < RSA_MODULUS_SIZE {
            return Err(HandshakeError::UnexpectedMessage("challenge reply too short").into());
        }
        let expected = crypto::sha1_concat(&[&nonce, &challenge]);
        if !crypto::rsa_verify(
            &body[..RSA_MODULUS_SIZE],
            &expected,
            &self.keys.exponent,
            &modulus,
        ) {
            return Err(HandshakeError::VerificationFailed.into());
        }

        // Key derivation, then leg 3: prove possession of the derived key.
        let key = crypto::derive_session_key(&challenge, &nonce, &self.keys.oem_seed);
        let confirmation = crypto::confirmation_block(&key, &challenge);
        debug!("mtpz leg 3: sending keyed confirmation");
        session.vendor_request(LEG_CONFIRMATION, &[], Some(&build_message(&confirmation)))?;

        Ok(key)
    }

    /// Encrypts a WiFi password with the device's RSA public key.
    ///
    /// Available once leg 1 has stored the device key; the result is
    /// exactly 128 bytes.
    pub fn encrypt_wifi_password(&self, password: &str) -> Result<[u8; RSA_MODULUS_SIZE]> {
        self.encrypt_wifi_password_with_rng(password, &mut rand::thread_rng())
    }

    /// [`encrypt_wifi_password`](Self::encrypt_wifi_password) with a
    /// caller-supplied padding source.
    pub fn encrypt_wifi_password_with_rng(
        &self,
        password: &str,
        rng: &mut dyn RngCore,
    ) -> Result<[u8; RSA_MODULUS_SIZE]> {
        if matches!(self.state, State::Failed) {
            return Err(HandshakeError::Invalid.into());
        }
        let modulus = self
            .device_modulus
            .as_ref()
            .ok_or(HandshakeError::UnexpectedMessage("device key not yet received"))?;
        Ok(crypto::rsa_encrypt(
            password.as_bytes(),
            &self.keys.exponent,
            modulus,
            rng,
        )?)
    }
}

/// Frames an MTPZ message: tag, big-endian length of the remainder, a zero
/// status byte, then the body.
fn build_message(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(MESSAGE_TAG.len() + 3 + body.len());
    out.extend_from_slice(&MESSAGE_TAG);
    out.extend_from_slice(&(1 + body.len() as u16).to_be_bytes());
    out.push(0);
    out.extend_from_slice(body);
    out
}

/// Unframes an MTPZ message, checking tag, length and status.
fn parse_message(payload: &[u8]) -> core::result::Result<&[u8], HandshakeError> {
    if payload.len() < MESSAGE_TAG.len() + 3 {
        return Err(HandshakeError::UnexpectedMessage("message too short"));
    }
    if payload[..MESSAGE_TAG.len()] != MESSAGE_TAG {
        return Err(HandshakeError::UnexpectedMessage("bad message tag"));
    }
    let len = u16::from_be_bytes([payload[5], payload[6]]) as usize;
    let rest = &payload[7..];
    if len == 0 || rest.len() < len {
        return Err(HandshakeError::UnexpectedMessage("message length out of bounds"));
    }
    if rest[0] != 0 {
        return Err(HandshakeError::UnexpectedMessage("device reported failure status"));
    }
    Ok(&rest[1..len])
}
