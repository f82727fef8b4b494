// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Scripted MTPZ handshake against fixture vectors from a real RSA-1024
 * host/device keypair.
 *
 * Copyright (c) 2025 Code Construct
 */

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use rand::RngCore;

use mtp::{
    ContainerType, DeviceProperty, EndpointConfig, Session, TransportError, UsbTransport,
};
use mtpz::{Error, HandshakeError, Keys, TrustedApp};

// Fixtures generated offline: both RSA-1024 keypairs are real, so the
// device's signed reply verifies (or fails to) for real.
const KEY_FILE: &str = "65537:bc896f2f5fba7419ef3afab8b1e76cd4c3939f59e9be3150458a3f23f3c062ff8d3d6f4e6e6d3cf9a2b0fc1d5af2420f772c5267e84fcd3d03d80a2bda477526be95f33eb1a80391214423e66240b70be501c900076627bd83cf37dc4473d66e1dc98d109d46466176d3d3ee5beaf307a687b0fc83b77b018a020dc83e485fe7:50f9e65b3e8e629750fccffacbce4e1c03f43f98ea9fd9a65477d02eacde90a69a0f2ce34ee27431f402780653ad815a0b216a335ec007b2911815264896306639ebb33e3f9f403f2fcbb44a3ee72e19c9afe82e7374fb09eb61e3ba69f2731d4a377e963d8287fc9adde6cd1fdab390fe1167c9113417998252fe539b5a3fe1:30373e454c535a61686f767d848b9299a0a7aeb5bcc3cad1d8dfe6edf4fb020910171e252c333a41484f565d646b727980878e959ca3aab1b8bfc6cdd4dbe2e9f0f7fe050c131a21282f363d444b525960676e757c838a91989fa6adb4bbc2c9d0d7dee5ecf3fa01080f161d242b323940474e555c636a71787f868d949ba2a9b0b7bec5ccd3dae1e8eff6fd040b121920272e353c434a51585f666d747b828990979ea5acb3bac1c8cfd6dde4ebf2f900070e151c232a31383f464d545b626970777e858c939aa1:606162636465666768696a6b6c6d6e6f70717273";
const DEVICE_CERT_REPLY: &str = "020101000000d500c0c1c2c3c4c5c6c7c8c9cacbcccdcecfd0d1d2d3e1e309f14dcab8ed32c80c2a513efcd577dd4f26110c1c67f1d9bf9eaeecd4e3a7c9bbbde0ececa8b732fb1d98c80249f7e8a381917e1e6bb0ceb2e9793b34c936f371a1170f3ade6531fff9fa8a861a305593c2fcf722350397a74265cd7c776fdbfb085ec97ab00796c11abf43a8cb42dc4deeb1872e72f68654ab73e760d7808386898c8f9295989b9ea1a4a7aaadb0b3b6b9bcbfc2c5c8cbced1d4d7dadde0e3e6e9eceff2f5f8fbfe0104070a0d101316191c1f2225282b2e3134373a3d";
const DEVICE_SIG_REPLY: &str = "02010100000081008c7f80675e4674b0260f8df1342ce18e5e9c64da47e2fff87066268956d949ac6612a997cf0973027390be74b2ae5c99017307d2de5f0260a39a254b0870e4e74058f3b20ce43efc6faf0b94e27a8636290cbb6485abfff5994d1e9d85c1eec2bc67a8322e5546b1ea72484ccdb0742cdaf779033afedca2a66f61c0a08bfb03";
const EXPECTED_HOST_LEG2: &str = "0201010000009100000102030405060708090a0b0c0d0e0f6758bc5e770ea40149e02bba9a90255697b0d5316b21253dcf9e87342f45425750c57516687195b0772670b75faae00500cbf3256c3b2f3858023e103606675144e92125be87d7cfdb22c7b90cbd46bd2a8b794b0ca3c3c33e11e7d50c37989529bc515b8382e09b12f4834505224bfea00b24fe36073408161be08428eea53f";
const EXPECTED_HOST_LEG3: &str = "02010100000021008e9ff6aa61dd6e87721f08dd80a121cb3844b4896fa2ba1de03ae73fb3616e76";
const EXPECTED_SESSION_KEY: &str = "7ed82475d09f786a50ae9ab01bf7c631";
const EXPECTED_WIFI_CIPHERTEXT: &str = "a68448640eac64bff2f0cf4810a619fb919fc6ab3f2f07e79e54e356ec9a9b44cc05711f83692afe2010122c71e4bf34b470c95c32cc9ec43f540426a1c56ab76c5fa087fab33d906b9db11afdaf9f12bd9bdfa6f032fca2f3e605bcd284a7119828158b2e27ca42b901a36b4ecee0fc60e900c081739201b2e5c7f3cce35dc8";

/// Deterministic byte counter standing in for the OS RNG.
#[derive(Default)]
struct FixedRng {
    counter: u64,
}

impl RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        let b = (self.counter % 256) as u32;
        self.counter += 1;
        b
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for b in dest {
            *b = (self.counter % 256) as u8;
            self.counter += 1;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct State {
    reads: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, Default)]
struct Scripted {
    state: Rc<RefCell<State>>,
}

impl Scripted {
    fn queue(&self, kind: ContainerType, code: u16, tid: u32, payload: &[u8]) {
        let mut out = Vec::with_capacity(12 + payload.len());
        out.extend_from_slice(&(12 + payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(kind as u16).to_le_bytes());
        out.extend_from_slice(&code.to_le_bytes());
        out.extend_from_slice(&tid.to_le_bytes());
        out.extend_from_slice(payload);
        self.state.borrow_mut().reads.push_back(out);
    }

    fn queue_ok(&self, tid: u32) {
        self.queue(ContainerType::Response, 0x2001, tid, &[]);
    }

    fn script_handshake(&self, cert_reply: &[u8]) {
        self.queue(ContainerType::Data, 0x1000, 0, cert_reply);
        self.queue_ok(0);
        self.queue(ContainerType::Data, 0x1001, 1, &hex(DEVICE_SIG_REPLY));
        self.queue_ok(1);
        self.queue_ok(2);
    }

    /// Payload of the data phase written for operation `code`.
    fn data_phase(&self, code: u16) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .writes
            .iter()
            .find(|w| {
                w.len() >= 12
                    && w[4..6] == (ContainerType::Data as u16).to_le_bytes()
                    && w[6..8] == code.to_le_bytes()
            })
            .map(|w| w[12..].to_vec())
    }
}

impl UsbTransport for Scripted {
    fn write_bulk(
        &mut self,
        _endpoint: u8,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        self.state.borrow_mut().writes.push(data.to_vec());
        Ok(data.len())
    }

    fn read_bulk(
        &mut self,
        _endpoint: u8,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        let chunk = self
            .state
            .borrow_mut()
            .reads
            .pop_front()
            .ok_or(TransportError::Timeout)?;
        assert!(chunk.len() <= buf.len());
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }

    fn read_interrupt(
        &mut self,
        _endpoint: u8,
        _buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        Err(TransportError::Timeout)
    }

    fn control_transfer(
        &mut self,
        _request_type: u8,
        _request: u8,
        _value: u16,
        _index: u16,
        _data: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        Ok(0)
    }

    fn clear_halt(&mut self, _endpoint: u8) -> Result<(), TransportError> {
        Ok(())
    }
}

fn hex(s: &str) -> Vec<u8> {
    ::hex::decode(s).unwrap()
}

fn trusted_app() -> TrustedApp {
    TrustedApp::with_keys(Keys::parse(KEY_FILE).unwrap())
}

#[test]
fn handshake_reaches_confirmed_and_secures_the_session() {
    let _ = env_logger::Builder::new()
        .filter(None, log::LevelFilter::Trace)
        .is_test(true)
        .try_init();

    let script = Scripted::default();
    script.script_handshake(&hex(DEVICE_CERT_REPLY));

    let mut session = Session::new(script.clone(), EndpointConfig::default());
    let mut app = trusted_app();
    assert!(!app.is_confirmed());

    app.authenticate_with_rng(&mut session, &mut FixedRng::default())
        .unwrap();

    assert!(app.is_confirmed());
    assert!(app.has_device_key());
    assert!(session.is_secure());
    assert_eq!(
        session.session_key().unwrap().as_slice(),
        &hex(EXPECTED_SESSION_KEY)[..]
    );

    // every host leg matches the reference transcript bit for bit
    let leg1 = script.data_phase(0x1000).expect("leg 1 written");
    assert_eq!(&leg1[..5], &[0x02, 0x01, 0x01, 0x00, 0x00]);
    assert_eq!(script.data_phase(0x1001).unwrap(), hex(EXPECTED_HOST_LEG2));
    assert_eq!(script.data_phase(0x1002).unwrap(), hex(EXPECTED_HOST_LEG3));

    // authenticate again: no-op, no extra traffic
    let writes_before = script.state.borrow().writes.len();
    app.authenticate_with_rng(&mut session, &mut FixedRng::default())
        .unwrap();
    assert_eq!(script.state.borrow().writes.len(), writes_before);

    // a privileged write goes through on the secure session
    script.queue_ok(3);
    let mut guid = vec![0x11u8; 18];
    guid[0] = 17;
    session
        .set_device_property(DeviceProperty::ZUNE_PC_GUID, &guid)
        .unwrap();
}

#[test]
fn bit_flip_in_first_device_response_fails_verification() {
    let script = Scripted::default();
    let mut reply = hex(DEVICE_CERT_REPLY);
    reply[9] ^= 0x01; // one bit of the device challenge
    script.script_handshake(&reply);

    let mut session = Session::new(script, EndpointConfig::default());
    let mut app = trusted_app();
    let err = app
        .authenticate_with_rng(&mut session, &mut FixedRng::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Handshake(HandshakeError::VerificationFailed)
    ));
    assert!(!session.is_secure());

    // the failure is terminal for the trusted app
    let err = app
        .authenticate_with_rng(&mut session, &mut FixedRng::default())
        .unwrap_err();
    assert!(matches!(err, Error::Handshake(HandshakeError::Invalid)));
}

#[test]
fn wifi_password_encrypts_to_one_rsa_block() {
    let script = Scripted::default();
    script.script_handshake(&hex(DEVICE_CERT_REPLY));

    let mut session = Session::new(script, EndpointConfig::default());
    let mut app = trusted_app();
    app.authenticate_with_rng(&mut session, &mut FixedRng::default())
        .unwrap();

    let ct = app
        .encrypt_wifi_password_with_rng("hunter2 wireless", &mut FixedRng::default())
        .unwrap();
    assert_eq!(ct.len(), 128);
    assert_eq!(&ct[..], &hex(EXPECTED_WIFI_CIPHERTEXT)[..]);

    // before leg 1 there is no device key to encrypt against
    let app = trusted_app();
    assert!(app.encrypt_wifi_password("x").is_err());
}

#[test]
fn key_bundle_loads_from_disk() {
    let path = std::env::temp_dir().join(format!("mtpz-data-{}", std::process::id()));
    std::fs::write(&path, KEY_FILE).unwrap();
    let app = TrustedApp::create(&path);
    std::fs::remove_file(&path).unwrap();
    let app = app.unwrap();
    assert!(!app.is_confirmed());
}

#[test]
fn truncated_certificate_reply_is_rejected() {
    let script = Scripted::default();
    let reply = hex(DEVICE_CERT_REPLY);
    // keep framing valid but cut the body below challenge + modulus
    let mut short = reply[..40].to_vec();
    let body_len = (short.len() - 7) as u16;
    short[5..7].copy_from_slice(&body_len.to_be_bytes());
    script.queue(ContainerType::Data, 0x1000, 0, &short);
    script.queue_ok(0);

    let mut session = Session::new(script, EndpointConfig::default());
    let mut app = trusted_app();
    let err = app
        .authenticate_with_rng(&mut session, &mut FixedRng::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Handshake(HandshakeError::UnexpectedMessage(_))
    ));
}
