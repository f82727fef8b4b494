// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * The `.mtpz-data` key bundle.
 *
 * Copyright (c) 2025 Code Construct
 */

use std::path::Path;

use num_bigint::BigUint;

use crate::KeyFileError;

/// Length of the RSA modulus and private exponent fields, in hex digits.
const MODULUS_HEX_LEN: usize = 256;
/// Length of the OEM seed field, in hex digits.
const SEED_HEX_LEN: usize = 40;

/// The parsed `.mtpz-data` bundle: host RSA keypair, host certificate blob
/// and the OEM key seed.
///
/// The textual form is five colon-separated fields: public exponent
/// (decimal), host modulus (256 hex chars), host private exponent (256 hex
/// chars), certificate blob (hex), OEM seed (40 hex chars). Whitespace
/// around a field is ignored; anything else is malformed.
#[derive(Clone)]
pub struct Keys {
    /// Public exponent, `0x10001` in every bundle seen in the wild.
    pub exponent: BigUint,
    /// Host RSA modulus, 1024 bits.
    pub modulus: BigUint,
    /// Host RSA private exponent.
    pub private_exponent: BigUint,
    /// Host certificate blob sent in handshake leg 1.
    pub certificate: Vec<u8>,
    /// 160-bit OEM seed mixed into the session-key derivation.
    pub oem_seed: [u8; 20],
}

impl std::fmt::Debug for Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // No key material in logs.
        f.debug_struct("Keys")
            .field("certificate.len()", &self.certificate.len())
            .finish_non_exhaustive()
    }
}

impl Keys {
    /// Loads a bundle from a `.mtpz-data` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KeyFileError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parses the textual bundle form.
    pub fn parse(text: &str) -> Result<Self, KeyFileError> {
        let fields: Vec<&str> = text.split(':').map(str::trim).collect();
        let [exponent, modulus, private_exponent, certificate, oem_seed] = fields[..] else {
            return Err(KeyFileError::Malformed("expected five ':'-separated fields"));
        };

        let exponent: u32 = exponent
            .parse()
            .map_err(|_| KeyFileError::Malformed("public exponent is not a decimal number"))?;

        let modulus = parse_hex_exact(modulus, MODULUS_HEX_LEN, "host modulus")?;
        let private_exponent =
            parse_hex_exact(private_exponent, MODULUS_HEX_LEN, "host private exponent")?;

        let certificate = hex::decode(certificate)
            .map_err(|_| KeyFileError::Malformed("certificate blob is not valid hex"))?;
        if certificate.is_empty() {
            return Err(KeyFileError::Malformed("certificate blob is empty"));
        }

        let seed = parse_hex_exact(oem_seed, SEED_HEX_LEN, "oem seed")?;
        let seed = seed.to_bytes_be();
        let mut oem_seed = [0u8; 20];
        oem_seed[20 - seed.len()..].copy_from_slice(&seed);

        Ok(Self {
            exponent: BigUint::from(exponent),
            modulus,
            private_exponent,
            certificate,
            oem_seed,
        })
    }
}

fn parse_hex_exact(
    field: &str,
    len: usize,
    what: &'static str,
) -> Result<BigUint, KeyFileError> {
    if field.len() != len || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(KeyFileError::Malformed(what));
    }
    Ok(BigUint::parse_bytes(field.as_bytes(), 16).expect("validated hex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> String {
        format!(
            "65537:{m}:{d}:{c}:{s}",
            m = "ab".repeat(128),
            d = "cd".repeat(128),
            c = "3082010a",
            s = "ef".repeat(20),
        )
    }

    #[test]
    fn parses_well_formed_bundle() {
        let keys = Keys::parse(&bundle()).unwrap();
        assert_eq!(keys.exponent, BigUint::from(0x10001u32));
        assert_eq!(keys.certificate, vec![0x30, 0x82, 0x01, 0x0a]);
        assert_eq!(keys.oem_seed, [0xef; 20]);
        assert_eq!(keys.modulus.bits(), 1024);
    }

    #[test]
    fn leading_whitespace_ignored() {
        let text = bundle().replace(':', ":\n  ");
        let keys = Keys::parse(&text).unwrap();
        assert_eq!(keys.oem_seed, [0xef; 20]);
    }

    #[test]
    fn malformed_bundles_rejected() {
        // wrong field count
        assert!(Keys::parse("65537:aa:bb").is_err());
        // non-decimal exponent
        assert!(Keys::parse(&bundle().replacen("65537", "0x10001", 1)).is_err());
        // short modulus
        let mut b = bundle();
        b = b.replacen(&"ab".repeat(128), &"ab".repeat(127), 1);
        assert!(Keys::parse(&b).is_err());
        // stray characters in the seed
        let b = bundle().replace(&"ef".repeat(20), &format!("{}zz", "ef".repeat(19)));
        assert!(Keys::parse(&b).is_err());
        // empty certificate
        let b = bundle().replace("3082010a", "");
        assert!(Keys::parse(&b).is_err());
    }
}
