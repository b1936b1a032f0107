//! Verification key loading.
//!
//! The key is loaded exactly once at startup and is read-only afterwards.
//! Any failure here is fatal: the gateway must not serve without a trust root.

use std::fmt;
use std::fs;

use jsonwebtoken::{Algorithm, DecodingKey};

use crate::config::{ConfigError, KeyConfig, KeyFamily};

/// Immutable key every token is verified against.
#[derive(Clone)]
pub struct VerificationKey {
    family: KeyFamily,
    decoding: DecodingKey,
}

impl VerificationKey {
    /// Load key material described by the `auth.key` section.
    pub fn from_config(config: &KeyConfig) -> Result<Self, ConfigError> {
        match config.algorithm {
            KeyFamily::Hmac => {
                let secret = config
                    .secret
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ConfigError::Key("hmac requires a non-empty secret".into()))?;
                Ok(Self::hmac(secret.as_bytes()))
            }
            family => {
                let pem = match (&config.pem, &config.pem_path) {
                    (Some(pem), None) => pem.clone(),
                    (None, Some(path)) => fs::read_to_string(path).map_err(|e| {
                        ConfigError::Key(format!("cannot read {}: {e}", path.display()))
                    })?,
                    _ => {
                        return Err(ConfigError::Key(
                            "exactly one of `pem` or `pem_path` is required".into(),
                        ))
                    }
                };
                Self::from_pem(family, &pem)
            }
        }
    }

    /// Parse an RSA or EC public key in PEM form.
    pub fn from_pem(family: KeyFamily, pem: &str) -> Result<Self, ConfigError> {
        let armoured = normalize_pem(pem);
        let decoding = match family {
            KeyFamily::Rsa => DecodingKey::from_rsa_pem(armoured.as_bytes()),
            KeyFamily::Ec => DecodingKey::from_ec_pem(armoured.as_bytes()),
            KeyFamily::Hmac => {
                return Err(ConfigError::Key("a shared secret is not PEM encoded".into()))
            }
        }
        .map_err(|e| ConfigError::Key(e.to_string()))?;

        Ok(Self { family, decoding })
    }

    /// Shared-secret key.
    pub fn hmac(secret: &[u8]) -> Self {
        Self {
            family: KeyFamily::Hmac,
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn family(&self) -> KeyFamily {
        self.family
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    /// Token algorithms this key is allowed to verify.
    pub fn algorithms(&self) -> Vec<Algorithm> {
        match self.family {
            KeyFamily::Rsa => vec![
                Algorithm::RS256,
                Algorithm::RS384,
                Algorithm::RS512,
                Algorithm::PS256,
                Algorithm::PS384,
                Algorithm::PS512,
            ],
            KeyFamily::Ec => vec![Algorithm::ES256, Algorithm::ES384],
            KeyFamily::Hmac => vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512],
        }
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

/// Accept keys passed through environment variables: escaped newlines,
/// or a bare base64 body without the PEM armour.
fn normalize_pem(raw: &str) -> String {
    let text = raw.trim().replace("\\n", "\n");
    if text.contains("-----BEGIN") {
        return text;
    }

    let body: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let mut out = String::from("-----BEGIN PUBLIC KEY-----\n");
    for chunk in body.as_bytes().chunks(64) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out.push_str("-----END PUBLIC KEY-----\n");
    out
}
