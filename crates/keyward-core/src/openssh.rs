//! OpenSSH public key lines
//!
//! Only the framing is interpreted (`TYPE BLOB [COMMENT]` and the SSH wire
//! strings inside the blob). No key material is validated.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use sha2::{Digest, Sha256};

/// Type tags of keys held by a hardware authenticator start with this
pub const HARDWARE_KEY_TYPE_PREFIX: &str = "sk-";

/// A parsed `authorized_keys`-style public key line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyLine {
    pub key_type: String,
    pub blob: Option<String>,
    pub comment: Option<String>,
}

impl PublicKeyLine {
    /// Parse the first non-empty line of `content`.
    ///
    /// Returns `None` when there is no line with a key type.
    pub fn parse(content: &str) -> Option<Self> {
        let line = content.lines().map(str::trim).find(|l| !l.is_empty())?;
        let mut tokens = line.split_whitespace();
        let key_type = tokens.next()?.to_string();
        let blob = tokens.next().map(str::to_string);
        let comment = tokens.next().map(str::to_string);
        Some(Self {
            key_type,
            blob,
            comment,
        })
    }

    pub fn is_hardware_backed(&self) -> bool {
        self.key_type.starts_with(HARDWARE_KEY_TYPE_PREFIX)
    }

    /// `SHA256:` fingerprint of the blob, as `ssh-keygen -l` prints it.
    pub fn fingerprint(&self) -> Option<String> {
        fingerprint(self.blob.as_deref()?)
    }

    /// FIDO application string embedded in an `sk-` key blob.
    pub fn application(&self) -> Option<String> {
        if !self.is_hardware_backed() {
            return None;
        }
        sk_application(self.blob.as_deref()?)
    }
}

/// OpenSSH `SHA256:` fingerprint of a base64 key blob.
///
/// Returns `None` when the blob is not valid base64.
pub fn fingerprint(blob: &str) -> Option<String> {
    let decoded = STANDARD.decode(blob).ok()?;
    let digest = Sha256::digest(&decoded);
    Some(format!("SHA256:{}", STANDARD_NO_PAD.encode(digest)))
}

/// Extract the application from an `sk-ssh-ed25519` or `sk-ecdsa-*` blob.
pub fn sk_application(blob: &str) -> Option<String> {
    let decoded = STANDARD.decode(blob).ok()?;
    let mut reader = WireReader::new(&decoded);
    let key_type = std::str::from_utf8(reader.string()?).ok()?;
    match key_type {
        "sk-ssh-ed25519@openssh.com" => {
            reader.string()?; // public key
        }
        t if t.starts_with("sk-ecdsa-") => {
            reader.string()?; // curve
            reader.string()?; // Q
        }
        _ => return None,
    }
    let application = std::str::from_utf8(reader.string()?).ok()?;
    Some(application.to_string())
}

/// Reader for length-prefixed SSH wire strings
struct WireReader<'a> {
    data: &'a [u8],
}

impl<'a> WireReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn string(&mut self) -> Option<&'a [u8]> {
        let (len, rest) = self.data.split_first_chunk::<4>()?;
        let len = u32::from_be_bytes(*len) as usize;
        if rest.len() < len {
            return None;
        }
        let (value, rest) = rest.split_at(len);
        self.data = rest;
        Some(value)
    }
}
