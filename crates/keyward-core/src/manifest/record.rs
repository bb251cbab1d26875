//! Key records and the closed provider set

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the private key material lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// FIDO2 authenticator (`ed25519-sk`); the private file is only a handle
    #[serde(rename = "fido2", alias = "hardware-backed")]
    HardwareBacked,
    /// Passphrase-encrypted private key file
    #[serde(rename = "software")]
    Software,
}

impl Provider {
    /// Every provider, in display order
    pub const ALL: [Provider; 2] = [Provider::HardwareBacked, Provider::Software];

    /// Wire name used in manifests and config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HardwareBacked => "fido2",
            Self::Software => "software",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fido2" | "hardware-backed" => Ok(Self::HardwareBacked),
            "software" => Ok(Self::Software),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Provider-specific record fields.
///
/// Only hardware-backed keys can be resident or carry an application string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    HardwareBacked {
        resident: bool,
        application: Option<String>,
    },
    Software,
}

impl KeyKind {
    pub fn provider(&self) -> Provider {
        match self {
            Self::HardwareBacked { .. } => Provider::HardwareBacked,
            Self::Software => Provider::Software,
        }
    }
}

/// One tracked key pair.
///
/// The path fields are stored exactly as declared in the manifest and are
/// untrusted: pass them through [`crate::resolve_record_paths`] before any
/// filesystem use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordWire", into = "RecordWire")]
pub struct KeyRecord {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub public_key_path: String,
    pub private_key_path: String,
    pub comment: String,
    pub kind: KeyKind,
}

impl KeyRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        kind: KeyKind,
        public_key_path: &Path,
        private_key_path: &Path,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            public_key_path: public_key_path.to_string_lossy().into_owned(),
            private_key_path: private_key_path.to_string_lossy().into_owned(),
            comment: comment.into(),
            kind,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn provider(&self) -> Provider {
        self.kind.provider()
    }

    pub fn is_resident(&self) -> bool {
        matches!(self.kind, KeyKind::HardwareBacked { resident: true, .. })
    }

    pub fn application(&self) -> Option<&str> {
        match &self.kind {
            KeyKind::HardwareBacked { application, .. } => application.as_deref(),
            KeyKind::Software => None,
        }
    }
}

/// Flat on-disk layout of a record.
///
/// Fields are declared alphabetically so serialized manifests have sorted keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordWire {
    #[serde(default)]
    application: Option<String>,
    comment: String,
    created_at: DateTime<Utc>,
    name: String,
    private_key_path: String,
    provider: Provider,
    public_key_path: String,
    resident: bool,
}

impl TryFrom<RecordWire> for KeyRecord {
    type Error = String;

    fn try_from(wire: RecordWire) -> Result<Self, Self::Error> {
        if wire.name.is_empty() {
            return Err("name must not be empty".into());
        }

        let kind = match wire.provider {
            Provider::HardwareBacked => KeyKind::HardwareBacked {
                resident: wire.resident,
                application: wire.application,
            },
            Provider::Software => {
                if wire.resident {
                    return Err("software keys cannot be resident".into());
                }
                if wire.application.is_some() {
                    return Err("application is only valid for fido2 keys".into());
                }
                KeyKind::Software
            }
        };

        Ok(Self {
            name: wire.name,
            created_at: wire.created_at,
            public_key_path: wire.public_key_path,
            private_key_path: wire.private_key_path,
            comment: wire.comment,
            kind,
        })
    }
}

impl From<KeyRecord> for RecordWire {
    fn from(record: KeyRecord) -> Self {
        let provider = record.provider();
        let (resident, application) = match record.kind {
            KeyKind::HardwareBacked {
                resident,
                application,
            } => (resident, application),
            KeyKind::Software => (false, None),
        };
        Self {
            application,
            comment: record.comment,
            created_at: record.created_at,
            name: record.name,
            private_key_path: record.private_key_path,
            provider,
            public_key_path: record.public_key_path,
            resident,
        }
    }
}
