//! External key generation through `ssh-keygen`
//!
//! Key material is never produced in-process. [`KeyGenerator`] is the seam:
//! production code uses [`SshKeygen`], tests substitute a fake that writes
//! the `NAME`/`NAME.pub` pair directly.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::manifest::Provider;

/// Default KDF rounds for software keys
pub const DEFAULT_ROUNDS: u32 = 64;

/// First OpenSSH release with `ed25519-sk` keys
pub const MIN_FIDO2_OPENSSH: (u32, u32) = (8, 2);

/// Parameters for generating one key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeygenRequest<'a> {
    pub provider: Provider,
    /// Private key file; the public half is written next to it with `.pub`
    pub key_path: &'a Path,
    pub comment: &'a str,
    /// Software keys only; `None` means an empty passphrase
    pub passphrase: Option<&'a str>,
    pub resident: bool,
    pub application: Option<&'a str>,
    pub rounds: u32,
}

/// Produces key files on behalf of the lifecycle operations
pub trait KeyGenerator {
    /// Create `request.key_path` and its `.pub` sibling.
    fn generate(&self, request: &KeygenRequest<'_>) -> Result<()>;

    /// Write handles for every resident credential on the authenticator into `dir`.
    fn download_resident(&self, dir: &Path) -> Result<()>;
}

/// [`KeyGenerator`] backed by the `ssh-keygen` program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeygen {
    program: PathBuf,
}

impl Default for SshKeygen {
    fn default() -> Self {
        Self::new("ssh-keygen")
    }
}

impl SshKeygen {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument vector for generating `request`.
    pub fn build_args(request: &KeygenRequest<'_>) -> Vec<OsString> {
        let key_path = request.key_path.as_os_str();
        let mut args: Vec<OsString> = Vec::new();
        match request.provider {
            Provider::HardwareBacked => {
                push_args(&mut args, ["-t", "ed25519-sk", "-f"]);
                args.push(key_path.to_os_string());
                push_args(&mut args, ["-C", request.comment]);
                if request.resident {
                    push_args(&mut args, ["-O", "resident"]);
                }
                if let Some(application) = request.application {
                    args.push("-O".into());
                    args.push(format!("application={application}").into());
                }
                // The handle file carries no secret; FIDO keys use the device PIN
                push_args(&mut args, ["-N", ""]);
            }
            Provider::Software => {
                let rounds = request.rounds.to_string();
                push_args(&mut args, ["-t", "ed25519", "-a", rounds.as_str(), "-f"]);
                args.push(key_path.to_os_string());
                push_args(&mut args, ["-C", request.comment]);
                push_args(&mut args, ["-N", request.passphrase.unwrap_or("")]);
            }
        }
        args
    }

    fn run(&self, args: &[OsString], cwd: Option<&Path>) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let program = self.program.display().to_string();
        tracing::debug!(program = %program, "running key generator");
        let output = cmd.output().map_err(|e| Error::Keygen {
            program: program.clone(),
            code: None,
            message: e.to_string(),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if output.status.success() {
            if !stderr.is_empty() {
                tracing::debug!(program = %program, stderr = %stderr, "key generator output");
            }
            return Ok(());
        }
        Err(Error::Keygen {
            program,
            code: output.status.code(),
            message: if stderr.is_empty() {
                "no error output".into()
            } else {
                stderr
            },
        })
    }
}

impl KeyGenerator for SshKeygen {
    fn generate(&self, request: &KeygenRequest<'_>) -> Result<()> {
        self.run(&Self::build_args(request), None)
    }

    fn download_resident(&self, dir: &Path) -> Result<()> {
        // `-K` writes id_*_sk_rk* files into the working directory
        self.run(&[OsString::from("-K")], Some(dir))
    }
}

fn push_args<const N: usize>(args: &mut Vec<OsString>, items: [&str; N]) {
    args.extend(items.into_iter().map(OsString::from));
}

/// Tri-state answer of a tool capability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Supported,
    Unsupported,
    Unknown,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Supported => "supported",
            Self::Unsupported => "unsupported",
            Self::Unknown => "unknown",
        })
    }
}

/// Locate `program` on `PATH`.
pub fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path = env::var_os("PATH")?;
    env::split_paths(&path).find_map(|dir| {
        let full = dir.join(program);
        if full.is_file() {
            return Some(full);
        }
        #[cfg(windows)]
        {
            let exe = dir.join(format!("{program}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Whether `ssh-keygen` is installed.
pub fn probe_keygen() -> bool {
    find_program("ssh-keygen").is_some()
}

/// Version banner printed by `ssh -V`, if `ssh` runs.
pub fn ssh_version() -> Option<String> {
    let output = Command::new("ssh").arg("-V").output().ok()?;
    // OpenSSH prints its banner on stderr
    [output.stderr, output.stdout]
        .iter()
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
        .find(|text| !text.is_empty())
}

/// `(major, minor)` from a banner such as `OpenSSH_9.6p1 Ubuntu-3, OpenSSL 3.0.13`.
pub fn parse_openssh_version(banner: &str) -> Option<(u32, u32)> {
    let start = banner.find("OpenSSH_")? + "OpenSSH_".len();
    let rest = &banner[start..];
    let mut parts = rest.splitn(2, '.');
    let major = parts.next()?.parse().ok()?;
    let minor_digits: String = parts
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let minor = minor_digits.parse().ok()?;
    Some((major, minor))
}

/// FIDO2 key support derived from an `ssh -V` banner.
pub fn fido2_capability(banner: Option<&str>) -> Capability {
    match banner.and_then(parse_openssh_version) {
        Some(version) if version >= MIN_FIDO2_OPENSSH => Capability::Supported,
        Some(_) => Capability::Unsupported,
        None => Capability::Unknown,
    }
}
