use crate::SshSessionError;

/// How the relay's host key is checked after the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HostKeyPolicy {
    /// Accept any host key. No pinning, no known_hosts lookup.
    #[default]
    InsecureIgnore,
    /// Accept only a host key whose SHA-256 digest matches (lowercase hex).
    Sha256Fingerprint(String),
}

impl HostKeyPolicy {
    /// Accepts hex with or without `:` separators, in any case.
    pub fn sha256_fingerprint(src: &str) -> Result<Self, String> {
        let normalized: String = src
            .chars()
            .filter(|c| *c != ':')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if normalized.len() != 64 || !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!(
                "Invalid SHA-256 fingerprint '{}'. Expected 64 hex digits",
                src
            ));
        }

        Ok(Self::Sha256Fingerprint(normalized))
    }

    pub fn is_insecure(&self) -> bool {
        matches!(self, HostKeyPolicy::InsecureIgnore)
    }

    pub fn verify(&self, host_key_sha256: Option<&[u8]>) -> Result<(), SshSessionError> {
        let expected = match self {
            HostKeyPolicy::InsecureIgnore => return Ok(()),
            HostKeyPolicy::Sha256Fingerprint(expected) => expected,
        };

        let actual = match host_key_sha256 {
            Some(hash) => to_hex(hash),
            None => {
                return Err(SshSessionError::HostKeyRejected(
                    "relay did not present a host key".to_string(),
                ))
            }
        };

        if actual != *expected {
            return Err(SshSessionError::HostKeyRejected(format!(
                "fingerprint {} does not match pinned {}",
                actual, expected
            )));
        }

        Ok(())
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        result.push_str(&format!("{:02x}", b));
    }
    result
}
