//! Password based key derivation for encrypted keystores.
//!
//! Only the two KDFs a V3 keystore can name are supported. Parameters are
//! checked against [`KdfLimits`] before any work is done, so a hostile
//! keystore cannot make us allocate gigabytes or spin for minutes.

use pbkdf2::pbkdf2_hmac;
use scrypt::Params;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::errors::{KeyringError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfAlgorithm {
    Pbkdf2 { iterations: u32 },
    Scrypt { n: u64, r: u32, p: u32 },
}

/// Resource ceilings applied before running a KDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfLimits {
    /// Upper bound on scrypt's `128 * r * N` working set.
    pub max_scrypt_memory_bytes: u64,
    /// Upper bound on scrypt's `p`; total work is `N * r * p`.
    pub max_scrypt_parallelism: u32,
    pub max_pbkdf2_iterations: u32,
}

impl Default for KdfLimits {
    fn default() -> Self {
        Self {
            max_scrypt_memory_bytes: 256 * 1024 * 1024,
            max_scrypt_parallelism: 16,
            max_pbkdf2_iterations: 10_000_000,
        }
    }
}

pub struct KeyDerivation {
    algorithm: KdfAlgorithm,
}

impl KeyDerivation {
    pub fn new(algorithm: KdfAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn pbkdf2(iterations: u32) -> Self {
        Self::new(KdfAlgorithm::Pbkdf2 { iterations })
    }

    pub fn scrypt(n: u64, r: u32, p: u32) -> Self {
        Self::new(KdfAlgorithm::Scrypt { n, r, p })
    }

    pub fn algorithm(&self) -> KdfAlgorithm {
        self.algorithm
    }

    /// Reject parameters that are malformed or exceed `limits`.
    ///
    /// Scrypt follows RFC 7914: N is a power of two greater than 1 and
    /// `N < 2^(16 * r)`.
    pub fn validate(&self, limits: &KdfLimits) -> Result<()> {
        match self.algorithm {
            KdfAlgorithm::Pbkdf2 { iterations } => {
                if iterations == 0 || iterations > limits.max_pbkdf2_iterations {
                    debug!("pbkdf2 iteration count {} rejected", iterations);
                    return Err(KeyringError::DecryptionFailed);
                }
            }
            KdfAlgorithm::Scrypt { n, r, p } => {
                if n < 2 || !n.is_power_of_two() || r == 0 || p == 0 {
                    debug!("scrypt parameters N={} r={} p={} malformed", n, r, p);
                    return Err(KeyringError::DecryptionFailed);
                }
                let log_n = n.trailing_zeros();
                if u64::from(log_n) >= 16 * u64::from(r) {
                    debug!("scrypt N={} inconsistent with r={}", n, r);
                    return Err(KeyringError::DecryptionFailed);
                }
                let memory = 128u64
                    .checked_mul(u64::from(r))
                    .and_then(|m| m.checked_mul(n))
                    .ok_or(KeyringError::DecryptionFailed)?;
                if memory > limits.max_scrypt_memory_bytes {
                    debug!("scrypt working set {} bytes over limit", memory);
                    return Err(KeyringError::DecryptionFailed);
                }
                if p > limits.max_scrypt_parallelism {
                    debug!("scrypt p={} over limit", p);
                    return Err(KeyringError::DecryptionFailed);
                }
            }
        }
        Ok(())
    }

    pub fn derive_key(
        &self,
        password: &[u8],
        salt: &[u8],
        key_length: usize,
        limits: &KdfLimits,
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.validate(limits)?;
        debug!("Deriving key with length {} bytes", key_length);

        match self.algorithm {
            KdfAlgorithm::Pbkdf2 { iterations } => {
                Ok(Self::derive_pbkdf2(password, salt, iterations, key_length))
            }
            KdfAlgorithm::Scrypt { n, r, p } => {
                Self::derive_scrypt(password, salt, n, r, p, key_length)
            }
        }
    }

    fn derive_pbkdf2(
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        key_length: usize,
    ) -> Zeroizing<Vec<u8>> {
        debug!("Using PBKDF2 with {} iterations", iterations);
        let mut key = Zeroizing::new(vec![0u8; key_length]);
        pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
        key
    }

    fn derive_scrypt(
        password: &[u8],
        salt: &[u8],
        n: u64,
        r: u32,
        p: u32,
        key_length: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        debug!("Using Scrypt with parameters N={}, r={}, p={}", n, r, p);

        let log_n = u8::try_from(n.trailing_zeros()).map_err(|_| KeyringError::DecryptionFailed)?;
        let params = Params::new(log_n, r, p, key_length).map_err(|_| KeyringError::DecryptionFailed)?;

        let mut key = Zeroizing::new(vec![0u8; key_length]);
        scrypt::scrypt(password, salt, &params, &mut key).map_err(|_| KeyringError::DecryptionFailed)?;
        Ok(key)
    }
}
