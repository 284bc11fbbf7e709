//! Fixed-size secret buffers that are zeroized on drop and never printed.
use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::errors::{KeyringError, Result};

/// Fixed-size owned secret, wiped when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes<const N: usize>([u8; N]);

impl<const N: usize> SecretBytes<N> {
    pub fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Copy out of a slice that must be exactly `N` bytes long.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != N {
            return Err(KeyringError::InvalidInputLength {
                expected: N,
                actual: slice.len(),
            });
        }
        let mut arr = [0u8; N];
        arr.copy_from_slice(slice);
        let secret = Self(arr);
        arr.zeroize();
        Ok(secret)
    }

    /// Scoped access to the underlying bytes. The borrow cannot outlive `f`.
    pub fn with_secret<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[u8; N]) -> R,
    {
        f(&self.0)
    }

    pub(crate) fn expose(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> fmt::Debug for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{}>(<redacted>)", N)
    }
}
