//! Derivation path parsing: `m / idx['] / idx['] ...`
//!
//! A trailing `'` marks a hardened index. Indices are the unhardened 31-bit
//! values; the hardened offset is applied by the derivation code.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::core::errors::{KeyringError, Result};

/// Offset added to hardened child indices.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// One path level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildNumber {
    Normal(u32),
    Hardened(u32),
}

impl ChildNumber {
    /// Unhardened 31-bit index.
    pub fn index(&self) -> u32 {
        match *self {
            ChildNumber::Normal(i) | ChildNumber::Hardened(i) => i,
        }
    }

    pub fn is_hardened(&self) -> bool {
        matches!(self, ChildNumber::Hardened(_))
    }

    /// Wire value with the hardened bit applied.
    pub fn to_u32(&self) -> u32 {
        match *self {
            ChildNumber::Normal(i) => i,
            ChildNumber::Hardened(i) => i | HARDENED_OFFSET,
        }
    }

    /// Inverse of [`ChildNumber::to_u32`].
    pub fn from_u32(value: u32) -> Self {
        if value & HARDENED_OFFSET != 0 {
            ChildNumber::Hardened(value & !HARDENED_OFFSET)
        } else {
            ChildNumber::Normal(value)
        }
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ChildNumber::Normal(i) => write!(f, "{}", i),
            ChildNumber::Hardened(i) => write!(f, "{}'", i),
        }
    }
}

/// Parsed `m/...` path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    pub fn master() -> Self {
        Self(Vec::new())
    }

    pub fn parse(path: &str) -> Result<Self> {
        path.parse()
    }

    pub fn children(&self) -> &[ChildNumber] {
        &self.0
    }

    pub fn is_master(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_fully_hardened(&self) -> bool {
        self.0.iter().all(ChildNumber::is_hardened)
    }

    /// Copy of this path extended by one level.
    pub fn child(&self, child: ChildNumber) -> Self {
        let mut children = self.0.clone();
        children.push(child);
        Self(children)
    }
}

fn parse_segment(segment: &str) -> std::result::Result<ChildNumber, &'static str> {
    let (digits, hardened) = match segment.strip_suffix('\'') {
        Some(rest) => (rest, true),
        None => (segment, false),
    };
    if digits.is_empty() {
        return Err("empty segment");
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err("non-numeric segment");
    }
    let index: u32 = digits.parse().map_err(|_| "index overflow")?;
    if index >= HARDENED_OFFSET {
        return Err("index out of range");
    }
    Ok(if hardened {
        ChildNumber::Hardened(index)
    } else {
        ChildNumber::Normal(index)
    })
}

impl FromStr for DerivationPath {
    type Err = KeyringError;

    fn from_str(path: &str) -> Result<Self> {
        let mut segments = path.split('/');
        if segments.next() != Some("m") {
            debug!("derivation path rejected: missing master prefix");
            return Err(KeyringError::InvalidPath);
        }
        let mut children = Vec::new();
        for segment in segments {
            let child = parse_segment(segment).map_err(|reason| {
                debug!("derivation path rejected: {}", reason);
                KeyringError::InvalidPath
            })?;
            children.push(child);
        }
        Ok(Self(children))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for child in &self.0 {
            write!(f, "/{}", child)?;
        }
        Ok(())
    }
}
