// src/security/mod.rs
//! Zeroizing containers for private key material.

pub mod secret;

pub use secret::SecretBytes;
