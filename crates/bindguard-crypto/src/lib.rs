//! Cryptography utilities for Bindguard

pub mod hash;

pub use hash::*;
