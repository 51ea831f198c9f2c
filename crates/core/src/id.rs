//! Strongly-typed identifiers used across the pipeline.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Prefix carried by every actor address.
pub const ADDRESS_PREFIX: &str = "agent1q";

/// Namespace for seed-derived addresses (UUIDv5).
const ADDRESS_NAMESPACE: Uuid = Uuid::from_u128(0x5e7e_9a4d_0c1b_4f3e_9d2a_7b61_c0de_a11e);

/// Opaque, stable identifier of an actor's mailbox.
///
/// Addresses are purely referential: holding one says nothing about whether the
/// actor behind it is running. Which address is "the router" or "the enricher" is
/// configuration, never computed by the pipeline itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap an externally configured address.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derive a deterministic address from an actor name and a seed phrase.
    ///
    /// The same `(name, seed)` pair always yields the same address, so peers can be
    /// configured once and survive restarts.
    pub fn from_seed(name: &str, seed: &str) -> Self {
        let material = format!("{name}\u{1f}{seed}");
        let id = Uuid::new_v5(&ADDRESS_NAMESPACE, material.as_bytes());
        Self(format!("{ADDRESS_PREFIX}{}", id.simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::invalid("address", "cannot be empty"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ValidationError::invalid("address", "cannot contain whitespace"));
        }
        Ok(Self(s.to_string()))
    }
}

/// Identifier of a single envelope.
///
/// Uses UUIDv7 (time-ordered). Receivers may use it as an idempotency key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for MessageId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| ValidationError::invalid("message_id", e.to_string()))?;
        Ok(Self(uuid))
    }
}

/// Tracker-assigned identifier of an observed person.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub u64);

impl PersonId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl From<u64> for PersonId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for PersonId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
