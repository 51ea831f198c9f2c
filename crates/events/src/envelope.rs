use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use siteguard_core::{Address, MessageId};

use crate::schema::{Contract, Schema};

/// Addressed, schema-tagged message.
///
/// This is the unit placed in a mailbox.
///
/// Notes:
/// - `sender` is the **originating** actor. Forwarding (see `readdress`) keeps it, so
///   the final receiver can reply to whoever produced the payload.
/// - `body` travels by value as JSON; receivers decode it at their own boundary.
/// - `id` is stable across forwarding hops and can serve as an idempotency key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    id: MessageId,
    schema: Schema,
    sender: Address,
    recipient: Address,
    sent_at: DateTime<Utc>,
    body: JsonValue,
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("envelope carries `{found}`, expected `{expected}`")]
    SchemaMismatch { expected: Schema, found: Schema },

    #[error("malformed `{schema}` body: {source}")]
    Body {
        schema: Schema,
        #[source]
        source: serde_json::Error,
    },
}

impl Envelope {
    /// Serialize a typed message into a fresh envelope.
    pub fn seal<C: Contract>(
        sender: Address,
        recipient: Address,
        message: &C,
    ) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_value(message)?;
        Ok(Self::raw(C::SCHEMA, sender, recipient, body))
    }

    /// Wrap an already-encoded body (e.g. received from an external source).
    pub fn raw(schema: Schema, sender: Address, recipient: Address, body: JsonValue) -> Self {
        Self {
            id: MessageId::new(),
            schema,
            sender,
            recipient,
            sent_at: Utc::now(),
            body,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn sender(&self) -> &Address {
        &self.sender
    }

    pub fn recipient(&self) -> &Address {
        &self.recipient
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    pub fn body(&self) -> &JsonValue {
        &self.body
    }

    /// Point the envelope at another mailbox, leaving id, sender and body untouched.
    pub fn readdress(mut self, recipient: Address) -> Self {
        self.recipient = recipient;
        self
    }

    /// Strictly decode the body as `C`.
    ///
    /// Use `crate::decode` instead when partially malformed input must be tolerated.
    pub fn open<C: Contract>(&self) -> Result<C, OpenError> {
        if self.schema != C::SCHEMA {
            return Err(OpenError::SchemaMismatch {
                expected: C::SCHEMA,
                found: self.schema,
            });
        }
        serde_json::from_value(self.body.clone()).map_err(|source| OpenError::Body {
            schema: self.schema,
            source,
        })
    }
}
