//! Error taxonomy for the chat core.
//!
//! [`ChatError`] classifies everything that can go wrong while admitting a
//! connection or handling an inbound payload. Recoverable variants are turned
//! into a client-visible error event by the session; none of them close the
//! connection except [`ChatError::AdmissionDenied`].
//!
//! [`GatewayError`] is what collaborator implementations (store, auth)
//! return across the trait boundary.

use thiserror::Error;

/// Errors raised by the chat core.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    /// The connecting principal is unauthenticated or not allowed in the room.
    #[error("admission denied: {0}")]
    AdmissionDenied(String),

    /// The inbound payload is not a well-formed chat message.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// `receiver_id` absent or empty.
    #[error("missing receiver_id")]
    MissingReceiver,

    /// `message` empty after trimming.
    #[error("message cannot be empty")]
    EmptyMessage,

    /// The receiver does not name an existing user.
    #[error("receiver not found: {0}")]
    ReceiverNotFound(String),

    /// The persistence gateway failed to store the message.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// Serializing or enqueueing an event for one subscriber failed.
    #[error("delivery fault: {0}")]
    DeliveryFault(String),
}

impl ChatError {
    /// Reason string sent to the client in the error event.
    pub fn client_reason(&self) -> &'static str {
        match self {
            Self::AdmissionDenied(_) => "Not authorized",
            Self::MalformedPayload(_) => "Invalid message format",
            Self::MissingReceiver => "Missing receiver_id",
            Self::EmptyMessage => "Message cannot be empty",
            Self::ReceiverNotFound(_) => "Receiver not found",
            Self::PersistenceFailure(_) => "Failed to save message",
            Self::DeliveryFault(_) => "Error processing message",
        }
    }

    /// Short classification string for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AdmissionDenied(_) => "admission_denied",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::MissingReceiver => "missing_receiver",
            Self::EmptyMessage => "empty_message",
            Self::ReceiverNotFound(_) => "receiver_not_found",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::DeliveryFault(_) => "delivery_fault",
        }
    }

    /// Whether the error ends the connection.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AdmissionDenied(_))
    }
}

/// Errors returned by collaborator implementations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The backing store could not be reached or returned an error.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was refused (constraint violation, invalid input).
    #[error("rejected: {0}")]
    Rejected(String),
}
