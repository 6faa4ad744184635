//! # palaver-core
//!
//! Foundation types shared by every Palaver crate:
//!
//! - [`ids`]: branded identifiers (`SessionId`, `UserId`, `MessageId`)
//! - [`room`]: canonical room naming and admission policy
//! - [`protocol`]: chat wire format (inbound payload parsing, outbound events)
//! - [`errors`]: the chat error taxonomy and collaborator errors
//! - [`gateway`]: traits for the collaborators the chat core consumes
//!
//! Nothing in this crate performs I/O.

#![deny(unsafe_code)]

pub mod errors;
pub mod gateway;
pub mod ids;
pub mod protocol;
pub mod room;

pub use errors::{ChatError, GatewayError};
pub use gateway::{Authenticator, Credentials, FriendshipLookup, Identity, PersistenceGateway, SavedMessage};
pub use ids::{MessageId, SessionId, UserId};
pub use protocol::{ChatEvent, ChatMessageEvent, ErrorEvent, InboundMessage, ReceiverRef};
pub use room::{AdmissionPolicy, RoomKey, RoomName, canonical_room_name};
