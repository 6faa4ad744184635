//! Connection session state machine.
//!
//! One [`ChatSession`] per live connection:
//!
//! ```text
//! Connecting --admit ok--> Open --close--> Closed
//!     |                                      ^
//!     +------------admit denied--------------+
//! ```
//!
//! Admission resolves the caller's identity, checks the room against the
//! configured [`AdmissionPolicy`] and joins the room before the session is
//! `Open`. Inbound payloads are validated, persisted and then published to
//! the room; failures are reported to this session only.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use palaver_core::{
    AdmissionPolicy, Authenticator, ChatError, ChatEvent, ChatMessageEvent, Credentials,
    FriendshipLookup, Identity, InboundMessage, MessageId, PersistenceGateway, RoomKey, RoomName,
    SessionId,
};
use palaver_telemetry::metrics::{
    CHAT_ADMISSIONS_DENIED_TOTAL, CHAT_MESSAGE_ERRORS_TOTAL, CHAT_MESSAGES_TOTAL,
    CHAT_RECEIVE_DURATION_SECONDS,
};
use tracing::{debug, info, instrument, warn};

use super::groups::GroupLayer;
use crate::websocket::connection::ClientConnection;

/// Denial reason used when no identity could be resolved.
pub const REASON_UNAUTHENTICATED: &str = "unauthenticated";

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct ChatContext {
    /// Message store and user existence checks.
    pub persistence: Arc<dyn PersistenceGateway>,
    /// Credential resolution.
    pub authenticator: Arc<dyn Authenticator>,
    /// Friendship checks for the `friends` policy.
    pub friendships: Arc<dyn FriendshipLookup>,
    /// Room table.
    pub groups: Arc<GroupLayer>,
    /// Who may join a room.
    pub policy: AdmissionPolicy,
}

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted at transport level, not yet admitted.
    Connecting,
    /// Admitted and subscribed to its room.
    Open,
    /// Terminal.
    Closed,
}

/// Result of handling one inbound payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Persisted and enqueued for `recipients` room members.
    Published {
        /// Id assigned by the store.
        message_id: MessageId,
        /// Members the event was enqueued for.
        recipients: usize,
    },
    /// Rejected; an error event went to this session only.
    Rejected(ChatError),
    /// The session was not open, nothing happened.
    Ignored,
}

/// Runtime state for one client connection.
pub struct ChatSession {
    ctx: ChatContext,
    room_name: RoomName,
    room: RoomKey,
    state: SessionState,
    identity: Option<Identity>,
    outbound: Arc<ClientConnection>,
}

impl ChatSession {
    /// A new session in `Connecting` for `room_name`, delivering through
    /// `outbound`.
    pub fn new(ctx: ChatContext, room_name: RoomName, outbound: Arc<ClientConnection>) -> Self {
        let room = RoomKey::for_room(&room_name);
        Self {
            ctx,
            room_name,
            room,
            state: SessionState::Connecting,
            identity: None,
            outbound,
        }
    }

    /// Session id (same as its connection's).
    pub fn id(&self) -> &SessionId {
        &self.outbound.id
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Admitted identity, once `Open`.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Room channel key.
    pub fn room(&self) -> &RoomKey {
        &self.room
    }

    /// Authenticate and authorize, then join the room.
    ///
    /// On denial the session is `Closed`, never joined, and no event is sent.
    #[instrument(skip_all, fields(session_id = %self.outbound.id, room = %self.room))]
    pub async fn admit(&mut self, credentials: &Credentials) -> Result<&Identity, ChatError> {
        if self.state != SessionState::Connecting {
            return Err(ChatError::AdmissionDenied(format!(
                "session is {:?}",
                self.state
            )));
        }

        let Some(identity) = self
            .ctx
            .authenticator
            .current_authenticated_user(credentials)
            .await
        else {
            return Err(self.deny(REASON_UNAUTHENTICATED));
        };

        if let Err(reason) = self.authorize(&identity).await {
            info!(user_id = %identity.user_id, reason, "admission refused by policy");
            return Err(self.deny(reason));
        }

        let _ = self.ctx.groups.join(&self.room, Arc::clone(&self.outbound));
        info!(user_id = %identity.user_id, username = %identity.username, "session admitted");
        self.state = SessionState::Open;
        Ok(self.identity.insert(identity))
    }

    async fn authorize(&self, identity: &Identity) -> Result<(), &'static str> {
        match self.ctx.policy {
            AdmissionPolicy::Authenticated => Ok(()),
            AdmissionPolicy::Participant => {
                if self.room_name.includes(identity.user_id) {
                    Ok(())
                } else {
                    Err("not a participant")
                }
            }
            AdmissionPolicy::Friends => {
                let Some(peer) = self.room_name.peer_of(identity.user_id) else {
                    return Err("not a participant");
                };
                match self.ctx.friendships.are_friends(identity.user_id, peer).await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err("not friends"),
                    Err(e) => {
                        warn!(error = %e, "friendship lookup failed during admission");
                        Err("friendship lookup failed")
                    }
                }
            }
        }
    }

    fn deny(&mut self, reason: &str) -> ChatError {
        self.state = SessionState::Closed;
        counter!(CHAT_ADMISSIONS_DENIED_TOTAL, "reason" => reason.to_string()).increment(1);
        ChatError::AdmissionDenied(reason.to_string())
    }

    /// Handle one inbound payload.
    ///
    /// Checks run in order: format, receiver present, message non-empty,
    /// receiver exists, persist, publish. The first failure is reported to
    /// this session and nothing is published.
    #[instrument(skip_all, fields(session_id = %self.outbound.id, room = %self.room))]
    pub async fn receive(&mut self, raw: &str) -> ReceiveOutcome {
        let (SessionState::Open, Some(sender)) = (self.state, self.identity.clone()) else {
            debug!(state = ?self.state, "payload received outside open state, ignoring");
            return ReceiveOutcome::Ignored;
        };

        let started = Instant::now();
        match self.process(&sender, raw).await {
            Ok((message_id, recipients)) => {
                counter!(CHAT_MESSAGES_TOTAL, "source" => "websocket").increment(1);
                histogram!(CHAT_RECEIVE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
                debug!(%message_id, recipients, "message published");
                ReceiveOutcome::Published {
                    message_id,
                    recipients,
                }
            }
            Err(err) => {
                counter!(CHAT_MESSAGE_ERRORS_TOTAL, "kind" => err.kind()).increment(1);
                debug!(kind = err.kind(), error = %err, "inbound message rejected");
                if !self.outbound.send_event(&ChatEvent::from(&err)) {
                    warn!("could not enqueue error event");
                }
                ReceiveOutcome::Rejected(err)
            }
        }
    }

    async fn process(
        &self,
        sender: &Identity,
        raw: &str,
    ) -> Result<(MessageId, usize), ChatError> {
        let inbound = InboundMessage::parse(raw)?;

        let not_found = || ChatError::ReceiverNotFound(inbound.receiver.to_string());
        let receiver = inbound.receiver.user_id().ok_or_else(not_found)?;
        match self.ctx.persistence.user_exists(receiver).await {
            Ok(true) => {}
            Ok(false) => return Err(not_found()),
            Err(e) => {
                warn!(error = %e, receiver = %receiver, "receiver lookup failed");
                return Err(not_found());
            }
        }

        let saved = self
            .ctx
            .persistence
            .save_message(sender.user_id, receiver, &inbound.content)
            .await
            .map_err(|e| {
                warn!(error = %e, "failed to save message");
                ChatError::PersistenceFailure(e.to_string())
            })?;

        let event = ChatEvent::ChatMessage(ChatMessageEvent::from_saved(
            sender,
            &inbound.content,
            &saved,
        ));
        let recipients = self.ctx.groups.publish(&self.room, &event)?;
        Ok((saved.id, recipients))
    }

    /// Leave the room and move to `Closed`. Idempotent.
    pub fn close(&mut self) {
        if self.state == SessionState::Open {
            let _ = self.ctx.groups.leave(&self.room, &self.outbound.id);
            info!(session_id = %self.outbound.id, room = %self.room, "session closed");
        }
        self.state = SessionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use chrono::Utc;
    use palaver_core::{GatewayError, SavedMessage, UserId};
    use parking_lot::Mutex;
    use serde_json::Value;
    use tokio::sync::mpsc;

    use super::*;

    // ── Fakes ───────────────────────────────────────────────────────

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Call {
        UserExists(UserId),
        Save(UserId, UserId, String),
    }

    #[derive(Default)]
    struct RecordingStore {
        users: HashSet<i64>,
        fail_saves: bool,
        fail_lookups: bool,
        calls: Mutex<Vec<Call>>,
        next_id: Mutex<i64>,
    }

    impl RecordingStore {
        fn with_users(ids: &[i64]) -> Self {
            Self {
                users: ids.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn saves(&self) -> usize {
            self.calls
                .lock()
                .iter()
                .filter(|c| matches!(c, Call::Save(..)))
                .count()
        }
    }

    #[async_trait]
    impl PersistenceGateway for RecordingStore {
        async fn user_exists(&self, user_id: UserId) -> Result<bool, GatewayError> {
            self.calls.lock().push(Call::UserExists(user_id));
            if self.fail_lookups {
                return Err(GatewayError::Unavailable("down".into()));
            }
            Ok(self.users.contains(&user_id.get()))
        }

        async fn save_message(
            &self,
            sender_id: UserId,
            receiver_id: UserId,
            content: &str,
        ) -> Result<SavedMessage, GatewayError> {
            self.calls
                .lock()
                .push(Call::Save(sender_id, receiver_id, content.to_string()));
            if self.fail_saves {
                return Err(GatewayError::Unavailable("disk full".into()));
            }
            let mut next = self.next_id.lock();
            *next += 1;
            Ok(SavedMessage {
                id: MessageId::new(*next),
                timestamp: Utc::now(),
            })
        }
    }

    struct StaticAuth;

    #[async_trait]
    impl Authenticator for StaticAuth {
        async fn current_authenticated_user(&self, credentials: &Credentials) -> Option<Identity> {
            match credentials.bearer.as_deref()? {
                "tok-1" => Some(Identity::new(UserId::new(1), "ana")),
                "tok-2" => Some(Identity::new(UserId::new(2), "bob")),
                "tok-3" => Some(Identity::new(UserId::new(3), "cy")),
                _ => None,
            }
        }
    }

    struct Friends(Vec<(i64, i64)>);

    #[async_trait]
    impl FriendshipLookup for Friends {
        async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, GatewayError> {
            Ok(self
                .0
                .iter()
                .any(|&(x, y)| (x, y) == (a.get(), b.get()) || (y, x) == (a.get(), b.get())))
        }
    }

    struct Harness {
        store: Arc<RecordingStore>,
        ctx: ChatContext,
    }

    impl Harness {
        fn new(store: RecordingStore, policy: AdmissionPolicy) -> Self {
            let store = Arc::new(store);
            let ctx = ChatContext {
                persistence: store.clone(),
                authenticator: Arc::new(StaticAuth),
                friendships: Arc::new(Friends(vec![(1, 2)])),
                groups: Arc::new(GroupLayer::new()),
                policy,
            };
            Self { store, ctx }
        }

        fn default_users() -> Self {
            Self::new(RecordingStore::with_users(&[1, 2, 3]), AdmissionPolicy::Authenticated)
        }

        fn session(&self, room: &str) -> (ChatSession, mpsc::Receiver<Arc<String>>) {
            let (tx, rx) = mpsc::channel(16);
            let conn = Arc::new(ClientConnection::new(SessionId::new(), tx));
            (ChatSession::new(self.ctx.clone(), RoomName::new(room), conn), rx)
        }

        async fn open(&self, room: &str, token: &str) -> (ChatSession, mpsc::Receiver<Arc<String>>) {
            let (mut session, rx) = self.session(room);
            let _ = session.admit(&Credentials::bearer(token)).await.unwrap();
            (session, rx)
        }
    }

    fn frames(rx: &mut mpsc::Receiver<Arc<String>>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }

    // ── Admission ───────────────────────────────────────────────────

    #[tokio::test]
    async fn unauthenticated_admission_never_joins() {
        let h = Harness::default_users();
        let (mut session, mut rx) = h.session("1_2");

        let err = session.admit(&Credentials::anonymous()).await.unwrap_err();
        assert_eq!(err, ChatError::AdmissionDenied(REASON_UNAUTHENTICATED.into()));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.identity().is_none());
        assert_eq!(h.ctx.groups.room_count(), 0);
        assert!(frames(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn invalid_token_is_unauthenticated() {
        let h = Harness::default_users();
        let (mut session, _rx) = h.session("1_2");
        assert!(session.admit(&Credentials::bearer("nope")).await.is_err());
        assert_eq!(h.ctx.groups.room_count(), 0);
    }

    #[tokio::test]
    async fn admission_joins_before_open() {
        let h = Harness::default_users();
        let (mut session, _rx) = h.session("1_2");
        let who = session.admit(&Credentials::bearer("tok-1")).await.unwrap().clone();

        assert_eq!(who, Identity::new(UserId::new(1), "ana"));
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(h.ctx.groups.members(session.room()), vec![session.id().clone()]);
        assert_eq!(session.room().as_str(), "chat_1_2");
    }

    #[tokio::test]
    async fn authenticated_policy_admits_any_room() {
        let h = Harness::default_users();
        let (session, _rx) = h.open("5_6", "tok-3").await;
        assert_eq!(session.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn participant_policy_requires_membership_in_pair() {
        let h = Harness::new(RecordingStore::with_users(&[1, 2, 3]), AdmissionPolicy::Participant);

        let (mut outsider, _rx) = h.session("1_2");
        let err = outsider.admit(&Credentials::bearer("tok-3")).await.unwrap_err();
        assert_eq!(err, ChatError::AdmissionDenied("not a participant".into()));
        assert_eq!(outsider.state(), SessionState::Closed);

        let (mut reversed, _rx) = h.session("2_1");
        assert!(reversed.admit(&Credentials::bearer("tok-1")).await.is_err());

        let (insider, _rx) = h.open("1_2", "tok-2").await;
        assert_eq!(insider.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn friends_policy_checks_friendship() {
        let h = Harness::new(RecordingStore::with_users(&[1, 2, 3]), AdmissionPolicy::Friends);

        let (mut strangers, _rx) = h.session("1_3");
        let err = strangers.admit(&Credentials::bearer("tok-1")).await.unwrap_err();
        assert_eq!(err, ChatError::AdmissionDenied("not friends".into()));

        let (friends, _rx) = h.open("1_2", "tok-1").await;
        assert_eq!(friends.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn admit_twice_is_rejected() {
        let h = Harness::default_users();
        let (mut session, _rx) = h.open("1_2", "tok-1").await;
        assert!(session.admit(&Credentials::bearer("tok-1")).await.is_err());
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(h.ctx.groups.member_count(session.room()), 1);
    }

    // ── Receive ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn valid_message_saved_once_then_published_to_all() {
        let h = Harness::default_users();
        let (mut alice, mut rx_a) = h.open("1_2", "tok-1").await;
        let (_bob, mut rx_b) = h.open("1_2", "tok-2").await;

        let outcome = alice.receive(r#"{"message":"hi","receiver_id":2}"#).await;
        assert_eq!(
            outcome,
            ReceiveOutcome::Published {
                message_id: MessageId::new(1),
                recipients: 2
            }
        );
        assert_eq!(
            *h.store.calls.lock(),
            vec![
                Call::UserExists(UserId::new(2)),
                Call::Save(UserId::new(1), UserId::new(2), "hi".into()),
            ]
        );

        for rx in [&mut rx_a, &mut rx_b] {
            let got = frames(rx);
            assert_eq!(got.len(), 1);
            assert_eq!(got[0]["message"], "hi");
            assert_eq!(got[0]["sender_id"], 1);
            assert_eq!(got[0]["sender_username"], "ana");
            assert_eq!(got[0]["message_id"], 1);
            assert!(got[0]["timestamp"].is_string());
        }
    }

    #[tokio::test]
    async fn content_is_saved_untrimmed() {
        let h = Harness::default_users();
        let (mut alice, mut rx) = h.open("1_2", "tok-1").await;
        let _ = alice.receive(r#"{"message":"  hi  ","receiver_id":"2"}"#).await;
        assert_eq!(
            h.store.calls.lock().last(),
            Some(&Call::Save(UserId::new(1), UserId::new(2), "  hi  ".into()))
        );
        assert_eq!(frames(&mut rx)[0]["message"], "  hi  ");
    }

    #[tokio::test]
    async fn empty_message_reports_error_and_publishes_nothing() {
        let h = Harness::default_users();
        let (mut alice, mut rx_a) = h.open("1_2", "tok-1").await;
        let (_bob, mut rx_b) = h.open("1_2", "tok-2").await;

        let outcome = alice.receive(r#"{"message":"   ","receiver_id":2}"#).await;
        assert_eq!(outcome, ReceiveOutcome::Rejected(ChatError::EmptyMessage));
        assert_eq!(
            frames(&mut rx_a),
            vec![serde_json::json!({"error": "Message cannot be empty", "type": "error"})]
        );
        assert!(frames(&mut rx_b).is_empty());
        assert_eq!(h.store.saves(), 0);
    }

    #[tokio::test]
    async fn unknown_receiver_is_not_found() {
        let h = Harness::default_users();
        let (mut alice, mut rx) = h.open("1_2", "tok-1").await;

        let outcome = alice.receive(r#"{"message":"x","receiver_id":9999}"#).await;
        assert_eq!(outcome, ReceiveOutcome::Rejected(ChatError::ReceiverNotFound("9999".into())));
        assert_eq!(frames(&mut rx)[0]["error"], "Receiver not found");
        assert_eq!(h.store.saves(), 0);
    }

    #[tokio::test]
    async fn non_numeric_receiver_is_not_found_without_lookup() {
        let h = Harness::default_users();
        let (mut alice, mut rx) = h.open("1_2", "tok-1").await;

        let outcome = alice.receive(r#"{"message":"x","receiver_id":"bob"}"#).await;
        assert!(matches!(outcome, ReceiveOutcome::Rejected(ChatError::ReceiverNotFound(_))));
        assert!(h.store.calls.lock().is_empty());
        assert_eq!(frames(&mut rx)[0]["error"], "Receiver not found");
    }

    #[tokio::test]
    async fn lookup_failure_counts_as_not_found() {
        let store = RecordingStore {
            fail_lookups: true,
            ..RecordingStore::with_users(&[1, 2])
        };
        let h = Harness::new(store, AdmissionPolicy::Authenticated);
        let (mut alice, _rx) = h.open("1_2", "tok-1").await;

        let outcome = alice.receive(r#"{"message":"x","receiver_id":2}"#).await;
        assert!(matches!(outcome, ReceiveOutcome::Rejected(ChatError::ReceiverNotFound(_))));
    }

    #[tokio::test]
    async fn failed_save_publishes_nothing() {
        let store = RecordingStore {
            fail_saves: true,
            ..RecordingStore::with_users(&[1, 2])
        };
        let h = Harness::new(store, AdmissionPolicy::Authenticated);
        let (mut alice, mut rx_a) = h.open("1_2", "tok-1").await;
        let (_bob, mut rx_b) = h.open("1_2", "tok-2").await;

        let outcome = alice.receive(r#"{"message":"hi","receiver_id":2}"#).await;
        assert!(matches!(outcome, ReceiveOutcome::Rejected(ChatError::PersistenceFailure(_))));
        assert_eq!(h.store.saves(), 1);
        assert_eq!(frames(&mut rx_a)[0]["error"], "Failed to save message");
        assert!(frames(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn validation_order_is_respected() {
        let h = Harness::default_users();
        let (mut alice, mut rx) = h.open("1_2", "tok-1").await;

        let _ = alice.receive("not json").await;
        let _ = alice.receive(r#"{"message":""}"#).await;
        let _ = alice.receive(r#"{"message":"","receiver_id":9999}"#).await;

        let errors: Vec<Value> = frames(&mut rx).into_iter().map(|f| f["error"].clone()).collect();
        assert_eq!(
            errors,
            vec!["Invalid message format", "Missing receiver_id", "Message cannot be empty"]
        );
        assert!(h.store.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn errors_do_not_change_state() {
        let h = Harness::default_users();
        let (mut alice, _rx) = h.open("1_2", "tok-1").await;
        let _ = alice.receive("{}").await;
        assert_eq!(alice.state(), SessionState::Open);
        assert!(matches!(
            alice.receive(r#"{"message":"ok","receiver_id":2}"#).await,
            ReceiveOutcome::Published { .. }
        ));
    }

    #[tokio::test]
    async fn sender_receives_own_broadcast_once() {
        let h = Harness::default_users();
        let (mut alice, mut rx) = h.open("1_2", "tok-1").await;
        let _ = alice.receive(r#"{"message":"echo","receiver_id":2}"#).await;
        assert_eq!(frames(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn sequential_sends_arrive_in_order() {
        let h = Harness::default_users();
        let (mut alice, _rx_a) = h.open("1_2", "tok-1").await;
        let (_bob, mut rx_b) = h.open("1_2", "tok-2").await;

        for text in ["one", "two", "three"] {
            let _ = alice
                .receive(&format!(r#"{{"message":"{text}","receiver_id":2}}"#))
                .await;
        }
        let texts: Vec<Value> = frames(&mut rx_b).into_iter().map(|f| f["message"].clone()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    // ── Close ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn closed_session_receives_and_sends_nothing() {
        let h = Harness::default_users();
        let (mut alice, mut rx_a) = h.open("1_2", "tok-1").await;
        let (mut bob, mut rx_b) = h.open("1_2", "tok-2").await;

        alice.close();
        assert_eq!(alice.state(), SessionState::Closed);
        assert_eq!(h.ctx.groups.member_count(bob.room()), 1);

        assert_eq!(
            alice.receive(r#"{"message":"late","receiver_id":2}"#).await,
            ReceiveOutcome::Ignored
        );
        let _ = bob.receive(r#"{"message":"still here?","receiver_id":1}"#).await;

        assert!(frames(&mut rx_a).is_empty());
        assert_eq!(frames(&mut rx_b).len(), 1);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_prunes_room() {
        let h = Harness::default_users();
        let (mut alice, _rx) = h.open("1_2", "tok-1").await;
        alice.close();
        alice.close();
        assert_eq!(h.ctx.groups.room_count(), 0);
    }

    #[tokio::test]
    async fn closing_unadmitted_session_is_noop() {
        let h = Harness::default_users();
        let (_other, _rx) = h.open("1_2", "tok-2").await;
        let (mut pending, _rx2) = h.session("1_2");
        pending.close();
        assert_eq!(pending.state(), SessionState::Closed);
        assert_eq!(h.ctx.groups.member_count(&RoomKey::for_room(&RoomName::new("1_2"))), 1);
    }

    #[tokio::test]
    async fn connecting_session_ignores_payloads() {
        let h = Harness::default_users();
        let (mut pending, _rx) = h.session("1_2");
        assert_eq!(
            pending.receive(r#"{"message":"hi","receiver_id":2}"#).await,
            ReceiveOutcome::Ignored
        );
        assert!(h.store.calls.lock().is_empty());
    }
}
