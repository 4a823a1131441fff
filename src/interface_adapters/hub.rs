// Session hub: one control task owns the active session set and every
// outbound queue sender, so register/unregister/fanout never interleave.

use crate::interface_adapters::protocol::{RemovePlayerDto, ServerMessage};
use crate::use_cases::PlayerRegistry;
use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

pub type SessionId = String;

/// Hub-side half of a session: its id and the sending end of its outbound
/// queue. The hub holds the only sender, so dropping the handle closes the queue.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    outbound_tx: mpsc::Sender<Utf8Bytes>,
    /// Dropped together with the handle; the session's [`RemovalNotice`]
    /// resolves as soon as the hub lets go of it.
    _removal_tx: oneshot::Sender<()>,
}

/// Resolves once the hub has removed the session, whether by unregister,
/// slow-consumer eviction or a replacing registration.
pub type RemovalNotice = oneshot::Receiver<()>;

impl SessionHandle {
    /// Creates a handle plus the receiver the session's outbound pump drains.
    pub fn new(id: impl Into<SessionId>, capacity: usize) -> (Self, mpsc::Receiver<Utf8Bytes>) {
        let (handle, outbound_rx, _) = Self::with_removal_notice(id, capacity);
        (handle, outbound_rx)
    }

    /// Like [`SessionHandle::new`], also returning a notice the session can
    /// wait on to learn that the hub dropped it.
    pub fn with_removal_notice(
        id: impl Into<SessionId>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Utf8Bytes>, RemovalNotice) {
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
        let (removal_tx, removal_rx) = oneshot::channel();
        (
            Self {
                id: id.into(),
                outbound_tx,
                _removal_tx: removal_tx,
            },
            outbound_rx,
            removal_rx,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// A fanout job.
#[derive(Debug, Clone)]
pub struct Broadcast {
    /// Encoded frame, shared by every recipient.
    pub data: Utf8Bytes,
    /// Session that never receives this job, normally the one that caused it.
    pub exclude_id: Option<SessionId>,
    /// When non-empty, only these sessions receive the job.
    pub include_ids: Vec<SessionId>,
}

impl Broadcast {
    /// Every active session.
    pub fn to_all(data: Utf8Bytes) -> Self {
        Self {
            data,
            exclude_id: None,
            include_ids: Vec::new(),
        }
    }

    /// Every active session except `exclude_id`.
    pub fn excluding(data: Utf8Bytes, exclude_id: &str) -> Self {
        Self {
            data,
            exclude_id: Some(exclude_id.to_string()),
            include_ids: Vec::new(),
        }
    }

    /// Only the listed sessions.
    pub fn only(data: Utf8Bytes, include_ids: Vec<SessionId>) -> Self {
        Self {
            data,
            exclude_id: None,
            include_ids,
        }
    }

    fn targets(&self, session_id: &str) -> bool {
        if self.exclude_id.as_deref() == Some(session_id) {
            return false;
        }
        self.include_ids.is_empty() || self.include_ids.iter().any(|id| id == session_id)
    }
}

/// Work items processed one at a time by the hub control task.
#[derive(Debug)]
pub enum HubEvent {
    /// Add a session to the active set.
    Register(SessionHandle),
    /// Remove a session, drop its player and notify the rest.
    Unregister(SessionId),
    /// Fan a frame out to the targeted sessions.
    Broadcast(Broadcast),
}

#[derive(Debug)]
pub enum HubError {
    /// The control task has stopped; nothing can be registered or delivered.
    Closed,
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubError::Closed => f.write_str("session hub is closed"),
        }
    }
}

impl std::error::Error for HubError {}

/// Cloneable front door to the hub control task.
#[derive(Debug, Clone)]
pub struct HubHandle {
    events_tx: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    async fn submit(&self, event: HubEvent) -> Result<(), HubError> {
        self.events_tx.send(event).await.map_err(|_| HubError::Closed)
    }

    pub async fn register(&self, session: SessionHandle) -> Result<(), HubError> {
        self.submit(HubEvent::Register(session)).await
    }

    pub async fn unregister(&self, session_id: &str) -> Result<(), HubError> {
        self.submit(HubEvent::Unregister(session_id.to_string()))
            .await
    }

    pub async fn broadcast(&self, job: Broadcast) -> Result<(), HubError> {
        self.submit(HubEvent::Broadcast(job)).await
    }

    /// Fanout to every active session except `exclude_id`, the sending
    /// session. Dropped by the hub if that session is no longer active.
    pub async fn broadcast_except(&self, data: Utf8Bytes, exclude_id: &str) -> Result<(), HubError> {
        self.broadcast(Broadcast::excluding(data, exclude_id)).await
    }

    /// Delivers `data` to one session through the same queue as fanout, so
    /// direct replies and broadcasts keep their submission order.
    pub async fn send_to(&self, session_id: &str, data: Utf8Bytes) -> Result<(), HubError> {
        self.broadcast(Broadcast::only(data, vec![session_id.to_string()]))
            .await
    }
}

/// State owned by the hub control task.
#[derive(Debug)]
pub struct SessionHub {
    sessions: HashMap<SessionId, SessionHandle>,
    registry: Arc<PlayerRegistry>,
}

impl SessionHub {
    pub fn new(registry: Arc<PlayerRegistry>) -> Self {
        Self {
            sessions: HashMap::new(),
            registry,
        }
    }

    /// Spawns the control task and returns a handle for submitting events.
    pub fn spawn(registry: Arc<PlayerRegistry>, event_capacity: usize) -> HubHandle {
        let (events_tx, events_rx) = mpsc::channel(event_capacity);
        tokio::spawn(SessionHub::new(registry).run(events_rx));
        HubHandle { events_tx }
    }

    /// Processes events one at a time until every handle is dropped.
    pub async fn run(mut self, mut events_rx: mpsc::Receiver<HubEvent>) {
        while let Some(event) = events_rx.recv().await {
            self.handle(event).await;
        }
        info!(active = self.sessions.len(), "session hub stopped");
    }

    pub async fn handle(&mut self, event: HubEvent) {
        match event {
            HubEvent::Register(session) => self.register(session),
            HubEvent::Unregister(session_id) => {
                self.unregister(&session_id).await;
            }
            HubEvent::Broadcast(job) => {
                // Traffic from an evicted or unregistered sender is stale.
                if let Some(sender) = job
                    .exclude_id
                    .as_deref()
                    .filter(|id| !self.is_active(id))
                {
                    debug!(session_id = %sender, "dropping broadcast from inactive session");
                    return;
                }
                self.fanout(&job).await;
            }
        }
    }

    pub fn register(&mut self, session: SessionHandle) {
        let session_id = session.id.clone();
        if self.sessions.insert(session_id.clone(), session).is_some() {
            // Session ids are random v4 uuids; a repeat means the old queue is now closed.
            warn!(%session_id, "session id registered twice; replaced previous session");
        }
        info!(%session_id, active = self.sessions.len(), "session registered");
    }

    /// Removes the session, closes its queue, drops its player and tells
    /// everyone else. Returns false if the session was not active; no one is
    /// notified then, but a player it still owns is removed.
    pub async fn unregister(&mut self, session_id: &str) -> bool {
        let player = self.registry.remove_for_session(session_id).await;
        let Some(session) = self.sessions.remove(session_id) else {
            match player {
                // Joined after eviction; its spawn was never fanned out.
                Some(player) => {
                    debug!(%session_id, player_id = %player.id, "removed player of inactive session");
                }
                None => debug!(%session_id, "unregister for inactive session ignored"),
            }
            return false;
        };
        // Dropping the only sender closes the outbound queue.
        drop(session);
        info!(%session_id, active = self.sessions.len(), "session unregistered");

        let notice = ServerMessage::RemovePlayer(RemovePlayerDto {
            player_id: player.map_or_else(|| session_id.to_string(), |p| p.id),
        });
        match notice.encode() {
            Ok(data) => {
                self.fanout(&Broadcast::excluding(data, session_id)).await;
            }
            Err(e) => error!(error = ?e, "failed to encode remove player notification"),
        }
        true
    }

    /// Non-blocking delivery to every targeted session. A full queue marks a
    /// slow consumer: it is evicted on the spot, with no notification.
    /// Returns how many sessions accepted the message.
    pub async fn fanout(&mut self, job: &Broadcast) -> usize {
        let mut delivered = 0;
        let mut evicted = Vec::new();

        for (session_id, session) in &self.sessions {
            if !job.targets(session_id) {
                continue;
            }
            match session.outbound_tx.try_send(job.data.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => evicted.push(session_id.clone()),
                Err(TrySendError::Closed(_)) => {
                    // Outbound pump already exited; its own unregister will clean up.
                    debug!(%session_id, "outbound queue closed; skipping");
                }
            }
        }

        for session_id in evicted {
            self.sessions.remove(&session_id);
            self.registry.remove_for_session(&session_id).await;
            warn!(%session_id, active = self.sessions.len(), "evicted slow consumer");
        }

        delivered
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::join_player;
    use serde_json::Value;
    use tokio::sync::mpsc::error::TryRecvError;

    fn bytes(text: &str) -> Utf8Bytes {
        Utf8Bytes::from(text.to_string())
    }

    fn hub() -> (SessionHub, Arc<PlayerRegistry>) {
        let registry = Arc::new(PlayerRegistry::new());
        (SessionHub::new(registry.clone()), registry)
    }

    fn drain(rx: &mut mpsc::Receiver<Utf8Bytes>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg.as_str().to_string());
        }
        out
    }

    #[tokio::test]
    async fn active_count_tracks_registers_minus_unregisters() {
        let (mut hub, _) = hub();
        let mut receivers = Vec::new();
        for i in 0..5 {
            let (handle, rx) = SessionHandle::new(format!("s{i}"), 8);
            hub.register(handle);
            receivers.push(rx);
        }
        hub.fanout(&Broadcast::to_all(bytes("tick"))).await;
        assert!(hub.unregister("s1").await);
        hub.fanout(&Broadcast::to_all(bytes("tick"))).await;
        assert!(hub.unregister("s3").await);

        assert_eq!(hub.active_count(), 3);
        assert!(!hub.is_active("s1"));
        assert!(hub.is_active("s4"));
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let (mut hub, _) = hub();
        let (a, _a_rx) = SessionHandle::new("a", 8);
        let (b, mut b_rx) = SessionHandle::new("b", 8);
        hub.register(a);
        hub.register(b);

        assert!(hub.unregister("a").await);
        assert_eq!(drain(&mut b_rx).len(), 1);

        assert!(!hub.unregister("a").await);
        assert!(!hub.unregister("never-registered").await);
        assert!(drain(&mut b_rx).is_empty());
        assert_eq!(hub.active_count(), 1);
    }

    #[tokio::test]
    async fn unregister_closes_queue_removes_player_and_notifies_others() {
        let (mut hub, registry) = hub();
        let (a, mut a_rx) = SessionHandle::new("a", 8);
        let (b, mut b_rx) = SessionHandle::new("b", 8);
        hub.register(a);
        hub.register(b);
        join_player(&registry, "a").await;

        hub.unregister("a").await;

        assert!(registry.get("a").await.is_none());
        assert!(matches!(a_rx.try_recv(), Err(TryRecvError::Disconnected)));

        let notices = drain(&mut b_rx);
        assert_eq!(notices.len(), 1);
        let value: Value = serde_json::from_str(&notices[0]).unwrap();
        assert_eq!(value["type"], 5);
        assert_eq!(value["payload"]["player_id"], "a");
    }

    #[tokio::test]
    async fn excluded_session_never_receives_broadcast() {
        let (mut hub, _) = hub();
        let (a, mut a_rx) = SessionHandle::new("a", 8);
        let (b, mut b_rx) = SessionHandle::new("b", 8);
        hub.register(a);
        hub.register(b);

        let delivered = hub.fanout(&Broadcast::excluding(bytes("hi"), "a")).await;

        assert_eq!(delivered, 1);
        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(drain(&mut b_rx), ["hi"]);
    }

    #[tokio::test]
    async fn include_list_limits_recipients() {
        let (mut hub, _) = hub();
        let mut receivers = HashMap::new();
        for id in ["a", "b", "c"] {
            let (handle, rx) = SessionHandle::new(id, 8);
            hub.register(handle);
            receivers.insert(id, rx);
        }

        let mut job = Broadcast::only(bytes("direct"), vec!["b".to_string(), "c".to_string()]);
        job.exclude_id = Some("c".to_string());
        hub.fanout(&job).await;

        assert!(drain(receivers.get_mut("a").unwrap()).is_empty());
        assert_eq!(drain(receivers.get_mut("b").unwrap()), ["direct"]);
        assert!(drain(receivers.get_mut("c").unwrap()).is_empty());
    }

    #[tokio::test]
    async fn full_queue_evicts_slow_consumer_without_notice() {
        let (mut hub, registry) = hub();
        let (slow, mut slow_rx) = SessionHandle::new("slow", 1);
        let (fast, mut fast_rx) = SessionHandle::new("fast", 8);
        hub.register(slow);
        hub.register(fast);
        join_player(&registry, "slow").await;

        hub.fanout(&Broadcast::to_all(bytes("one"))).await;
        let delivered = hub.fanout(&Broadcast::to_all(bytes("two"))).await;

        assert_eq!(delivered, 1);
        assert!(!hub.is_active("slow"));
        assert!(registry.get("slow").await.is_none());
        // Buffered item survives, then the queue reports closed.
        assert_eq!(slow_rx.recv().await.unwrap().as_str(), "one");
        assert!(slow_rx.recv().await.is_none());
        assert_eq!(drain(&mut fast_rx), ["one", "two"]);

        // The session's own later unregister is a no-op.
        assert!(!hub.unregister("slow").await);
        assert!(drain(&mut fast_rx).is_empty());
    }

    #[tokio::test]
    async fn player_created_after_eviction_is_removed_on_unregister() {
        let (mut hub, registry) = hub();
        let (slow, _slow_rx) = SessionHandle::new("slow", 1);
        let (other, mut other_rx) = SessionHandle::new("other", 8);
        hub.register(slow);
        hub.register(other);

        hub.fanout(&Broadcast::only(bytes("one"), vec!["slow".to_string()]))
            .await;
        hub.fanout(&Broadcast::only(bytes("two"), vec!["slow".to_string()]))
            .await;
        assert!(!hub.is_active("slow"));

        // A Join dispatched before the session noticed it was evicted.
        join_player(&registry, "slow").await.expect("player inserted");
        hub.handle(HubEvent::Broadcast(Broadcast::excluding(bytes("spawn"), "slow")))
            .await;
        assert!(drain(&mut other_rx).is_empty());

        assert!(!hub.unregister("slow").await);
        assert!(registry.get("slow").await.is_none());
        assert!(drain(&mut other_rx).is_empty());
    }

    #[tokio::test]
    async fn broadcast_from_unknown_sender_is_dropped() {
        let (mut hub, _) = hub();
        let (a, mut a_rx) = SessionHandle::new("a", 8);
        hub.register(a);

        hub.handle(HubEvent::Broadcast(Broadcast::excluding(bytes("late"), "gone")))
            .await;
        assert!(drain(&mut a_rx).is_empty());

        hub.handle(HubEvent::Broadcast(Broadcast::to_all(bytes("tick"))))
            .await;
        assert_eq!(drain(&mut a_rx), ["tick"]);
    }

    #[tokio::test]
    async fn removal_notice_fires_on_eviction() {
        let (mut hub, _) = hub();
        let (slow, _slow_rx, mut removed) = SessionHandle::with_removal_notice("slow", 1);
        hub.register(slow);
        assert!(matches!(
            removed.try_recv(),
            Err(oneshot::error::TryRecvError::Empty)
        ));

        hub.fanout(&Broadcast::to_all(bytes("one"))).await;
        hub.fanout(&Broadcast::to_all(bytes("two"))).await;

        assert!(matches!(
            removed.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn closed_receiver_is_skipped_not_evicted() {
        let (mut hub, _) = hub();
        let (gone, gone_rx) = SessionHandle::new("gone", 8);
        hub.register(gone);
        drop(gone_rx);

        assert_eq!(hub.fanout(&Broadcast::to_all(bytes("x"))).await, 0);
        assert!(hub.is_active("gone"));
    }

    #[tokio::test]
    async fn spawned_hub_preserves_submission_order() {
        let registry = Arc::new(PlayerRegistry::new());
        let handle = SessionHub::spawn(registry, 16);
        let (a, mut a_rx) = SessionHandle::new("a", 16);
        handle.register(a).await.unwrap();

        for i in 0..10 {
            handle.send_to("a", bytes(&i.to_string())).await.unwrap();
        }
        for i in 0..10 {
            assert_eq!(a_rx.recv().await.unwrap().as_str(), i.to_string());
        }

        handle.unregister("a").await.unwrap();
        assert!(a_rx.recv().await.is_none());
    }
}
