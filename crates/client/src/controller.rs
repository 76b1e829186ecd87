//! Access controller: session store + resolvers + gate
//!
//! On every session replacement the controller publishes a loading
//! snapshot, runs both resolvers concurrently and publishes their result,
//! unless a newer session arrived meanwhile (last session wins).

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::SubscriptionStatus;
use crate::gate::{decide, AccessDecision, AccessInputs, AccessRequirements, SessionPresence};
use crate::resolver::{RoleResolver, SubscriptionResolver};
use crate::session::{SessionState, SessionStore};

/// Everything the gate needs, for one session generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSnapshot {
    pub generation: u64,
    pub session: SessionPresence,
    pub user_id: Option<Uuid>,
    pub is_admin: Option<bool>,
    pub subscription: Option<SubscriptionStatus>,
}

impl AccessSnapshot {
    fn loading(state: &SessionState) -> Self {
        let session = match (&state.session, state.resolved) {
            (_, false) => SessionPresence::Unknown,
            (None, true) => SessionPresence::Absent,
            (Some(_), true) => SessionPresence::Present,
        };
        Self {
            generation: state.generation,
            session,
            user_id: state.session.as_ref().map(|s| s.user.id),
            is_admin: None,
            subscription: None,
        }
    }

    pub fn inputs(&self) -> AccessInputs {
        AccessInputs {
            session: self.session,
            is_admin: self.is_admin,
            subscribed: self.subscription.as_ref().map(|s| s.subscribed),
        }
    }
}

pub struct AccessController {
    store: SessionStore,
    roles: RoleResolver,
    subscriptions: SubscriptionResolver,
    tx: watch::Sender<AccessSnapshot>,
}

impl AccessController {
    pub fn new(
        store: SessionStore,
        roles: RoleResolver,
        subscriptions: SubscriptionResolver,
    ) -> Arc<Self> {
        let initial = AccessSnapshot::loading(&store.state());
        let (tx, _rx) = watch::channel(initial);
        Arc::new(Self {
            store,
            roles,
            subscriptions,
            tx,
        })
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> AccessSnapshot {
        self.tx.borrow().clone()
    }

    pub fn observe(&self) -> watch::Receiver<AccessSnapshot> {
        self.tx.subscribe()
    }

    /// Gate decision for `path` from the latest snapshot
    pub fn decide(&self, requirements: AccessRequirements, path: &str) -> AccessDecision {
        decide(requirements, self.snapshot().inputs(), path)
    }

    /// Resolve role and subscription for one session state
    pub async fn resolve(&self, state: SessionState) {
        let mut snapshot = AccessSnapshot::loading(&state);
        self.publish(snapshot.clone());

        if state.session.is_none() {
            // Nothing to resolve; gate answers from presence alone
            snapshot.is_admin = Some(false);
            snapshot.subscription = Some(SubscriptionStatus::unsubscribed());
            self.publish(snapshot);
            return;
        }

        let now = Utc::now();
        let (is_admin, subscription) = tokio::join!(
            self.roles.is_admin(&state, now),
            self.subscriptions.check(&state, now)
        );

        snapshot.is_admin = Some(is_admin);
        snapshot.subscription = Some(subscription);
        self.publish(snapshot);
    }

    /// Re-check the subscription for the current session (after checkout)
    pub async fn refresh_subscription(&self) {
        self.subscriptions.invalidate();
        self.resolve(self.store.state()).await;
    }

    /// Publish unless the snapshot belongs to a superseded session
    fn publish(&self, snapshot: AccessSnapshot) {
        let current_generation = self.store.generation();
        if snapshot.generation != current_generation {
            tracing::debug!(
                stale = snapshot.generation,
                current = current_generation,
                "Discarding access result for superseded session"
            );
            return;
        }
        self.tx.send_if_modified(|published| {
            if published.generation > snapshot.generation || *published == snapshot {
                return false;
            }
            *published = snapshot;
            true
        });
    }

    /// Follow the session store in a background task.
    ///
    /// A session change cancels the resolution still running for the
    /// previous one, so a hung backend call only ever holds its own
    /// session in `Loading`. The task holds the controller weakly and ends
    /// at the first session change after the controller is dropped, or
    /// when every store handle is gone.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::downgrade(&self);
        let mut watcher = self.store.observe();
        drop(self);

        tokio::spawn(async move {
            let mut next = watcher.next().await;
            while let Some(state) = next.take() {
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                tokio::select! {
                    biased;
                    changed = watcher.next() => {
                        tracing::debug!(generation = state.generation, "Session changed, cancelling resolution");
                        next = changed;
                    }
                    () = controller.resolve(state.clone()) => {
                        drop(controller);
                        next = watcher.next().await;
                    }
                }
            }
            tracing::debug!("Access controller stopped");
        })
    }
}
