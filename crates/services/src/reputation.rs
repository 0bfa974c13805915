//! # Reputation Ledger
//!
//! Reputation moves only as a side effect of content events: +2 on a new
//! post, ±1 on a like toggled against someone else's content. All mutations
//! here are best-effort; a failed update is logged and never fails the
//! action that triggered it.

use std::sync::Arc;

use uuid::Uuid;

use domains::UserRepo;

pub const POST_CREATED_DELTA: i64 = 2;
pub const LIKE_DELTA: i64 = 1;

pub struct ReputationLedger {
    users: Arc<dyn UserRepo>,
}

impl ReputationLedger {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    /// +2 for the author, even when replying to their own thread.
    pub async fn post_created(&self, author_id: Uuid) {
        self.apply(author_id, POST_CREATED_DELTA, "post created").await;
    }

    /// +1 for the target's author, unless the actor is liking their own
    /// content.
    pub async fn like_added(&self, actor_id: Uuid, author_id: Uuid) {
        if actor_id == author_id {
            return;
        }
        self.apply(author_id, LIKE_DELTA, "like added").await;
    }

    /// −1 for the target's author, under the same self-exclusion.
    pub async fn like_removed(&self, actor_id: Uuid, author_id: Uuid) {
        if actor_id == author_id {
            return;
        }
        self.apply(author_id, -LIKE_DELTA, "like removed").await;
    }

    async fn apply(&self, user_id: Uuid, delta: i64, cause: &str) {
        if let Err(err) = self.users.adjust_reputation(user_id, delta).await {
            tracing::warn!(%user_id, delta, cause, error = %err, "reputation update failed");
        }
    }
}
