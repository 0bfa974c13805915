//! # Reactions
//!
//! Idempotent like toggling: present becomes absent, absent becomes present.
//! The reputation delta and the notification both skip self-likes; the
//! unique constraint on (user, target, kind) in the store is the safety net
//! against concurrent double-toggles.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use domains::{
    Clock, ContentRef, CurrentUser, Reaction, ReactionKind, ReactionRepo, Result,
};

use crate::moderation::ModerationService;
use crate::notifications::{NotificationEvent, NotificationService};
use crate::reputation::ReputationLedger;
use crate::security::{RateQuotas, SecurityService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToggleOutcome {
    Added,
    Removed,
}

pub struct ReactionService {
    reactions: Arc<dyn ReactionRepo>,
    security: Arc<SecurityService>,
    moderation: Arc<ModerationService>,
    reputation: Arc<ReputationLedger>,
    notifications: Arc<NotificationService>,
    quotas: RateQuotas,
    clock: Arc<dyn Clock>,
}

impl ReactionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reactions: Arc<dyn ReactionRepo>,
        security: Arc<SecurityService>,
        moderation: Arc<ModerationService>,
        reputation: Arc<ReputationLedger>,
        notifications: Arc<NotificationService>,
        quotas: RateQuotas,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { reactions, security, moderation, reputation, notifications, quotas, clock }
    }

    pub async fn toggle(
        &self,
        actor: &CurrentUser,
        target: ContentRef,
        kind: ReactionKind,
    ) -> Result<ToggleOutcome> {
        self.security.ensure_not_banned(actor.id).await?;
        self.security
            .enforce_rate_limit("reaction:toggle", self.quotas.toggle_reaction, Some(actor.id))
            .await?;

        // Also validates the target exists.
        let location = self.moderation.locate(target).await?;

        if let Some(existing) = self.reactions.find(actor.id, target, kind).await? {
            self.reactions.delete(existing.id).await?;
            if kind == ReactionKind::Like {
                self.reputation.like_removed(actor.id, location.author_id).await;
            }
            return Ok(ToggleOutcome::Removed);
        }

        let reaction = Reaction {
            id: Uuid::new_v4(),
            kind,
            target,
            user_id: actor.id,
            created_at: self.clock.now(),
        };
        self.reactions.create(reaction).await?;

        if kind == ReactionKind::Like {
            self.reputation.like_added(actor.id, location.author_id).await;
            // Recipient resolution drops self-likes on its own.
            self.notifications
                .dispatch(NotificationEvent::LikeAdded {
                    target,
                    thread_id: location.thread_id,
                    author_id: location.author_id,
                    actor_id: actor.id,
                })
                .await;
        }

        Ok(ToggleOutcome::Added)
    }
}
