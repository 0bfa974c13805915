//! Shared fixtures: the full service graph wired over the in-memory
//! adapters, with a manually advanced clock so window and expiry behavior
//! is testable without sleeping.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use domains::{
    Category, CategoryRepo, Clock, CurrentUser, Notification, NotificationRepo, Post, PostRepo,
    RateLimitStore, ReactionRepo, ReportRepo, Role, Thread, ThreadRepo, User, UserRepo,
};
use services::{
    ModerationService, NotificationService, PostService, RateQuotas, ReactionService,
    ReportService, ReputationLedger, SecurityService, ThreadService,
};
use storage_adapters::{MemoryRateLimitStore, MemoryStore};

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A complete forum over the in-memory store.
pub struct TestForum {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub security: Arc<SecurityService>,
    pub notifications: Arc<NotificationService>,
    pub moderation: Arc<ModerationService>,
    pub threads: ThreadService,
    pub posts: PostService,
    pub reactions: ReactionService,
    pub reports: ReportService,
}

impl TestForum {
    pub fn new() -> Self {
        Self::with_quotas(RateQuotas::default())
    }

    pub fn with_quotas(quotas: RateQuotas) -> Self {
        let store = MemoryStore::new();
        let clock = ManualClock::new();
        let clock_port: Arc<dyn Clock> = clock.clone();
        let ratelimit: Arc<dyn RateLimitStore> = MemoryRateLimitStore::new();

        let users: Arc<dyn UserRepo> = store.clone();
        let categories: Arc<dyn CategoryRepo> = store.clone();
        let thread_repo: Arc<dyn ThreadRepo> = store.clone();
        let post_repo: Arc<dyn PostRepo> = store.clone();
        let reaction_repo: Arc<dyn ReactionRepo> = store.clone();
        let report_repo: Arc<dyn ReportRepo> = store.clone();
        let notification_repo: Arc<dyn NotificationRepo> = store.clone();

        let security = Arc::new(SecurityService::new(
            users.clone(),
            ratelimit,
            clock_port.clone(),
        ));
        let notifications = Arc::new(NotificationService::new(
            notification_repo,
            categories.clone(),
            users.clone(),
            clock_port.clone(),
        ));
        let moderation = Arc::new(ModerationService::new(
            categories.clone(),
            thread_repo.clone(),
            post_repo.clone(),
        ));
        let reputation = Arc::new(ReputationLedger::new(users.clone()));

        let threads = ThreadService::new(
            thread_repo.clone(),
            categories.clone(),
            post_repo.clone(),
            security.clone(),
            moderation.clone(),
            notifications.clone(),
            quotas,
            clock_port.clone(),
        );
        let posts = PostService::new(
            post_repo.clone(),
            thread_repo.clone(),
            security.clone(),
            moderation.clone(),
            reputation.clone(),
            notifications.clone(),
            quotas,
            clock_port.clone(),
        );
        let reactions = ReactionService::new(
            reaction_repo,
            security.clone(),
            moderation.clone(),
            reputation,
            notifications.clone(),
            quotas,
            clock_port.clone(),
        );
        let reports = ReportService::new(
            report_repo,
            users,
            categories,
            post_repo,
            security.clone(),
            moderation.clone(),
            notifications.clone(),
            quotas,
            clock_port,
        );

        Self {
            store,
            clock,
            security,
            notifications,
            moderation,
            threads,
            posts,
            reactions,
            reports,
        }
    }

    pub fn member(&self, username: &str, role: Role) -> CurrentUser {
        let id = Uuid::new_v4();
        self.store.seed_user(User {
            id,
            username: username.to_string(),
            role,
            banned: false,
            ban_reason: None,
            ban_expires: None,
            reputation: 0,
            created_at: self.clock.now(),
        });
        CurrentUser { id, username: username.to_string(), role }
    }

    pub fn banned_member(
        &self,
        username: &str,
        expires: Option<DateTime<Utc>>,
    ) -> CurrentUser {
        let id = Uuid::new_v4();
        self.store.seed_user(User {
            id,
            username: username.to_string(),
            role: Role::User,
            banned: true,
            ban_reason: Some("spam".to_string()),
            ban_expires: expires,
            reputation: 0,
            created_at: self.clock.now(),
        });
        CurrentUser { id, username: username.to_string(), role: Role::User }
    }

    pub fn category(&self, slug: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store.seed_category(Category {
            id,
            slug: slug.to_string(),
            name: slug.to_string(),
            description: None,
            created_at: self.clock.now(),
        });
        id
    }

    pub fn make_moderator(&self, category_id: Uuid, user: &CurrentUser) {
        self.store.seed_moderator(category_id, user.id);
    }

    pub fn thread(&self, category_id: Uuid, author: &CurrentUser, title: &str) -> Thread {
        let now = self.clock.now();
        let thread = Thread {
            id: Uuid::new_v4(),
            category_id,
            author_id: author.id,
            title: title.to_string(),
            slug: format!("t-{}", Uuid::new_v4().simple()),
            is_locked: false,
            is_pinned: false,
            solution_post_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.seed_thread(thread.clone());
        thread
    }

    pub fn post(&self, thread: &Thread, author: &CurrentUser) -> Post {
        let now = self.clock.now();
        let post = Post {
            id: Uuid::new_v4(),
            thread_id: thread.id,
            author_id: author.id,
            parent_id: None,
            content: "seeded reply".to_string(),
            is_edited: false,
            created_at: now,
            updated_at: now,
        };
        self.store.seed_post(post.clone());
        post
    }

    pub fn reputation_of(&self, user_id: Uuid) -> i64 {
        self.store.user(user_id).expect("user must be seeded").reputation
    }

    pub fn inbox(&self, user_id: Uuid) -> Vec<Notification> {
        self.store.notifications_for(user_id)
    }
}

#[test]
fn manual_clock_advances() {
    let clock = ManualClock::new();
    let before = clock.now();
    clock.advance(Duration::milliseconds(1500));
    assert_eq!(clock.now() - before, Duration::milliseconds(1500));
}
