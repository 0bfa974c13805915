//! Thread creation, slug allocation, and the moderation toggles.

mod fixtures;

use domains::{AppError, NotificationKind, Role};
use fixtures::TestForum;
use services::NewThread;

#[tokio::test]
async fn new_thread_notifies_every_category_moderator_including_the_author() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let author_mod = forum.member("ada", Role::Moderator);
    let other_mod = forum.member("mira", Role::Moderator);
    forum.make_moderator(category, &author_mod);
    forum.make_moderator(category, &other_mod);

    let thread = forum
        .threads
        .create(
            &author_mod,
            NewThread { category_id: category, title: "Release planning".to_string() },
        )
        .await
        .unwrap();

    // No self-exclusion on thread announcements.
    let own_inbox = forum.inbox(author_mod.id);
    assert_eq!(own_inbox.len(), 1);
    assert_eq!(own_inbox[0].kind, NotificationKind::Thread);
    assert_eq!(own_inbox[0].entity_id, thread.id);

    let other_inbox = forum.inbox(other_mod.id);
    assert_eq!(other_inbox.len(), 1);
    assert_eq!(other_inbox[0].link, Some(format!("/threads/{}", thread.id)));
}

#[tokio::test]
async fn colliding_titles_get_suffixed_slugs() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let author = forum.member("ada", Role::User);

    let first = forum
        .threads
        .create(&author, NewThread { category_id: category, title: "Hello, World!".to_string() })
        .await
        .unwrap();
    let second = forum
        .threads
        .create(&author, NewThread { category_id: category, title: "Hello, World!".to_string() })
        .await
        .unwrap();

    assert_eq!(first.slug, "hello-world");
    assert_eq!(second.slug, "hello-world-2");
}

#[tokio::test]
async fn title_bounds_are_validated() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let author = forum.member("ada", Role::User);

    let err = forum
        .threads
        .create(&author, NewThread { category_id: category, title: "Hey".to_string() })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = forum
        .threads
        .create(&author, NewThread { category_id: category, title: "x".repeat(151) })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn missing_category_is_not_found() {
    let forum = TestForum::new();
    let author = forum.member("ada", Role::User);

    let err = forum
        .threads
        .create(
            &author,
            NewThread { category_id: uuid::Uuid::new_v4(), title: "Into the void".to_string() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_, _)));
}

#[tokio::test]
async fn locking_is_moderator_scoped_even_for_the_author() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let author = forum.member("ada", Role::User);
    let moderator = forum.member("mira", Role::Moderator);
    forum.make_moderator(category, &moderator);
    let thread = forum.thread(category, &author, "Lock me");

    let err = forum.threads.set_locked(&author, thread.id, true).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    forum.threads.set_locked(&moderator, thread.id, true).await.unwrap();
    assert!(forum.store.thread(thread.id).unwrap().is_locked);
}

#[tokio::test]
async fn solution_must_be_a_post_of_the_thread() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let author = forum.member("ada", Role::User);
    let helper = forum.member("uli", Role::User);
    let thread = forum.thread(category, &author, "How do I borrow twice?");
    let other_thread = forum.thread(category, &author, "Unrelated");
    let answer = forum.post(&thread, &helper);
    let elsewhere = forum.post(&other_thread, &helper);

    let err = forum
        .threads
        .set_solution(&author, thread.id, Some(elsewhere.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    forum.threads.set_solution(&author, thread.id, Some(answer.id)).await.unwrap();
    assert_eq!(forum.store.thread(thread.id).unwrap().solution_post_id, Some(answer.id));

    // A stranger cannot mark answers on someone else's thread.
    let stranger = forum.member("sam", Role::User);
    let err = forum
        .threads
        .set_solution(&stranger, thread.id, Some(answer.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}
