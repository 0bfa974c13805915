//! Reply creation end to end: the primary insert plus its best-effort side
//! effects (reputation, thread bump, notification fan-out).

mod fixtures;

use chrono::Duration;
use domains::{AppError, NotificationKind, Role};
use fixtures::TestForum;
use services::NewPost;

#[tokio::test]
async fn reply_awards_reputation_notifies_the_thread_author_and_bumps() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let thread_author = forum.member("bea", Role::User);
    let replier = forum.member("ada", Role::User);
    let thread = forum.thread(category, &thread_author, "Welcome thread");
    let created_at = thread.updated_at;

    forum.clock.advance(Duration::minutes(5));
    let post = forum
        .posts
        .create(
            &replier,
            NewPost { thread_id: thread.id, parent_id: None, content: "Glad to be here".to_string() },
        )
        .await
        .unwrap();

    // +2 for the post author, regardless of whose thread it is.
    assert_eq!(forum.reputation_of(replier.id), 2);

    // Exactly one REPLY notification, addressed to the thread author.
    let inbox = forum.inbox(thread_author.id);
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::Reply);
    assert_eq!(inbox[0].actor_id, Some(replier.id));
    assert_eq!(inbox[0].entity_id, post.id);
    assert!(forum.inbox(replier.id).is_empty());

    // The activity bump moved updated_at forward.
    let bumped = forum.store.thread(thread.id).unwrap();
    assert!(bumped.updated_at > created_at);
}

#[tokio::test]
async fn reply_to_own_thread_still_pays_out_but_stays_silent() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let author = forum.member("ada", Role::User);
    let thread = forum.thread(category, &author, "Talking to myself");

    forum
        .posts
        .create(
            &author,
            NewPost { thread_id: thread.id, parent_id: None, content: "First!".to_string() },
        )
        .await
        .unwrap();

    assert_eq!(forum.reputation_of(author.id), 2);
    assert!(forum.inbox(author.id).is_empty());
}

#[tokio::test]
async fn nested_reply_notifies_both_thread_and_parent_author() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let thread_author = forum.member("bea", Role::User);
    let parent_author = forum.member("uli", Role::User);
    let replier = forum.member("ada", Role::User);
    let thread = forum.thread(category, &thread_author, "Deep discussion");
    let parent = forum.post(&thread, &parent_author);

    forum
        .posts
        .create(
            &replier,
            NewPost {
                thread_id: thread.id,
                parent_id: Some(parent.id),
                content: "Replying to your point".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(forum.inbox(thread_author.id).len(), 1);
    assert_eq!(forum.inbox(parent_author.id).len(), 1);
    assert!(forum.inbox(replier.id).is_empty());
}

#[tokio::test]
async fn parent_post_must_belong_to_the_thread() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let author = forum.member("ada", Role::User);
    let thread = forum.thread(category, &author, "Main thread");
    let other = forum.thread(category, &author, "Other thread");
    let foreign_parent = forum.post(&other, &author);

    let err = forum
        .posts
        .create(
            &author,
            NewPost {
                thread_id: thread.id,
                parent_id: Some(foreign_parent.id),
                content: "Crossing the streams".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn locked_threads_refuse_replies_except_from_moderators() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let author = forum.member("ada", Role::User);
    let moderator = forum.member("mira", Role::Moderator);
    forum.make_moderator(category, &moderator);

    let mut thread = forum.thread(category, &author, "Heated topic");
    thread.is_locked = true;
    forum.store.seed_thread(thread.clone());

    let err = forum
        .posts
        .create(
            &author,
            NewPost { thread_id: thread.id, parent_id: None, content: "One more word".to_string() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    forum
        .posts
        .create(
            &moderator,
            NewPost { thread_id: thread.id, parent_id: None, content: "Thread closed.".to_string() },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn editing_flips_the_edited_flag_and_respects_the_composite_rule() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let author = forum.member("ada", Role::User);
    let stranger = forum.member("sam", Role::User);
    let thread = forum.thread(category, &author, "Editable");
    let post = forum.post(&thread, &author);

    let err = forum
        .posts
        .edit(&stranger, post.id, "hijacked".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let edited = forum
        .posts
        .edit(&author, post.id, "clarified wording".to_string())
        .await
        .unwrap();
    assert!(edited.is_edited);
    assert_eq!(edited.content, "clarified wording");
}

#[tokio::test]
async fn deleting_the_accepted_answer_clears_the_solution() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let author = forum.member("ada", Role::User);
    let thread = forum.thread(category, &author, "Solved thread");
    let answer = forum.post(&thread, &author);
    forum.threads.set_solution(&author, thread.id, Some(answer.id)).await.unwrap();

    forum.posts.delete(&author, answer.id).await.unwrap();

    assert_eq!(forum.store.thread(thread.id).unwrap().solution_post_id, None);
}
