//! Database tests

use super::*;
use crate::error::AppError;
use chrono::{Duration, Utc};
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

fn test_user(name: &str, email: Option<&str>, phone: Option<&str>) -> User {
    User {
        id: EntityId::new().0,
        email: email.map(str::to_string),
        phone: phone.map(str::to_string),
        name: name.to_string(),
        password: "$argon2id$placeholder".to_string(),
        image_url: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn insert_test_user(db: &Database, name: &str) -> User {
    let user = test_user(name, Some(&format!("{}@example.com", EntityId::new())), None);
    let mut conn = db.acquire().await.unwrap();
    users::insert_user(&mut conn, &user).await.unwrap();
    user
}

/// Insert a post whose timestamp is `age_secs` in the past
async fn insert_test_post(db: &Database, author: &User, body: &str, tags: &[&str], age_secs: i64) -> Post {
    let created_at = Utc::now() - Duration::seconds(age_secs);
    let post = Post {
        id: EntityId::new().0,
        user_id: author.id.clone(),
        body: body.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        created_at,
        updated_at: created_at,
    };
    posts::create(db, &post).await.unwrap();
    post
}

async fn insert_test_comment(db: &Database, post: &Post, author: &User, text: &str) -> Comment {
    let comment = Comment {
        id: EntityId::new().0,
        post_id: post.id.clone(),
        user_id: author.id.clone(),
        comment: text.to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let mut conn = db.acquire().await.unwrap();
    posts::insert_comment(&mut conn, &comment).await.unwrap();
    comment
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
    // Connection successful if we get here without panicking
}

#[tokio::test]
async fn test_user_insert_and_lookup() {
    let (db, _temp_dir) = create_test_db().await;
    let user = test_user("Alice Doe", None, Some("+6281234567"));

    let mut conn = db.acquire().await.unwrap();
    users::insert_user(&mut conn, &user).await.unwrap();

    let by_id = users::get_by_id(&mut conn, &user.id).await.unwrap();
    assert_eq!(by_id.name, "Alice Doe");
    assert_eq!(by_id.phone.as_deref(), Some("+6281234567"));
    assert!(by_id.email.is_none());

    let by_phone = users::get_by_credential(&mut conn, CredentialType::Phone, "+6281234567")
        .await
        .unwrap();
    assert_eq!(by_phone.id, user.id);

    let missing = users::get_by_credential(&mut conn, CredentialType::Email, "nobody@example.com").await;
    assert!(matches!(missing, Err(AppError::UserNotFound)));

    let malformed = users::get_by_id(&mut conn, "not-a-uuid").await;
    assert!(matches!(malformed, Err(AppError::UserNotFound)));
}

#[tokio::test]
async fn test_duplicate_credential_is_rejected() {
    let (db, _temp_dir) = create_test_db().await;
    let mut conn = db.acquire().await.unwrap();

    let first = test_user("Alice Doe", Some("a@example.com"), None);
    users::insert_user(&mut conn, &first).await.unwrap();

    let second = test_user("Alice Two", Some("a@example.com"), None);
    let result = users::insert_user(&mut conn, &second).await;
    assert!(matches!(result, Err(AppError::CredentialTaken("email"))));
}

#[tokio::test]
async fn test_credential_link_is_one_time() {
    let (db, _temp_dir) = create_test_db().await;
    let mut conn = db.acquire().await.unwrap();

    let user = test_user("Alice Doe", None, Some("+6281111111"));
    users::insert_user(&mut conn, &user).await.unwrap();

    // Phone already set at registration
    let relink = users::update_phone(&mut conn, &user.id, "+6282222222").await;
    assert!(matches!(relink, Err(AppError::AlreadyLinked("phone"))));

    // Email still unset
    users::update_email(&mut conn, &user.id, "alice@example.com")
        .await
        .unwrap();
    let updated = users::get_by_id(&mut conn, &user.id).await.unwrap();
    assert_eq!(updated.email.as_deref(), Some("alice@example.com"));
    assert_eq!(updated.phone.as_deref(), Some("+6281111111"));

    let again = users::update_email(&mut conn, &user.id, "other@example.com").await;
    assert!(matches!(again, Err(AppError::AlreadyLinked("email"))));
}

#[tokio::test]
async fn test_link_to_credential_of_another_user() {
    let (db, _temp_dir) = create_test_db().await;
    let mut conn = db.acquire().await.unwrap();

    let alice = test_user("Alice Doe", Some("alice@example.com"), None);
    let bob = test_user("Bob Smith", None, Some("+6283333333"));
    users::insert_user(&mut conn, &alice).await.unwrap();
    users::insert_user(&mut conn, &bob).await.unwrap();

    let result = users::update_email(&mut conn, &bob.id, "alice@example.com").await;
    assert!(matches!(result, Err(AppError::CredentialTaken("email"))));
}

#[tokio::test]
async fn test_profile_update() {
    let (db, _temp_dir) = create_test_db().await;
    let user = insert_test_user(&db, "Alice Doe").await;
    let mut conn = db.acquire().await.unwrap();

    let patch = ProfilePatch {
        name: "Alice Renamed".to_string(),
        image_url: Some("https://cdn.example.com/a.png".to_string()),
    };
    users::update_profile(&mut conn, &user.id, &patch).await.unwrap();

    let updated = users::get_by_id(&mut conn, &user.id).await.unwrap();
    assert_eq!(updated.name, "Alice Renamed");
    assert_eq!(updated.image_url.as_deref(), Some("https://cdn.example.com/a.png"));

    // Name only; image stays
    let patch = ProfilePatch {
        name: "Alice Again".to_string(),
        image_url: None,
    };
    users::update_profile(&mut conn, &user.id, &patch).await.unwrap();
    let updated = users::get_by_id(&mut conn, &user.id).await.unwrap();
    assert_eq!(updated.name, "Alice Again");
    assert_eq!(updated.image_url.as_deref(), Some("https://cdn.example.com/a.png"));

    let missing = users::update_profile(&mut conn, &EntityId::new().0, &patch).await;
    assert!(matches!(missing, Err(AppError::UserNotFound)));
}

#[tokio::test]
async fn test_friend_round_trip() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "Alice Doe").await;
    let bob = insert_test_user(&db, "Bob Smith").await;
    let mut conn = db.acquire().await.unwrap();

    assert!(!friends::is_friend(&mut conn, &alice.id, &bob.id).await.unwrap());

    friends::add_friend(&mut conn, &alice.id, &bob.id).await.unwrap();
    assert!(friends::is_friend(&mut conn, &alice.id, &bob.id).await.unwrap());
    assert!(friends::is_friend(&mut conn, &bob.id, &alice.id).await.unwrap());

    // Deleting works from the other side of the edge
    friends::delete_friend(&mut conn, &bob.id, &alice.id).await.unwrap();
    assert!(!friends::is_friend(&mut conn, &alice.id, &bob.id).await.unwrap());
    assert!(!friends::is_friend(&mut conn, &bob.id, &alice.id).await.unwrap());

    let again = friends::delete_friend(&mut conn, &alice.id, &bob.id).await;
    assert!(matches!(again, Err(AppError::NotFriends)));
}

#[tokio::test]
async fn test_duplicate_friend_leaves_graph_unchanged() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "Alice Doe").await;
    let bob = insert_test_user(&db, "Bob Smith").await;
    let mut conn = db.acquire().await.unwrap();

    friends::add_friend(&mut conn, &alice.id, &bob.id).await.unwrap();

    let same = friends::add_friend(&mut conn, &alice.id, &bob.id).await;
    assert!(matches!(same, Err(AppError::AlreadyFriends)));
    let reversed = friends::add_friend(&mut conn, &bob.id, &alice.id).await;
    assert!(matches!(reversed, Err(AppError::AlreadyFriends)));

    let edges: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM friends")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(edges, 1);

    let of_alice = friends::friends_of(&mut conn, &alice.id).await.unwrap();
    assert_eq!(of_alice.len(), 1);
    assert!(of_alice.contains(&bob.id));
}

#[tokio::test]
async fn test_self_friend_does_not_touch_storage() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "Alice Doe").await;
    let mut conn = db.acquire().await.unwrap();

    let add = friends::add_friend(&mut conn, &alice.id, &alice.id).await;
    assert!(matches!(add, Err(AppError::SelfFriend)));
    let delete = friends::delete_friend(&mut conn, &alice.id, &alice.id).await;
    assert!(matches!(delete, Err(AppError::SelfFriend)));

    let edges: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM friends")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(edges, 0);
}

#[tokio::test]
async fn test_post_counter_tracks_creates() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "Alice Doe").await;

    {
        let mut conn = db.acquire().await.unwrap();
        assert_eq!(posts::post_count(&mut conn).await.unwrap(), 0);
    }

    insert_test_post(&db, &alice, "first post", &["a"], 2).await;
    insert_test_post(&db, &alice, "second post", &["b"], 1).await;

    let mut conn = db.acquire().await.unwrap();
    assert_eq!(posts::post_count(&mut conn).await.unwrap(), 2);

    let post = insert_test_post(&db, &alice, "third post", &[], 0).await;
    let stored = posts::get_by_id(&mut conn, &post.id).await.unwrap();
    assert!(stored.tags.is_empty());
    assert_eq!(posts::post_count(&mut conn).await.unwrap(), 3);
}

#[tokio::test]
async fn test_get_post_not_found() {
    let (db, _temp_dir) = create_test_db().await;
    let mut conn = db.acquire().await.unwrap();

    let missing = posts::get_by_id(&mut conn, &EntityId::new().0).await;
    assert!(matches!(missing, Err(AppError::PostNotFound)));
    let malformed = posts::get_by_id(&mut conn, "123").await;
    assert!(matches!(malformed, Err(AppError::PostNotFound)));
}

#[tokio::test]
async fn test_feed_visibility_follows_friendship() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "Alice Doe").await;
    let bob = insert_test_user(&db, "Bob Smith").await;
    let carol = insert_test_user(&db, "Carol King").await;

    let own = insert_test_post(&db, &alice, "alice post", &["x"], 3).await;
    let friend = insert_test_post(&db, &bob, "bob post", &["x"], 2).await;
    insert_test_post(&db, &carol, "carol post", &["x"], 1).await;

    let mut conn = db.acquire().await.unwrap();
    friends::add_friend(&mut conn, &bob.id, &alice.id).await.unwrap();

    let filter = PostFilter {
        user_id: Some(alice.id.clone()),
        ..PostFilter::default()
    };
    let feed = posts::list_feed(&mut conn, &filter).await.unwrap();
    let ids: Vec<&str> = feed.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![friend.id.as_str(), own.id.as_str()]);
    assert_eq!(posts::count_feed(&mut conn, &filter).await.unwrap(), 2);
}

#[tokio::test]
async fn test_unlimited_feed_matches_count() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "Alice Doe").await;
    for i in 0..8 {
        insert_test_post(&db, &alice, &format!("post number {}", i), &["t"], 10 - i).await;
    }

    let mut conn = db.acquire().await.unwrap();
    let filter = PostFilter {
        user_id: Some(alice.id.clone()),
        ..PostFilter::default()
    };

    // Default page size applies
    let page = posts::list_feed(&mut conn, &filter).await.unwrap();
    assert_eq!(page.len() as i64, filter::DEFAULT_LIMIT);

    let unlimited = PostFilter {
        disable_offset: true,
        ..filter.clone()
    };
    let all = posts::list_feed(&mut conn, &unlimited).await.unwrap();
    let total = posts::count_feed(&mut conn, &filter).await.unwrap();
    assert_eq!(all.len() as i64, total);
    assert_eq!(total, 8);

    // Newest first
    assert_eq!(all[0].body, "post number 7");
    assert_eq!(all[7].body, "post number 0");

    let second_page = PostFilter {
        offset: 5,
        ..filter
    };
    assert_eq!(posts::list_feed(&mut conn, &second_page).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_feed_tag_and_search_filters() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "Alice Doe").await;

    insert_test_post(&db, &alice, "Rust is great", &["rust", "lang"], 3).await;
    insert_test_post(&db, &alice, "Go is fine", &["go", "lang"], 2).await;
    insert_test_post(&db, &alice, "100% done_today", &["misc"], 1).await;

    let mut conn = db.acquire().await.unwrap();
    let base = PostFilter {
        user_id: Some(alice.id.clone()),
        disable_offset: true,
        ..PostFilter::default()
    };

    let tagged = PostFilter {
        search_tags: vec!["rust".to_string(), "go".to_string()],
        ..base.clone()
    };
    assert_eq!(posts::list_feed(&mut conn, &tagged).await.unwrap().len(), 2);

    let lang_only = PostFilter {
        search_tags: vec!["misc".to_string()],
        ..base.clone()
    };
    let misc = posts::list_feed(&mut conn, &lang_only).await.unwrap();
    assert_eq!(misc.len(), 1);
    assert_eq!(misc[0].body, "100% done_today");

    let search = PostFilter {
        search: Some("RUST".to_string()),
        ..base.clone()
    };
    assert_eq!(posts::list_feed(&mut conn, &search).await.unwrap().len(), 1);

    // Wildcards in the search term are literal
    let percent = PostFilter {
        search: Some("%".to_string()),
        ..base.clone()
    };
    assert_eq!(posts::list_feed(&mut conn, &percent).await.unwrap().len(), 1);
    let underscore = PostFilter {
        search: Some("_".to_string()),
        ..base
    };
    assert_eq!(posts::list_feed(&mut conn, &underscore).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_comments_for_posts_batch() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "Alice Doe").await;
    let bob = insert_test_user(&db, "Bob Smith").await;

    let first = insert_test_post(&db, &alice, "first post", &["a"], 2).await;
    let second = insert_test_post(&db, &alice, "second post", &["a"], 1).await;
    let untouched = insert_test_post(&db, &alice, "third post", &["a"], 0).await;

    insert_test_comment(&db, &first, &bob, "one").await;
    insert_test_comment(&db, &first, &alice, "two").await;
    insert_test_comment(&db, &second, &bob, "three").await;
    insert_test_comment(&db, &untouched, &bob, "elsewhere").await;

    let mut conn = db.acquire().await.unwrap();
    let comments = posts::comments_for_posts(&mut conn, &[first.id.clone(), second.id.clone()])
        .await
        .unwrap();
    assert_eq!(comments.len(), 3);
    assert!(comments.iter().all(|c| c.post_id != untouched.id));

    let none = posts::comments_for_posts(&mut conn, &[]).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_user_list_friend_counts() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "Alice Doe").await;
    let bob = insert_test_user(&db, "Bob Smith").await;
    let carol = insert_test_user(&db, "Carol King").await;

    {
        let mut conn = db.acquire().await.unwrap();
        friends::add_friend(&mut conn, &alice.id, &bob.id).await.unwrap();
        friends::add_friend(&mut conn, &carol.id, &alice.id).await.unwrap();
    }

    let by_count = UserFilter {
        sort_by: UserSortKey::FriendCount,
        order_by: SortDirection::Desc,
        limit: 10,
        ..UserFilter::default()
    };
    let page = users::list(&db, &by_count).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items[0].id, alice.id);
    assert_eq!(page.items[0].friend_count, 2);
    assert!(page.items[1..].iter().all(|p| p.friend_count == 1));

    let only_friends = UserFilter {
        user_id: Some(alice.id.clone()),
        only_friend: true,
        ..UserFilter::default()
    };
    let page = users::list(&db, &only_friends).await.unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|p| p.id != alice.id));

    let search = UserFilter {
        search: Some("car".to_string()),
        ..UserFilter::default()
    };
    let page = users::list(&db, &search).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].name, "Carol King");

    let mut conn = db.acquire().await.unwrap();
    let profiles = users::profiles_by_ids(&mut conn, &[bob.id.clone(), EntityId::new().0])
        .await
        .unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[&bob.id].friend_count, 1);
    assert!(profiles[&bob.id].created_at.is_some());
}

#[tokio::test]
async fn test_search_folds_non_ascii_case() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "Alice Doe").await;
    insert_test_post(&db, &alice, "Über Éclair party", &["food"], 1).await;
    insert_test_post(&db, &alice, "plain ascii post", &["food"], 0).await;

    let mut conn = db.acquire().await.unwrap();
    for term in ["PARTY", "ÉCLAIR", "über", "éclair"] {
        let filter = PostFilter {
            user_id: Some(alice.id.clone()),
            search: Some(term.to_string()),
            ..PostFilter::default()
        };
        let found = posts::list_feed(&mut conn, &filter).await.unwrap();
        assert_eq!(found.len(), 1, "search term {term}");
        assert_eq!(found[0].body, "Über Éclair party");
        assert_eq!(posts::count_feed(&mut conn, &filter).await.unwrap(), 1);
    }

    let elodie = insert_test_user(&db, "Élodie Martin").await;
    for term in ["élodie", "ÉLODIE"] {
        let filter = UserFilter {
            search: Some(term.to_string()),
            ..UserFilter::default()
        };
        let page = users::list(&db, &filter).await.unwrap();
        assert_eq!(page.total, 1, "search term {term}");
        assert_eq!(page.items[0].id, elodie.id);
    }

    // Renames refresh the searchable name
    let patch = ProfilePatch {
        name: "Ångström Lab".to_string(),
        image_url: None,
    };
    users::update_profile(&mut conn, &elodie.id, &patch).await.unwrap();
    let renamed = UserFilter {
        search: Some("ÅNGSTRÖM".to_string()),
        ..UserFilter::default()
    };
    let page = users::list(&db, &renamed).await.unwrap();
    assert_eq!(page.total, 1);
    let stale = UserFilter {
        search: Some("élodie".to_string()),
        ..UserFilter::default()
    };
    assert_eq!(users::list(&db, &stale).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_failed_post_create_rolls_back() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "Alice Doe").await;
    let kept = insert_test_post(&db, &alice, "kept post", &["a"], 1).await;

    let mut conn = db.acquire().await.unwrap();
    assert_eq!(posts::post_count(&mut conn).await.unwrap(), 1);

    // Counter bump fails after the post row was written
    sqlx::query(
        "CREATE TRIGGER block_counter BEFORE UPDATE ON post_counter \
         BEGIN SELECT RAISE(ABORT, 'counter blocked'); END",
    )
    .execute(&mut *conn)
    .await
    .unwrap();

    let now = Utc::now();
    let blocked = Post {
        id: EntityId::new().0,
        user_id: alice.id.clone(),
        body: "never stored".to_string(),
        tags: vec!["a".to_string()],
        created_at: now,
        updated_at: now,
    };
    assert!(posts::create(&db, &blocked).await.is_err());
    assert!(matches!(
        posts::get_by_id(&mut conn, &blocked.id).await,
        Err(AppError::PostNotFound)
    ));
    assert_eq!(posts::post_count(&mut conn).await.unwrap(), 1);

    sqlx::query("DROP TRIGGER block_counter")
        .execute(&mut *conn)
        .await
        .unwrap();

    // Unknown author and reused id fail on the insert itself
    let orphan = Post {
        id: EntityId::new().0,
        user_id: EntityId::new().0,
        ..blocked.clone()
    };
    assert!(posts::create(&db, &orphan).await.is_err());
    let reused = Post {
        id: kept.id.clone(),
        ..blocked.clone()
    };
    assert!(posts::create(&db, &reused).await.is_err());
    assert_eq!(posts::post_count(&mut conn).await.unwrap(), 1);

    let filter = PostFilter {
        user_id: Some(alice.id.clone()),
        disable_offset: true,
        ..PostFilter::default()
    };
    let feed = posts::list_feed(&mut conn, &filter).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].body, "kept post");

    posts::create(&db, &blocked).await.unwrap();
    assert_eq!(posts::post_count(&mut conn).await.unwrap(), 2);
}

#[tokio::test]
async fn test_feed_orders_same_timestamp_by_id() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "Alice Doe").await;

    let created_at = Utc::now();
    let mut ids = Vec::new();
    for body in ["twin one", "twin two", "twin three"] {
        let post = Post {
            id: EntityId::new().0,
            user_id: alice.id.clone(),
            body: body.to_string(),
            tags: vec!["t".to_string()],
            created_at,
            updated_at: created_at,
        };
        posts::create(&db, &post).await.unwrap();
        ids.push(post.id);
    }
    ids.sort_unstable_by(|a, b| b.cmp(a));

    let mut conn = db.acquire().await.unwrap();
    let filter = PostFilter {
        user_id: Some(alice.id.clone()),
        disable_offset: true,
        ..PostFilter::default()
    };
    let feed: Vec<String> = posts::list_feed(&mut conn, &filter)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(feed, ids);

    let mut paged = Vec::new();
    for offset in 0..3 {
        let page = PostFilter {
            limit: 1,
            offset,
            disable_offset: false,
            ..filter.clone()
        };
        let rows = posts::list_feed(&mut conn, &page).await.unwrap();
        assert_eq!(rows.len(), 1);
        paged.push(rows[0].id.clone());
    }
    assert_eq!(paged, ids);
}
