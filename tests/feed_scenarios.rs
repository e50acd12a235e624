//! Feed ordering and capping against a real MongoDB instance.
//!
//! These tests are ignored by default; run them with a local mongod:
//! `MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored`.
//! Each test works in its own throwaway database and drops it afterwards.

use bson::doc;
use chrono::{Duration, Utc};
use mongodb::{Client, Database};
use uuid::Uuid;

use campus_backend::data::announcement::{
    Announcement, AnnouncementDbExt, ANNOUNCEMENT_FEED_CAP,
};
use campus_backend::data::message::{Message, MessageDbExt, MESSAGE_HISTORY_CAP};
use campus_backend::scope::Audience;

async fn scratch_db() -> Database {
    let uri = std::env::var("MONGODB_URI").unwrap_or("mongodb://localhost:27017".to_string());
    let client = Client::with_uri_str(&uri)
        .await
        .expect("unable to connect to MongoDB");

    client.database(&format!("campus_test_{}", Uuid::new_v4().simple()))
}

#[rocket::async_test]
#[ignore = "requires a running MongoDB"]
async fn announcement_feed_is_newest_first_and_capped() {
    let db = scratch_db().await;

    let sender = Uuid::new_v4();
    let base = Utc::now() - Duration::hours(1);
    let total = ANNOUNCEMENT_FEED_CAP + 5;

    for i in 0..total {
        let mut announcement =
            Announcement::new(sender, format!("Notice {i}"), "content", Audience::All);
        announcement.created = base + Duration::seconds(i);
        db.create_announcement(&announcement)
            .await
            .expect("announcement created");
    }

    let feed = db
        .list_announcements(doc! {})
        .await
        .expect("announcement feed");

    assert_eq!(feed.len(), ANNOUNCEMENT_FEED_CAP as usize);
    // The newest entry leads; the 5 oldest fall off the end.
    assert_eq!(feed[0].title, format!("Notice {}", total - 1));
    assert_eq!(
        feed.last().unwrap().title,
        format!("Notice {}", total - ANNOUNCEMENT_FEED_CAP)
    );
    assert!(feed.windows(2).all(|w| w[0].created >= w[1].created));

    db.drop(None).await.expect("scratch database dropped");
}

#[rocket::async_test]
#[ignore = "requires a running MongoDB"]
async fn class_chat_history_is_oldest_first_and_capped() {
    let db = scratch_db().await;

    let class = Uuid::new_v4();
    let sender = Uuid::new_v4();
    let base = Utc::now() - Duration::hours(1);
    let total = MESSAGE_HISTORY_CAP + 5;

    for i in 0..total {
        let mut message = Message::new_text(class, sender, format!("msg {i}"));
        message.created = base + Duration::seconds(i);
        db.create_message(&message).await.expect("message created");
    }

    // Messages for another class stay out of the history.
    let stray = Message::new_text(Uuid::new_v4(), sender, "elsewhere");
    db.create_message(&stray).await.expect("stray created");

    let history = db
        .list_class_messages(class)
        .await
        .expect("class history");

    assert_eq!(history.len(), MESSAGE_HISTORY_CAP as usize);
    assert_eq!(history[0].content.as_deref(), Some("msg 0"));
    assert_eq!(
        history.last().unwrap().content.as_deref(),
        Some(format!("msg {}", MESSAGE_HISTORY_CAP - 1).as_str())
    );
    assert!(history.windows(2).all(|w| w[0].created <= w[1].created));

    db.drop(None).await.expect("scratch database dropped");
}
