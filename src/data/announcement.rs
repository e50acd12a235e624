use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::filter;
use crate::resp::problem::{problems, Problem};
use crate::scope::Audience;

pub static ANNOUNCEMENT_COLLECTION_NAME: &str = "announcements";

/// Feed entries shown newest-first; the feed is capped server-side.
pub const ANNOUNCEMENT_FEED_CAP: i64 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub sender: Uuid,
    pub title: String,
    pub content: String,
    pub target_audience: Audience,
    #[serde(default)]
    pub read_by: Vec<Uuid>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Announcement {
    pub fn new(
        sender: Uuid,
        title: impl Into<String>,
        content: impl Into<String>,
        target_audience: Audience,
    ) -> Announcement {
        Announcement {
            id: Uuid::new_v4(),
            sender,
            title: title.into(),
            content: content.into(),
            target_audience,
            read_by: vec![],
            attachment_url: None,
            created: Utc::now(),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait AnnouncementDbExt {
    async fn create_announcement(&self, announcement: &Announcement) -> Result<(), Problem>;

    async fn require_announcement(&self, id: Uuid) -> Result<Announcement, Problem>;

    /// Newest first, capped at [`ANNOUNCEMENT_FEED_CAP`]. The caller supplies
    /// a scope filter from [`crate::scope::announcement_filter`].
    async fn list_announcements(&self, scope: Document) -> Result<Vec<Announcement>, Problem>;

    /// Set-adds the reader; already-read is a silent no-op.
    async fn mark_announcement_read(&self, id: Uuid, reader: Uuid) -> Result<(), Problem>;

    async fn count_unread_announcements(&self, scope: Document) -> Result<u64, Problem>;

    async fn delete_announcement(&self, id: Uuid) -> Result<Option<Announcement>, Problem>;
}

impl AnnouncementDbExt for Database {
    async fn create_announcement(&self, announcement: &Announcement) -> Result<(), Problem> {
        self.collection::<Announcement>(ANNOUNCEMENT_COLLECTION_NAME)
            .insert_one(announcement, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn require_announcement(&self, id: Uuid) -> Result<Announcement, Problem> {
        self.collection::<Announcement>(ANNOUNCEMENT_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)?
            .ok_or_else(|| problems::not_found("Announcement", id))
    }

    async fn list_announcements(&self, scope: Document) -> Result<Vec<Announcement>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "created": -1 })
            .limit(ANNOUNCEMENT_FEED_CAP)
            .build();

        let mut cursor = self
            .collection::<Announcement>(ANNOUNCEMENT_COLLECTION_NAME)
            .find(scope, options)
            .await
            .map_err(Problem::from)?;

        let mut announcements = vec![];
        while let Some(result) = cursor.next().await {
            match result {
                Ok(announcement) => announcements.push(announcement),
                Err(_) => tracing::warn!("unable to deserialize Announcement document"),
            }
        }

        Ok(announcements)
    }

    async fn mark_announcement_read(&self, id: Uuid, reader: Uuid) -> Result<(), Problem> {
        let result = self
            .collection::<Announcement>(ANNOUNCEMENT_COLLECTION_NAME)
            .update_one(
                filter::by_id(id),
                doc! { "$addToSet": { "readBy": reader.to_string() } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        if result.matched_count == 0 {
            return Err(problems::not_found("Announcement", id));
        }
        Ok(())
    }

    async fn count_unread_announcements(&self, scope: Document) -> Result<u64, Problem> {
        self.collection::<Announcement>(ANNOUNCEMENT_COLLECTION_NAME)
            .count_documents(scope, None)
            .await
            .map_err(Problem::from)
    }

    async fn delete_announcement(&self, id: Uuid) -> Result<Option<Announcement>, Problem> {
        self.collection::<Announcement>(ANNOUNCEMENT_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }
}
