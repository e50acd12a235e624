use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::filter;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;

pub static NOTICE_COLLECTION_NAME: &str = "notices";

/// A board notice. Unlike announcements these target a role list and may be
/// pinned to specific classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
    pub author: Uuid,
    /// Empty targets everyone.
    #[serde(default)]
    pub target_audience: Vec<Role>,
    #[serde(default)]
    pub target_classes: Vec<Uuid>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

#[allow(async_fn_in_trait)]
pub trait NoticeDbExt {
    async fn create_notice(&self, notice: &Notice) -> Result<(), Problem>;
    async fn require_notice(&self, id: Uuid) -> Result<Notice, Problem>;

    /// Newest first; the caller supplies a scope filter from
    /// [`crate::scope::notice_filter`].
    async fn list_notices(&self, scope: Document) -> Result<Vec<Notice>, Problem>;

    async fn save_notice(&self, notice: &Notice) -> Result<(), Problem>;
    async fn delete_notice(&self, id: Uuid) -> Result<Option<Notice>, Problem>;
}

impl NoticeDbExt for Database {
    async fn create_notice(&self, notice: &Notice) -> Result<(), Problem> {
        self.collection::<Notice>(NOTICE_COLLECTION_NAME)
            .insert_one(notice, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn require_notice(&self, id: Uuid) -> Result<Notice, Problem> {
        self.collection::<Notice>(NOTICE_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)?
            .ok_or_else(|| problems::not_found("Notice", id))
    }

    async fn list_notices(&self, scope: Document) -> Result<Vec<Notice>, Problem> {
        let options = FindOptions::builder().sort(doc! { "date": -1 }).build();

        let mut cursor = self
            .collection::<Notice>(NOTICE_COLLECTION_NAME)
            .find(scope, options)
            .await
            .map_err(Problem::from)?;

        let mut notices = vec![];
        while let Some(result) = cursor.next().await {
            match result {
                Ok(notice) => notices.push(notice),
                Err(_) => tracing::warn!("unable to deserialize Notice document"),
            }
        }

        Ok(notices)
    }

    async fn save_notice(&self, notice: &Notice) -> Result<(), Problem> {
        self.collection::<Notice>(NOTICE_COLLECTION_NAME)
            .replace_one(filter::by_id(notice.id), notice, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn delete_notice(&self, id: Uuid) -> Result<Option<Notice>, Problem> {
        self.collection::<Notice>(NOTICE_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }
}
