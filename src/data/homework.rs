use bson::Document;
use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::filter;
use crate::resp::problem::{problems, Problem};

pub static HOMEWORK_COLLECTION_NAME: &str = "homework";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Homework {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub class: Uuid,
    pub subject: Uuid,
    pub staff: Uuid,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

#[allow(async_fn_in_trait)]
pub trait HomeworkDbExt {
    async fn create_homework(&self, homework: &Homework) -> Result<(), Problem>;
    async fn require_homework(&self, id: Uuid) -> Result<Homework, Problem>;
    async fn list_homework(&self, query: Document) -> Result<Vec<Homework>, Problem>;
    async fn save_homework(&self, homework: &Homework) -> Result<(), Problem>;
    async fn delete_homework(&self, id: Uuid) -> Result<Option<Homework>, Problem>;
}

impl HomeworkDbExt for Database {
    async fn create_homework(&self, homework: &Homework) -> Result<(), Problem> {
        self.collection::<Homework>(HOMEWORK_COLLECTION_NAME)
            .insert_one(homework, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn require_homework(&self, id: Uuid) -> Result<Homework, Problem> {
        self.collection::<Homework>(HOMEWORK_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)?
            .ok_or_else(|| problems::not_found("Homework", id))
    }

    async fn list_homework(&self, query: Document) -> Result<Vec<Homework>, Problem> {
        let mut cursor = self
            .collection::<Homework>(HOMEWORK_COLLECTION_NAME)
            .find(query, None)
            .await
            .map_err(Problem::from)?;

        let mut homework = vec![];
        while let Some(result) = cursor.next().await {
            match result {
                Ok(entry) => homework.push(entry),
                Err(_) => tracing::warn!("unable to deserialize Homework document"),
            }
        }

        Ok(homework)
    }

    async fn save_homework(&self, homework: &Homework) -> Result<(), Problem> {
        self.collection::<Homework>(HOMEWORK_COLLECTION_NAME)
            .replace_one(filter::by_id(homework.id), homework, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn delete_homework(&self, id: Uuid) -> Result<Option<Homework>, Problem> {
        self.collection::<Homework>(HOMEWORK_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }
}
