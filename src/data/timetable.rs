use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::filter;
use crate::resp::problem::{problems, Problem};

pub static TIMETABLE_COLLECTION_NAME: &str = "timetables";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum SchoolDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl std::fmt::Display for SchoolDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let day = match self {
            SchoolDay::Monday => "Monday",
            SchoolDay::Tuesday => "Tuesday",
            SchoolDay::Wednesday => "Wednesday",
            SchoolDay::Thursday => "Thursday",
            SchoolDay::Friday => "Friday",
            SchoolDay::Saturday => "Saturday",
        };
        write!(f, "{}", day)
    }
}

/// One slot in a day plan. Break periods carry no subject or staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub period_number: u32,
    /// "HH:MM", client-formatted.
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub subject: Option<Uuid>,
    #[serde(default)]
    pub staff: Option<Uuid>,
    #[serde(default)]
    pub is_break: bool,
    #[serde(default)]
    pub break_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub class: Uuid,
    pub day: SchoolDay,
    pub periods: Vec<Period>,
    pub uploaded_by: Uuid,
    pub academic_year: String,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

pub mod problem {
    use super::SchoolDay;
    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn day_taken(class: Uuid, day: SchoolDay) -> Problem {
        Problem::new_untyped(
            Status::Conflict,
            "Timetable for this class and day already exists.",
        )
        .insert_str("class", class)
        .insert_str("day", day)
        .to_owned()
    }
}

#[allow(async_fn_in_trait)]
pub trait TimetableDbExt {
    /// Inserts a day plan; one plan per (class, day, academicYear).
    async fn create_timetable(&self, timetable: &Timetable) -> Result<(), Problem>;

    async fn require_timetable(&self, id: Uuid) -> Result<Timetable, Problem>;
    async fn list_timetables(&self, query: Document) -> Result<Vec<Timetable>, Problem>;
    async fn save_timetable(&self, timetable: &Timetable) -> Result<(), Problem>;
    async fn delete_timetable(&self, id: Uuid) -> Result<Option<Timetable>, Problem>;
}

impl TimetableDbExt for Database {
    async fn create_timetable(&self, timetable: &Timetable) -> Result<(), Problem> {
        let collection = self.collection::<Timetable>(TIMETABLE_COLLECTION_NAME);

        let existing = collection
            .find_one(
                doc! {
                    "class": timetable.class.to_string(),
                    "day": timetable.day.to_string(),
                    "academicYear": &timetable.academic_year,
                },
                None,
            )
            .await
            .map_err(Problem::from)?;

        if existing.is_some() {
            return Err(problem::day_taken(timetable.class, timetable.day));
        }

        collection
            .insert_one(timetable, None)
            .await
            .map_err(Problem::from)?;

        Ok(())
    }

    async fn require_timetable(&self, id: Uuid) -> Result<Timetable, Problem> {
        self.collection::<Timetable>(TIMETABLE_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)?
            .ok_or_else(|| problems::not_found("Timetable", id))
    }

    async fn list_timetables(&self, query: Document) -> Result<Vec<Timetable>, Problem> {
        let mut cursor = self
            .collection::<Timetable>(TIMETABLE_COLLECTION_NAME)
            .find(query, None)
            .await
            .map_err(Problem::from)?;

        let mut timetables = vec![];
        while let Some(result) = cursor.next().await {
            match result {
                Ok(timetable) => timetables.push(timetable),
                Err(_) => tracing::warn!("unable to deserialize Timetable document"),
            }
        }

        Ok(timetables)
    }

    async fn save_timetable(&self, timetable: &Timetable) -> Result<(), Problem> {
        self.collection::<Timetable>(TIMETABLE_COLLECTION_NAME)
            .replace_one(filter::by_id(timetable.id), timetable, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn delete_timetable(&self, id: Uuid) -> Result<Option<Timetable>, Problem> {
        self.collection::<Timetable>(TIMETABLE_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }
}
