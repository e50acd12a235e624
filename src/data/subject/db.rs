use bson::doc;
use mongodb::Database;
use rocket::futures::StreamExt;
use uuid::Uuid;

use super::{Subject, SUBJECT_COLLECTION_NAME};
use crate::data::filter;
use crate::resp::problem::Problem;

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::new_untyped(Status::NotFound, "Subject doesn't exist.")
            .insert_str("id", id)
            .to_owned()
    }

    #[inline]
    pub fn code_taken(code: impl ToString) -> Problem {
        Problem::new_untyped(Status::Conflict, "Subject with this code already exists.")
            .insert_str("code", code)
            .to_owned()
    }
}

#[allow(async_fn_in_trait)]
pub trait SubjectDbExt {
    /// Inserts a subject after checking the code uniqueness invariant.
    async fn create_subject(&self, subject: &Subject) -> Result<(), Problem>;

    async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>, Problem>;
    async fn require_subject(&self, id: Uuid) -> Result<Subject, Problem>;

    async fn list_subjects(&self) -> Result<Vec<Subject>, Problem>;

    async fn save_subject(&self, subject: &Subject) -> Result<(), Problem>;
    async fn delete_subject(&self, id: Uuid) -> Result<Option<Subject>, Problem>;
}

impl SubjectDbExt for Database {
    async fn create_subject(&self, subject: &Subject) -> Result<(), Problem> {
        let existing = self
            .collection::<Subject>(SUBJECT_COLLECTION_NAME)
            .find_one(doc! { "code": &subject.code }, None)
            .await
            .map_err(Problem::from)?;

        if existing.is_some() {
            return Err(problem::code_taken(&subject.code));
        }

        self.collection::<Subject>(SUBJECT_COLLECTION_NAME)
            .insert_one(subject, None)
            .await
            .map_err(Problem::from)?;

        Ok(())
    }

    async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>, Problem> {
        self.collection::<Subject>(SUBJECT_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn require_subject(&self, id: Uuid) -> Result<Subject, Problem> {
        self.get_subject(id)
            .await?
            .ok_or_else(|| problem::not_found(id))
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, Problem> {
        let mut cursor = self
            .collection::<Subject>(SUBJECT_COLLECTION_NAME)
            .find(doc! {}, None)
            .await
            .map_err(Problem::from)?;

        let mut subjects = vec![];
        while let Some(result) = cursor.next().await {
            match result {
                Ok(subject) => subjects.push(subject),
                Err(_) => tracing::warn!("unable to deserialize Subject document"),
            }
        }

        Ok(subjects)
    }

    async fn save_subject(&self, subject: &Subject) -> Result<(), Problem> {
        self.collection::<Subject>(SUBJECT_COLLECTION_NAME)
            .replace_one(filter::by_id(subject.id), subject, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn delete_subject(&self, id: Uuid) -> Result<Option<Subject>, Problem> {
        self.collection::<Subject>(SUBJECT_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }
}
