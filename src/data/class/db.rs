use bson::doc;
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::{Class, CLASS_COLLECTION_NAME};
use crate::data::filter;
use crate::data::subject::{Subject, SUBJECT_COLLECTION_NAME};
use crate::data::user::{User, USER_COLLECTION_NAME};
use crate::resp::problem::Problem;

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::new_untyped(Status::NotFound, "Class doesn't exist.")
            .insert_str("id", id)
            .to_owned()
    }
}

/// `name email registerNumber` projection of a user, as embedded in
/// populated responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBrief {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_number: Option<String>,
}

impl From<&User> for UserBrief {
    fn from(user: &User) -> Self {
        UserBrief {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            register_number: user.register_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectBrief {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

impl From<&Subject> for SubjectBrief {
    fn from(subject: &Subject) -> Self {
        SubjectBrief {
            id: subject.id,
            name: subject.name.clone(),
            code: subject.code.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectStaffView {
    pub subject: Option<SubjectBrief>,
    pub staff: Option<UserBrief>,
}

/// A class with its relationship ids resolved to brief records. Dangling
/// references resolve to nothing instead of failing the response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassView {
    pub id: Uuid,
    pub name: String,
    pub grade: String,
    pub section: String,
    #[serde(rename = "classstaff", skip_serializing_if = "Option::is_none")]
    pub class_staff: Option<UserBrief>,
    pub subjects: Vec<SubjectBrief>,
    #[serde(rename = "subjectstaffs")]
    pub subject_staffs: Vec<SubjectStaffView>,
    pub students: Vec<UserBrief>,
}

#[allow(async_fn_in_trait)]
pub trait ClassDbExt {
    async fn create_class(&self, class: &Class) -> Result<(), Problem>;

    async fn get_class(&self, id: Uuid) -> Result<Option<Class>, Problem>;

    /// Maps a missing class to a 404 problem before any mutation happens.
    async fn require_class(&self, id: Uuid) -> Result<Class, Problem>;

    /// Lists all classes, or only those a staff member is involved in
    /// (as class-teacher or subject-staff).
    async fn list_classes(&self, staff: Option<Uuid>) -> Result<Vec<Class>, Problem>;

    /// Persists a class document mutated in memory.
    async fn save_class(&self, class: &Class) -> Result<(), Problem>;

    async fn delete_class(&self, id: Uuid) -> Result<Option<Class>, Problem>;

    /// Resolves the class's relationship ids into a populated view.
    async fn populate_class(&self, class: &Class) -> Result<ClassView, Problem>;
}

impl ClassDbExt for Database {
    async fn create_class(&self, class: &Class) -> Result<(), Problem> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .insert_one(class, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn get_class(&self, id: Uuid) -> Result<Option<Class>, Problem> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn require_class(&self, id: Uuid) -> Result<Class, Problem> {
        self.get_class(id).await?.ok_or_else(|| problem::not_found(id))
    }

    async fn list_classes(&self, staff: Option<Uuid>) -> Result<Vec<Class>, Problem> {
        let query = match staff {
            Some(staff) => doc! {
                "$or": [
                    { "classstaff": staff.to_string() },
                    { "subjectstaffs.staff": staff.to_string() },
                ]
            },
            None => doc! {},
        };

        let mut cursor = self
            .collection::<Class>(CLASS_COLLECTION_NAME)
            .find(query, None)
            .await
            .map_err(Problem::from)?;

        let mut classes = vec![];
        while let Some(result) = cursor.next().await {
            match result {
                Ok(class) => classes.push(class),
                Err(_) => tracing::warn!("unable to deserialize Class document"),
            }
        }

        Ok(classes)
    }

    async fn save_class(&self, class: &Class) -> Result<(), Problem> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .replace_one(filter::by_id(class.id), class, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn delete_class(&self, id: Uuid) -> Result<Option<Class>, Problem> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn populate_class(&self, class: &Class) -> Result<ClassView, Problem> {
        let mut user_ids: Vec<Uuid> = class.students.clone();
        user_ids.extend(class.class_staff);
        user_ids.extend(class.subject_staffs.iter().map(|e| e.staff));

        let mut subject_ids: Vec<Uuid> = class.subjects.clone();
        subject_ids.extend(class.subject_staffs.iter().map(|e| e.subject));

        let users = fetch_users(self, &user_ids).await?;
        let subjects = fetch_subjects(self, &subject_ids).await?;

        Ok(ClassView {
            id: class.id,
            name: class.name.clone(),
            grade: class.grade.clone(),
            section: class.section.clone(),
            class_staff: class
                .class_staff
                .and_then(|id| users.get(&id).map(UserBrief::from)),
            subjects: class
                .subjects
                .iter()
                .filter_map(|id| subjects.get(id).map(SubjectBrief::from))
                .collect(),
            subject_staffs: class
                .subject_staffs
                .iter()
                .map(|entry| SubjectStaffView {
                    subject: subjects.get(&entry.subject).map(SubjectBrief::from),
                    staff: users.get(&entry.staff).map(UserBrief::from),
                })
                .collect(),
            students: class
                .students
                .iter()
                .filter_map(|id| users.get(id).map(UserBrief::from))
                .collect(),
        })
    }
}

async fn fetch_users(db: &Database, ids: &[Uuid]) -> Result<HashMap<Uuid, User>, Problem> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let id_strings: Vec<String> = ids.iter().map(Uuid::to_string).collect();
    let mut cursor = db
        .collection::<User>(USER_COLLECTION_NAME)
        .find(doc! { "_id": { "$in": id_strings } }, None)
        .await
        .map_err(Problem::from)?;

    let mut users = HashMap::new();
    while let Some(result) = cursor.next().await {
        if let Ok(user) = result {
            users.insert(user.id, user);
        }
    }
    Ok(users)
}

async fn fetch_subjects(db: &Database, ids: &[Uuid]) -> Result<HashMap<Uuid, Subject>, Problem> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let id_strings: Vec<String> = ids.iter().map(Uuid::to_string).collect();
    let mut cursor = db
        .collection::<Subject>(SUBJECT_COLLECTION_NAME)
        .find(doc! { "_id": { "$in": id_strings } }, None)
        .await
        .map_err(Problem::from)?;

    let mut subjects = HashMap::new();
    while let Some(result) = cursor.next().await {
        if let Ok(subject) = result {
            subjects.insert(subject.id, subject);
        }
    }
    Ok(subjects)
}
