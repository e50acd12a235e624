use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::data::class::db::ClassDbExt;
use crate::data::subject::db::{problem as subject_problem, SubjectDbExt};
use crate::data::subject::Subject;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;
use crate::route::require_admin;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectData {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectClassData {
    pub class_id: Uuid,
}

#[get("/")]
#[tracing::instrument(skip(db))]
pub async fn subject_list(
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<Subject>>, Problem> {
    Ok(Json(db.list_subjects().await?))
}

#[post("/", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn subject_create(
    create: Json<CreateSubjectData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Subject>, Problem> {
    require_admin(&auth)?;

    let create = create.into_inner();
    let subject = Subject::new(create.name, create.code);
    db.create_subject(&subject).await?;

    Ok(Json(subject))
}

#[delete("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn subject_delete(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    require_admin(&auth)?;

    match db.delete_subject(id).await? {
        Some(subject) => Ok(Json(subject.id.to_string())),
        None => Err(subject_problem::not_found(id)),
    }
}

#[post("/<id>/classes", data = "<body>")]
#[tracing::instrument(skip(db))]
pub async fn subject_add_class(
    id: Uuid,
    body: Json<SubjectClassData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Subject>, Problem> {
    require_admin(&auth)?;

    let mut subject = db.require_subject(id).await?;
    db.require_class(body.class_id).await?;

    if subject.add_class(body.class_id) {
        db.save_subject(&subject).await?;
    }

    Ok(Json(subject))
}

#[delete("/<id>/classes/<class_id>")]
#[tracing::instrument(skip(db))]
pub async fn subject_remove_class(
    id: Uuid,
    class_id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Subject>, Problem> {
    require_admin(&auth)?;

    let mut subject = db.require_subject(id).await?;
    if subject.remove_class(class_id) {
        db.save_subject(&subject).await?;
    }

    Ok(Json(subject))
}
