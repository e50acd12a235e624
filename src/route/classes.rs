use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::data::class::db::{ClassDbExt, ClassView};
use crate::data::class::Class;
use crate::data::sync::RelationshipSyncExt;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;
use crate::route::require_admin;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassData {
    pub name: String,
    pub grade: String,
    pub section: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStaffData {
    /// `None` clears the class-teacher.
    pub staff_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStaffData {
    pub subject_id: Uuid,
    pub staff_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSubjectData {
    pub subject_id: Uuid,
}

#[get("/?<staff>")]
#[tracing::instrument(skip(db))]
pub async fn class_list(
    staff: Option<Uuid>,
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<Class>>, Problem> {
    Ok(Json(db.list_classes(staff).await?))
}

#[get("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn class_get(
    id: Uuid,
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ClassView>, Problem> {
    let class = db.require_class(id).await?;
    Ok(Json(db.populate_class(&class).await?))
}

#[post("/", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn class_create(
    create: Json<CreateClassData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ClassView>, Problem> {
    require_admin(&auth)?;

    let create = create.into_inner();
    let class = Class::new(create.name, create.grade, create.section);
    db.create_class(&class).await?;

    Ok(Json(db.populate_class(&class).await?))
}

#[delete("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn class_delete(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    require_admin(&auth)?;

    let removed = db.delete_class(id).await?;
    match removed {
        Some(class) => Ok(Json(class.id.to_string())),
        None => Err(crate::data::class::db::problem::not_found(id)),
    }
}

#[post("/<id>/assign-class-staff", data = "<body>")]
#[tracing::instrument(skip(db))]
pub async fn class_assign_class_staff(
    id: Uuid,
    body: Json<ClassStaffData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ClassView>, Problem> {
    require_admin(&auth)?;

    let class = match body.staff_id {
        Some(staff) => db.assign_class_teacher(id, staff).await?,
        None => db.unassign_class_teacher(id).await?,
    };

    Ok(Json(db.populate_class(&class).await?))
}

#[post("/<id>/assign-subject-staff", data = "<body>")]
#[tracing::instrument(skip(db))]
pub async fn class_assign_subject_staff(
    id: Uuid,
    body: Json<SubjectStaffData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ClassView>, Problem> {
    require_admin(&auth)?;

    let class = db
        .assign_subject_teacher(id, body.subject_id, body.staff_id)
        .await?;

    Ok(Json(db.populate_class(&class).await?))
}

#[delete("/<id>/subject-staff/<subject_id>")]
#[tracing::instrument(skip(db))]
pub async fn class_remove_subject_staff(
    id: Uuid,
    subject_id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ClassView>, Problem> {
    require_admin(&auth)?;

    let class = db.remove_subject_teacher(id, subject_id).await?;
    Ok(Json(db.populate_class(&class).await?))
}

#[post("/<id>/subjects", data = "<body>")]
#[tracing::instrument(skip(db))]
pub async fn class_add_subject(
    id: Uuid,
    body: Json<ClassSubjectData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ClassView>, Problem> {
    require_admin(&auth)?;

    let class = db.add_subject_to_class(id, body.subject_id).await?;
    Ok(Json(db.populate_class(&class).await?))
}

#[delete("/<id>/subjects/<subject_id>")]
#[tracing::instrument(skip(db))]
pub async fn class_remove_subject(
    id: Uuid,
    subject_id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ClassView>, Problem> {
    require_admin(&auth)?;

    let class = db.remove_subject_from_class(id, subject_id).await?;
    Ok(Json(db.populate_class(&class).await?))
}
