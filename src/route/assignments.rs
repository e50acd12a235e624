use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::class::db::{ClassDbExt, ClassView};
use crate::data::sync::RelationshipSyncExt;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;
use crate::route::require_admin;

/// One teaching relationship, flattened out of the class documents.
/// `subject = None` marks a class-teacher entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub class: Uuid,
    pub class_name: String,
    pub subject: Option<Uuid>,
    pub staff: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAssignmentData {
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub staff_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectUnassignmentData {
    pub class_id: Uuid,
    pub subject_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStaffAssignmentData {
    pub class_id: Uuid,
    /// `None` clears the class-teacher.
    pub staff_id: Option<Uuid>,
}

#[get("/")]
#[tracing::instrument(skip(db))]
pub async fn assignment_list(
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<AssignmentView>>, Problem> {
    let classes = db.list_classes(None).await?;

    let mut assignments = vec![];
    for class in classes {
        if let Some(staff) = class.class_staff {
            assignments.push(AssignmentView {
                class: class.id,
                class_name: class.name.clone(),
                subject: None,
                staff,
            });
        }
        for entry in &class.subject_staffs {
            assignments.push(AssignmentView {
                class: class.id,
                class_name: class.name.clone(),
                subject: Some(entry.subject),
                staff: entry.staff,
            });
        }
    }

    Ok(Json(assignments))
}

#[post("/subject", data = "<body>")]
#[tracing::instrument(skip(db))]
pub async fn assign_subject(
    body: Json<SubjectAssignmentData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ClassView>, Problem> {
    require_admin(&auth)?;

    let class = db
        .assign_subject_teacher(body.class_id, body.subject_id, body.staff_id)
        .await?;

    Ok(Json(db.populate_class(&class).await?))
}

#[delete("/subject", data = "<body>")]
#[tracing::instrument(skip(db))]
pub async fn unassign_subject(
    body: Json<SubjectUnassignmentData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ClassView>, Problem> {
    require_admin(&auth)?;

    let class = db
        .remove_subject_teacher(body.class_id, body.subject_id)
        .await?;

    Ok(Json(db.populate_class(&class).await?))
}

#[post("/class-staff", data = "<body>")]
#[tracing::instrument(skip(db))]
pub async fn assign_class_staff(
    body: Json<ClassStaffAssignmentData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ClassView>, Problem> {
    require_admin(&auth)?;

    let class = match body.staff_id {
        Some(staff) => db.assign_class_teacher(body.class_id, staff).await?,
        None => db.unassign_class_teacher(body.class_id).await?,
    };

    Ok(Json(db.populate_class(&class).await?))
}
