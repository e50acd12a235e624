use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::data::sync::RelationshipSyncExt;
use crate::data::user::db::{problem as user_problem, UserDbExt};
use crate::data::user::{Gender, PublicUser, User};
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;
use crate::role::Role;
use crate::route::require_admin;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentData {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub register_number: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub student_class: Option<Uuid>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// Relationship fields are double-optional: absent means "leave alone",
/// `null` means "clear".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "crate::util::double_option::deserialize")]
    pub student_class: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "crate::util::double_option::deserialize")]
    pub parent_id: Option<Option<Uuid>>,
}

/// Query keys match the mobile client's camelCase spelling.
#[derive(Debug, FromForm)]
pub struct StudentListQuery {
    #[field(name = "classId")]
    pub class_id: Option<Uuid>,
}

#[get("/?<query..>")]
#[tracing::instrument(skip(db))]
pub async fn student_list(
    query: StudentListQuery,
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<PublicUser>>, Problem> {
    let students = db.list_users_by_role(Role::Student).await?;

    let students = students
        .into_iter()
        .filter(|user| match query.class_id {
            Some(class) => user
                .student_data()
                .is_some_and(|data| data.student_class == Some(class)),
            None => true,
        })
        .map(PublicUser)
        .collect();

    Ok(Json(students))
}

#[get("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn student_get(
    id: Uuid,
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<PublicUser>, Problem> {
    let student = db.require_role(id, Role::Student).await?;
    Ok(Json(PublicUser(student)))
}

#[post("/", data = "<create>")]
#[tracing::instrument(skip(create, db))]
pub async fn student_create(
    create: Json<CreateStudentData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<PublicUser>, Problem> {
    require_admin(&auth)?;

    let create = create.into_inner();
    let mut student = User::new(&create.email, &create.name, &create.password, Role::Student);
    student.register_number = create.register_number;
    student.phone = create.phone;
    student.address = create.address;
    student.date_of_birth = create.date_of_birth;
    student.gender = create.gender;

    db.create_user(&student).await?;

    if create.student_class.is_some() {
        student = db.transfer_student(student.id, create.student_class).await?;
    }
    if create.parent_id.is_some() {
        student = db.link_parent(student.id, create.parent_id).await?;
    }

    Ok(Json(PublicUser(student)))
}

#[put("/<id>", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn student_update(
    id: Uuid,
    update: Json<UpdateStudentData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<PublicUser>, Problem> {
    require_admin(&auth)?;

    let mut student = db.require_role(id, Role::Student).await?;
    let update = update.into_inner();

    if let Some(name) = update.name {
        student.name = name;
    }
    if let Some(phone) = update.phone {
        student.phone = Some(phone);
    }
    if let Some(address) = update.address {
        student.address = Some(address);
    }
    if let Some(date_of_birth) = update.date_of_birth {
        student.date_of_birth = Some(date_of_birth);
    }
    if let Some(gender) = update.gender {
        student.gender = Some(gender);
    }
    db.save_user(&student).await?;

    // Relationship fields are never written directly; diffs go through the
    // synchronizer.
    if let Some(class) = update.student_class {
        student = db.transfer_student(id, class).await?;
    }
    if let Some(parent) = update.parent_id {
        student = db.link_parent(id, parent).await?;
    }

    Ok(Json(PublicUser(student)))
}

#[delete("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn student_delete(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    require_admin(&auth)?;

    db.require_role(id, Role::Student).await?;
    match db.delete_user(id).await? {
        Some(removed) => Ok(Json(removed.id.to_string())),
        None => Err(user_problem::not_found(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_reads_student_class() {
        let class = Uuid::new_v4();
        let create: CreateStudentData = serde_json::from_value(serde_json::json!({
            "name": "Asha",
            "email": "asha@example.com",
            "password": "password123",
            "studentClass": class.to_string(),
        }))
        .expect("valid create payload");

        assert_eq!(create.student_class, Some(class));
    }

    #[test]
    fn update_payload_reads_student_class() {
        let class = Uuid::new_v4();
        let update: UpdateStudentData = serde_json::from_value(serde_json::json!({
            "studentClass": class.to_string(),
        }))
        .expect("valid update payload");

        assert_eq!(update.student_class, Some(Some(class)));
    }

    #[test]
    fn update_payload_distinguishes_null_from_absent() {
        let cleared: UpdateStudentData =
            serde_json::from_value(serde_json::json!({ "studentClass": null }))
                .expect("explicit null");
        assert_eq!(cleared.student_class, Some(None));

        let untouched: UpdateStudentData =
            serde_json::from_value(serde_json::json!({})).expect("empty payload");
        assert_eq!(untouched.student_class, None);
    }
}
