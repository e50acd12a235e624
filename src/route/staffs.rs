use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::data::sync::RelationshipSyncExt;
use crate::data::user::db::{problem as user_problem, UserDbExt};
use crate::data::user::{PublicUser, User};
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;
use crate::role::Role;
use crate::route::require_admin;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffData {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Qualification subjects, assigned through the synchronizer.
    #[serde(default)]
    pub subjects: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStaffData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// When present, replaces the qualification set; the diff is applied
    /// through the synchronizer.
    #[serde(default)]
    pub subjects: Option<Vec<Uuid>>,
}

#[get("/")]
#[tracing::instrument(skip(db))]
pub async fn staff_list(
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<PublicUser>>, Problem> {
    let staffs = db.list_users_by_role(Role::Staff).await?;
    Ok(Json(staffs.into_iter().map(PublicUser).collect()))
}

#[get("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn staff_get(
    id: Uuid,
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<PublicUser>, Problem> {
    let staff = db.require_role(id, Role::Staff).await?;
    Ok(Json(PublicUser(staff)))
}

#[post("/", data = "<create>")]
#[tracing::instrument(skip(create, db))]
pub async fn staff_create(
    create: Json<CreateStaffData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<PublicUser>, Problem> {
    require_admin(&auth)?;

    let create = create.into_inner();
    let mut staff = User::new(&create.email, &create.name, &create.password, Role::Staff);
    staff.phone = create.phone;
    staff.address = create.address;

    db.create_user(&staff).await?;

    for subject in create.subjects {
        staff = db.assign_subject_to_staff(staff.id, subject).await?;
    }

    Ok(Json(PublicUser(staff)))
}

#[put("/<id>", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn staff_update(
    id: Uuid,
    update: Json<UpdateStaffData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<PublicUser>, Problem> {
    require_admin(&auth)?;

    let mut staff = db.require_role(id, Role::Staff).await?;
    let update = update.into_inner();

    if let Some(name) = update.name {
        staff.name = name;
    }
    if let Some(phone) = update.phone {
        staff.phone = Some(phone);
    }
    if let Some(address) = update.address {
        staff.address = Some(address);
    }
    db.save_user(&staff).await?;

    if let Some(subjects) = update.subjects {
        let current = staff
            .staff_data()
            .map(|data| data.staff_subjects.clone())
            .unwrap_or_default();

        for subject in current.iter().filter(|s| !subjects.contains(s)) {
            staff = db.remove_subject_from_staff(id, *subject).await?;
        }
        for subject in subjects.iter().filter(|s| !current.contains(s)) {
            staff = db.assign_subject_to_staff(id, *subject).await?;
        }
    }

    Ok(Json(PublicUser(staff)))
}

#[delete("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn staff_delete(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    require_admin(&auth)?;

    db.require_role(id, Role::Staff).await?;
    match db.delete_user(id).await? {
        Some(removed) => Ok(Json(removed.id.to_string())),
        None => Err(user_problem::not_found(id)),
    }
}
