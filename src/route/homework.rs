use bson::Document;
use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::data::class::db::ClassDbExt;
use crate::data::homework::{Homework, HomeworkDbExt};
use crate::data::subject::db::SubjectDbExt;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHomeworkData {
    pub title: String,
    pub description: String,
    pub class: Uuid,
    pub subject: Uuid,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub attachment_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHomeworkData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachment_url: Option<String>,
}

fn require_assigner(auth: &UserRoleToken) -> Result<(), Problem> {
    match auth.role {
        Role::Admin | Role::Staff => Ok(()),
        _ => Err(problems::forbidden("Only staff can manage homework.")),
    }
}

/// Staff may only touch their own homework; admins may touch any.
fn check_ownership(auth: &UserRoleToken, homework: &Homework) -> Result<(), Problem> {
    if auth.role.is_admin() || homework.staff == auth.user {
        return Ok(());
    }
    Err(problems::forbidden(
        "Homework can only be changed by the staff member who assigned it.",
    ))
}

#[get("/?<class>&<subject>&<staff>")]
#[tracing::instrument(skip(db))]
pub async fn homework_list(
    class: Option<Uuid>,
    subject: Option<Uuid>,
    staff: Option<Uuid>,
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<Homework>>, Problem> {
    let mut query = Document::new();
    if let Some(class) = class {
        query.insert("class", class.to_string());
    }
    if let Some(subject) = subject {
        query.insert("subject", subject.to_string());
    }
    if let Some(staff) = staff {
        query.insert("staff", staff.to_string());
    }

    Ok(Json(db.list_homework(query).await?))
}

#[post("/", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn homework_create(
    create: Json<CreateHomeworkData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Homework>, Problem> {
    require_assigner(&auth)?;

    let create = create.into_inner();
    db.require_class(create.class).await?;
    db.require_subject(create.subject).await?;

    let homework = Homework {
        id: Uuid::new_v4(),
        title: create.title,
        description: create.description,
        class: create.class,
        subject: create.subject,
        staff: auth.user,
        due_date: create.due_date,
        attachment_url: create.attachment_url,
        created: Utc::now(),
    };
    db.create_homework(&homework).await?;

    Ok(Json(homework))
}

#[put("/<id>", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn homework_update(
    id: Uuid,
    update: Json<UpdateHomeworkData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Homework>, Problem> {
    require_assigner(&auth)?;

    let mut homework = db.require_homework(id).await?;
    check_ownership(&auth, &homework)?;

    let update = update.into_inner();
    if let Some(title) = update.title {
        homework.title = title;
    }
    if let Some(description) = update.description {
        homework.description = description;
    }
    if let Some(due_date) = update.due_date {
        homework.due_date = due_date;
    }
    if let Some(attachment_url) = update.attachment_url {
        homework.attachment_url = Some(attachment_url);
    }
    db.save_homework(&homework).await?;

    Ok(Json(homework))
}

#[delete("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn homework_delete(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    require_assigner(&auth)?;

    let homework = db.require_homework(id).await?;
    check_ownership(&auth, &homework)?;

    db.delete_homework(id).await?;
    Ok(Json(id.to_string()))
}
