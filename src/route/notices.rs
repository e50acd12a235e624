use chrono::Utc;
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::data::notice::{Notice, NoticeDbExt};
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;
use crate::role::Role;
use crate::route::require_admin;
use crate::scope;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoticeData {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub target_audience: Vec<Role>,
    #[serde(default)]
    pub target_classes: Vec<Uuid>,
    #[serde(default)]
    pub attachment_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoticeData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub target_audience: Option<Vec<Role>>,
    #[serde(default)]
    pub target_classes: Option<Vec<Uuid>>,
    #[serde(default)]
    pub attachment_url: Option<String>,
}

#[get("/")]
#[tracing::instrument(skip(db))]
pub async fn notice_list(
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<Notice>>, Problem> {
    let scope = scope::notice_filter(auth.role);
    Ok(Json(db.list_notices(scope).await?))
}

#[post("/", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn notice_create(
    create: Json<CreateNoticeData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Notice>, Problem> {
    require_admin(&auth)?;

    let create = create.into_inner();
    let notice = Notice {
        id: Uuid::new_v4(),
        title: create.title,
        content: create.content,
        date: Utc::now(),
        author: auth.user,
        target_audience: create.target_audience,
        target_classes: create.target_classes,
        attachment_url: create.attachment_url,
        created: Utc::now(),
    };
    db.create_notice(&notice).await?;

    Ok(Json(notice))
}

#[put("/<id>", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn notice_update(
    id: Uuid,
    update: Json<UpdateNoticeData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Notice>, Problem> {
    require_admin(&auth)?;

    let mut notice = db.require_notice(id).await?;
    let update = update.into_inner();

    if let Some(title) = update.title {
        notice.title = title;
    }
    if let Some(content) = update.content {
        notice.content = content;
    }
    if let Some(target_audience) = update.target_audience {
        notice.target_audience = target_audience;
    }
    if let Some(target_classes) = update.target_classes {
        notice.target_classes = target_classes;
    }
    if let Some(attachment_url) = update.attachment_url {
        notice.attachment_url = Some(attachment_url);
    }
    db.save_notice(&notice).await?;

    Ok(Json(notice))
}

#[delete("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn notice_delete(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    require_admin(&auth)?;

    db.require_notice(id).await?;
    db.delete_notice(id).await?;
    Ok(Json(id.to_string()))
}
