use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::announcement::{Announcement, AnnouncementDbExt};
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::{problems, Problem};
use crate::scope::{self, Audience};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementData {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub target_audience: Option<Audience>,
    #[serde(default)]
    pub attachment_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: u64,
}

#[get("/")]
#[tracing::instrument(skip(db))]
pub async fn announcement_list(
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<Announcement>>, Problem> {
    let scope = scope::announcement_filter(auth.role)?;
    Ok(Json(db.list_announcements(scope).await?))
}

#[post("/", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn announcement_create(
    create: Json<CreateAnnouncementData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Announcement>, Problem> {
    if !auth.role.can_announce() {
        return Err(problems::forbidden(
            "Only staff and administrators can announce.",
        ));
    }

    let create = create.into_inner();
    if create.title.trim().is_empty() || create.content.trim().is_empty() {
        return Err(problems::validation("Title and content are required."));
    }

    let mut announcement = Announcement::new(
        auth.user,
        create.title,
        create.content,
        create.target_audience.unwrap_or(Audience::All),
    );
    announcement.attachment_url = create.attachment_url;

    db.create_announcement(&announcement).await?;
    Ok(Json(announcement))
}

#[put("/<id>/read")]
#[tracing::instrument(skip(db))]
pub async fn announcement_mark_read(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    db.mark_announcement_read(id, auth.user).await?;
    Ok(Json(id.to_string()))
}

#[delete("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn announcement_delete(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    let announcement = db.require_announcement(id).await?;

    if !auth.role.is_admin() && announcement.sender != auth.user {
        return Err(problems::forbidden(
            "Announcements can only be removed by their sender or an administrator.",
        ));
    }

    db.delete_announcement(id).await?;
    Ok(Json(id.to_string()))
}

#[get("/unread/count")]
#[tracing::instrument(skip(db))]
pub async fn announcement_unread_count(
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<UnreadCount>, Problem> {
    let scope = scope::announcement_unread_filter(auth.role, auth.user)?;
    let count = db.count_unread_announcements(scope).await?;
    Ok(Json(UnreadCount { count }))
}
