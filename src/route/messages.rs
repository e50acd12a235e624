use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::class::db::ClassDbExt;
use crate::data::message::{Message, MessageDbExt};
use crate::data::user::db::UserDbExt;
use crate::data::user::User;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::{problems, Problem};
use crate::scope;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageData {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub is_poll: bool,
    #[serde(default)]
    pub poll_question: Option<String>,
    #[serde(default)]
    pub poll_options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteData {
    pub option: usize,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: u64,
}

async fn require_member(
    db: &Database,
    auth: &UserRoleToken,
    class: Uuid,
) -> Result<User, Problem> {
    let caller = db.require_user(auth.user).await?;
    scope::check_class_message_access(&caller, class)?;
    Ok(caller)
}

#[get("/class/<class_id>")]
#[tracing::instrument(skip(db))]
pub async fn message_list(
    class_id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<Message>>, Problem> {
    db.require_class(class_id).await?;
    require_member(db, &auth, class_id).await?;

    Ok(Json(db.list_class_messages(class_id).await?))
}

#[post("/class/<class_id>", data = "<send>")]
#[tracing::instrument(skip(db))]
pub async fn message_send(
    class_id: Uuid,
    send: Json<SendMessageData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Message>, Problem> {
    db.require_class(class_id).await?;
    require_member(db, &auth, class_id).await?;

    let send = send.into_inner();
    let mut message = match (send.is_poll, send.content) {
        (true, None) => {
            let question = send
                .poll_question
                .filter(|q| !q.trim().is_empty())
                .ok_or_else(|| problems::validation("Polls need a question."))?;
            if send.poll_options.len() < 2 {
                return Err(problems::validation("Polls need at least two options."));
            }
            Message::new_poll(class_id, auth.user, question, send.poll_options)
        }
        (false, Some(content)) if !content.trim().is_empty() => {
            Message::new_text(class_id, auth.user, content)
        }
        // A message is either text or a poll, never both or neither.
        _ => {
            return Err(problems::validation(
                "Message must carry either content or a poll.",
            ))
        }
    };
    message.attachment_url = send.attachment_url;

    db.create_message(&message).await?;
    Ok(Json(message))
}

#[put("/<id>/read")]
#[tracing::instrument(skip(db))]
pub async fn message_mark_read(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    let message = db.require_message(id).await?;
    require_member(db, &auth, message.class).await?;

    db.mark_message_read(id, auth.user).await?;
    Ok(Json(id.to_string()))
}

#[put("/<id>/vote", data = "<vote>")]
#[tracing::instrument(skip(db))]
pub async fn message_vote(
    id: Uuid,
    vote: Json<VoteData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Message>, Problem> {
    let mut message = db.require_message(id).await?;
    require_member(db, &auth, message.class).await?;

    message.record_vote(auth.user, vote.option)?;
    db.save_message(&message).await?;

    Ok(Json(message))
}

#[get("/unread-count")]
#[tracing::instrument(skip(db))]
pub async fn message_unread_count(
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<UnreadCount>, Problem> {
    let caller = db.require_user(auth.user).await?;

    let count = match scope::own_class(&caller) {
        Some(class) => db.count_unread_messages(class, auth.user).await?,
        None => 0,
    };

    Ok(Json(UnreadCount { count }))
}

#[delete("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn message_delete(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    let message = db.require_message(id).await?;

    let is_class_staff = db
        .get_class(message.class)
        .await?
        .is_some_and(|class| class.class_staff == Some(auth.user));

    if message.sender != auth.user && !is_class_staff {
        return Err(problems::forbidden(
            "Messages can only be removed by their sender or the class staff.",
        ));
    }

    db.delete_message(id).await?;
    Ok(Json(id.to_string()))
}
