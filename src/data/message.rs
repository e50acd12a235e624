use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::filter;
use crate::resp::problem::{problems, Problem};

pub static MESSAGE_COLLECTION_NAME: &str = "messages";

/// Class chat history is served oldest-first, capped server-side.
pub const MESSAGE_HISTORY_CAP: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub option: String,
    #[serde(default)]
    pub votes: Vec<Uuid>,
}

/// A class-scoped chat message, optionally carrying a poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub class: Uuid,
    pub sender: Uuid,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub is_poll: bool,
    #[serde(default)]
    pub poll_question: Option<String>,
    #[serde(default)]
    pub poll_options: Vec<PollOption>,
    #[serde(default)]
    pub read_by: Vec<Uuid>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Message {
    pub fn new_text(class: Uuid, sender: Uuid, content: impl Into<String>) -> Message {
        Message {
            id: Uuid::new_v4(),
            class,
            sender,
            content: Some(content.into()),
            attachment_url: None,
            is_poll: false,
            poll_question: None,
            poll_options: vec![],
            // Senders have read their own message.
            read_by: vec![sender],
            created: Utc::now(),
        }
    }

    pub fn new_poll(
        class: Uuid,
        sender: Uuid,
        question: impl Into<String>,
        options: Vec<String>,
    ) -> Message {
        Message {
            id: Uuid::new_v4(),
            class,
            sender,
            content: None,
            attachment_url: None,
            is_poll: true,
            poll_question: Some(question.into()),
            poll_options: options
                .into_iter()
                .map(|option| PollOption {
                    option,
                    votes: vec![],
                })
                .collect(),
            read_by: vec![sender],
            created: Utc::now(),
        }
    }

    /// Records a vote for `option`. A revote moves the voter's existing vote.
    pub fn record_vote(&mut self, voter: Uuid, option: usize) -> Result<(), Problem> {
        if !self.is_poll {
            return Err(problems::validation("Message is not a poll."));
        }
        if option >= self.poll_options.len() {
            return Err(problems::validation("Poll option index out of range."));
        }

        for entry in &mut self.poll_options {
            entry.votes.retain(|v| *v != voter);
        }
        self.poll_options[option].votes.push(voter);

        Ok(())
    }
}

#[allow(async_fn_in_trait)]
pub trait MessageDbExt {
    async fn create_message(&self, message: &Message) -> Result<(), Problem>;

    async fn require_message(&self, id: Uuid) -> Result<Message, Problem>;

    /// Oldest first, capped at [`MESSAGE_HISTORY_CAP`].
    async fn list_class_messages(&self, class: Uuid) -> Result<Vec<Message>, Problem>;

    async fn mark_message_read(&self, id: Uuid, reader: Uuid) -> Result<(), Problem>;

    async fn save_message(&self, message: &Message) -> Result<(), Problem>;

    async fn count_unread_messages(&self, class: Uuid, caller: Uuid) -> Result<u64, Problem>;

    async fn delete_message(&self, id: Uuid) -> Result<Option<Message>, Problem>;
}

fn unread_filter(class: Uuid, caller: Uuid) -> Document {
    doc! {
        "class": class.to_string(),
        "readBy": { "$ne": caller.to_string() },
    }
}

impl MessageDbExt for Database {
    async fn create_message(&self, message: &Message) -> Result<(), Problem> {
        self.collection::<Message>(MESSAGE_COLLECTION_NAME)
            .insert_one(message, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn require_message(&self, id: Uuid) -> Result<Message, Problem> {
        self.collection::<Message>(MESSAGE_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)?
            .ok_or_else(|| problems::not_found("Message", id))
    }

    async fn list_class_messages(&self, class: Uuid) -> Result<Vec<Message>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "created": 1 })
            .limit(MESSAGE_HISTORY_CAP)
            .build();

        let mut cursor = self
            .collection::<Message>(MESSAGE_COLLECTION_NAME)
            .find(doc! { "class": class.to_string() }, options)
            .await
            .map_err(Problem::from)?;

        let mut messages = vec![];
        while let Some(result) = cursor.next().await {
            match result {
                Ok(message) => messages.push(message),
                Err(_) => tracing::warn!("unable to deserialize Message document"),
            }
        }

        Ok(messages)
    }

    async fn mark_message_read(&self, id: Uuid, reader: Uuid) -> Result<(), Problem> {
        let result = self
            .collection::<Message>(MESSAGE_COLLECTION_NAME)
            .update_one(
                filter::by_id(id),
                doc! { "$addToSet": { "readBy": reader.to_string() } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        if result.matched_count == 0 {
            return Err(problems::not_found("Message", id));
        }
        Ok(())
    }

    async fn save_message(&self, message: &Message) -> Result<(), Problem> {
        self.collection::<Message>(MESSAGE_COLLECTION_NAME)
            .replace_one(filter::by_id(message.id), message, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn count_unread_messages(&self, class: Uuid, caller: Uuid) -> Result<u64, Problem> {
        self.collection::<Message>(MESSAGE_COLLECTION_NAME)
            .count_documents(unread_filter(class, caller), None)
            .await
            .map_err(Problem::from)
    }

    async fn delete_message(&self, id: Uuid) -> Result<Option<Message>, Problem> {
        self.collection::<Message>(MESSAGE_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revote_moves_the_vote() {
        let mut poll = Message::new_poll(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Trip destination?",
            vec!["Museum".into(), "Planetarium".into()],
        );
        let voter = Uuid::new_v4();

        poll.record_vote(voter, 0).unwrap();
        assert_eq!(poll.poll_options[0].votes, vec![voter]);

        poll.record_vote(voter, 1).unwrap();
        assert!(poll.poll_options[0].votes.is_empty());
        assert_eq!(poll.poll_options[1].votes, vec![voter]);
    }

    #[test]
    fn vote_rejects_bad_index_and_non_polls() {
        let mut poll = Message::new_poll(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Q?",
            vec!["A".into()],
        );
        assert_eq!(
            poll.record_vote(Uuid::new_v4(), 1).unwrap_err().status.code,
            400
        );

        let mut text = Message::new_text(Uuid::new_v4(), Uuid::new_v4(), "hello");
        assert_eq!(
            text.record_vote(Uuid::new_v4(), 0).unwrap_err().status.code,
            400
        );
    }

    #[test]
    fn sender_starts_in_read_by() {
        let sender = Uuid::new_v4();
        let message = Message::new_text(Uuid::new_v4(), sender, "hi");
        assert_eq!(message.read_by, vec![sender]);
    }
}
