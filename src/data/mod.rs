pub mod announcement;
pub mod attendance;
pub mod class;
pub mod exam;
pub mod fee;
pub mod homework;
pub mod message;
pub mod notice;
pub mod subject;
pub mod sync;
pub mod timetable;
pub mod user;

/// Shared BSON filter helpers. Ids are stored as their hyphenated string
/// form, so filters compare against `Uuid::to_string`.
pub mod filter {
    use bson::{doc, Document};
    use uuid::Uuid;

    #[inline]
    pub fn by_id(id: Uuid) -> Document {
        doc! { "_id": id.to_string() }
    }

    #[inline]
    pub fn by_email(email: impl AsRef<str>) -> Document {
        doc! { "email": email.as_ref() }
    }
}
