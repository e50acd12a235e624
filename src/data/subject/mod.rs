use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod db;

pub static SUBJECT_COLLECTION_NAME: &str = "subjects";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    /// Unique short code, e.g. "MATH10".
    pub code: String,
    /// Informational class back-references; scheduling truth lives on the
    /// class documents.
    #[serde(default)]
    pub classes: Vec<Uuid>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Subject {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Subject {
        Subject {
            id: Uuid::new_v4(),
            name: name.into(),
            code: code.into(),
            classes: vec![],
            created: Utc::now(),
        }
    }

    pub fn add_class(&mut self, class: Uuid) -> bool {
        if self.classes.contains(&class) {
            return false;
        }
        self.classes.push(class);
        true
    }

    pub fn remove_class(&mut self, class: Uuid) -> bool {
        let before = self.classes.len();
        self.classes.retain(|c| *c != class);
        self.classes.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_back_references_are_a_set() {
        let mut subject = Subject::new("Mathematics", "MATH10");
        let class = Uuid::new_v4();

        assert!(subject.add_class(class));
        assert!(!subject.add_class(class));
        assert!(subject.remove_class(class));
        assert!(!subject.remove_class(class));
    }
}
