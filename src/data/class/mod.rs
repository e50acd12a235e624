use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod db;

pub static CLASS_COLLECTION_NAME: &str = "classes";

/// One `subjectstaffs` entry: `staff` teaches `subject` in this class.
/// At most one entry exists per subject.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubjectStaff {
    pub subject: Uuid,
    pub staff: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub grade: String,
    pub section: String,

    /// Class-teacher pointer; mirrored by the staff's `staffClass`.
    #[serde(rename = "classstaff", default, skip_serializing_if = "Option::is_none")]
    pub class_staff: Option<Uuid>,
    #[serde(default)]
    pub subjects: Vec<Uuid>,
    #[serde(rename = "subjectstaffs", default)]
    pub subject_staffs: Vec<SubjectStaff>,
    #[serde(default)]
    pub students: Vec<Uuid>,

    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Class {
    pub fn new(
        name: impl Into<String>,
        grade: impl Into<String>,
        section: impl Into<String>,
    ) -> Class {
        Class {
            id: Uuid::new_v4(),
            name: name.into(),
            grade: grade.into(),
            section: section.into(),
            class_staff: None,
            subjects: vec![],
            subject_staffs: vec![],
            students: vec![],
            created: Utc::now(),
        }
    }

    /// Overwrites (last-write-wins) or appends the subject-staff entry for
    /// `subject`. Returns the staff previously assigned to that subject, if
    /// any.
    pub fn set_subject_staff(&mut self, subject: Uuid, staff: Uuid) -> Option<Uuid> {
        match self.subject_staffs.iter_mut().find(|e| e.subject == subject) {
            Some(entry) => {
                let previous = entry.staff;
                entry.staff = staff;
                Some(previous)
            }
            None => {
                self.subject_staffs.push(SubjectStaff { subject, staff });
                None
            }
        }
    }

    /// Deletes the subject-staff entry for `subject`, returning the staff
    /// that was assigned.
    pub fn remove_subject_staff(&mut self, subject: Uuid) -> Option<Uuid> {
        let removed = self
            .subject_staffs
            .iter()
            .find(|e| e.subject == subject)
            .map(|e| e.staff);
        self.subject_staffs.retain(|e| e.subject != subject);
        removed
    }

    pub fn subject_staff(&self, subject: Uuid) -> Option<Uuid> {
        self.subject_staffs
            .iter()
            .find(|e| e.subject == subject)
            .map(|e| e.staff)
    }

    /// Set-insert into `subjects`. Returns false if already present.
    pub fn add_subject(&mut self, subject: Uuid) -> bool {
        if self.subjects.contains(&subject) {
            return false;
        }
        self.subjects.push(subject);
        true
    }

    /// Removes `subject` from the subject list and drops any subject-staff
    /// entry for it. Returns the staff that taught the removed subject.
    pub fn remove_subject(&mut self, subject: Uuid) -> Option<Uuid> {
        self.subjects.retain(|s| *s != subject);
        self.remove_subject_staff(subject)
    }

    pub fn add_student(&mut self, student: Uuid) -> bool {
        if self.students.contains(&student) {
            return false;
        }
        self.students.push(student);
        true
    }

    pub fn remove_student(&mut self, student: Uuid) -> bool {
        let before = self.students.len();
        self.students.retain(|s| *s != student);
        self.students.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_staff_overwrite_returns_displaced_staff() {
        let mut class = Class::new("Class 10 A", "10", "A");
        let subject = Uuid::new_v4();
        let staff_a = Uuid::new_v4();
        let staff_b = Uuid::new_v4();

        assert_eq!(class.set_subject_staff(subject, staff_a), None);
        assert_eq!(class.set_subject_staff(subject, staff_b), Some(staff_a));
        assert_eq!(class.subject_staffs.len(), 1);
        assert_eq!(class.subject_staff(subject), Some(staff_b));
    }

    #[test]
    fn subject_staff_reassignment_is_idempotent() {
        let mut class = Class::new("Class 10 A", "10", "A");
        let subject = Uuid::new_v4();
        let staff = Uuid::new_v4();

        class.set_subject_staff(subject, staff);
        let displaced = class.set_subject_staff(subject, staff);

        assert_eq!(displaced, Some(staff));
        assert_eq!(class.subject_staffs.len(), 1);
        assert_eq!(class.subject_staff(subject), Some(staff));
    }

    #[test]
    fn removing_subject_drops_its_staff_entry() {
        let mut class = Class::new("Class 9 B", "9", "B");
        let subject = Uuid::new_v4();
        let staff = Uuid::new_v4();

        class.add_subject(subject);
        class.set_subject_staff(subject, staff);

        assert_eq!(class.remove_subject(subject), Some(staff));
        assert!(class.subjects.is_empty());
        assert!(class.subject_staffs.is_empty());
    }

    #[test]
    fn subjects_and_students_are_sets() {
        let mut class = Class::new("Class 8 C", "8", "C");
        let subject = Uuid::new_v4();
        let student = Uuid::new_v4();

        assert!(class.add_subject(subject));
        assert!(!class.add_subject(subject));
        assert!(class.add_student(student));
        assert!(!class.add_student(student));
        assert!(class.remove_student(student));
        assert!(!class.remove_student(student));
    }

    #[test]
    fn wire_field_names_match_the_stored_schema() {
        let mut class = Class::new("Class 10 A", "10", "A");
        class.class_staff = Some(Uuid::new_v4());
        class.set_subject_staff(Uuid::new_v4(), Uuid::new_v4());

        let json = serde_json::to_value(&class).expect("serializable");
        assert!(json.get("classstaff").is_some());
        assert!(json.get("subjectstaffs").is_some());
        assert!(json.get("students").is_some());
    }
}
