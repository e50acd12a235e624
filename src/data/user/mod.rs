use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

pub mod db;

pub static USER_COLLECTION_NAME: &str = "users";

/// Argon2 PHC-string password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(password: impl AsRef<str>) -> PasswordHash {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_ref().as_bytes(), &salt)
            .expect("argon2 with default parameters must hash any password")
            .to_string();

        PasswordHash(hash)
    }

    pub fn verify(&self, password: impl AsRef<str>) -> bool {
        argon2::PasswordHash::new(&self.0)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_ref().as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// A teaching assignment mirror held on the staff side: this staff member
/// teaches `subject` in `class`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectClassAssignment {
    pub subject: Uuid,
    pub class: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffData {
    /// Subjects this staff member is qualified to teach, independent of any
    /// class assignment.
    #[serde(default)]
    pub staff_subjects: Vec<Uuid>,
    /// The class this staff member is class-teacher of, if any. Mirrors the
    /// class's `classstaff` pointer.
    #[serde(default)]
    pub staff_class: Option<Uuid>,
    /// Mirrors of every `subjectstaffs` entry naming this staff member.
    #[serde(default)]
    pub subject_class_assignments: Vec<SubjectClassAssignment>,
}

impl StaffData {
    /// Set-insert into `staffSubjects`. Returns false if already present.
    pub fn add_subject(&mut self, subject: Uuid) -> bool {
        if self.staff_subjects.contains(&subject) {
            return false;
        }
        self.staff_subjects.push(subject);
        true
    }

    pub fn remove_subject(&mut self, subject: Uuid) -> bool {
        let before = self.staff_subjects.len();
        self.staff_subjects.retain(|s| *s != subject);
        self.staff_subjects.len() != before
    }

    /// Set-insert of a (subject, class) pair. Returns false if the pair was
    /// already recorded.
    pub fn add_assignment(&mut self, subject: Uuid, class: Uuid) -> bool {
        let pair = SubjectClassAssignment { subject, class };
        if self.subject_class_assignments.contains(&pair) {
            return false;
        }
        self.subject_class_assignments.push(pair);
        true
    }

    pub fn remove_assignment(&mut self, subject: Uuid, class: Uuid) -> bool {
        let before = self.subject_class_assignments.len();
        self.subject_class_assignments
            .retain(|a| !(a.subject == subject && a.class == class));
        self.subject_class_assignments.len() != before
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentData {
    /// The class this student is enrolled in. Mirrors the class's `students`
    /// set.
    #[serde(default)]
    pub student_class: Option<Uuid>,
    /// Owning parent account. Mirrors the parent's `children` set.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentData {
    #[serde(default)]
    pub children: Vec<Uuid>,
}

/// Role-specific payload, internally tagged so a student document cannot
/// carry staff fields. Flattened into the user document: the tag is stored
/// as the `role` field alongside the common identity core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum RoleData {
    Admin,
    Staff(StaffData),
    Student(StudentData),
    Parent(ParentData),
}

impl RoleData {
    pub fn empty(role: Role) -> RoleData {
        match role {
            Role::Admin => RoleData::Admin,
            Role::Staff => RoleData::Staff(StaffData::default()),
            Role::Student => RoleData::Student(StudentData::default()),
            Role::Parent => RoleData::Parent(ParentData::default()),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            RoleData::Admin => Role::Admin,
            RoleData::Staff(_) => Role::Staff,
            RoleData::Student(_) => Role::Student,
            RoleData::Parent(_) => Role::Parent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub pw_hash: PasswordHash,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,

    #[serde(flatten)]
    pub role: RoleData,

    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        password: impl AsRef<str>,
        role: Role,
    ) -> User {
        let id = Uuid::new_v4();
        tracing::info!("creating a new {} user: {}", role, id);

        User {
            id,
            name: name.into(),
            email: email.into(),
            pw_hash: PasswordHash::new(password),
            phone: None,
            address: None,
            register_number: None,
            date_of_birth: None,
            gender: None,
            profile_picture: None,
            role: RoleData::empty(role),
            created: Utc::now(),
        }
    }

    pub fn staff_data(&self) -> Option<&StaffData> {
        match &self.role {
            RoleData::Staff(data) => Some(data),
            _ => None,
        }
    }

    pub fn staff_data_mut(&mut self) -> Option<&mut StaffData> {
        match &mut self.role {
            RoleData::Staff(data) => Some(data),
            _ => None,
        }
    }

    pub fn student_data(&self) -> Option<&StudentData> {
        match &self.role {
            RoleData::Student(data) => Some(data),
            _ => None,
        }
    }

    pub fn parent_data(&self) -> Option<&ParentData> {
        match &self.role {
            RoleData::Parent(data) => Some(data),
            _ => None,
        }
    }
}

/// Response wrapper that serializes a user without its password hash.
#[derive(Debug, Clone)]
pub struct PublicUser(pub User);

impl Serialize for PublicUser {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = serde_json::to_value(&self.0).map_err(serde::ser::Error::custom)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("pwHash");
        }
        value.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_matching_password() {
        let hash = PasswordHash::new("hunter2hunter2");
        assert!(hash.verify("hunter2hunter2"));
        assert!(!hash.verify("hunter3hunter3"));
    }

    #[test]
    fn role_payload_is_internally_tagged() {
        let user = User::new("s1@example.com", "S One", "password123", Role::Staff);
        let json = serde_json::to_value(&user).expect("serializable");

        assert_eq!(json["role"], "Staff");
        assert!(json["staffSubjects"].is_array());
        assert!(json.get("studentClass").is_none());
        assert!(json.get("children").is_none());
    }

    #[test]
    fn student_payload_round_trips_through_json() {
        let mut user = User::new("st@example.com", "St", "password123", Role::Student);
        let class = Uuid::new_v4();
        if let RoleData::Student(data) = &mut user.role {
            data.student_class = Some(class);
        }

        let json = serde_json::to_string(&user).expect("serializable");
        let back: User = serde_json::from_str(&json).expect("deserializable");

        assert_eq!(back.student_data().unwrap().student_class, Some(class));
        assert_eq!(back.role.role(), Role::Student);
    }

    #[test]
    fn staff_subject_set_semantics() {
        let mut data = StaffData::default();
        let subject = Uuid::new_v4();

        assert!(data.add_subject(subject));
        assert!(!data.add_subject(subject));
        assert_eq!(data.staff_subjects.len(), 1);

        assert!(data.remove_subject(subject));
        assert!(!data.remove_subject(subject));
        assert!(data.staff_subjects.is_empty());
    }

    #[test]
    fn public_user_hides_password_hash() {
        let user = User::new("p@example.com", "P", "password123", Role::Admin);
        let json = serde_json::to_value(PublicUser(user)).expect("serializable");

        assert!(json.get("pwHash").is_none());
        assert_eq!(json["email"], "p@example.com");
    }

    #[test]
    fn staff_assignment_pairs_are_a_set() {
        let mut data = StaffData::default();
        let subject = Uuid::new_v4();
        let class_a = Uuid::new_v4();
        let class_b = Uuid::new_v4();

        assert!(data.add_assignment(subject, class_a));
        assert!(!data.add_assignment(subject, class_a));
        assert!(data.add_assignment(subject, class_b));
        assert_eq!(data.subject_class_assignments.len(), 2);

        assert!(data.remove_assignment(subject, class_a));
        assert_eq!(data.subject_class_assignments.len(), 1);
        assert_eq!(data.subject_class_assignments[0].class, class_b);
    }
}
