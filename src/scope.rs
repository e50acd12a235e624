//! Per-role query narrowing applied before the entity store is consulted.
//!
//! Scoping decides *which* records a caller may see; it never widens a
//! query. Handlers apply these filters verbatim so the narrowing rules stay
//! in one place.

use bson::{doc, Document};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::user::{RoleData, User};
use crate::resp::problem::{problems, Problem};
use crate::role::Role;

/// Announcement audience selector.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Audience {
    Staff,
    Students,
    All,
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Audience::Staff => write!(f, "Staff"),
            Audience::Students => write!(f, "Students"),
            Audience::All => write!(f, "All"),
        }
    }
}

/// Narrows an announcement query to the caller's audience. Staff see
/// staff-targeted and general announcements, students see student-targeted
/// and general ones, admins see everything. Parents have no announcement
/// feed.
pub fn announcement_filter(role: Role) -> Result<Document, Problem> {
    match role {
        Role::Admin => Ok(doc! {}),
        Role::Staff => Ok(doc! {
            "targetAudience": { "$in": [Audience::Staff.to_string(), Audience::All.to_string()] }
        }),
        Role::Student => Ok(doc! {
            "targetAudience": { "$in": [Audience::Students.to_string(), Audience::All.to_string()] }
        }),
        Role::Parent => Err(problems::forbidden("Access denied.")),
    }
}

/// Audience rule plus "caller hasn't read it yet".
pub fn announcement_unread_filter(role: Role, caller: Uuid) -> Result<Document, Problem> {
    let mut filter = announcement_filter(role)?;
    filter.insert("readBy", doc! { "$ne": caller.to_string() });
    Ok(filter)
}

/// Notices carry an audience list; non-admins see notices naming their role
/// or targeting nobody in particular.
pub fn notice_filter(role: Role) -> Document {
    match role {
        Role::Admin => doc! {},
        other => doc! {
            "$or": [
                { "targetAudience": other.to_string() },
                { "targetAudience": { "$size": 0 } },
            ]
        },
    }
}

/// The class a caller belongs to for messaging purposes: the class they
/// teach (staff) or attend (student).
pub fn own_class(caller: &User) -> Option<Uuid> {
    match &caller.role {
        RoleData::Staff(data) => data.staff_class,
        RoleData::Student(data) => data.student_class,
        _ => None,
    }
}

/// Class-scoped messages are visible only to the class's staff and its
/// students.
pub fn check_class_message_access(caller: &User, class: Uuid) -> Result<(), Problem> {
    if own_class(caller) == Some(class) {
        return Ok(());
    }
    Err(problems::forbidden("Access denied to this class."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::user::{StaffData, StudentData};

    fn staff_of(class: Option<Uuid>) -> User {
        let mut user = User::new("t@example.com", "T", "password123", Role::Staff);
        user.role = RoleData::Staff(StaffData {
            staff_class: class,
            ..StaffData::default()
        });
        user
    }

    fn student_of(class: Option<Uuid>) -> User {
        let mut user = User::new("s@example.com", "S", "password123", Role::Student);
        user.role = RoleData::Student(StudentData {
            student_class: class,
            parent_id: None,
        });
        user
    }

    #[test]
    fn admin_announcements_are_unfiltered() {
        assert_eq!(announcement_filter(Role::Admin).unwrap(), doc! {});
    }

    #[test]
    fn staff_sees_staff_and_general_announcements() {
        let filter = announcement_filter(Role::Staff).unwrap();
        assert_eq!(
            filter,
            doc! { "targetAudience": { "$in": ["Staff", "All"] } }
        );
    }

    #[test]
    fn student_sees_student_and_general_announcements() {
        let filter = announcement_filter(Role::Student).unwrap();
        assert_eq!(
            filter,
            doc! { "targetAudience": { "$in": ["Students", "All"] } }
        );
    }

    #[test]
    fn parent_announcements_are_forbidden() {
        let problem = announcement_filter(Role::Parent).unwrap_err();
        assert_eq!(problem.status.code, 403);
    }

    #[test]
    fn unread_filter_excludes_already_read() {
        let caller = Uuid::new_v4();
        let filter = announcement_unread_filter(Role::Student, caller).unwrap();
        assert_eq!(
            filter.get_document("readBy").unwrap(),
            &doc! { "$ne": caller.to_string() }
        );
    }

    #[test]
    fn notice_filter_matches_role_or_untargeted() {
        let filter = notice_filter(Role::Parent);
        assert_eq!(
            filter,
            doc! {
                "$or": [
                    { "targetAudience": "Parent" },
                    { "targetAudience": { "$size": 0 } },
                ]
            }
        );
        assert_eq!(notice_filter(Role::Admin), doc! {});
    }

    #[test]
    fn class_messages_restricted_to_members() {
        let class = Uuid::new_v4();

        assert!(check_class_message_access(&staff_of(Some(class)), class).is_ok());
        assert!(check_class_message_access(&student_of(Some(class)), class).is_ok());

        assert!(check_class_message_access(&staff_of(None), class).is_err());
        assert!(check_class_message_access(&student_of(Some(Uuid::new_v4())), class).is_err());

        let admin = User::new("a@example.com", "A", "password123", Role::Admin);
        assert!(check_class_message_access(&admin, class).is_err());
    }
}
