//! Relationship synchronizer: the only writer of the denormalized pointer
//! pairs between users, classes and subjects.
//!
//! Every operation validates all referenced ids before its first write, then
//! performs the authoritative write followed by compensating writes on the
//! mirror fields. The writes are not wrapped in a cross-document transaction;
//! a failure between them leaves the store partially updated, which is logged
//! and surfaced as a 500 problem.

use bson::doc;
use mongodb::Database;
use uuid::Uuid;

use crate::data::class::db::ClassDbExt;
use crate::data::class::{Class, CLASS_COLLECTION_NAME};
use crate::data::filter;
use crate::data::subject::db::SubjectDbExt;
use crate::data::user::db::UserDbExt;
use crate::data::user::{RoleData, User, USER_COLLECTION_NAME};
use crate::resp::problem::{problems, Problem};
use crate::role::Role;

fn partial_write(op: &'static str) -> impl FnOnce(Problem) -> Problem {
    move |e| {
        tracing::error!("{} left the store partially updated: {}", op, e);
        problems::partial_write(format!("{} failed after an earlier write landed.", op))
    }
}

#[allow(async_fn_in_trait)]
pub trait RelationshipSyncExt {
    /// Makes `staff` the class-teacher of `class`. A staff member teaches at
    /// most one class, and a class has at most one class-teacher; both are
    /// enforced by last-write-wins overwrite, never by rejection.
    async fn assign_class_teacher(&self, class: Uuid, staff: Uuid) -> Result<Class, Problem>;

    /// Clears the class-teacher pointer on both sides.
    async fn unassign_class_teacher(&self, class: Uuid) -> Result<Class, Problem>;

    /// Assigns `staff` to teach `subject` in `class`, displacing any previous
    /// staff for that subject and keeping both staff mirrors in step.
    async fn assign_subject_teacher(
        &self,
        class: Uuid,
        subject: Uuid,
        staff: Uuid,
    ) -> Result<Class, Problem>;

    /// Drops the subject-staff entry for `subject` from `class`.
    ///
    /// The displaced staff's `subjectClassAssignments` mirror is deliberately
    /// left untouched, matching observed system behavior (the staff keeps a
    /// historical record of the assignment).
    async fn remove_subject_teacher(&self, class: Uuid, subject: Uuid) -> Result<Class, Problem>;

    async fn add_subject_to_class(&self, class: Uuid, subject: Uuid) -> Result<Class, Problem>;

    /// Set-removes `subject` from the class, dropping any subject-staff entry
    /// for it. Carries the same staff-side asymmetry as
    /// [`remove_subject_teacher`](Self::remove_subject_teacher).
    async fn remove_subject_from_class(&self, class: Uuid, subject: Uuid)
        -> Result<Class, Problem>;

    /// Moves a student between classes (or out of any class for `None`),
    /// keeping the `students` sets and the student's `studentClass` pointer
    /// consistent. A no-op when the class is unchanged.
    async fn transfer_student(&self, student: Uuid, class: Option<Uuid>) -> Result<User, Problem>;

    /// Re-links a student to a parent (or no parent), keeping the parent
    /// `children` sets and the student's `parentId` pointer consistent.
    async fn link_parent(&self, student: Uuid, parent: Option<Uuid>) -> Result<User, Problem>;

    /// Adds `subject` to the staff's qualification set, independent of any
    /// class. Idempotent.
    async fn assign_subject_to_staff(&self, staff: Uuid, subject: Uuid) -> Result<User, Problem>;

    async fn remove_subject_from_staff(&self, staff: Uuid, subject: Uuid)
        -> Result<User, Problem>;
}

impl RelationshipSyncExt for Database {
    #[tracing::instrument(skip(self))]
    async fn assign_class_teacher(&self, class: Uuid, staff: Uuid) -> Result<Class, Problem> {
        let mut class_doc = self.require_class(class).await?;
        let staff_doc = self.require_role(staff, Role::Staff).await?;

        if class_doc.class_staff == Some(staff) {
            return Ok(class_doc);
        }

        let previous = class_doc.class_staff;

        // A staff member is class-teacher of at most one class; clear any
        // other class currently pointing at them.
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .update_many(
                doc! { "classstaff": staff.to_string() },
                doc! { "$unset": { "classstaff": "" } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        class_doc.class_staff = Some(staff);
        self.save_class(&class_doc)
            .await
            .map_err(partial_write("assign_class_teacher"))?;

        self.collection::<User>(USER_COLLECTION_NAME)
            .update_one(
                filter::by_id(staff_doc.id),
                doc! { "$set": { "staffClass": class.to_string() } },
                None,
            )
            .await
            .map_err(Problem::from)
            .map_err(partial_write("assign_class_teacher"))?;

        if let Some(previous) = previous {
            self.collection::<User>(USER_COLLECTION_NAME)
                .update_one(
                    filter::by_id(previous),
                    doc! { "$unset": { "staffClass": "" } },
                    None,
                )
                .await
                .map_err(Problem::from)
                .map_err(partial_write("assign_class_teacher"))?;
        }

        Ok(class_doc)
    }

    #[tracing::instrument(skip(self))]
    async fn unassign_class_teacher(&self, class: Uuid) -> Result<Class, Problem> {
        let mut class_doc = self.require_class(class).await?;

        let staff = match class_doc.class_staff.take() {
            Some(staff) => staff,
            None => return Ok(class_doc),
        };

        self.save_class(&class_doc).await?;

        self.collection::<User>(USER_COLLECTION_NAME)
            .update_one(
                filter::by_id(staff),
                doc! { "$unset": { "staffClass": "" } },
                None,
            )
            .await
            .map_err(Problem::from)
            .map_err(partial_write("unassign_class_teacher"))?;

        Ok(class_doc)
    }

    #[tracing::instrument(skip(self))]
    async fn assign_subject_teacher(
        &self,
        class: Uuid,
        subject: Uuid,
        staff: Uuid,
    ) -> Result<Class, Problem> {
        let mut class_doc = self.require_class(class).await?;
        let mut staff_doc = self.require_role(staff, Role::Staff).await?;
        self.require_subject(subject).await?;

        let previous = class_doc.set_subject_staff(subject, staff);
        self.save_class(&class_doc).await?;

        if let RoleData::Staff(data) = &mut staff_doc.role {
            if data.add_assignment(subject, class) {
                self.save_user(&staff_doc)
                    .await
                    .map_err(partial_write("assign_subject_teacher"))?;
            }
        }

        if let Some(previous) = previous.filter(|p| *p != staff) {
            match self.get_user(previous).await? {
                Some(mut previous_doc) => {
                    if let RoleData::Staff(data) = &mut previous_doc.role {
                        if data.remove_assignment(subject, class) {
                            self.save_user(&previous_doc)
                                .await
                                .map_err(partial_write("assign_subject_teacher"))?;
                        }
                    }
                }
                // Dangling staff references are tolerated; nothing to clean.
                None => tracing::warn!("displaced subject staff {} no longer exists", previous),
            }
        }

        Ok(class_doc)
    }

    #[tracing::instrument(skip(self))]
    async fn remove_subject_teacher(&self, class: Uuid, subject: Uuid) -> Result<Class, Problem> {
        let mut class_doc = self.require_class(class).await?;

        if class_doc.remove_subject_staff(subject).is_some() {
            self.save_class(&class_doc).await?;
        }

        Ok(class_doc)
    }

    #[tracing::instrument(skip(self))]
    async fn add_subject_to_class(&self, class: Uuid, subject: Uuid) -> Result<Class, Problem> {
        let mut class_doc = self.require_class(class).await?;
        self.require_subject(subject).await?;

        if class_doc.add_subject(subject) {
            self.save_class(&class_doc).await?;
        }

        Ok(class_doc)
    }

    #[tracing::instrument(skip(self))]
    async fn remove_subject_from_class(
        &self,
        class: Uuid,
        subject: Uuid,
    ) -> Result<Class, Problem> {
        let mut class_doc = self.require_class(class).await?;

        class_doc.remove_subject(subject);
        self.save_class(&class_doc).await?;

        Ok(class_doc)
    }

    #[tracing::instrument(skip(self))]
    async fn transfer_student(&self, student: Uuid, class: Option<Uuid>) -> Result<User, Problem> {
        let mut student_doc = self.require_role(student, Role::Student).await?;
        if let Some(class) = class {
            self.require_class(class).await?;
        }

        let previous = match &student_doc.role {
            RoleData::Student(data) => data.student_class,
            _ => None,
        };

        if previous == class {
            return Ok(student_doc);
        }

        if let Some(previous) = previous {
            self.collection::<Class>(CLASS_COLLECTION_NAME)
                .update_one(
                    filter::by_id(previous),
                    doc! { "$pull": { "students": student.to_string() } },
                    None,
                )
                .await
                .map_err(Problem::from)?;
        }

        if let Some(class) = class {
            self.collection::<Class>(CLASS_COLLECTION_NAME)
                .update_one(
                    filter::by_id(class),
                    doc! { "$addToSet": { "students": student.to_string() } },
                    None,
                )
                .await
                .map_err(Problem::from)
                .map_err(partial_write("transfer_student"))?;
        }

        if let RoleData::Student(data) = &mut student_doc.role {
            data.student_class = class;
        }
        self.save_user(&student_doc)
            .await
            .map_err(partial_write("transfer_student"))?;

        Ok(student_doc)
    }

    #[tracing::instrument(skip(self))]
    async fn link_parent(&self, student: Uuid, parent: Option<Uuid>) -> Result<User, Problem> {
        let mut student_doc = self.require_role(student, Role::Student).await?;
        if let Some(parent) = parent {
            self.require_role(parent, Role::Parent).await?;
        }

        let previous = match &student_doc.role {
            RoleData::Student(data) => data.parent_id,
            _ => None,
        };

        if previous == parent {
            return Ok(student_doc);
        }

        if let Some(previous) = previous {
            self.collection::<User>(USER_COLLECTION_NAME)
                .update_one(
                    filter::by_id(previous),
                    doc! { "$pull": { "children": student.to_string() } },
                    None,
                )
                .await
                .map_err(Problem::from)?;
        }

        if let Some(parent) = parent {
            self.collection::<User>(USER_COLLECTION_NAME)
                .update_one(
                    filter::by_id(parent),
                    doc! { "$addToSet": { "children": student.to_string() } },
                    None,
                )
                .await
                .map_err(Problem::from)
                .map_err(partial_write("link_parent"))?;
        }

        if let RoleData::Student(data) = &mut student_doc.role {
            data.parent_id = parent;
        }
        self.save_user(&student_doc)
            .await
            .map_err(partial_write("link_parent"))?;

        Ok(student_doc)
    }

    #[tracing::instrument(skip(self))]
    async fn assign_subject_to_staff(&self, staff: Uuid, subject: Uuid) -> Result<User, Problem> {
        let mut staff_doc = self.require_role(staff, Role::Staff).await?;
        self.require_subject(subject).await?;

        if let RoleData::Staff(data) = &mut staff_doc.role {
            if data.add_subject(subject) {
                self.save_user(&staff_doc).await?;
            }
        }

        Ok(staff_doc)
    }

    #[tracing::instrument(skip(self))]
    async fn remove_subject_from_staff(
        &self,
        staff: Uuid,
        subject: Uuid,
    ) -> Result<User, Problem> {
        let mut staff_doc = self.require_role(staff, Role::Staff).await?;

        if let RoleData::Staff(data) = &mut staff_doc.role {
            if data.remove_subject(subject) {
                self.save_user(&staff_doc).await?;
            }
        }

        Ok(staff_doc)
    }
}
