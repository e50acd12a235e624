//! Relationship synchronizer scenarios against a real MongoDB instance.
//!
//! These tests are ignored by default; run them with a local mongod:
//! `MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored`.
//! Each test works in its own throwaway database and drops it afterwards.

use mongodb::{Client, Database};
use uuid::Uuid;

use campus_backend::data::class::db::ClassDbExt;
use campus_backend::data::class::Class;
use campus_backend::data::subject::db::SubjectDbExt;
use campus_backend::data::subject::Subject;
use campus_backend::data::sync::RelationshipSyncExt;
use campus_backend::data::user::db::UserDbExt;
use campus_backend::data::user::User;
use campus_backend::role::Role;

async fn scratch_db() -> Database {
    let uri = std::env::var("MONGODB_URI").unwrap_or("mongodb://localhost:27017".to_string());
    let client = Client::with_uri_str(&uri)
        .await
        .expect("unable to connect to MongoDB");

    client.database(&format!("campus_test_{}", Uuid::new_v4().simple()))
}

async fn make_class(db: &Database, name: &str) -> Class {
    let class = Class::new(name, "10", "A");
    db.create_class(&class).await.expect("class created");
    class
}

async fn make_user(db: &Database, email: &str, role: Role) -> User {
    let user = User::new(email, email.split('@').next().unwrap(), "password123", role);
    db.create_user(&user).await.expect("user created");
    user
}

async fn make_subject(db: &Database, code: &str) -> Subject {
    let subject = Subject::new(format!("Subject {}", code), code);
    db.create_subject(&subject).await.expect("subject created");
    subject
}

#[rocket::async_test]
#[ignore = "requires a running MongoDB"]
async fn class_teacher_is_exclusive_last_write_wins() {
    let db = scratch_db().await;

    let class_a = make_class(&db, "10-A").await;
    let class_b = make_class(&db, "10-B").await;
    let staff = make_user(&db, "t1@example.com", Role::Staff).await;

    db.assign_class_teacher(class_a.id, staff.id)
        .await
        .expect("first assignment");
    db.assign_class_teacher(class_b.id, staff.id)
        .await
        .expect("second assignment");

    // The staff member teaches at most one class; the earlier class loses
    // its teacher instead of the call being rejected.
    let class_a = db.require_class(class_a.id).await.expect("class A");
    let class_b = db.require_class(class_b.id).await.expect("class B");
    assert_eq!(class_a.class_staff, None);
    assert_eq!(class_b.class_staff, Some(staff.id));

    let staff = db.require_user(staff.id).await.expect("staff");
    assert_eq!(staff.staff_data().unwrap().staff_class, Some(class_b.id));

    db.drop(None).await.expect("scratch database dropped");
}

#[rocket::async_test]
#[ignore = "requires a running MongoDB"]
async fn displaced_subject_teacher_loses_their_mirror() {
    let db = scratch_db().await;

    let class = make_class(&db, "10-A").await;
    let subject = make_subject(&db, "MATH10").await;
    let first = make_user(&db, "t1@example.com", Role::Staff).await;
    let second = make_user(&db, "t2@example.com", Role::Staff).await;

    db.assign_subject_teacher(class.id, subject.id, first.id)
        .await
        .expect("first assignment");
    db.assign_subject_teacher(class.id, subject.id, second.id)
        .await
        .expect("displacing assignment");

    let class = db.require_class(class.id).await.expect("class");
    assert_eq!(class.subject_staff(subject.id), Some(second.id));
    assert_eq!(class.subject_staffs.len(), 1);

    let first = db.require_user(first.id).await.expect("first staff");
    assert!(first
        .staff_data()
        .unwrap()
        .subject_class_assignments
        .is_empty());

    let second = db.require_user(second.id).await.expect("second staff");
    assert_eq!(second.staff_data().unwrap().subject_class_assignments.len(), 1);

    db.drop(None).await.expect("scratch database dropped");
}

#[rocket::async_test]
#[ignore = "requires a running MongoDB"]
async fn removing_subject_teacher_leaves_staff_mirror_alone() {
    let db = scratch_db().await;

    let class = make_class(&db, "10-A").await;
    let subject = make_subject(&db, "PHY10").await;
    let staff = make_user(&db, "t1@example.com", Role::Staff).await;

    db.assign_subject_teacher(class.id, subject.id, staff.id)
        .await
        .expect("assignment");
    db.remove_subject_teacher(class.id, subject.id)
        .await
        .expect("removal");

    let class = db.require_class(class.id).await.expect("class");
    assert!(class.subject_staffs.is_empty());

    // The staff-side assignment record survives removal.
    let staff = db.require_user(staff.id).await.expect("staff");
    assert_eq!(staff.staff_data().unwrap().subject_class_assignments.len(), 1);

    db.drop(None).await.expect("scratch database dropped");
}

#[rocket::async_test]
#[ignore = "requires a running MongoDB"]
async fn transferring_a_student_moves_both_pointers() {
    let db = scratch_db().await;

    let class_a = make_class(&db, "10-A").await;
    let class_b = make_class(&db, "10-B").await;
    let student = make_user(&db, "s1@example.com", Role::Student).await;

    db.transfer_student(student.id, Some(class_a.id))
        .await
        .expect("enrollment");
    db.transfer_student(student.id, Some(class_b.id))
        .await
        .expect("transfer");

    let class_a = db.require_class(class_a.id).await.expect("class A");
    let class_b = db.require_class(class_b.id).await.expect("class B");
    assert!(class_a.students.is_empty());
    assert_eq!(class_b.students, vec![student.id]);

    let student = db.require_user(student.id).await.expect("student");
    assert_eq!(
        student.student_data().unwrap().student_class,
        Some(class_b.id)
    );

    db.drop(None).await.expect("scratch database dropped");
}

#[rocket::async_test]
#[ignore = "requires a running MongoDB"]
async fn relinking_a_parent_updates_children_sets() {
    let db = scratch_db().await;

    let student = make_user(&db, "s1@example.com", Role::Student).await;
    let parent_a = make_user(&db, "p1@example.com", Role::Parent).await;
    let parent_b = make_user(&db, "p2@example.com", Role::Parent).await;

    db.link_parent(student.id, Some(parent_a.id))
        .await
        .expect("first link");
    db.link_parent(student.id, Some(parent_b.id))
        .await
        .expect("relink");

    let parent_a = db.require_user(parent_a.id).await.expect("parent A");
    let parent_b = db.require_user(parent_b.id).await.expect("parent B");
    assert!(parent_a.parent_data().unwrap().children.is_empty());
    assert_eq!(parent_b.parent_data().unwrap().children, vec![student.id]);

    let student = db.require_user(student.id).await.expect("student");
    assert_eq!(student.student_data().unwrap().parent_id, Some(parent_b.id));

    db.drop(None).await.expect("scratch database dropped");
}

#[rocket::async_test]
#[ignore = "requires a running MongoDB"]
async fn repeating_an_assignment_changes_nothing() {
    let db = scratch_db().await;

    let class = make_class(&db, "10-A").await;
    let subject = make_subject(&db, "CHEM10").await;
    let staff = make_user(&db, "t1@example.com", Role::Staff).await;

    db.assign_class_teacher(class.id, staff.id)
        .await
        .expect("class teacher");
    db.assign_subject_teacher(class.id, subject.id, staff.id)
        .await
        .expect("subject teacher");

    db.assign_class_teacher(class.id, staff.id)
        .await
        .expect("repeat class teacher");
    db.assign_subject_teacher(class.id, subject.id, staff.id)
        .await
        .expect("repeat subject teacher");

    let class = db.require_class(class.id).await.expect("class");
    assert_eq!(class.class_staff, Some(staff.id));
    assert_eq!(class.subject_staffs.len(), 1);

    let staff = db.require_user(staff.id).await.expect("staff");
    assert_eq!(staff.staff_data().unwrap().subject_class_assignments.len(), 1);
    assert_eq!(staff.staff_data().unwrap().staff_class, Some(class.id));

    db.drop(None).await.expect("scratch database dropped");
}

#[rocket::async_test]
#[ignore = "requires a running MongoDB"]
async fn bad_references_fail_before_any_write() {
    let db = scratch_db().await;

    let class = make_class(&db, "10-A").await;
    let student = make_user(&db, "s1@example.com", Role::Student).await;

    // Missing staff id.
    let err = db
        .assign_class_teacher(class.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.status.code, 404);

    // A student id where a staff id is expected.
    let err = db
        .assign_class_teacher(class.id, student.id)
        .await
        .unwrap_err();
    assert_eq!(err.status.code, 404);

    // Missing class id on transfer.
    let err = db
        .transfer_student(student.id, Some(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.status.code, 404);

    let class = db.require_class(class.id).await.expect("class");
    assert_eq!(class.class_staff, None);
    let student = db.require_user(student.id).await.expect("student");
    assert_eq!(student.student_data().unwrap().student_class, None);

    db.drop(None).await.expect("scratch database dropped");
}
