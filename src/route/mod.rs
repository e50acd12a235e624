use mongodb::Database;
use rocket::{Build, Rocket};

use crate::data::class::db::ClassDbExt;
use crate::data::class::Class;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::{problems, Problem};

pub mod announcements;
pub mod assignments;
pub mod attendance;
pub mod auth;
pub mod classes;
pub mod exam_results;
pub mod fees;
pub mod homework;
pub mod messages;
pub mod notices;
pub mod staffs;
pub mod students;
pub mod subjects;
pub mod timetables;

/// Mounts the whole API surface under `/api`.
pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/api/auth", routes![auth::register, auth::login])
        .mount(
            "/api/classes",
            routes![
                classes::class_list,
                classes::class_get,
                classes::class_create,
                classes::class_delete,
                classes::class_assign_class_staff,
                classes::class_assign_subject_staff,
                classes::class_remove_subject_staff,
                classes::class_add_subject,
                classes::class_remove_subject,
            ],
        )
        .mount(
            "/api/subjects",
            routes![
                subjects::subject_list,
                subjects::subject_create,
                subjects::subject_delete,
                subjects::subject_add_class,
                subjects::subject_remove_class,
            ],
        )
        .mount(
            "/api/students",
            routes![
                students::student_list,
                students::student_get,
                students::student_create,
                students::student_update,
                students::student_delete,
            ],
        )
        .mount(
            "/api/staffs",
            routes![
                staffs::staff_list,
                staffs::staff_get,
                staffs::staff_create,
                staffs::staff_update,
                staffs::staff_delete,
            ],
        )
        .mount(
            "/api/assignments",
            routes![
                assignments::assignment_list,
                assignments::assign_subject,
                assignments::unassign_subject,
                assignments::assign_class_staff,
            ],
        )
        .mount(
            "/api/attendance",
            routes![
                attendance::attendance_list,
                attendance::attendance_record,
                attendance::attendance_for_student,
                attendance::attendance_stats,
                attendance::attendance_class_details,
            ],
        )
        .mount(
            "/api/fees",
            routes![
                fees::fee_list,
                fees::fee_create,
                fees::fee_pay,
                fees::fee_delete,
                fees::fee_stats,
            ],
        )
        .mount(
            "/api/homework",
            routes![
                homework::homework_list,
                homework::homework_create,
                homework::homework_update,
                homework::homework_delete,
            ],
        )
        .mount(
            "/api/notices",
            routes![
                notices::notice_list,
                notices::notice_create,
                notices::notice_update,
                notices::notice_delete,
            ],
        )
        .mount(
            "/api/announcements",
            routes![
                announcements::announcement_list,
                announcements::announcement_create,
                announcements::announcement_mark_read,
                announcements::announcement_delete,
                announcements::announcement_unread_count,
            ],
        )
        .mount(
            "/api/messages",
            routes![
                messages::message_list,
                messages::message_send,
                messages::message_mark_read,
                messages::message_vote,
                messages::message_unread_count,
                messages::message_delete,
            ],
        )
        .mount(
            "/api/exam-results",
            routes![
                exam_results::exam_result_list,
                exam_results::exam_result_get,
                exam_results::exam_result_create,
                exam_results::exam_result_update,
                exam_results::exam_result_delete,
            ],
        )
        .mount(
            "/api/timetables",
            routes![
                timetables::timetable_list,
                timetables::timetable_get,
                timetables::timetable_create,
                timetables::timetable_update,
                timetables::timetable_delete,
            ],
        )
}

/// Gate for admin-only mutations.
pub fn require_admin(auth: &UserRoleToken) -> Result<(), Problem> {
    if auth.role.is_admin() {
        return Ok(());
    }
    Err(problems::forbidden("Administrator access required."))
}

/// Admins pass; staff pass only for the class they are class-teacher of.
pub async fn require_class_teacher(
    db: &Database,
    auth: &UserRoleToken,
    class: uuid::Uuid,
) -> Result<Class, Problem> {
    let class_doc = db.require_class(class).await?;
    if auth.role.is_admin() || class_doc.class_staff == Some(auth.user) {
        return Ok(class_doc);
    }
    Err(problems::forbidden(
        "Only the class teacher or an administrator may do this.",
    ))
}
