use std::collections::HashMap;

use bson::{doc, Document};
use chrono::NaiveDate;
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::attendance::{
    Attendance, AttendanceDbExt, AttendanceRecord, AttendanceStats,
};
use crate::data::class::db::ClassDbExt;
use crate::data::user::db::UserDbExt;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;
use crate::route::{require_admin, require_class_teacher};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAttendanceData {
    pub class: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub subject: Option<Uuid>,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAttendanceDetails {
    pub sheets: Vec<Attendance>,
    pub stats: AttendanceStats,
}

fn parse_date(date: &str) -> Result<NaiveDate, Problem> {
    date.parse()
        .map_err(|_| problems::validation("Date must be formatted as YYYY-MM-DD."))
}

#[get("/?<class>&<subject>&<date>")]
#[tracing::instrument(skip(db))]
pub async fn attendance_list(
    class: Option<Uuid>,
    subject: Option<Uuid>,
    date: Option<&str>,
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<Attendance>>, Problem> {
    let mut query = Document::new();
    if let Some(class) = class {
        query.insert("class", class.to_string());
    }
    if let Some(subject) = subject {
        query.insert("subject", subject.to_string());
    }
    if let Some(date) = date {
        query.insert("date", parse_date(date)?.to_string());
    }

    Ok(Json(db.list_attendance(query).await?))
}

#[post("/", data = "<body>")]
#[tracing::instrument(skip(db))]
pub async fn attendance_record(
    body: Json<RecordAttendanceData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Attendance>, Problem> {
    let body = body.into_inner();
    require_class_teacher(db, &auth, body.class).await?;

    for record in &body.records {
        db.require_role(record.student, Role::Student).await?;
    }

    let sheet = Attendance {
        id: Uuid::new_v4(),
        date: body.date,
        class: body.class,
        subject: body.subject,
        staff: auth.user,
        records: body.records,
        created: chrono::Utc::now(),
    };

    Ok(Json(db.record_attendance(sheet).await?))
}

#[get("/student/<id>")]
#[tracing::instrument(skip(db))]
pub async fn attendance_for_student(
    id: Uuid,
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<Attendance>>, Problem> {
    db.require_role(id, Role::Student).await?;
    Ok(Json(db.list_student_attendance(id).await?))
}

#[get("/stats?<date>")]
#[tracing::instrument(skip(db))]
pub async fn attendance_stats(
    date: &str,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<HashMap<Uuid, AttendanceStats>>, Problem> {
    require_admin(&auth)?;
    Ok(Json(db.attendance_stats(parse_date(date)?).await?))
}

#[get("/class-details?<class>&<date>")]
#[tracing::instrument(skip(db))]
pub async fn attendance_class_details(
    class: Uuid,
    date: &str,
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ClassAttendanceDetails>, Problem> {
    db.require_class(class).await?;

    let sheets = db
        .list_attendance(doc! {
            "class": class.to_string(),
            "date": parse_date(date)?.to_string(),
        })
        .await?;
    let stats = AttendanceStats::tally(&sheets);

    Ok(Json(ClassAttendanceDetails { sheets, stats }))
}
