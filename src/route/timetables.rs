use bson::Document;
use chrono::Utc;
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::data::timetable::{Period, SchoolDay, Timetable, TimetableDbExt};
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;
use crate::route::require_class_teacher;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimetableData {
    pub class: Uuid,
    pub day: SchoolDay,
    pub periods: Vec<Period>,
    pub academic_year: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimetableData {
    #[serde(default)]
    pub periods: Option<Vec<Period>>,
}

#[get("/?<class>&<day>&<academic_year>")]
#[tracing::instrument(skip(db))]
pub async fn timetable_list(
    class: Option<Uuid>,
    day: Option<&str>,
    academic_year: Option<&str>,
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<Timetable>>, Problem> {
    let mut query = Document::new();
    if let Some(class) = class {
        query.insert("class", class.to_string());
    }
    if let Some(day) = day {
        query.insert("day", day);
    }
    if let Some(academic_year) = academic_year {
        query.insert("academicYear", academic_year);
    }

    Ok(Json(db.list_timetables(query).await?))
}

#[get("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn timetable_get(
    id: Uuid,
    _auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Timetable>, Problem> {
    Ok(Json(db.require_timetable(id).await?))
}

#[post("/", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn timetable_create(
    create: Json<CreateTimetableData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Timetable>, Problem> {
    let create = create.into_inner();
    require_class_teacher(db, &auth, create.class).await?;

    let timetable = Timetable {
        id: Uuid::new_v4(),
        class: create.class,
        day: create.day,
        periods: create.periods,
        uploaded_by: auth.user,
        academic_year: create.academic_year,
        created: Utc::now(),
    };
    db.create_timetable(&timetable).await?;

    Ok(Json(timetable))
}

#[put("/<id>", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn timetable_update(
    id: Uuid,
    update: Json<UpdateTimetableData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Timetable>, Problem> {
    let mut timetable = db.require_timetable(id).await?;
    require_class_teacher(db, &auth, timetable.class).await?;

    if let Some(periods) = update.into_inner().periods {
        timetable.periods = periods;
    }
    db.save_timetable(&timetable).await?;

    Ok(Json(timetable))
}

#[delete("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn timetable_delete(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    let timetable = db.require_timetable(id).await?;
    require_class_teacher(db, &auth, timetable.class).await?;

    db.delete_timetable(id).await?;
    Ok(Json(id.to_string()))
}
