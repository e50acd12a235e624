use bson::Document;
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::data::exam::{ExamResult, ExamResultDbExt, ExamType};
use crate::data::user::db::UserDbExt;
use crate::grade::SubjectMarks;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;
use crate::route::require_class_teacher;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamResultData {
    pub student: Uuid,
    pub class: Uuid,
    pub exam_type: ExamType,
    pub exam_name: String,
    pub academic_year: String,
    pub subjects: Vec<SubjectMarks>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExamResultData {
    /// When present, replaces the marks and reruns the grading pipeline.
    #[serde(default)]
    pub subjects: Option<Vec<SubjectMarks>>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[get("/?<student>&<class>&<exam_type>&<academic_year>")]
#[tracing::instrument(skip(db))]
pub async fn exam_result_list(
    student: Option<Uuid>,
    class: Option<Uuid>,
    exam_type: Option<&str>,
    academic_year: Option<&str>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<ExamResult>>, Problem> {
    // Students only ever see their own marksheets.
    let student = match auth.role {
        Role::Student => Some(auth.user),
        _ => student,
    };

    let mut query = Document::new();
    if let Some(student) = student {
        query.insert("student", student.to_string());
    }
    if let Some(class) = class {
        query.insert("class", class.to_string());
    }
    if let Some(exam_type) = exam_type {
        query.insert("examType", exam_type);
    }
    if let Some(academic_year) = academic_year {
        query.insert("academicYear", academic_year);
    }

    Ok(Json(db.list_exam_results(query).await?))
}

#[get("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn exam_result_get(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ExamResult>, Problem> {
    let result = db.require_exam_result(id).await?;

    if auth.role == Role::Student && result.student != auth.user {
        return Err(problems::forbidden("Students can only see their own results."));
    }

    Ok(Json(result))
}

#[post("/", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn exam_result_create(
    create: Json<CreateExamResultData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ExamResult>, Problem> {
    let create = create.into_inner();

    require_class_teacher(db, &auth, create.class).await?;
    db.require_role(create.student, Role::Student).await?;

    let result = ExamResult::graded(
        create.student,
        create.class,
        create.exam_type,
        create.exam_name,
        create.academic_year,
        create.subjects,
        auth.user,
    )?;
    db.create_exam_result(&result).await?;

    Ok(Json(result))
}

#[put("/<id>", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn exam_result_update(
    id: Uuid,
    update: Json<UpdateExamResultData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ExamResult>, Problem> {
    let mut result = db.require_exam_result(id).await?;
    require_class_teacher(db, &auth, result.class).await?;

    let update = update.into_inner();
    if let Some(subjects) = update.subjects {
        result.regrade(subjects)?;
    }
    if let Some(rank) = update.rank {
        result.rank = Some(rank);
    }
    if let Some(remarks) = update.remarks {
        result.remarks = Some(remarks);
    }
    db.save_exam_result(&result).await?;

    Ok(Json(result))
}

#[delete("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn exam_result_delete(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    let result = db.require_exam_result(id).await?;

    if !auth.role.is_admin() && result.uploaded_by != auth.user {
        return Err(problems::forbidden(
            "Results can only be removed by their uploader or an administrator.",
        ));
    }

    db.delete_exam_result(id).await?;
    Ok(Json(id.to_string()))
}
