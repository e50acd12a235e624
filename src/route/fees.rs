use bson::Document;
use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::data::fee::{Fee, FeeDbExt, FeeStats, FeeStatus};
use crate::data::user::db::UserDbExt;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;
use crate::route::require_admin;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeeData {
    pub student: Uuid,
    pub title: String,
    pub amount: f64,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub payment_method: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

fn parse_status(status: &str) -> Result<FeeStatus, Problem> {
    match status {
        "Paid" => Ok(FeeStatus::Paid),
        "Pending" => Ok(FeeStatus::Pending),
        "Overdue" => Ok(FeeStatus::Overdue),
        _ => Err(problems::validation(
            "Status must be Paid, Pending or Overdue.",
        )),
    }
}

#[get("/?<student>&<status>")]
#[tracing::instrument(skip(db))]
pub async fn fee_list(
    student: Option<Uuid>,
    status: Option<&str>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Vec<Fee>>, Problem> {
    // Students only ever see their own fees.
    let student = match auth.role {
        Role::Student => Some(auth.user),
        _ => student,
    };

    let mut query = Document::new();
    if let Some(student) = student {
        query.insert("student", student.to_string());
    }
    if let Some(status) = status {
        query.insert("status", parse_status(status)?.to_string());
    }

    Ok(Json(db.list_fees(query).await?))
}

#[post("/", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn fee_create(
    create: Json<CreateFeeData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Fee>, Problem> {
    require_admin(&auth)?;

    let create = create.into_inner();
    if create.amount <= 0.0 {
        return Err(problems::validation("Fee amount must be positive."));
    }

    let student = db.require_role(create.student, Role::Student).await?;
    let class = student
        .student_data()
        .and_then(|data| data.student_class)
        .ok_or_else(|| problems::validation("Student is not enrolled in a class."))?;

    let fee = Fee {
        id: Uuid::new_v4(),
        student: student.id,
        class,
        title: create.title,
        amount: create.amount,
        due_date: create.due_date,
        status: FeeStatus::Pending,
        payment_date: None,
        payment_method: None,
        transaction_id: None,
        created: Utc::now(),
    };
    db.create_fee(&fee).await?;

    Ok(Json(fee))
}

#[put("/<id>/payment", data = "<payment>")]
#[tracing::instrument(skip(db))]
pub async fn fee_pay(
    id: Uuid,
    payment: Json<PaymentData>,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<Fee>, Problem> {
    require_admin(&auth)?;

    let payment = payment.into_inner();
    let mut fee = db.require_fee(id).await?;
    fee.record_payment(payment.payment_method, payment.transaction_id)?;
    db.save_fee(&fee).await?;

    Ok(Json(fee))
}

#[delete("/<id>")]
#[tracing::instrument(skip(db))]
pub async fn fee_delete(
    id: Uuid,
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<String>, Problem> {
    require_admin(&auth)?;

    match db.delete_fee(id).await? {
        Some(fee) => Ok(Json(fee.id.to_string())),
        None => Err(problems::not_found("Fee", id)),
    }
}

#[get("/stats")]
#[tracing::instrument(skip(db))]
pub async fn fee_stats(
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<FeeStats>, Problem> {
    require_admin(&auth)?;
    Ok(Json(db.fee_stats().await?))
}
