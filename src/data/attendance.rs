use std::collections::HashMap;

use bson::{doc, Bson, Document};
use chrono::{DateTime, NaiveDate, Utc};
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::filter;
use crate::resp::problem::{problems, Problem};

pub static ATTENDANCE_COLLECTION_NAME: &str = "attendance";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Leave,
    /// On-duty: absent from class for a sanctioned school activity.
    OD,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student: Uuid,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// One sheet per (class, date, subject) triple; `subject = None` is the
/// full-day sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub date: NaiveDate,
    pub class: Uuid,
    #[serde(default)]
    pub subject: Option<Uuid>,
    pub staff: Uuid,
    pub records: Vec<AttendanceRecord>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

/// Status tallies over one day's sheets.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub present: u64,
    pub absent: u64,
    pub late: u64,
    pub leave: u64,
    pub od: u64,
    pub total: u64,
}

impl AttendanceStats {
    pub fn tally(sheets: &[Attendance]) -> AttendanceStats {
        let mut stats = AttendanceStats::default();
        for sheet in sheets {
            for record in &sheet.records {
                match record.status {
                    AttendanceStatus::Present => stats.present += 1,
                    AttendanceStatus::Absent => stats.absent += 1,
                    AttendanceStatus::Late => stats.late += 1,
                    AttendanceStatus::Leave => stats.leave += 1,
                    AttendanceStatus::OD => stats.od += 1,
                }
                stats.total += 1;
            }
        }
        stats
    }
}

fn sheet_key(class: Uuid, date: NaiveDate, subject: Option<Uuid>) -> Document {
    doc! {
        "class": class.to_string(),
        "date": date.to_string(),
        "subject": match subject {
            Some(subject) => Bson::String(subject.to_string()),
            None => Bson::Null,
        },
    }
}

#[allow(async_fn_in_trait)]
pub trait AttendanceDbExt {
    /// Stores a sheet. Re-marking the same (class, date, subject) replaces
    /// the existing records rather than creating a second sheet.
    async fn record_attendance(&self, sheet: Attendance) -> Result<Attendance, Problem>;

    async fn require_attendance(&self, id: Uuid) -> Result<Attendance, Problem>;

    async fn list_attendance(&self, query: Document) -> Result<Vec<Attendance>, Problem>;

    /// All sheets containing a record for the student.
    async fn list_student_attendance(&self, student: Uuid) -> Result<Vec<Attendance>, Problem>;

    /// Per-class status tallies for one day.
    async fn attendance_stats(
        &self,
        date: NaiveDate,
    ) -> Result<HashMap<Uuid, AttendanceStats>, Problem>;

    async fn delete_attendance(&self, id: Uuid) -> Result<Option<Attendance>, Problem>;
}

impl AttendanceDbExt for Database {
    async fn record_attendance(&self, sheet: Attendance) -> Result<Attendance, Problem> {
        let collection = self.collection::<Attendance>(ATTENDANCE_COLLECTION_NAME);

        let existing = collection
            .find_one(sheet_key(sheet.class, sheet.date, sheet.subject), None)
            .await
            .map_err(Problem::from)?;

        match existing {
            Some(mut stored) => {
                stored.staff = sheet.staff;
                stored.records = sheet.records;
                collection
                    .replace_one(filter::by_id(stored.id), &stored, None)
                    .await
                    .map_err(Problem::from)?;
                Ok(stored)
            }
            None => {
                collection
                    .insert_one(&sheet, None)
                    .await
                    .map_err(Problem::from)?;
                Ok(sheet)
            }
        }
    }

    async fn require_attendance(&self, id: Uuid) -> Result<Attendance, Problem> {
        self.collection::<Attendance>(ATTENDANCE_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)?
            .ok_or_else(|| problems::not_found("Attendance", id))
    }

    async fn list_attendance(&self, query: Document) -> Result<Vec<Attendance>, Problem> {
        let mut cursor = self
            .collection::<Attendance>(ATTENDANCE_COLLECTION_NAME)
            .find(query, None)
            .await
            .map_err(Problem::from)?;

        let mut sheets = vec![];
        while let Some(result) = cursor.next().await {
            match result {
                Ok(sheet) => sheets.push(sheet),
                Err(_) => tracing::warn!("unable to deserialize Attendance document"),
            }
        }

        Ok(sheets)
    }

    async fn list_student_attendance(&self, student: Uuid) -> Result<Vec<Attendance>, Problem> {
        self.list_attendance(doc! { "records.student": student.to_string() })
            .await
    }

    async fn attendance_stats(
        &self,
        date: NaiveDate,
    ) -> Result<HashMap<Uuid, AttendanceStats>, Problem> {
        let sheets = self
            .list_attendance(doc! { "date": date.to_string() })
            .await?;

        let mut by_class: HashMap<Uuid, Vec<Attendance>> = HashMap::new();
        for sheet in sheets {
            by_class.entry(sheet.class).or_default().push(sheet);
        }

        Ok(by_class
            .into_iter()
            .map(|(class, sheets)| (class, AttendanceStats::tally(&sheets)))
            .collect())
    }

    async fn delete_attendance(&self, id: Uuid) -> Result<Option<Attendance>, Problem> {
        self.collection::<Attendance>(ATTENDANCE_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            student: Uuid::new_v4(),
            status,
            remarks: None,
        }
    }

    #[test]
    fn stats_tally_all_statuses() {
        let sheet = Attendance {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            class: Uuid::new_v4(),
            subject: None,
            staff: Uuid::new_v4(),
            records: vec![
                record(AttendanceStatus::Present),
                record(AttendanceStatus::Present),
                record(AttendanceStatus::Absent),
                record(AttendanceStatus::Late),
                record(AttendanceStatus::OD),
            ],
            created: Utc::now(),
        };

        let stats = AttendanceStats::tally(&[sheet]);
        assert_eq!(stats.present, 2);
        assert_eq!(stats.absent, 1);
        assert_eq!(stats.late, 1);
        assert_eq!(stats.leave, 0);
        assert_eq!(stats.od, 1);
        assert_eq!(stats.total, 5);
    }

    #[test]
    fn full_day_sheet_key_uses_null_subject() {
        let class = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        let key = sheet_key(class, date, None);
        assert_eq!(key.get("subject"), Some(&Bson::Null));
        assert_eq!(key.get_str("date").unwrap(), "2026-03-02");
    }

    #[test]
    fn od_status_round_trips_as_upper_case() {
        let json = serde_json::to_value(AttendanceStatus::OD).unwrap();
        assert_eq!(json, serde_json::json!("OD"));
    }
}
