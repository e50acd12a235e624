use bson::Document;
use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::filter;
use crate::grade::{compute_exam_totals, Grade, SubjectMarks};
use crate::resp::problem::{problems, Problem};

pub static EXAM_RESULT_COLLECTION_NAME: &str = "examResults";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ExamType {
    #[serde(rename = "Mid-Term")]
    MidTerm,
    Final,
    #[serde(rename = "Unit Test")]
    UnitTest,
    Quarterly,
    #[serde(rename = "Half-Yearly")]
    HalfYearly,
    Annual,
}

/// One student's marksheet for one exam. The aggregate fields are derived
/// from `subjects` and recomputed whenever that array changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub student: Uuid,
    pub class: Uuid,
    pub exam_type: ExamType,
    pub exam_name: String,
    pub academic_year: String,
    pub subjects: Vec<SubjectMarks>,
    pub total_marks_obtained: f64,
    pub total_marks: f64,
    pub percentage: f64,
    pub overall_grade: Grade,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub remarks: Option<String>,
    pub uploaded_by: Uuid,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl ExamResult {
    /// Builds a marksheet from raw per-subject marks, running the grading
    /// pipeline over them.
    #[allow(clippy::too_many_arguments)]
    pub fn graded(
        student: Uuid,
        class: Uuid,
        exam_type: ExamType,
        exam_name: impl Into<String>,
        academic_year: impl Into<String>,
        mut subjects: Vec<SubjectMarks>,
        uploaded_by: Uuid,
    ) -> Result<ExamResult, Problem> {
        let totals = compute_exam_totals(&mut subjects)?;

        Ok(ExamResult {
            id: Uuid::new_v4(),
            student,
            class,
            exam_type,
            exam_name: exam_name.into(),
            academic_year: academic_year.into(),
            subjects,
            total_marks_obtained: totals.total_marks_obtained,
            total_marks: totals.total_marks,
            percentage: totals.percentage,
            overall_grade: totals.overall_grade,
            rank: None,
            remarks: None,
            uploaded_by,
            created: Utc::now(),
        })
    }

    /// Replaces the marks array and recomputes every derived field.
    pub fn regrade(&mut self, mut subjects: Vec<SubjectMarks>) -> Result<(), Problem> {
        let totals = compute_exam_totals(&mut subjects)?;
        self.subjects = subjects;
        self.total_marks_obtained = totals.total_marks_obtained;
        self.total_marks = totals.total_marks;
        self.percentage = totals.percentage;
        self.overall_grade = totals.overall_grade;
        Ok(())
    }
}

#[allow(async_fn_in_trait)]
pub trait ExamResultDbExt {
    async fn create_exam_result(&self, result: &ExamResult) -> Result<(), Problem>;
    async fn require_exam_result(&self, id: Uuid) -> Result<ExamResult, Problem>;
    async fn list_exam_results(&self, query: Document) -> Result<Vec<ExamResult>, Problem>;
    async fn save_exam_result(&self, result: &ExamResult) -> Result<(), Problem>;
    async fn delete_exam_result(&self, id: Uuid) -> Result<Option<ExamResult>, Problem>;
}

impl ExamResultDbExt for Database {
    async fn create_exam_result(&self, result: &ExamResult) -> Result<(), Problem> {
        self.collection::<ExamResult>(EXAM_RESULT_COLLECTION_NAME)
            .insert_one(result, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn require_exam_result(&self, id: Uuid) -> Result<ExamResult, Problem> {
        self.collection::<ExamResult>(EXAM_RESULT_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)?
            .ok_or_else(|| problems::not_found("Exam result", id))
    }

    async fn list_exam_results(&self, query: Document) -> Result<Vec<ExamResult>, Problem> {
        let mut cursor = self
            .collection::<ExamResult>(EXAM_RESULT_COLLECTION_NAME)
            .find(query, None)
            .await
            .map_err(Problem::from)?;

        let mut results = vec![];
        while let Some(result) = cursor.next().await {
            match result {
                Ok(entry) => results.push(entry),
                Err(_) => tracing::warn!("unable to deserialize ExamResult document"),
            }
        }

        Ok(results)
    }

    async fn save_exam_result(&self, result: &ExamResult) -> Result<(), Problem> {
        self.collection::<ExamResult>(EXAM_RESULT_COLLECTION_NAME)
            .replace_one(filter::by_id(result.id), result, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn delete_exam_result(&self, id: Uuid) -> Result<Option<ExamResult>, Problem> {
        self.collection::<ExamResult>(EXAM_RESULT_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marks(obtained: f64, total: f64) -> SubjectMarks {
        SubjectMarks {
            subject: Uuid::new_v4(),
            marks_obtained: obtained,
            total_marks: total,
            grade: None,
            remarks: None,
        }
    }

    #[test]
    fn graded_fills_aggregates_and_subject_grades() {
        let result = ExamResult::graded(
            Uuid::new_v4(),
            Uuid::new_v4(),
            ExamType::MidTerm,
            "Mid-Term I",
            "2026-2027",
            vec![marks(85.0, 100.0), marks(78.0, 100.0)],
            Uuid::new_v4(),
        )
        .unwrap();

        assert_eq!(result.total_marks_obtained, 163.0);
        assert_eq!(result.total_marks, 200.0);
        assert_eq!(result.percentage, 81.5);
        assert_eq!(result.overall_grade, Grade::A);
        assert!(result.subjects.iter().all(|s| s.grade.is_some()));
    }

    #[test]
    fn regrade_replaces_derived_fields() {
        let mut result = ExamResult::graded(
            Uuid::new_v4(),
            Uuid::new_v4(),
            ExamType::Final,
            "Final",
            "2026-2027",
            vec![marks(40.0, 100.0)],
            Uuid::new_v4(),
        )
        .unwrap();
        assert_eq!(result.overall_grade, Grade::D);

        result.regrade(vec![marks(95.0, 100.0)]).unwrap();
        assert_eq!(result.overall_grade, Grade::APlus);
        assert_eq!(result.percentage, 95.0);
    }

    #[test]
    fn zero_total_is_rejected_before_any_store_write() {
        let error = ExamResult::graded(
            Uuid::new_v4(),
            Uuid::new_v4(),
            ExamType::Quarterly,
            "Q1",
            "2026-2027",
            vec![marks(10.0, 0.0)],
            Uuid::new_v4(),
        )
        .unwrap_err();

        assert_eq!(error.status.code, 400);
    }

    #[test]
    fn exam_type_wire_names_use_display_spelling() {
        assert_eq!(
            serde_json::to_value(ExamType::MidTerm).unwrap(),
            serde_json::json!("Mid-Term")
        );
        assert_eq!(
            serde_json::to_value(ExamType::UnitTest).unwrap(),
            serde_json::json!("Unit Test")
        );
        assert_eq!(
            serde_json::to_value(ExamType::HalfYearly).unwrap(),
            serde_json::json!("Half-Yearly")
        );
    }
}
