use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resp::problem::{problems, Problem};

/// Letter grade bands. Boundaries are inclusive on the lower bound.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    D,
    F,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grade::APlus => write!(f, "A+"),
            Grade::A => write!(f, "A"),
            Grade::BPlus => write!(f, "B+"),
            Grade::B => write!(f, "B"),
            Grade::C => write!(f, "C"),
            Grade::D => write!(f, "D"),
            Grade::F => write!(f, "F"),
        }
    }
}

/// Total over all inputs, including out-of-range ones; a NaN percentage maps
/// to `F` because every band comparison fails.
pub fn grade_for_percentage(percentage: f64) -> Grade {
    if percentage >= 90.0 {
        Grade::APlus
    } else if percentage >= 80.0 {
        Grade::A
    } else if percentage >= 70.0 {
        Grade::BPlus
    } else if percentage >= 60.0 {
        Grade::B
    } else if percentage >= 50.0 {
        Grade::C
    } else if percentage >= 40.0 {
        Grade::D
    } else {
        Grade::F
    }
}

/// Per-subject marks as stored inside an exam result document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMarks {
    pub subject: Uuid,
    pub marks_obtained: f64,
    pub total_marks: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExamTotals {
    pub total_marks_obtained: f64,
    pub total_marks: f64,
    pub percentage: f64,
    pub overall_grade: Grade,
}

/// Sums marks, fills in each subject's grade and computes the aggregate
/// percentage and overall grade.
///
/// A zero `totalMarks` (per subject or in aggregate) would divide by zero;
/// that is rejected as a validation problem instead of propagating a
/// non-finite percentage.
pub fn compute_exam_totals(subjects: &mut [SubjectMarks]) -> Result<ExamTotals, Problem> {
    if subjects.is_empty() {
        return Err(problems::validation(
            "An exam result requires at least one subject entry.",
        ));
    }

    let mut total_marks_obtained = 0.0;
    let mut total_marks = 0.0;

    for entry in subjects.iter_mut() {
        if entry.total_marks <= 0.0 {
            return Err(problems::validation(
                "Subject totalMarks must be greater than zero.",
            ));
        }

        total_marks_obtained += entry.marks_obtained;
        total_marks += entry.total_marks;

        let percentage = (entry.marks_obtained / entry.total_marks) * 100.0;
        entry.grade = Some(grade_for_percentage(percentage));
    }

    let percentage = (total_marks_obtained / total_marks) * 100.0;

    Ok(ExamTotals {
        total_marks_obtained,
        total_marks,
        percentage,
        overall_grade: grade_for_percentage(percentage),
    })
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
    fn band_lower_bounds_are_inclusive() {
        assert_eq!(grade_for_percentage(90.0), Grade::APlus);
        assert_eq!(grade_for_percentage(89.99), Grade::A);
        assert_eq!(grade_for_percentage(80.0), Grade::A);
        assert_eq!(grade_for_percentage(70.0), Grade::BPlus);
        assert_eq!(grade_for_percentage(60.0), Grade::B);
        assert_eq!(grade_for_percentage(50.0), Grade::C);
        assert_eq!(grade_for_percentage(40.0), Grade::D);
        assert_eq!(grade_for_percentage(39.99), Grade::F);
    }

    #[test]
    fn out_of_range_input_does_not_panic() {
        assert_eq!(grade_for_percentage(240.0), Grade::APlus);
        assert_eq!(grade_for_percentage(-3.0), Grade::F);
        assert_eq!(grade_for_percentage(f64::NAN), Grade::F);
    }

    #[test]
    fn totals_and_grades_for_two_subjects() {
        let mut subjects = vec![marks(85.0, 100.0), marks(78.0, 100.0)];

        let totals = compute_exam_totals(&mut subjects).expect("valid marks");

        assert_eq!(totals.total_marks_obtained, 163.0);
        assert_eq!(totals.total_marks, 200.0);
        assert_eq!(totals.percentage, 81.5);
        assert_eq!(totals.overall_grade, Grade::A);
        assert_eq!(subjects[0].grade, Some(Grade::A));
        assert_eq!(subjects[1].grade, Some(Grade::BPlus));
    }

    #[test]
    fn zero_total_marks_is_rejected() {
        let mut subjects = vec![marks(10.0, 0.0)];
        let problem = compute_exam_totals(&mut subjects).unwrap_err();
        assert_eq!(problem.status.code, 400);
    }

    #[test]
    fn empty_subject_list_is_rejected() {
        let mut subjects: Vec<SubjectMarks> = vec![];
        assert!(compute_exam_totals(&mut subjects).is_err());
    }

    #[test]
    fn grade_serializes_with_plus_suffix() {
        assert_eq!(serde_json::to_string(&Grade::APlus).unwrap(), "\"A+\"");
        assert_eq!(serde_json::to_string(&Grade::BPlus).unwrap(), "\"B+\"");
        assert_eq!(serde_json::to_string(&Grade::F).unwrap(), "\"F\"");
    }
}
