// src/handlers/guru.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::{
    config::PASSING_SCORE,
    error::AppError,
    models::{
        attempt::ExamResult,
        exam::{
            CreateExamRequest, Exam, ExamStatistics, ExamStatus, UpdateExamRequest,
            UpdateExamStatusRequest,
        },
        grade::{BulkGradeRequest, Grade, UpsertGradeRequest, letter_grade},
        question::{CreateQuestionRequest, Question, UpdateQuestionRequest, letter_options},
        user::{Role, User},
    },
    store::{Store, keys, new_id},
    utils::{csv::rows_to_csv, html::clean_html, jwt::Claims},
};

/// Query parameters for listing a teacher's exams.
#[derive(Debug, Deserialize)]
pub struct ExamListParams {
    pub subject: Option<String>,
    pub status: Option<ExamStatus>,
}

/// Lists the exams owned by the authenticated teacher.
/// Guru only.
pub async fn list_exams(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ExamListParams>,
) -> Result<impl IntoResponse, AppError> {
    let exams: Vec<Exam> = store.load(keys::EXAMS).await?;

    let own: Vec<Exam> = exams
        .into_iter()
        .filter(|e| e.teacher == claims.name)
        .filter(|e| params.subject.as_deref().is_none_or(|s| e.subject == s))
        .filter(|e| params.status.is_none_or(|s| e.status == s))
        .collect();

    Ok(Json(own))
}

/// Creates a new exam in draft status.
/// Guru only.
pub async fn create_exam(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut exams: Vec<Exam> = store.load(keys::EXAMS).await?;

    let exam = Exam {
        id: new_id("exam"),
        title: payload.title,
        subject: payload.subject,
        exam_type: payload.exam_type,
        date: payload.date,
        time: payload.time,
        duration: payload.duration,
        total_questions: payload.total_questions,
        max_score: payload.max_score,
        instructions: payload.instructions.map(|i| clean_html(&i)),
        classes: payload.classes,
        teacher: claims.name.clone(),
        status: ExamStatus::Draft,
        created_at: Utc::now(),
        updated_at: None,
    };

    let created = exam.clone();
    exams.push(exam);
    store.save(keys::EXAMS, &exams).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Updates one of the teacher's own exams.
/// Guru only.
pub async fn update_exam(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut exams: Vec<Exam> = store.load(keys::EXAMS).await?;

    let exam = exams
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    if exam.teacher != claims.name {
        return Err(AppError::Forbidden("Not your exam".to_string()));
    }

    if let Some(title) = payload.title {
        exam.title = title;
    }
    if let Some(subject) = payload.subject {
        exam.subject = subject;
    }
    if let Some(exam_type) = payload.exam_type {
        exam.exam_type = exam_type;
    }
    if let Some(date) = payload.date {
        exam.date = date;
    }
    if let Some(time) = payload.time {
        exam.time = time;
    }
    if let Some(duration) = payload.duration {
        exam.duration = duration;
    }
    if let Some(total_questions) = payload.total_questions {
        exam.total_questions = total_questions;
    }
    if let Some(max_score) = payload.max_score {
        exam.max_score = max_score;
    }
    if let Some(instructions) = payload.instructions {
        exam.instructions = Some(clean_html(&instructions));
    }
    if let Some(classes) = payload.classes {
        exam.classes = classes;
    }
    exam.updated_at = Some(Utc::now());

    let updated = exam.clone();
    store.save(keys::EXAMS, &exams).await?;

    Ok(Json(updated))
}

/// Deletes one of the teacher's own exams.
/// Guru only.
pub async fn delete_exam(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut exams: Vec<Exam> = store.load(keys::EXAMS).await?;

    let exam = exams
        .iter()
        .find(|e| e.id == id)
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    if exam.teacher != claims.name {
        return Err(AppError::Forbidden("Not your exam".to_string()));
    }

    exams.retain(|e| e.id != id);
    store.save(keys::EXAMS, &exams).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Moves an exam through its lifecycle. Publishing requires at least
/// one attached question.
/// Guru only.
pub async fn update_exam_status(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateExamStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut exams: Vec<Exam> = store.load(keys::EXAMS).await?;

    let index = exams
        .iter()
        .position(|e| e.id == id)
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    if exams[index].teacher != claims.name {
        return Err(AppError::Forbidden("Not your exam".to_string()));
    }

    if payload.status == ExamStatus::Published {
        let questions: Vec<Question> = store.load(keys::QUESTIONS).await?;
        let attached = questions
            .iter()
            .filter(|q| q.exam_id.as_deref() == Some(id.as_str()))
            .count();
        if attached == 0 {
            return Err(AppError::BadRequest("Exam has no questions".to_string()));
        }
    }

    exams[index].status = payload.status;
    exams[index].updated_at = Some(Utc::now());

    let updated = exams[index].clone();
    store.save(keys::EXAMS, &exams).await?;

    Ok(Json(updated))
}

/// Builds the aggregate statistics over a slice of attempt scores.
fn build_statistics(scores: &[u32]) -> ExamStatistics {
    let total = scores.len();
    let sum: u64 = scores.iter().map(|s| u64::from(*s)).sum();
    let passing = scores
        .iter()
        .filter(|s| f64::from(**s) >= PASSING_SCORE)
        .count();

    ExamStatistics {
        total_students: total,
        average_score: (sum as f64 / total as f64).round() as u32,
        highest_score: scores.iter().copied().max().unwrap_or(0),
        lowest_score: scores.iter().copied().min().unwrap_or(0),
        passing_rate: (passing as f64 / total as f64) * 100.0,
    }
}

/// Result statistics for one of the teacher's exams: average, extremes
/// and the share of students at or above the passing mark.
/// Guru only.
pub async fn exam_statistics(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exams: Vec<Exam> = store.load(keys::EXAMS).await?;

    let exam = exams
        .iter()
        .find(|e| e.id == id)
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    if exam.teacher != claims.name {
        return Err(AppError::Forbidden("Not your exam".to_string()));
    }

    let results: Vec<ExamResult> = store.load(keys::EXAM_RESULTS).await?;
    let scores: Vec<u32> = results
        .iter()
        .filter(|r| r.exam_id == id)
        .filter_map(|r| r.score)
        .collect();

    if scores.is_empty() {
        return Err(AppError::NotFound(
            "No results for this exam yet".to_string(),
        ));
    }

    Ok(Json(build_statistics(&scores)))
}

/// Query parameters for listing a teacher's question bank.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListParams {
    /// Free-text search over the question text.
    pub q: Option<String>,
    pub subject: Option<String>,
    pub difficulty: Option<String>,
    pub exam_id: Option<String>,
}

/// Lists the questions owned by the authenticated teacher.
/// Guru only.
pub async fn list_questions(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let questions: Vec<Question> = store.load(keys::QUESTIONS).await?;

    let needle = params.q.map(|q| q.to_lowercase());
    let own: Vec<Question> = questions
        .into_iter()
        .filter(|q| q.teacher == claims.name)
        .filter(|q| match &needle {
            Some(text) => q.text.to_lowercase().contains(text),
            None => true,
        })
        .filter(|q| {
            params
                .subject
                .as_deref()
                .is_none_or(|s| q.subject.as_deref() == Some(s))
        })
        .filter(|q| {
            params
                .difficulty
                .as_deref()
                .is_none_or(|d| q.difficulty.as_deref() == Some(d))
        })
        .filter(|q| {
            params
                .exam_id
                .as_deref()
                .is_none_or(|e| q.exam_id.as_deref() == Some(e))
        })
        .collect();

    Ok(Json(own))
}

/// Adds a question to the bank. Options are lettered A, B, C, ... by
/// position and the correct answer must name one of them.
/// Guru only.
pub async fn create_question(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let options = letter_options(&payload.options);
    let correct_answer = payload.correct_answer.to_uppercase();
    if !options.iter().any(|o| o.id == correct_answer) {
        return Err(AppError::BadRequest(
            "Correct answer must match one of the options".to_string(),
        ));
    }

    let mut questions: Vec<Question> = store.load(keys::QUESTIONS).await?;

    let question = Question {
        id: new_id("question"),
        exam_id: payload.exam_id,
        text: clean_html(&payload.text),
        subject: payload.subject,
        question_type: payload.question_type,
        difficulty: payload.difficulty,
        options,
        correct_answer,
        score: payload.score,
        explanation: payload.explanation.map(|e| clean_html(&e)),
        teacher: claims.name.clone(),
        created_at: Utc::now(),
    };

    let created = question.clone();
    questions.push(question);
    store.save(keys::QUESTIONS, &questions).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Updates one of the teacher's own questions. Replacing the options
/// re-letters them and revalidates the answer key.
/// Guru only.
pub async fn update_question(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut questions: Vec<Question> = store.load(keys::QUESTIONS).await?;

    let question = questions
        .iter_mut()
        .find(|q| q.id == id)
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if question.teacher != claims.name {
        return Err(AppError::Forbidden("Not your question".to_string()));
    }

    if let Some(text) = payload.text {
        question.text = clean_html(&text);
    }
    if let Some(exam_id) = payload.exam_id {
        question.exam_id = Some(exam_id);
    }
    if let Some(subject) = payload.subject {
        question.subject = Some(subject);
    }
    if let Some(question_type) = payload.question_type {
        question.question_type = Some(question_type);
    }
    if let Some(difficulty) = payload.difficulty {
        question.difficulty = Some(difficulty);
    }
    if let Some(options) = payload.options {
        if options.is_empty() || options.iter().any(|o| o.trim().is_empty()) {
            return Err(AppError::BadRequest(
                "All answer options must be filled in".to_string(),
            ));
        }
        question.options = letter_options(&options);
    }
    if let Some(correct_answer) = payload.correct_answer {
        question.correct_answer = correct_answer.to_uppercase();
    }
    if let Some(score) = payload.score {
        question.score = score;
    }
    if let Some(explanation) = payload.explanation {
        question.explanation = Some(clean_html(&explanation));
    }

    // The key must still point at an existing option after any edit.
    if !question
        .options
        .iter()
        .any(|o| o.id == question.correct_answer)
    {
        return Err(AppError::BadRequest(
            "Correct answer must match one of the options".to_string(),
        ));
    }

    let updated = question.clone();
    store.save(keys::QUESTIONS, &questions).await?;

    Ok(Json(updated))
}

/// Deletes one of the teacher's own questions.
/// Guru only.
pub async fn delete_question(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut questions: Vec<Question> = store.load(keys::QUESTIONS).await?;

    let question = questions
        .iter()
        .find(|q| q.id == id)
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if question.teacher != claims.name {
        return Err(AppError::Forbidden("Not your question".to_string()));
    }

    questions.retain(|q| q.id != id);
    store.save(keys::QUESTIONS, &questions).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for listing grades.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeListParams {
    pub exam_id: Option<String>,
}

/// Lists grades entered by the authenticated teacher.
/// Guru only.
pub async fn list_grades(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<GradeListParams>,
) -> Result<impl IntoResponse, AppError> {
    let grades: Vec<Grade> = store.load(keys::GRADES).await?;

    let own: Vec<Grade> = grades
        .into_iter()
        .filter(|g| g.teacher == claims.name)
        .filter(|g| params.exam_id.as_deref().is_none_or(|e| g.exam_id == e))
        .collect();

    Ok(Json(own))
}

/// Inserts or updates the grade stored for (studentId, examId).
fn upsert_into(
    grades: &mut Vec<Grade>,
    student_id: &str,
    exam_id: &str,
    grade: f64,
    subject: Option<String>,
    teacher: &str,
) {
    match grades
        .iter_mut()
        .find(|g| g.student_id == student_id && g.exam_id == exam_id)
    {
        Some(existing) => {
            existing.grade = grade;
            existing.updated_at = Some(Utc::now());
        }
        None => grades.push(Grade {
            student_id: student_id.to_owned(),
            exam_id: exam_id.to_owned(),
            subject,
            grade,
            teacher: teacher.to_owned(),
            created_at: Utc::now(),
            updated_at: None,
        }),
    }
}

/// Enters or corrects one student's grade for an exam.
/// Guru only.
pub async fn upsert_grade(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpsertGradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exams: Vec<Exam> = store.load(keys::EXAMS).await?;
    let subject = exams
        .iter()
        .find(|e| e.id == payload.exam_id)
        .map(|e| e.subject.clone());

    let mut grades: Vec<Grade> = store.load(keys::GRADES).await?;
    upsert_into(
        &mut grades,
        &payload.student_id,
        &payload.exam_id,
        payload.grade,
        subject,
        &claims.name,
    );
    store.save(keys::GRADES, &grades).await?;

    let saved = grades
        .iter()
        .find(|g| g.student_id == payload.student_id && g.exam_id == payload.exam_id)
        .cloned();

    Ok(Json(saved))
}

/// Gives the same grade to several students at once.
/// Guru only.
pub async fn bulk_grades(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BulkGradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exams: Vec<Exam> = store.load(keys::EXAMS).await?;
    let subject = exams
        .iter()
        .find(|e| e.id == payload.exam_id)
        .map(|e| e.subject.clone());

    let mut grades: Vec<Grade> = store.load(keys::GRADES).await?;
    for student_id in &payload.student_ids {
        upsert_into(
            &mut grades,
            student_id,
            &payload.exam_id,
            payload.grade,
            subject.clone(),
            &claims.name,
        );
    }
    store.save(keys::GRADES, &grades).await?;

    Ok(Json(serde_json::json!({
        "updated": payload.student_ids.len()
    })))
}

/// Exports the teacher's grades as CSV with letter grades.
/// Guru only.
pub async fn export_grades(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<GradeListParams>,
) -> Result<impl IntoResponse, AppError> {
    let grades: Vec<Grade> = store.load(keys::GRADES).await?;
    let users: Vec<User> = store.load(keys::USERS).await?;

    let rows: Vec<Vec<String>> = grades
        .iter()
        .filter(|g| g.teacher == claims.name)
        .filter(|g| params.exam_id.as_deref().is_none_or(|e| g.exam_id == e))
        .map(|g| {
            let student = users
                .iter()
                .find(|u| u.id == g.student_id && u.role == Role::Siswa);
            let nis = student
                .and_then(|u| u.nis.clone())
                .unwrap_or_else(|| g.student_id.clone());
            let name = student.map(|u| u.name.clone()).unwrap_or_default();
            vec![
                nis,
                name,
                g.subject.clone().unwrap_or_default(),
                g.grade.to_string(),
                letter_grade(g.grade).to_string(),
            ]
        })
        .collect();

    let document = rows_to_csv(&["NIS", "Nama", "Mata Pelajaran", "Nilai", "Grade"], &rows);

    Ok(([(header::CONTENT_TYPE, "text/csv")], document))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_over_mixed_scores() {
        let stats = build_statistics(&[50, 75, 100]);
        assert_eq!(stats.total_students, 3);
        assert_eq!(stats.average_score, 75);
        assert_eq!(stats.highest_score, 100);
        assert_eq!(stats.lowest_score, 50);
        // 75 and 100 pass the 75-point mark.
        assert!((stats.passing_rate - 66.666).abs() < 0.01);
    }

    #[test]
    fn statistics_rounds_the_average() {
        let stats = build_statistics(&[70, 71]);
        assert_eq!(stats.average_score, 71); // 70.5 rounds up
    }

    #[test]
    fn upsert_updates_in_place() {
        let mut grades = Vec::new();
        upsert_into(
            &mut grades,
            "siswa_1",
            "exam_1",
            80.0,
            Some("Matematika".to_string()),
            "Diana Sari, S.Pd.",
        );
        upsert_into(&mut grades, "siswa_1", "exam_1", 92.0, None, "Diana Sari, S.Pd.");
        upsert_into(&mut grades, "siswa_2", "exam_1", 75.0, None, "Diana Sari, S.Pd.");

        assert_eq!(grades.len(), 2);
        assert_eq!(grades[0].grade, 92.0);
        assert!(grades[0].updated_at.is_some());
        // The original subject survives a correction.
        assert_eq!(grades[0].subject.as_deref(), Some("Matematika"));
    }
}
