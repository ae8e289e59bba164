// src/handlers/ulangan.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        attempt::{
            AttemptStatus, ExamResult, MoveAction, MoveRequest, SaveAnswerRequest, format_clock,
            warning_level,
        },
        exam::{Exam, ExamStatus},
        question::{PublicQuestion, Question},
        user::User,
    },
    store::{Store, keys},
    utils::jwt::Claims,
};

/// Live countdown/progress snapshot for an attempt.
fn attempt_status(attempt: &ExamResult, exam: &Exam, total_questions: usize) -> AttemptStatus {
    let now = Utc::now();
    let remaining = attempt.remaining_seconds(exam.duration, now);

    AttemptStatus {
        current_question: attempt.current_question,
        answered_count: attempt.answered_count(),
        unanswered_count: total_questions.saturating_sub(attempt.answered_count()),
        remaining_seconds: remaining,
        clock: format_clock(remaining),
        warning: warning_level(remaining),
        expired: remaining == 0,
    }
}

/// Computes (correct count, percentage score) for an attempt.
/// Every question counts the same; the percentage is rounded.
fn calculate_score(questions: &[Question], answers: &HashMap<String, String>) -> (usize, u32) {
    if questions.is_empty() {
        return (0, 0);
    }

    let correct = questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_answer))
        .count();

    let score = ((correct as f64 / questions.len() as f64) * 100.0).round() as u32;
    (correct, score)
}

/// Questions attached to an exam, in stored order.
fn questions_for_exam(questions: &[Question], exam_id: &str) -> Vec<Question> {
    questions
        .iter()
        .filter(|q| q.exam_id.as_deref() == Some(exam_id))
        .cloned()
        .collect()
}

/// Lists the published exams assigned to the student's class.
/// Siswa only.
pub async fn list_available(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let users: Vec<User> = store.load(keys::USERS).await?;
    let kelas = users
        .iter()
        .find(|u| u.id == claims.sub)
        .and_then(|u| u.kelas.clone())
        .ok_or(AppError::BadRequest(
            "No class assigned to this account".to_string(),
        ))?;

    let exams: Vec<Exam> = store.load(keys::EXAMS).await?;
    let available: Vec<Exam> = exams
        .into_iter()
        .filter(|e| e.status == ExamStatus::Published)
        .filter(|e| e.classes.iter().any(|c| c == &kelas))
        .collect();

    Ok(Json(available))
}

/// Payload returned when an attempt starts or resumes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExamResponse {
    pub exam: Exam,
    pub questions: Vec<PublicQuestion>,
    pub status: AttemptStatus,
}

/// Starts the student's attempt at a published exam, or resumes the
/// in-progress one. The answer key never leaves the server.
/// Siswa only.
pub async fn start_exam(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exams: Vec<Exam> = store.load(keys::EXAMS).await?;
    let exam = exams
        .iter()
        .find(|e| e.id == exam_id)
        .ok_or(AppError::NotFound("Exam not found".to_string()))?
        .clone();

    if exam.status != ExamStatus::Published {
        return Err(AppError::BadRequest("Exam is not open".to_string()));
    }

    let users: Vec<User> = store.load(keys::USERS).await?;
    let kelas = users
        .iter()
        .find(|u| u.id == claims.sub)
        .and_then(|u| u.kelas.clone());
    if !kelas.is_some_and(|k| exam.classes.iter().any(|c| c == &k)) {
        return Err(AppError::Forbidden(
            "Exam is not assigned to your class".to_string(),
        ));
    }

    let all_questions: Vec<Question> = store.load(keys::QUESTIONS).await?;
    let questions = questions_for_exam(&all_questions, &exam.id);
    if questions.is_empty() {
        return Err(AppError::BadRequest("Exam has no questions".to_string()));
    }

    let mut results: Vec<ExamResult> = store.load(keys::EXAM_RESULTS).await?;

    let existing = results
        .iter()
        .position(|r| r.exam_id == exam.id && r.student_id == claims.sub);

    let attempt = match existing {
        Some(i) if results[i].is_completed() => {
            return Err(AppError::Conflict("Exam already completed".to_string()));
        }
        // Resume: the countdown keeps running from the original start.
        Some(i) => results[i].clone(),
        None => {
            let fresh = ExamResult::new(&exam.id, &claims.sub, Utc::now());
            results.push(fresh.clone());
            store.save(keys::EXAM_RESULTS, &results).await?;
            tracing::info!("Attempt started: {} by {}", exam.id, claims.sub);
            fresh
        }
    };

    let status = attempt_status(&attempt, &exam, questions.len());

    Ok(Json(StartExamResponse {
        exam,
        questions: questions.iter().map(PublicQuestion::from).collect(),
        status,
    }))
}

/// Loads the exam plus the attempt list and the index of this
/// student's attempt, erroring out on missing exams or attempts.
async fn load_attempt(
    store: &Store,
    exam_id: &str,
    student_id: &str,
) -> Result<(Exam, Vec<ExamResult>, usize), AppError> {
    let exams: Vec<Exam> = store.load(keys::EXAMS).await?;
    let exam = exams
        .iter()
        .find(|e| e.id == exam_id)
        .ok_or(AppError::NotFound("Exam not found".to_string()))?
        .clone();

    let results: Vec<ExamResult> = store.load(keys::EXAM_RESULTS).await?;
    let index = results
        .iter()
        .position(|r| r.exam_id == exam_id && r.student_id == student_id)
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    Ok((exam, results, index))
}

/// Returns the countdown/progress state of the in-progress attempt.
/// Siswa only.
pub async fn get_status(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (exam, results, index) = load_attempt(&store, &exam_id, &claims.sub).await?;
    let attempt = &results[index];

    if attempt.is_completed() {
        return Err(AppError::Conflict("Exam already completed".to_string()));
    }

    let questions: Vec<Question> = store.load(keys::QUESTIONS).await?;
    let total = questions_for_exam(&questions, &exam_id).len();

    Ok(Json(attempt_status(attempt, &exam, total)))
}

/// Records one answer. The question must belong to the exam and the
/// option letter must exist; nothing is accepted after time runs out.
/// Siswa only.
pub async fn save_answer(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
    Json(payload): Json<SaveAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (exam, mut results, index) = load_attempt(&store, &exam_id, &claims.sub).await?;

    if results[index].is_completed() {
        return Err(AppError::Conflict("Exam already completed".to_string()));
    }
    if results[index].is_expired(exam.duration, Utc::now()) {
        return Err(AppError::BadRequest("Time is up".to_string()));
    }

    let all_questions: Vec<Question> = store.load(keys::QUESTIONS).await?;
    let questions = questions_for_exam(&all_questions, &exam_id);

    let question = questions
        .iter()
        .find(|q| q.id == payload.question_id)
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let letter = payload.option_id.to_uppercase();
    if !question.options.iter().any(|o| o.id == letter) {
        return Err(AppError::BadRequest(format!(
            "Unknown option '{}'",
            payload.option_id
        )));
    }

    results[index].answers.insert(question.id.clone(), letter);
    store.save(keys::EXAM_RESULTS, &results).await?;

    Ok(Json(attempt_status(&results[index], &exam, questions.len())))
}

/// Moves the stored question position: next and prev walk one step and
/// stop at the ends; goto jumps to an index.
/// Siswa only.
pub async fn move_position(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
    Json(payload): Json<MoveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (exam, mut results, index) = load_attempt(&store, &exam_id, &claims.sub).await?;

    if results[index].is_completed() {
        return Err(AppError::Conflict("Exam already completed".to_string()));
    }
    if results[index].is_expired(exam.duration, Utc::now()) {
        return Err(AppError::BadRequest("Time is up".to_string()));
    }

    let questions: Vec<Question> = store.load(keys::QUESTIONS).await?;
    let total = questions_for_exam(&questions, &exam_id).len();

    match payload.action {
        MoveAction::Next => results[index].step_next(total),
        MoveAction::Prev => results[index].step_prev(),
        MoveAction::Goto => {
            let target = payload
                .index
                .ok_or(AppError::BadRequest("Index is required for goto".to_string()))?;
            if !results[index].jump_to(target, total) {
                return Err(AppError::BadRequest(
                    "Question index out of range".to_string(),
                ));
            }
        }
    }

    store.save(keys::EXAM_RESULTS, &results).await?;

    Ok(Json(attempt_status(&results[index], &exam, total)))
}

/// Finalizes the attempt: scores it, stamps completion time and the
/// capped time spent. An expired attempt may still submit.
/// Siswa only.
pub async fn submit_exam(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (exam, mut results, index) = load_attempt(&store, &exam_id, &claims.sub).await?;

    if results[index].is_completed() {
        return Err(AppError::Conflict("Exam already completed".to_string()));
    }

    let all_questions: Vec<Question> = store.load(keys::QUESTIONS).await?;
    let questions = questions_for_exam(&all_questions, &exam_id);

    let now = Utc::now();
    let (correct_count, score) = calculate_score(&questions, &results[index].answers);
    let time_spent = results[index].elapsed_seconds(exam.duration, now);

    results[index].score = Some(score);
    results[index].completed_at = Some(now);
    results[index].time_spent = Some(time_spent);
    store.save(keys::EXAM_RESULTS, &results).await?;

    tracing::info!(
        "Attempt submitted: {} by {} scored {}",
        exam_id,
        claims.sub,
        score
    );

    Ok(Json(serde_json::json!({
        "score": score,
        "correctCount": correct_count,
        "totalQuestions": questions.len(),
        "timeSpent": time_spent,
        "message": "Exam submitted successfully"
    })))
}

/// Lists the student's own finished results.
/// Siswa only.
pub async fn my_results(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let results: Vec<ExamResult> = store.load(keys::EXAM_RESULTS).await?;

    let own: Vec<ExamResult> = results
        .into_iter()
        .filter(|r| r.student_id == claims.sub && r.is_completed())
        .collect();

    Ok(Json(own))
}
