// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    config::STORAGE_LIMIT_BYTES,
    error::AppError,
    models::{
        exam::{Exam, ExamStatus},
        grade::Grade,
        question::Question,
        settings::{SaveSettingsRequest, SchoolSettings},
        user::{
            CreateUserRequest, PublicUser, Role, UpdateUserRequest, User, generate_nip,
            generate_nis,
        },
    },
    store::{Store, keys, new_id},
    utils::{
        csv::{rows_to_csv, sections_to_csv},
        hash::hash_password,
        jwt::Claims,
    },
};

/// Query parameters for listing users.
#[derive(Debug, Deserialize)]
pub struct UserListParams {
    /// Free-text search over name, email and role.
    pub q: Option<String>,
    pub role: Option<Role>,
    pub status: Option<String>,
}

/// Lists users, optionally narrowed by search text, role and status.
/// Admin only.
pub async fn list_users(
    State(store): State<Store>,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse, AppError> {
    let users: Vec<User> = store.load(keys::USERS).await?;

    let needle = params.q.map(|q| q.to_lowercase());
    let filtered: Vec<PublicUser> = users
        .iter()
        .filter(|u| match &needle {
            Some(q) => {
                u.name.to_lowercase().contains(q)
                    || u.email
                        .as_deref()
                        .is_some_and(|e| e.to_lowercase().contains(q))
                    || u.role.as_str().contains(q.as_str())
            }
            None => true,
        })
        .filter(|u| params.role.is_none_or(|r| u.role == r))
        .filter(|u| params.status.as_deref().is_none_or(|s| u.status == s))
        .map(PublicUser::from)
        .collect();

    Ok(Json(filtered))
}

/// Creates a new user with a role-specific id. Students get a
/// generated NIS, teachers a generated NIP.
/// Admin only.
pub async fn create_user(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut users: Vec<User> = store.load(keys::USERS).await?;

    if users.iter().any(|u| u.username == payload.username) {
        return Err(AppError::Conflict(format!(
            "Username '{}' already exists",
            payload.username
        )));
    }

    let now = Utc::now();
    let (nis, nip) = match payload.role {
        Role::Siswa => (Some(generate_nis(now)), None),
        Role::Guru => (None, Some(generate_nip(now))),
        Role::Admin => (None, None),
    };

    let user = User {
        id: new_id(payload.role.id_prefix()),
        name: payload.name,
        email: payload.email,
        username: payload.username,
        password: hash_password(&payload.password)?,
        role: payload.role,
        nis,
        nip,
        mata_pelajaran: payload.mata_pelajaran,
        kelas: payload.kelas,
        status: "active".to_string(),
        created_by: Some(claims.name.clone()),
        created_at: now,
        updated_at: None,
    };

    let public = PublicUser::from(&user);
    users.push(user);
    store.save(keys::USERS, &users).await?;

    Ok((StatusCode::CREATED, Json(public)))
}

/// Updates user information.
/// Admin only.
pub async fn update_user(
    State(store): State<Store>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut users: Vec<User> = store.load(keys::USERS).await?;

    if let Some(new_username) = &payload.username {
        if users
            .iter()
            .any(|u| u.username == *new_username && u.id != id)
        {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                new_username
            )));
        }
    }

    let user = users
        .iter_mut()
        .find(|u| u.id == id)
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if let Some(name) = payload.name {
        user.name = name;
    }
    if let Some(email) = payload.email {
        user.email = Some(email);
    }
    if let Some(username) = payload.username {
        user.username = username;
    }
    if let Some(password) = payload.password {
        user.password = hash_password(&password)?;
    }
    if let Some(role) = payload.role {
        user.role = role;
    }
    if let Some(status) = payload.status {
        user.status = status;
    }
    if let Some(mata_pelajaran) = payload.mata_pelajaran {
        user.mata_pelajaran = Some(mata_pelajaran);
    }
    if let Some(kelas) = payload.kelas {
        user.kelas = Some(kelas);
    }
    user.updated_at = Some(Utc::now());

    let public = PublicUser::from(&*user);
    store.save(keys::USERS, &users).await?;

    Ok(Json(public))
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.sub {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let mut users: Vec<User> = store.load(keys::USERS).await?;
    let before = users.len();
    users.retain(|u| u.id != id);

    if users.len() == before {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    store.save(keys::USERS, &users).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the stored school settings (defaults if never saved).
/// Admin only.
pub async fn get_settings(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let settings: SchoolSettings = store.load_object(keys::SETTINGS).await?;
    Ok(Json(settings))
}

/// Replaces the school settings, stamping who saved them.
/// Admin only.
pub async fn save_settings(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SaveSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let settings = SchoolSettings {
        school_name: payload.school_name,
        school_address: payload.school_address,
        school_phone: payload.school_phone,
        school_email: payload.school_email,
        academic_year: payload.academic_year,
        semester: payload.semester,
        max_students: payload.max_students,
        grade_scale: payload.grade_scale,
        updated_by: Some(claims.name),
        updated_at: Some(Utc::now()),
    };

    store.save_object(keys::SETTINGS, &settings).await?;

    Ok(Json(settings))
}

/// Dashboard counters plus the storage usage percentage.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_users: usize,
    pub total_students: usize,
    pub total_teachers: usize,
    pub total_admins: usize,
    pub total_exams: usize,
    pub total_questions: usize,
    pub active_exams: usize,
    /// Serialized size of the primary collections against the 10 MB
    /// budget, in percent.
    pub storage_usage: u32,
}

/// Computes the dashboard statistics.
/// Admin only.
pub async fn system_stats(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let users: Vec<User> = store.load(keys::USERS).await?;
    let exams: Vec<Exam> = store.load(keys::EXAMS).await?;
    let questions: Vec<Question> = store.load(keys::QUESTIONS).await?;

    let used = store.used_bytes().await?;
    let storage_usage =
        (((used as f64 / STORAGE_LIMIT_BYTES as f64) * 100.0).round() as u32).min(100);

    let stats = SystemStats {
        total_users: users.len(),
        total_students: users.iter().filter(|u| u.role == Role::Siswa).count(),
        total_teachers: users.iter().filter(|u| u.role == Role::Guru).count(),
        total_admins: users.iter().filter(|u| u.role == Role::Admin).count(),
        total_exams: exams.len(),
        total_questions: questions.len(),
        active_exams: exams
            .iter()
            .filter(|e| e.status == ExamStatus::Published)
            .count(),
        storage_usage,
    };

    Ok(Json(stats))
}

/// Full backup of the primary collections. Exam results are not
/// bundled.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupBundle {
    pub users: Vec<User>,
    pub exams: Vec<Exam>,
    pub questions: Vec<Question>,
    pub grades: Vec<Grade>,
    pub settings: SchoolSettings,
    pub backup_date: DateTime<Utc>,
    pub backed_up_by: String,
}

/// Produces a downloadable JSON backup of all primary collections.
/// Admin only.
pub async fn backup(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let bundle = BackupBundle {
        users: store.load(keys::USERS).await?,
        exams: store.load(keys::EXAMS).await?,
        questions: store.load(keys::QUESTIONS).await?,
        grades: store.load(keys::GRADES).await?,
        settings: store.load_object(keys::SETTINGS).await?,
        backup_date: Utc::now(),
        backed_up_by: claims.name,
    };

    tracing::info!("Backup created by {}", bundle.backed_up_by);

    Ok(Json(bundle))
}

/// DTO for restoring from a backup. Only the collections present in
/// the bundle are written back.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    pub users: Option<Vec<User>>,
    pub exams: Option<Vec<Exam>>,
    pub questions: Option<Vec<Question>>,
    pub grades: Option<Vec<Grade>>,
    pub settings: Option<SchoolSettings>,
}

/// Restores collections from an uploaded backup bundle.
/// Admin only.
pub async fn restore(
    State(store): State<Store>,
    Json(payload): Json<RestoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(users) = &payload.users {
        store.save(keys::USERS, users).await?;
    }
    if let Some(exams) = &payload.exams {
        store.save(keys::EXAMS, exams).await?;
    }
    if let Some(questions) = &payload.questions {
        store.save(keys::QUESTIONS, questions).await?;
    }
    if let Some(grades) = &payload.grades {
        store.save(keys::GRADES, grades).await?;
    }
    if let Some(settings) = &payload.settings {
        store.save_object(keys::SETTINGS, settings).await?;
    }

    Ok(Json(serde_json::json!({
        "message": "Restore completed"
    })))
}

/// Exports students, teachers and grades as one CSV document with the
/// DATA SISWA / DATA GURU / DATA NILAI sections.
/// Admin only.
pub async fn export_csv(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let users: Vec<User> = store.load(keys::USERS).await?;
    let grades: Vec<Grade> = store.load(keys::GRADES).await?;

    let student_rows: Vec<Vec<String>> = users
        .iter()
        .filter(|u| u.role == Role::Siswa)
        .map(|u| {
            vec![
                u.nis.clone().unwrap_or_default(),
                u.name.clone(),
                u.kelas.clone().unwrap_or_default(),
                u.email.clone().unwrap_or_default(),
                u.status.clone(),
            ]
        })
        .collect();

    let teacher_rows: Vec<Vec<String>> = users
        .iter()
        .filter(|u| u.role == Role::Guru)
        .map(|u| {
            vec![
                u.nip.clone().unwrap_or_default(),
                u.name.clone(),
                u.mata_pelajaran.clone().unwrap_or_default(),
                u.email.clone().unwrap_or_default(),
                u.status.clone(),
            ]
        })
        .collect();

    let grade_rows: Vec<Vec<String>> = grades
        .iter()
        .map(|g| {
            let nis = users
                .iter()
                .find(|u| u.id == g.student_id)
                .and_then(|u| u.nis.clone())
                .unwrap_or_else(|| g.student_id.clone());
            vec![
                nis,
                g.subject.clone().unwrap_or_default(),
                g.grade.to_string(),
                g.created_at.to_rfc3339(),
            ]
        })
        .collect();

    let document = sections_to_csv(&[
        (
            "DATA SISWA",
            rows_to_csv(&["NIS", "Nama", "Kelas", "Email", "Status"], &student_rows),
        ),
        (
            "DATA GURU",
            rows_to_csv(
                &["NIP", "Nama", "Mata_Pelajaran", "Email", "Status"],
                &teacher_rows,
            ),
        ),
        (
            "DATA NILAI",
            rows_to_csv(
                &["NIS", "Mata_Pelajaran", "Nilai", "Tanggal"],
                &grade_rows,
            ),
        ),
    ]);

    Ok(([(header::CONTENT_TYPE, "text/csv")], document))
}

/// Removes exams older than one year and grades outside the current or
/// previous calendar year.
/// Admin only.
pub async fn cleanup(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let one_year_ago = now - Duration::days(365);
    let current_year = now.year();

    let mut exams: Vec<Exam> = store.load(keys::EXAMS).await?;
    let exams_before = exams.len();
    exams.retain(|e| e.created_at > one_year_ago);
    let removed_exams = exams_before - exams.len();
    store.save(keys::EXAMS, &exams).await?;

    let mut grades: Vec<Grade> = store.load(keys::GRADES).await?;
    let grades_before = grades.len();
    grades.retain(|g| {
        let year = g.created_at.year();
        year == current_year || year == current_year - 1
    });
    let removed_grades = grades_before - grades.len();
    store.save(keys::GRADES, &grades).await?;

    tracing::info!(
        "Cleanup removed {} exams and {} grades",
        removed_exams,
        removed_grades
    );

    Ok(Json(serde_json::json!({
        "removedExams": removed_exams,
        "removedGrades": removed_grades,
    })))
}

/// Query parameters for the report generator.
#[derive(Debug, Deserialize)]
pub struct ReportParams {
    #[serde(rename = "type")]
    pub report_type: Option<String>,
    pub period: Option<String>,
}

/// Generates an aggregate report: headline counters plus per-subject
/// grade averages.
/// Admin only.
pub async fn report(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse, AppError> {
    let users: Vec<User> = store.load(keys::USERS).await?;
    let exams: Vec<Exam> = store.load(keys::EXAMS).await?;
    let grades: Vec<Grade> = store.load(keys::GRADES).await?;

    let average_grade = if grades.is_empty() {
        0.0
    } else {
        let sum: f64 = grades.iter().map(|g| g.grade).sum();
        (sum / grades.len() as f64 * 10.0).round() / 10.0
    };

    let pass_rate = if grades.is_empty() {
        0.0
    } else {
        let passing = grades
            .iter()
            .filter(|g| g.grade >= crate::config::PASSING_SCORE)
            .count();
        (passing as f64 / grades.len() as f64 * 100.0).round()
    };

    // Per-subject grade averages for the details block.
    let mut subjects: Vec<String> = grades
        .iter()
        .filter_map(|g| g.subject.clone())
        .collect();
    subjects.sort();
    subjects.dedup();

    let details: Vec<serde_json::Value> = subjects
        .into_iter()
        .map(|subject| {
            let subject_grades: Vec<f64> = grades
                .iter()
                .filter(|g| g.subject.as_deref() == Some(subject.as_str()))
                .map(|g| g.grade)
                .collect();
            let avg = subject_grades.iter().sum::<f64>() / subject_grades.len() as f64;
            serde_json::json!({
                "subject": subject,
                "count": subject_grades.len(),
                "averageGrade": (avg * 10.0).round() / 10.0,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "type": params.report_type.unwrap_or_else(|| "academic".to_string()),
        "period": params.period.unwrap_or_else(|| "monthly".to_string()),
        "generatedAt": Utc::now(),
        "generatedBy": claims.name,
        "summary": {
            "totalStudents": users.iter().filter(|u| u.role == Role::Siswa).count(),
            "totalTeachers": users.iter().filter(|u| u.role == Role::Guru).count(),
            "totalExams": exams.len(),
            "averageGrade": average_grade,
            "passRate": pass_rate,
        },
        "details": details,
    })))
}
