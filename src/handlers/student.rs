use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::header,
    Json,
};

use crate::error::{AppError, Result};
use crate::models::{
    CreateStudentRequest, DeleteStudentResponse, Student, UpdateStudentRequest, Upload,
};
use crate::AppState;

/// Student fields plus the optional `profile` upload.
///
/// Accepts `multipart/form-data` or `application/json`. Any other body is
/// read as "no fields given".
#[derive(Debug, Default)]
pub struct StudentForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub parent: Option<String>,
    pub profile: Option<Upload>,
}

impl StudentForm {
    fn into_create(self) -> (CreateStudentRequest, Option<Upload>) {
        let req = CreateStudentRequest {
            name: self.name,
            email: self.email,
            phone: self.phone,
            parent: self.parent,
        };
        (req, self.profile)
    }

    fn into_update(self) -> (UpdateStudentRequest, Option<Upload>) {
        let req = UpdateStudentRequest {
            name: self.name,
            email: self.email,
            phone: self.phone,
        };
        (req, self.profile)
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = StudentForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            AppError::BadRequest(format!("Failed to process multipart: {}", e))
        })? {
            let name = field.name().unwrap_or("").to_string();

            match name.as_str() {
                "profile" => {
                    let file_name = field.file_name().map(|s| s.to_string());
                    let content_type = field.content_type().map(|s| s.to_string());

                    let data = field.bytes().await.map_err(|e| {
                        AppError::BadRequest(format!("Failed to read file: {}", e))
                    })?;

                    // Plain text part or an empty file input
                    let Some(file_name) = file_name.filter(|n| !n.is_empty()) else {
                        continue;
                    };

                    let file_name = base_name(&file_name).ok_or_else(|| {
                        AppError::BadRequest(format!("Invalid file name: {:?}", file_name))
                    })?;

                    form.profile = Some(Upload {
                        file_name,
                        content_type,
                        data,
                    });
                }
                "name" | "email" | "phone" | "parent" => {
                    let text = field.text().await.map_err(|e| {
                        AppError::BadRequest(format!("Failed to read field {}: {}", name, e))
                    })?;
                    match name.as_str() {
                        "name" => form.name = Some(text),
                        "email" => form.email = Some(text),
                        "phone" => form.phone = Some(text),
                        _ => form.parent = Some(text),
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

#[async_trait]
impl<S> FromRequest<S> for StudentForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?;
            Self::from_multipart(multipart).await
        } else if content_type.starts_with("application/json") {
            let Json(fields) = Json::<CreateStudentRequest>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;
            Ok(Self {
                name: fields.name,
                email: fields.email,
                phone: fields.phone,
                parent: fields.parent,
                profile: None,
            })
        } else {
            Ok(Self::default())
        }
    }
}

/// Last path component of a client-supplied file name
fn base_name(file_name: &str) -> Option<String> {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(|n| n.to_string())
}

/// List all students
/// GET /students
pub async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<Student>>> {
    let students = state.students.list().await?;
    Ok(Json(students))
}

/// Get a student by ID
/// GET /students/:id
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Student>> {
    let student = state.students.get(&id).await?;
    Ok(Json(student))
}

/// Create a student
/// POST /students
pub async fn create_student(
    State(state): State<AppState>,
    form: StudentForm,
) -> Result<Json<Student>> {
    let (req, upload) = form.into_create();
    let student = state.students.create(req, upload).await?;
    Ok(Json(student))
}

/// Update a student
/// PUT /students/:id
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: StudentForm,
) -> Result<Json<Student>> {
    let (req, upload) = form.into_update();
    let student = state.students.update(&id, req, upload).await?;
    Ok(Json(student))
}

/// Delete a student and its direct children
/// DELETE /students/:id
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteStudentResponse>> {
    let deleted = state.students.delete(&id).await?;
    Ok(Json(DeleteStudentResponse {
        message: "User deleted".to_string(),
        children_removed: deleted.children_removed,
    }))
}
