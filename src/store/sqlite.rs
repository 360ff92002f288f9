use async_trait::async_trait;
use uuid::Uuid;

use crate::db::Database;
use crate::error::Result;
use crate::models::{NewStudent, Student};
use crate::store::StudentStore;

const COLUMNS: &str = "id, name, email, phone, profile, parent";

/// SQLite-backed student store
#[derive(Clone)]
pub struct SqliteStudentStore {
    db: Database,
}

impl SqliteStudentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StudentStore for SqliteStudentStore {
    async fn find_all(&self) -> Result<Vec<Student>> {
        let students: Vec<Student> =
            sqlx::query_as(&format!("SELECT {} FROM students ORDER BY rowid", COLUMNS))
                .fetch_all(self.db.pool())
                .await?;
        Ok(students)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Student>> {
        let student: Option<Student> =
            sqlx::query_as(&format!("SELECT {} FROM students WHERE id = ?", COLUMNS))
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(student)
    }

    async fn find_by_parent(&self, parent: &str) -> Result<Vec<Student>> {
        let students: Vec<Student> = sqlx::query_as(&format!(
            "SELECT {} FROM students WHERE parent = ? ORDER BY rowid",
            COLUMNS
        ))
        .bind(parent)
        .fetch_all(self.db.pool())
        .await?;
        Ok(students)
    }

    async fn insert(&self, student: NewStudent) -> Result<Student> {
        let student = Student {
            id: Uuid::new_v4().to_string(),
            name: student.name,
            email: student.email,
            phone: student.phone,
            profile: student.profile,
            parent: student.parent,
        };

        sqlx::query(
            r#"
            INSERT INTO students (id, name, email, phone, profile, parent)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&student.id)
        .bind(&student.name)
        .bind(&student.email)
        .bind(&student.phone)
        .bind(&student.profile)
        .bind(&student.parent)
        .execute(self.db.pool())
        .await?;

        Ok(student)
    }

    async fn save(&self, student: &Student) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE students SET name = ?, email = ?, phone = ?, profile = ?, parent = ? WHERE id = ?",
        )
        .bind(&student.name)
        .bind(&student.email)
        .bind(&student.phone)
        .bind(&student.profile)
        .bind(&student.parent)
        .bind(&student.id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_parent(&self, parent: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM students WHERE parent = ?")
            .bind(parent)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<Student>> {
        let student: Option<Student> = sqlx::query_as(&format!(
            "DELETE FROM students WHERE id = ? RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(student)
    }
}
