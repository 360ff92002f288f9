use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    CreateStudentRequest, NewStudent, Student, UpdateStudentRequest, Upload,
};
use crate::storage::BlobStore;
use crate::store::StudentStore;

/// Manages student records together with their profile images
#[derive(Clone)]
pub struct StudentService {
    store: Arc<dyn StudentStore>,
    blobs: Arc<dyn BlobStore>,
    tolerate_missing_blobs: bool,
}

/// Outcome of a cascading delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedStudent {
    pub student: Student,
    pub children_removed: u64,
}

impl StudentService {
    pub fn new(
        store: Arc<dyn StudentStore>,
        blobs: Arc<dyn BlobStore>,
        tolerate_missing_blobs: bool,
    ) -> Self {
        Self {
            store,
            blobs,
            tolerate_missing_blobs,
        }
    }

    /// List every student
    pub async fn list(&self) -> Result<Vec<Student>> {
        self.store.find_all().await
    }

    /// Get a student by ID
    pub async fn get(&self, id: &str) -> Result<Student> {
        let id = parse_id(id)?;
        self.store
            .find_by_id(&id)
            .await?
            .ok_or_else(not_found)
    }

    /// Create a student, storing the upload first if there is one
    pub async fn create(
        &self,
        req: CreateStudentRequest,
        upload: Option<Upload>,
    ) -> Result<Student> {
        // Empty parent means root level
        let parent = match req.parent.filter(|p| !p.is_empty()) {
            Some(p) => Some(parse_id(&p)?),
            None => None,
        };

        let profile = match upload {
            Some(upload) => self.store_upload(upload).await?,
            None => String::new(),
        };

        let student = self
            .store
            .insert(NewStudent {
                name: req.name,
                email: req.email,
                phone: req.phone,
                profile,
                parent,
            })
            .await?;

        tracing::info!("Created student {} (parent: {:?})", student.id, student.parent);
        Ok(student)
    }

    /// Replace name, email and phone; swap the profile image only when a new one is uploaded
    pub async fn update(
        &self,
        id: &str,
        req: UpdateStudentRequest,
        upload: Option<Upload>,
    ) -> Result<Student> {
        let mut student = self.get(id).await?;

        student.name = req.name;
        student.email = req.email;
        student.phone = req.phone;

        if let Some(upload) = upload {
            let previous = std::mem::take(&mut student.profile);
            student.profile = self.store_upload(upload).await?;

            // Same name was just overwritten in place
            if !previous.is_empty() && previous != student.profile {
                self.remove_blob(&previous).await?;
            }
        }

        if !self.store.save(&student).await? {
            return Err(not_found());
        }

        tracing::info!("Updated student {}", student.id);
        Ok(student)
    }

    /// Delete a student, its direct children, and every profile image involved.
    ///
    /// Children go first. Grandchildren are left in place. Nothing is rolled
    /// back if a later step fails.
    pub async fn delete(&self, id: &str) -> Result<DeletedStudent> {
        let id = parse_id(id)?;
        let id = id.as_str();

        let target = self.store.find_by_id(id).await?.ok_or_else(not_found)?;
        let self_parented = target.parent.as_deref() == Some(id);

        // A record listed as its own parent is handled as the target below
        let children: Vec<Student> = self
            .store
            .find_by_parent(id)
            .await?
            .into_iter()
            .filter(|child| child.id != id)
            .collect();

        for child in children.iter().filter(|c| c.has_profile()) {
            self.remove_blob(&child.profile).await?;
        }

        let mut children_removed = 0;
        if !children.is_empty() {
            children_removed = self.store.delete_by_parent(id).await?;
            if self_parented {
                children_removed = children_removed.saturating_sub(1);
            }
        }

        // The bulk delete above already took a self-parented target with it
        let student = match self.store.delete_by_id(id).await? {
            Some(student) => student,
            None if self_parented && !children.is_empty() => target,
            None => return Err(not_found()),
        };

        if student.has_profile() {
            self.remove_blob(&student.profile).await?;
        }

        tracing::info!(
            "Deleted student {} and {} direct children",
            student.id,
            children_removed
        );
        Ok(DeletedStudent {
            student,
            children_removed,
        })
    }

    async fn store_upload(&self, upload: Upload) -> Result<String> {
        tracing::debug!(
            "Storing upload {} ({} bytes, {:?}) in {} storage",
            upload.file_name,
            upload.data.len(),
            upload.content_type,
            self.blobs.storage_type()
        );
        self.blobs.put(&upload.file_name, upload.data).await?;
        Ok(upload.file_name)
    }

    async fn remove_blob(&self, name: &str) -> Result<()> {
        match self.blobs.delete(name).await {
            Err(AppError::BlobMissing(missing)) if self.tolerate_missing_blobs => {
                tracing::warn!("Profile image {} already gone, continuing", missing);
                Ok(())
            }
            other => other,
        }
    }
}

/// Canonical lowercase hyphenated form, the only form the store ever sees
fn parse_id(id: &str) -> Result<String> {
    Uuid::parse_str(id)
        .map(|uuid| uuid.hyphenated().to_string())
        .map_err(|_| AppError::InvalidId(id.to_string()))
}

fn not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::storage::MemoryStorage;
    use crate::store::SqliteStudentStore;
    use bytes::Bytes;

    struct Fixture {
        service: StudentService,
        store: Arc<SqliteStudentStore>,
        blobs: Arc<MemoryStorage>,
    }

    async fn fixture(tolerate_missing_blobs: bool) -> Fixture {
        let db = Database::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        let store = Arc::new(SqliteStudentStore::new(db));
        let blobs = Arc::new(MemoryStorage::new());
        let service = StudentService::new(store.clone(), blobs.clone(), tolerate_missing_blobs);
        Fixture {
            service,
            store,
            blobs,
        }
    }

    fn upload(name: &str) -> Option<Upload> {
        Some(Upload {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            data: Bytes::from_static(b"png"),
        })
    }

    fn create_req(name: &str, parent: Option<&str>) -> CreateStudentRequest {
        CreateStudentRequest {
            name: Some(name.to_string()),
            email: Some(format!("{}@example.com", name)),
            phone: Some("555-0100".to_string()),
            parent: parent.map(|p| p.to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let f = fixture(false).await;
        let a = f.service.create(create_req("a", None), None).await.unwrap();
        let b = f.service.create(create_req("b", None), None).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.profile, "");
        assert_eq!(a.parent, None);
        assert_eq!(f.service.get(&a.id).await.unwrap(), a);
        assert_eq!(f.service.list().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_create_with_upload_and_empty_parent() {
        let f = fixture(false).await;
        let mut req = create_req("a", None);
        req.parent = Some(String::new());

        let a = f.service.create(req, upload("a.png")).await.unwrap();
        assert_eq!(a.profile, "a.png");
        assert_eq!(a.parent, None);
        assert_eq!(f.blobs.names(), vec!["a.png"]);
    }

    #[tokio::test]
    async fn test_create_with_malformed_parent_fails() {
        let f = fixture(false).await;
        let err = f
            .service
            .create(create_req("a", Some("not-an-id")), upload("a.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidId(_)));
        assert!(f.blobs.names().is_empty());
        assert!(f.service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dangling_parent_is_accepted() {
        let f = fixture(false).await;
        let ghost = Uuid::new_v4().to_string();
        let a = f.service.create(create_req("a", Some(&ghost)), None).await.unwrap();
        assert_eq!(a.parent, Some(ghost));
    }

    #[tokio::test]
    async fn test_get_missing_and_malformed() {
        let f = fixture(false).await;
        let missing = f.service.get(&Uuid::new_v4().to_string()).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));

        let malformed = f.service.get("12345").await.unwrap_err();
        assert!(matches!(malformed, AppError::InvalidId(_)));
    }

    #[tokio::test]
    async fn test_update_overwrites_fields_keeps_profile_and_parent() {
        let f = fixture(false).await;
        let root = f.service.create(create_req("root", None), None).await.unwrap();
        let a = f
            .service
            .create(create_req("a", Some(&root.id)), upload("a.png"))
            .await
            .unwrap();

        let updated = f
            .service
            .update(
                &a.id,
                UpdateStudentRequest {
                    name: Some("X".to_string()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.id, a.id);
        assert_eq!(updated.name.as_deref(), Some("X"));
        assert_eq!(updated.email, None);
        assert_eq!(updated.phone, None);
        assert_eq!(updated.profile, "a.png");
        assert_eq!(updated.parent, Some(root.id));
        assert_eq!(f.service.get(&a.id).await.unwrap(), updated);
        assert_eq!(f.blobs.names(), vec!["a.png"]);
    }

    #[tokio::test]
    async fn test_update_with_upload_replaces_previous_blob() {
        let f = fixture(false).await;
        let a = f.service.create(create_req("a", None), upload("a.png")).await.unwrap();

        let updated = f
            .service
            .update(&a.id, UpdateStudentRequest::default(), upload("b.png"))
            .await
            .unwrap();
        assert_eq!(updated.profile, "b.png");
        assert_eq!(f.blobs.names(), vec!["b.png"]);

        // Re-uploading under the same name keeps the fresh blob
        let again = f
            .service
            .update(&a.id, UpdateStudentRequest::default(), upload("b.png"))
            .await
            .unwrap();
        assert_eq!(again.profile, "b.png");
        assert_eq!(f.blobs.names(), vec!["b.png"]);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let f = fixture(false).await;
        let err = f
            .service
            .update(&Uuid::new_v4().to_string(), UpdateStudentRequest::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_fails_when_previous_blob_missing() {
        let f = fixture(false).await;
        let a = f.service.create(create_req("a", None), upload("a.png")).await.unwrap();
        f.blobs.delete("a.png").await.unwrap();

        let err = f
            .service
            .update(&a.id, UpdateStudentRequest::default(), upload("b.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BlobMissing(_)));
        assert_eq!(f.service.get(&a.id).await.unwrap().profile, "a.png");
        // New blob was written first and is left without a record
        assert_eq!(f.blobs.names(), vec!["b.png"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_one_level() {
        let f = fixture(false).await;
        let a = f.service.create(create_req("a", None), upload("a.png")).await.unwrap();
        let b = f
            .service
            .create(create_req("b", Some(&a.id)), upload("b.png"))
            .await
            .unwrap();
        let c = f.service.create(create_req("c", Some(&a.id)), None).await.unwrap();
        let g = f
            .service
            .create(create_req("g", Some(&b.id)), upload("g.png"))
            .await
            .unwrap();
        let other = f.service.create(create_req("other", None), None).await.unwrap();

        let deleted = f.service.delete(&a.id).await.unwrap();
        assert_eq!(deleted.student, a);
        assert_eq!(deleted.children_removed, 2);

        for id in [&a.id, &b.id, &c.id] {
            assert!(matches!(
                f.service.get(id).await.unwrap_err(),
                AppError::NotFound(_)
            ));
        }
        assert_eq!(f.service.get(&g.id).await.unwrap(), g);
        assert_eq!(f.service.get(&other.id).await.unwrap(), other);
        assert_eq!(f.blobs.names(), vec!["g.png"]);
    }

    #[tokio::test]
    async fn test_delete_missing_record_mutates_nothing() {
        let f = fixture(false).await;
        let ghost = Uuid::new_v4().to_string();
        let orphan = f
            .service
            .create(create_req("orphan", Some(&ghost)), upload("o.png"))
            .await
            .unwrap();

        let err = f.service.delete(&ghost).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(f.service.get(&orphan.id).await.unwrap(), orphan);
        assert_eq!(f.blobs.names(), vec!["o.png"]);
    }

    #[tokio::test]
    async fn test_non_canonical_ids_are_normalized() {
        let f = fixture(false).await;
        let a = f.service.create(create_req("a", None), None).await.unwrap();
        let upper = a.id.to_uppercase();
        let simple = Uuid::parse_str(&a.id).unwrap().simple().to_string();
        let braced = format!("{{{}}}", upper);

        let b = f
            .service
            .create(create_req("b", Some(&upper)), upload("b.png"))
            .await
            .unwrap();
        assert_eq!(b.parent.as_deref(), Some(a.id.as_str()));

        assert_eq!(f.service.get(&upper).await.unwrap(), a);
        assert_eq!(f.service.get(&simple).await.unwrap(), a);

        let updated = f
            .service
            .update(&simple, UpdateStudentRequest::default(), None)
            .await
            .unwrap();
        assert_eq!(updated.id, a.id);

        let deleted = f.service.delete(&braced).await.unwrap();
        assert_eq!(deleted.student.id, a.id);
        assert_eq!(deleted.children_removed, 1);
        assert!(matches!(
            f.service.get(&b.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(f.blobs.names().is_empty());
    }

    #[tokio::test]
    async fn test_delete_malformed_id() {
        let f = fixture(false).await;
        let err = f.service.delete("nope").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidId(_)));
    }

    #[tokio::test]
    async fn test_delete_aborts_on_missing_child_blob() {
        let f = fixture(false).await;
        let a = f.service.create(create_req("a", None), None).await.unwrap();
        let b = f
            .service
            .create(create_req("b", Some(&a.id)), upload("b.png"))
            .await
            .unwrap();
        f.blobs.delete("b.png").await.unwrap();

        let err = f.service.delete(&a.id).await.unwrap_err();
        assert!(matches!(err, AppError::BlobMissing(name) if name == "b.png"));
        assert!(f.store.find_by_id(&a.id).await.unwrap().is_some());
        assert!(f.store.find_by_id(&b.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_blobs_when_configured() {
        let f = fixture(true).await;
        let a = f.service.create(create_req("a", None), upload("a.png")).await.unwrap();
        f.service
            .create(create_req("b", Some(&a.id)), upload("b.png"))
            .await
            .unwrap();
        f.blobs.delete("a.png").await.unwrap();
        f.blobs.delete("b.png").await.unwrap();

        let deleted = f.service.delete(&a.id).await.unwrap();
        assert_eq!(deleted.children_removed, 1);
        assert!(f.service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_self_parented_record() {
        let f = fixture(false).await;
        let a = f.service.create(create_req("a", None), upload("a.png")).await.unwrap();
        let mut looped = a.clone();
        looped.parent = Some(a.id.clone());
        f.store.save(&looped).await.unwrap();

        let deleted = f.service.delete(&a.id).await.unwrap();
        assert_eq!(deleted.children_removed, 0);
        assert!(f.blobs.names().is_empty());
    }

    #[tokio::test]
    async fn test_delete_self_parented_record_with_children() {
        let f = fixture(false).await;
        let a = f.service.create(create_req("a", None), upload("a.png")).await.unwrap();
        let mut looped = a.clone();
        looped.parent = Some(a.id.clone());
        f.store.save(&looped).await.unwrap();
        f.service
            .create(create_req("b", Some(&a.id)), upload("b.png"))
            .await
            .unwrap();

        let deleted = f.service.delete(&a.id).await.unwrap();
        assert_eq!(deleted.student, looped);
        assert_eq!(deleted.children_removed, 1);
        assert!(f.service.list().await.unwrap().is_empty());
        assert!(f.blobs.names().is_empty());
    }
}
