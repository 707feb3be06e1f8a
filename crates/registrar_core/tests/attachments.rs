use registrar_core::db::open_db_in_memory;
use registrar_core::repo::attachment_repo::AttachmentStore;
use registrar_core::storage::BlobResult;
use registrar_core::{
    ActorContext, AttachmentService, BlobError, BlobStore, Document, DocumentInput, EntityKind,
    FsBlobStore, MemoryBlobStore, OwnerRef, RecordService, ServiceError, TrashFilter, University,
    UniversityInput, Upload, UploadPolicy,
};
use rusqlite::Connection;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Content store whose writes always fail.
struct FailingBlobStore;

impl BlobStore for FailingBlobStore {
    fn put(&self, key: &str, _bytes: &[u8]) -> BlobResult<()> {
        Err(BlobError::Io {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }

    fn get(&self, key: &str) -> BlobResult<Vec<u8>> {
        Err(BlobError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> BlobResult<()> {
        Err(BlobError::NotFound(key.to_string()))
    }

    fn exists(&self, _key: &str) -> BlobResult<bool> {
        Ok(false)
    }
}

/// In-memory store whose `fail_on`-th delete (1-based) fails.
struct FlakyDeleteStore {
    inner: MemoryBlobStore,
    deletes: AtomicUsize,
    fail_on: usize,
}

impl FlakyDeleteStore {
    fn failing_on(fail_on: usize) -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            deletes: AtomicUsize::new(0),
            fail_on,
        }
    }
}

impl BlobStore for FlakyDeleteStore {
    fn put(&self, key: &str, bytes: &[u8]) -> BlobResult<()> {
        self.inner.put(key, bytes)
    }

    fn get(&self, key: &str) -> BlobResult<Vec<u8>> {
        self.inner.get(key)
    }

    fn delete(&self, key: &str) -> BlobResult<()> {
        let attempt = self.deletes.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_on {
            return Err(BlobError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk"),
            });
        }
        self.inner.delete(key)
    }

    fn exists(&self, key: &str) -> BlobResult<bool> {
        self.inner.exists(key)
    }
}

fn pdf(name: &str) -> Upload {
    Upload::new(name, b"%PDF-1.7 minimal".to_vec()).with_mime_type("application/pdf")
}

fn attachment_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM attachments;", [], |row| row.get(0))
        .unwrap()
}

fn document_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM documents;", [], |row| row.get(0))
        .unwrap()
}

fn create_document<B: BlobStore>(conn: &Connection, blobs: &B, title: &str) -> Document {
    RecordService::<Document, B>::new(conn, blobs)
        .create(DocumentInput::titled(title), &ActorContext::authenticated(4))
        .unwrap()
}

#[test]
fn attach_stores_bytes_and_metadata_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::open(dir.path().join("files")).unwrap();
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();
    let document = create_document(&conn, &blobs, "Syllabus");
    let owner = OwnerRef::new(EntityKind::Document, document.id);
    let service = AttachmentService::new(&conn, &blobs, &policy);

    let attachment = service
        .attach(owner, pdf("Syllabus.PDF"), &ActorContext::authenticated(8))
        .unwrap();

    assert_eq!(attachment.owner(), owner);
    assert_eq!(attachment.original_name, "Syllabus.PDF");
    assert_eq!(attachment.size, 16);
    assert_eq!(attachment.mime_type, "application/pdf");
    assert_eq!(attachment.created_by, Some(8));
    assert!(attachment
        .stored_path
        .starts_with(&format!("document/{}/", document.id)));
    assert!(attachment.stored_path.ends_with(".pdf"));
    assert!(dir.path().join("files").join(&attachment.stored_path).is_file());

    let listed = service.list(owner).unwrap();
    assert_eq!(listed, vec![attachment.clone()]);

    let (meta, bytes) = service.download(attachment.id).unwrap();
    assert_eq!(meta, attachment);
    assert_eq!(bytes, b"%PDF-1.7 minimal");
}

#[test]
fn oversized_upload_writes_nothing() {
    let blobs = MemoryBlobStore::new();
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::new(8, ["pdf"]);
    let document = create_document(&conn, &blobs, "Thesis");
    let service = AttachmentService::new(&conn, &blobs, &policy);

    let err = service
        .attach(
            OwnerRef::new(EntityKind::Document, document.id),
            pdf("thesis.pdf"),
            &ActorContext::anonymous(),
        )
        .unwrap_err();

    match err {
        ServiceError::Validation(errors) => assert!(!errors.messages_for("file").is_empty()),
        other => panic!("unexpected error: {other}"),
    }
    assert!(blobs.is_empty());
    assert_eq!(attachment_rows(&conn), 0);
}

#[test]
fn disallowed_extension_is_rejected() {
    let blobs = MemoryBlobStore::new();
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();
    let document = create_document(&conn, &blobs, "Script");
    let service = AttachmentService::new(&conn, &blobs, &policy);

    let err = service
        .attach(
            OwnerRef::new(EntityKind::Document, document.id),
            Upload::new("run.exe", vec![1, 2, 3]),
            &ActorContext::anonymous(),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(blobs.is_empty());
}

#[test]
fn non_attachable_kind_is_rejected() {
    let blobs = MemoryBlobStore::new();
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();
    let university = RecordService::<University, _>::new(&conn, &blobs)
        .create(UniversityInput::named("UCM"), &ActorContext::anonymous())
        .unwrap();
    let service = AttachmentService::new(&conn, &blobs, &policy);

    let err = service
        .attach(
            OwnerRef::new(EntityKind::University, university.id),
            pdf("logo.pdf"),
            &ActorContext::anonymous(),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[test]
fn attach_to_trashed_owner_is_not_found_but_listing_still_works() {
    let blobs = MemoryBlobStore::new();
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();
    let document = create_document(&conn, &blobs, "Minutes");
    let owner = OwnerRef::new(EntityKind::Document, document.id);
    let service = AttachmentService::new(&conn, &blobs, &policy);
    service
        .attach(owner, pdf("minutes.pdf"), &ActorContext::anonymous())
        .unwrap();

    RecordService::<Document, _>::new(&conn, &blobs)
        .delete(document.id, &ActorContext::anonymous())
        .unwrap();

    assert!(matches!(
        service.attach(owner, pdf("more.pdf"), &ActorContext::anonymous()),
        Err(ServiceError::NotFound { .. })
    ));
    assert_eq!(service.list(owner).unwrap().len(), 1);
    assert_eq!(blobs.len(), 1);
}

#[test]
fn force_delete_removes_attachment_rows_and_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("files");
    let blobs = FsBlobStore::open(&root).unwrap();
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();
    let document = create_document(&conn, &blobs, "Contract");
    let keep = create_document(&conn, &blobs, "Keep");
    let owner = OwnerRef::new(EntityKind::Document, document.id);
    let attachments = AttachmentService::new(&conn, &blobs, &policy);

    let first = attachments
        .attach(owner, pdf("a.pdf"), &ActorContext::anonymous())
        .unwrap();
    let second = attachments
        .attach(owner, pdf("b.pdf"), &ActorContext::anonymous())
        .unwrap();
    let other = attachments
        .attach(
            OwnerRef::new(EntityKind::Document, keep.id),
            pdf("c.pdf"),
            &ActorContext::anonymous(),
        )
        .unwrap();

    let records = RecordService::<Document, _>::new(&conn, &blobs);
    records.delete(document.id, &ActorContext::anonymous()).unwrap();
    assert_eq!(attachment_rows(&conn), 3, "soft delete keeps attachments");

    let report = records.force_delete(document.id).unwrap();
    assert_eq!(report.attachments_removed, 2);
    assert_eq!(attachment_rows(&conn), 1);
    assert!(!root.join(&first.stored_path).exists());
    assert!(!root.join(&second.stored_path).exists());
    assert!(!root.join(owner.namespace()).exists());
    assert!(root.join(&other.stored_path).is_file());
    assert!(matches!(
        records.get(document.id, TrashFilter::With),
        Err(ServiceError::NotFound { .. })
    ));

    for removed in [&first, &second] {
        let err = attachments.download(removed.id).unwrap_err();
        assert!(matches!(err, ServiceError::AttachmentNotFound(_)));
        assert!(err.is_not_found());
    }
    assert!(attachments.download(other.id).is_ok());
}

#[test]
fn failed_byte_removal_during_purge_leaves_no_metadata() {
    let blobs = FlakyDeleteStore::failing_on(2);
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();
    let document = create_document(&conn, &blobs, "Ledger");
    let owner = OwnerRef::new(EntityKind::Document, document.id);
    let attachments = AttachmentService::new(&conn, &blobs, &policy);
    let first = attachments
        .attach(owner, pdf("a.pdf"), &ActorContext::anonymous())
        .unwrap();
    let second = attachments
        .attach(owner, pdf("b.pdf"), &ActorContext::anonymous())
        .unwrap();

    let report = RecordService::<Document, _>::new(&conn, &blobs)
        .force_delete(document.id)
        .unwrap();

    assert_eq!(report.attachments_removed, 2);
    assert_eq!(attachment_rows(&conn), 0);
    assert_eq!(document_rows(&conn), 0);
    assert_eq!(blobs.inner.len(), 1, "one blob is left unreachable");
    for attachment in [&first, &second] {
        assert!(matches!(
            attachments.download(attachment.id),
            Err(ServiceError::AttachmentNotFound(_))
        ));
    }
}

#[test]
fn failed_byte_removal_during_detach_still_removes_metadata() {
    let blobs = FlakyDeleteStore::failing_on(1);
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();
    let document = create_document(&conn, &blobs, "Draft");
    let service = AttachmentService::new(&conn, &blobs, &policy);
    let attachment = service
        .attach(
            OwnerRef::new(EntityKind::Document, document.id),
            pdf("draft.pdf"),
            &ActorContext::anonymous(),
        )
        .unwrap();

    service.detach(attachment.id).unwrap();

    assert_eq!(attachment_rows(&conn), 0);
    assert!(matches!(
        service.download(attachment.id),
        Err(ServiceError::AttachmentNotFound(_))
    ));
}

#[test]
fn purge_owner_removes_only_that_owners_attachments() {
    let blobs = MemoryBlobStore::new();
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();
    let purged = OwnerRef::new(
        EntityKind::Document,
        create_document(&conn, &blobs, "Old").id,
    );
    let kept = OwnerRef::new(
        EntityKind::Document,
        create_document(&conn, &blobs, "New").id,
    );
    let service = AttachmentService::new(&conn, &blobs, &policy);
    for name in ["one.pdf", "two.pdf"] {
        service
            .attach(purged, pdf(name), &ActorContext::anonymous())
            .unwrap();
    }
    let survivor = service
        .attach(kept, pdf("three.pdf"), &ActorContext::anonymous())
        .unwrap();

    assert_eq!(service.purge_owner(purged).unwrap(), 2);

    let store = AttachmentStore::new(&conn);
    assert_eq!(store.count_for_owner(&purged).unwrap(), 0);
    assert_eq!(store.count_for_owner(&kept).unwrap(), 1);
    assert_eq!(blobs.keys(), vec![survivor.stored_path.clone()]);
    assert_eq!(service.list(kept).unwrap(), vec![survivor]);
    assert_eq!(service.purge_owner(purged).unwrap(), 0);
}

#[test]
fn failed_write_leaves_no_metadata() {
    let blobs = FailingBlobStore;
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();
    let document = create_document(&conn, &blobs, "Report");
    let service = AttachmentService::new(&conn, &blobs, &policy);

    let err = service
        .attach(
            OwnerRef::new(EntityKind::Document, document.id),
            pdf("report.pdf"),
            &ActorContext::anonymous(),
        )
        .unwrap_err();

    assert!(matches!(err, ServiceError::Io(_)));
    assert_eq!(attachment_rows(&conn), 0);
}

#[test]
fn create_with_attachment_rolls_back_record_when_write_fails() {
    let blobs = FailingBlobStore;
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();

    let err = RecordService::<Document, _>::new(&conn, &blobs)
        .create_with_attachment(
            DocumentInput::titled("Grant"),
            pdf("grant.pdf"),
            &policy,
            &ActorContext::authenticated(1),
        )
        .unwrap_err();

    assert!(matches!(err, ServiceError::Io(_)));
    assert_eq!(document_rows(&conn), 0);
    assert_eq!(attachment_rows(&conn), 0);
}

#[test]
fn create_with_attachment_stores_both() {
    let blobs = MemoryBlobStore::new();
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();

    let (document, attachment) = RecordService::<Document, _>::new(&conn, &blobs)
        .create_with_attachment(
            DocumentInput::titled("Agenda"),
            pdf("agenda.pdf"),
            &policy,
            &ActorContext::authenticated(6),
        )
        .unwrap();

    assert_eq!(attachment.owner_id, document.id);
    assert_eq!(document.audit.created_by, Some(6));
    assert_eq!(attachment.created_by, Some(6));
    assert_eq!(blobs.keys(), vec![attachment.stored_path]);
}

#[test]
fn create_with_attachment_reports_record_and_file_errors_together() {
    let blobs = MemoryBlobStore::new();
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();

    let err = RecordService::<Document, _>::new(&conn, &blobs)
        .create_with_attachment(
            DocumentInput::titled(""),
            Upload::new("notes.exe", vec![0]),
            &policy,
            &ActorContext::anonymous(),
        )
        .unwrap_err();

    match err {
        ServiceError::Validation(errors) => {
            assert!(!errors.messages_for("title").is_empty());
            assert!(!errors.messages_for("file").is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(document_rows(&conn), 0);
    assert!(blobs.is_empty());
}

#[test]
fn detach_removes_row_and_bytes() {
    let blobs = MemoryBlobStore::new();
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();
    let document = create_document(&conn, &blobs, "Memo");
    let service = AttachmentService::new(&conn, &blobs, &policy);
    let attachment = service
        .attach(
            OwnerRef::new(EntityKind::Document, document.id),
            pdf("memo.pdf"),
            &ActorContext::anonymous(),
        )
        .unwrap();

    let removed = service.detach(attachment.id).unwrap();
    assert_eq!(removed.id, attachment.id);
    assert!(blobs.is_empty());
    assert_eq!(attachment_rows(&conn), 0);
    assert!(matches!(
        service.detach(attachment.id),
        Err(ServiceError::AttachmentNotFound(_))
    ));
}

#[test]
fn download_of_vanished_bytes_is_file_missing() {
    let blobs = MemoryBlobStore::new();
    let conn = open_db_in_memory().unwrap();
    let policy = UploadPolicy::default();
    let document = create_document(&conn, &blobs, "Lost");
    let service = AttachmentService::new(&conn, &blobs, &policy);
    let attachment = service
        .attach(
            OwnerRef::new(EntityKind::Document, document.id),
            pdf("lost.pdf"),
            &ActorContext::anonymous(),
        )
        .unwrap();
    blobs.delete(&attachment.stored_path).unwrap();

    let err = service.download(attachment.id).unwrap_err();
    assert!(matches!(err, ServiceError::FileMissing(_)));
    assert!(err.is_not_found());
}
