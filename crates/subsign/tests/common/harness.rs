//! Test harness for isolated pipeline runs.
//!
//! The `TestHarness` struct owns everything one test needs:
//! - a temporary directory backing a filesystem object store
//! - an in-memory database with all migrations applied
//! - fake conversion, e-signature and notification services

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use subsign::conversion::Converter;
use subsign::db::signature_repo::{self, SignatureRequestRow};
use subsign::db::Database;
use subsign::pipeline::{
    NoopProgress, Pipeline, PipelineConfig, PipelineError, SigningOutcome, SigningRequest,
};
use subsign::secrets::UrlSigner;
use subsign::storage::{FileObjectStore, ObjectStore};

use super::fakes::{FakeConverter, FakeSignatureService, RecordingNotifier};

pub const TEST_SIGNING_KEY: &str =
    "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
pub const PUBLIC_BASE_URL: &str = "https://files.portal.test/objects";

pub struct TestHarness {
    temp_dir: TempDir,
    /// Root of the filesystem object store.
    pub store_root: PathBuf,
    pub db: Database,
    pub store: Arc<FileObjectStore>,
    pub converter: Arc<FakeConverter>,
    pub esign: Arc<FakeSignatureService>,
    pub notifier: Arc<RecordingNotifier>,
    pub config: PipelineConfig,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store_root = temp_dir.path().join("objects");
        std::fs::create_dir_all(&store_root).expect("Failed to create store root");

        let signer = UrlSigner::from_hex_key(TEST_SIGNING_KEY).expect("valid test key");
        let store = Arc::new(FileObjectStore::new(&store_root, PUBLIC_BASE_URL, signer));
        let db = Database::open_in_memory().expect("Failed to open database");

        Self {
            temp_dir,
            store_root,
            db,
            store,
            converter: Arc::new(FakeConverter::default()),
            esign: Arc::new(FakeSignatureService::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            config: PipelineConfig::default(),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Stores `bytes` under `key` in the object store.
    pub fn put_object(&self, key: &str, bytes: &[u8]) {
        self.store
            .upload(key, bytes, "application/octet-stream")
            .expect("Failed to seed object");
    }

    pub fn object_exists(&self, key: &str) -> bool {
        self.store.download(key).is_ok()
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.db.clone(),
            self.store.clone(),
            self.converter.clone(),
            self.esign.clone(),
            self.notifier.clone(),
            Arc::new(self.config.clone()),
        )
    }

    /// Same collaborators as [`TestHarness::pipeline`] but a different converter.
    pub fn pipeline_with_converter(&self, converter: Arc<dyn Converter>) -> Pipeline {
        Pipeline::new(
            self.db.clone(),
            self.store.clone(),
            converter,
            self.esign.clone(),
            self.notifier.clone(),
            Arc::new(self.config.clone()),
        )
    }

    pub fn run(&self, request: SigningRequest) -> Result<SigningOutcome, PipelineError> {
        self.pipeline().run(request, &NoopProgress)
    }

    pub fn requests_for(&self, document_id: &str) -> Vec<SignatureRequestRow> {
        signature_repo::list_for_document(&self.db, document_id).unwrap()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
