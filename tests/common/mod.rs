#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tryon_relay::backend::SynthesisCall;
use tryon_relay::error::BackendError;
use tryon_relay::{
    build_router, AppState, BackendClientAdapter, SynthesisBackend, SynthesisParameters,
    TransientStorage, TryOnService,
};

pub fn encode(format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(4, 4, |x, y| Rgb([(x * 60) as u8, (y * 60) as u8, 128]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

pub fn png_bytes() -> Vec<u8> {
    encode(ImageFormat::Png)
}

pub fn jpeg_bytes() -> Vec<u8> {
    encode(ImageFormat::Jpeg)
}

/// What the stub saw during one `predict` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: SynthesisCall,
    /// Whether both stored uploads existed while the call ran
    pub inputs_present: bool,
}

/// Backend that answers every call with a fixed outputs list, or a fixed error.
pub struct StubBackend {
    outputs: Vec<Value>,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    completed: AtomicUsize,
}

impl StubBackend {
    pub fn returning(output: &Path) -> Self {
        Self {
            outputs: vec![json!(output.to_str().unwrap())],
            failure: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outputs: Vec::new(),
            failure: Some(message.to_string()),
            delay: None,
            calls: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }

    /// Like [`StubBackend::returning`], but each call takes `delay` to answer.
    pub fn slow(output: &Path, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::returning(output)
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls that ran to the end.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisBackend for StubBackend {
    async fn predict(&self, call: &SynthesisCall) -> Result<Vec<Value>, BackendError> {
        self.calls.lock().unwrap().push(RecordedCall {
            call: call.clone(),
            inputs_present: call.person.is_file() && call.garment.is_file(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(BackendError::Remote(message.clone())),
            None => Ok(self.outputs.clone()),
        }
    }
}

/// Starts the relay on an ephemeral port and returns its base URL.
pub async fn spawn_app(backend: Arc<dyn SynthesisBackend>, storage_root: &Path) -> String {
    spawn_app_with_limit(backend, storage_root, 10 * 1024 * 1024).await
}

pub async fn spawn_app_with_limit(
    backend: Arc<dyn SynthesisBackend>,
    storage_root: &Path,
    max_upload_bytes: usize,
) -> String {
    let adapter = BackendClientAdapter::new(backend, None);
    let service = TryOnService::new(
        TransientStorage::new(storage_root),
        adapter,
        SynthesisParameters::default(),
    );
    let app = build_router(AppState::new(service), max_upload_bytes);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

pub fn entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}
