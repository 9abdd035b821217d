use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ::common::compress::CompressorRegistry;
use ::common::config::{CompressorConfig, StorageBackend, StorageConfig};
use image::{ImageFormat, Rgb, RgbImage};
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tempfile::TempDir;

use server::config::{AppConfig, CorsConfig, DatabaseConfig, ServerConfig, UploadConfig};
use server::metadata::SeaOrmMetadataStore;
use server::pipeline::{CompressionPipeline, PipelineSettings};
use server::state::AppState;

pub const MAX_UPLOAD_BYTES: u64 = 256 * 1024;

pub mod routes {
    pub const UPLOAD: &str = "/upload";
    pub const FILES: &str = "/files";

    pub fn download(blob_id: &str) -> String {
        format!("/download/{blob_id}")
    }

    pub fn file(id: &str) -> String {
        format!("/files/{id}")
    }
}

/// Path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// A running test server backed by a scratch SQLite file and blob directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub blob_dir: PathBuf,
    _scratch: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    /// Spawn with a Ghostscript stand-in that succeeds.
    pub async fn spawn() -> Self {
        Self::spawn_with_ghostscript("fake-gs.sh").await
    }

    pub async fn spawn_with_ghostscript(script: &str) -> Self {
        let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
        let blob_dir = scratch.path().join("blobs");
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            scratch.path().join("records.db").display()
        );

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                public_base_url: "http://files.test/".to_string(),
                log_level: "debug".to_string(),
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: db_url,
                max_connections: 1,
            },
            upload: UploadConfig {
                max_bytes: MAX_UPLOAD_BYTES,
            },
            storage: StorageConfig {
                backend: StorageBackend::Filesystem,
                path: blob_dir.clone(),
                ..Default::default()
            },
            compressor: CompressorConfig {
                ghostscript_bin: fixtures_dir().join(script).display().to_string(),
                timeout_secs: 10,
                ..Default::default()
            },
        };

        let db = server::database::init_db(&config.database.url, config.database.max_connections)
            .await
            .expect("Failed to initialize test database");
        let blobs = config
            .storage
            .open()
            .await
            .expect("Failed to open blob storage");

        let pipeline = CompressionPipeline::new(
            CompressorRegistry::from_config(&config.compressor),
            blobs,
            Arc::new(SeaOrmMetadataStore::new(db)),
            PipelineSettings {
                max_upload_bytes: config.upload.max_bytes,
                download_base: config.download_base(),
            },
        );

        let app = server::build_router(AppState {
            pipeline: Arc::new(pipeline),
            config,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            blob_dir,
            _scratch: scratch,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_header(&self, path: &str, name: &str, value: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header(name, value)
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Upload `bytes` as the `file` field. `mime` of `None` sends the part without a content type.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>, mime: Option<&str>) -> TestResponse {
        let mut part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        if let Some(mime) = mime {
            part = part.mime_str(mime).expect("Failed to set MIME type");
        }
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = self
            .client
            .post(self.url(routes::UPLOAD))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send upload request");

        TestResponse::from_response(res).await
    }

    pub async fn upload_form(&self, form: reqwest::multipart::Form) -> TestResponse {
        let res = self
            .client
            .post(self.url(routes::UPLOAD))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send upload request");

        TestResponse::from_response(res).await
    }

    /// Number of stored blobs (sidecars excluded).
    pub fn blob_count(&self) -> usize {
        fn walk(dir: &Path) -> usize {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return 0;
            };
            entries
                .filter_map(Result::ok)
                .map(|entry| {
                    let path = entry.path();
                    if path.is_dir() {
                        walk(&path)
                    } else if path.extension().is_some() {
                        0
                    } else {
                        1
                    }
                })
                .sum()
        }
        walk(&self.blob_dir)
    }

    pub async fn record_count(&self) -> usize {
        let res = self.get(routes::FILES).await;
        assert_eq!(res.status, 200, "Listing failed: {}", res.text);
        res.body.as_array().map(Vec::len).unwrap_or_default()
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let bytes = res.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            bytes,
            text,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn str_field(&self, key: &str) -> &str {
        self.body[key]
            .as_str()
            .unwrap_or_else(|| panic!("response body should contain '{key}': {}", self.text))
    }
}

/// A noisy RGB image that does not compress to nothing.
pub fn sample_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(7919) ^ y.wrapping_mul(104_729) ^ (x * y);
        Rgb([(v & 0xff) as u8, ((v >> 8) & 0xff) as u8, ((x + y) & 0xff) as u8])
    })
}

pub fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("Failed to encode sample image");
    out.into_inner()
}

pub fn jpeg_bytes() -> Vec<u8> {
    encode(&sample_image(96, 96), ImageFormat::Jpeg)
}

pub fn png_bytes() -> Vec<u8> {
    encode(&sample_image(64, 64), ImageFormat::Png)
}

pub fn pdf_bytes() -> Vec<u8> {
    let mut pdf = b"%PDF-1.4\n".to_vec();
    pdf.extend(std::iter::repeat_n(b'x', 4096));
    pdf.extend_from_slice(b"\n%%EOF\n");
    pdf
}
