//! Model management for stem separation
//!
//! Locates ONNX models in a local cache directory and fetches missing ones
//! from a configured URL. No download location is built in: a model that is
//! neither cached nor configured with a URL is reported as not found.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::config::ModelType;
use super::error::{Result, SeparationError};

/// Download progress callback (0.0 to 1.0)
pub type DownloadProgress = Box<dyn Fn(f32) + Send>;

/// Manages the model cache
pub struct ModelManager {
    /// Directory where models are cached
    cache_dir: PathBuf,
}

impl ModelManager {
    /// Create a ModelManager with the default cache directory
    ///
    /// Default location: `~/.cache/stemify/models/`
    pub fn new() -> Result<Self> {
        let cache_dir = Self::default_cache_dir()?;
        Ok(Self { cache_dir })
    }

    /// Create a ModelManager with a custom cache directory
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn default_cache_dir() -> Result<PathBuf> {
        let base = dirs::cache_dir().ok_or_else(|| {
            SeparationError::InvalidConfig("Could not determine cache directory".to_string())
        })?;
        Ok(base.join("stemify").join("models"))
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the local path where a model would be stored
    pub fn model_path(&self, model: ModelType) -> PathBuf {
        self.cache_dir.join(model.filename())
    }

    /// Check if a model is already in the cache
    pub fn is_model_available(&self, model: ModelType) -> bool {
        self.model_path(model).exists()
    }

    /// Get the path to a model, downloading it from `url` if necessary
    pub fn ensure_model(
        &self,
        model: ModelType,
        url: Option<&str>,
        progress: Option<DownloadProgress>,
    ) -> Result<PathBuf> {
        let model_path = self.model_path(model);

        if model_path.exists() {
            log::info!("Model {} found at {:?}", model.display_name(), model_path);
            if let Some(cb) = &progress {
                cb(1.0);
            }
            return Ok(model_path);
        }

        let Some(url) = url else {
            return Err(SeparationError::ModelNotFound(format!(
                "{} is not cached at {:?} and no model_url is configured",
                model.display_name(),
                model_path
            )));
        };

        log::info!("Downloading model {} from {}", model.display_name(), url);
        self.download_file(url, &model_path, progress)?;
        Ok(model_path)
    }

    /// Download a file from a URL into the cache directory
    ///
    /// The body is streamed into a temporary file next to the target, which
    /// is only moved into place once the size checks out. On any failure the
    /// temporary file is removed.
    fn download_file(
        &self,
        url: &str,
        target_path: &Path,
        progress: Option<DownloadProgress>,
    ) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)?;

        let response = ureq::get(url)
            .call()
            .map_err(|e| SeparationError::ModelDownloadFailed(e.to_string()))?;

        let content_length: Option<u64> = response
            .header("Content-Length")
            .and_then(|s| s.parse().ok());

        let mut temp = NamedTempFile::new_in(&self.cache_dir)?;
        let mut reader = response.into_reader();
        let mut buffer = [0u8; 8192];
        let mut downloaded: u64 = 0;

        loop {
            let bytes_read = reader.read(&mut buffer).map_err(|e| {
                SeparationError::ModelDownloadFailed(format!(
                    "Download interrupted after {} bytes: {}",
                    downloaded, e
                ))
            })?;
            if bytes_read == 0 {
                break;
            }
            temp.write_all(&buffer[..bytes_read])?;
            downloaded += bytes_read as u64;

            if let (Some(cb), Some(total)) = (&progress, content_length) {
                let pct = downloaded as f32 / total as f32;
                cb(pct.min(0.99)); // Cap at 99% until verification
            }
        }

        temp.flush()?;

        if let Some(expected) = content_length {
            if downloaded != expected {
                return Err(SeparationError::ModelDownloadFailed(format!(
                    "Download incomplete: expected {} bytes, got {}",
                    expected, downloaded
                )));
            }
        }

        temp.persist(target_path)
            .map_err(|e| SeparationError::Io(e.error))?;

        log::info!(
            "Downloaded {:?} ({} bytes)",
            target_path.file_name().unwrap_or_default(),
            downloaded
        );

        if let Some(cb) = progress {
            cb(1.0);
        }

        Ok(())
    }

    /// Delete a cached model
    pub fn delete_model(&self, model: ModelType) -> Result<()> {
        let model_path = self.model_path(model);
        if model_path.exists() {
            fs::remove_file(&model_path)?;
            log::info!("Deleted cached model: {:?}", model_path);
        }
        Ok(())
    }

    /// Total size of all cached models in bytes
    pub fn cache_size(&self) -> u64 {
        ModelType::all()
            .iter()
            .filter_map(|model| fs::metadata(self.model_path(*model)).ok())
            .map(|meta| meta.len())
            .sum()
    }

    /// Clear all cached models
    pub fn clear_cache(&self) -> Result<()> {
        for model in ModelType::all() {
            self.delete_model(*model)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Serve one HTTP response on a local port and return the URL
    fn serve_once(content_length: usize, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                content_length
            );
            stream.write_all(header.as_bytes()).unwrap();
            stream.write_all(body).unwrap();
        });

        format!("http://{}/spleeter_2stems.onnx", addr)
    }

    fn cache_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_model_path() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_cache_dir(dir.path().to_path_buf());

        let path = manager.model_path(ModelType::Spleeter2Stems);
        assert_eq!(path, dir.path().join("spleeter_2stems.onnx"));
    }

    #[test]
    fn test_missing_model_without_url() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_cache_dir(dir.path().join("models"));

        assert!(!manager.is_model_available(ModelType::Spleeter5Stems));
        let result = manager.ensure_model(ModelType::Spleeter5Stems, None, None);
        assert!(matches!(result, Err(SeparationError::ModelNotFound(_))));
    }

    #[test]
    fn test_cached_model_reports_complete() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_cache_dir(dir.path().to_path_buf());
        fs::write(manager.model_path(ModelType::Spleeter2Stems), b"onnx").unwrap();

        let last = Arc::new(AtomicU32::new(0));
        let seen = last.clone();
        let path = manager
            .ensure_model(
                ModelType::Spleeter2Stems,
                None,
                Some(Box::new(move |p: f32| seen.store(p.to_bits(), Ordering::SeqCst))),
            )
            .unwrap();

        assert_eq!(path, manager.model_path(ModelType::Spleeter2Stems));
        assert_eq!(f32::from_bits(last.load(Ordering::SeqCst)), 1.0);
    }

    #[test]
    fn test_cache_size_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_cache_dir(dir.path().to_path_buf());
        fs::write(manager.model_path(ModelType::Spleeter2Stems), [0u8; 10]).unwrap();
        fs::write(manager.model_path(ModelType::Spleeter5Stems), [0u8; 5]).unwrap();

        assert_eq!(manager.cache_size(), 15);
        manager.clear_cache().unwrap();
        assert_eq!(manager.cache_size(), 0);
        assert!(!manager.is_model_available(ModelType::Spleeter2Stems));
    }

    #[test]
    fn test_download_into_cache() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_cache_dir(dir.path().join("models"));
        let url = serve_once(10, b"0123456789");

        let last = Arc::new(AtomicU32::new(0));
        let seen = last.clone();
        let path = manager
            .ensure_model(
                ModelType::Spleeter2Stems,
                Some(&url),
                Some(Box::new(move |p: f32| seen.store(p.to_bits(), Ordering::SeqCst))),
            )
            .unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"0123456789");
        assert_eq!(f32::from_bits(last.load(Ordering::SeqCst)), 1.0);
        assert_eq!(cache_entries(manager.cache_dir()), vec!["spleeter_2stems.onnx"]);
    }

    #[test]
    fn test_truncated_download_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_cache_dir(dir.path().join("models"));
        let url = serve_once(10, b"01234");

        let result = manager.ensure_model(ModelType::Spleeter2Stems, Some(&url), None);

        assert!(matches!(result, Err(SeparationError::ModelDownloadFailed(_))));
        assert!(!manager.is_model_available(ModelType::Spleeter2Stems));
        assert!(cache_entries(manager.cache_dir()).is_empty());
    }
}
