//! Utility functions for file operations and path manipulation

use crate::config::Config;
use crate::types::TaskId;
use std::path::{Path, PathBuf};

/// Extensions treated as still images by local material preprocessing
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

/// Extensions treated as video footage
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "avi", "m4v"];

/// URL with its query string removed
///
/// Signed CDN links differ only in their query, so the cache ignores it.
pub fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Content-addressed file name for a material URL
///
/// # Examples
///
/// ```
/// use autoreel::utils::material_file_name;
///
/// assert_eq!(
///     material_file_name("https://cdn.example.com/a.mp4?token=1"),
///     material_file_name("https://cdn.example.com/a.mp4?token=2"),
/// );
/// ```
pub fn material_file_name(url: &str) -> String {
    let digest = md5::compute(strip_query(url).as_bytes());
    format!("vid-{:x}.mp4", digest)
}

/// Resolve where a task's downloads are stored
///
/// `material_directory` of "" selects the shared cache, "task" selects the
/// task directory, and any other value must name an existing directory;
/// otherwise the shared cache is used.
pub fn resolve_material_dir(config: &Config, task_id: &TaskId) -> PathBuf {
    let configured = config.material.material_directory.trim();
    match configured {
        "" => config.cache_dir(),
        "task" => config.task_dir(task_id),
        dir if Path::new(dir).is_dir() => PathBuf::from(dir),
        dir => {
            tracing::warn!(
                material_directory = dir,
                "material directory does not exist, using shared cache"
            );
            config.cache_dir()
        }
    }
}

/// Remove a file, ignoring "not found"
pub async fn remove_file_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove file");
        }
    }
}

/// Size of a file, or `None` if it does not exist
pub async fn file_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Whether the path looks like a still image
pub fn is_image(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

/// Whether the path looks like a video file
pub fn is_video(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_strip_query() {
        assert_eq!(
            strip_query("https://x.com/v.mp4?a=1&b=2"),
            "https://x.com/v.mp4"
        );
        assert_eq!(strip_query("https://x.com/v.mp4"), "https://x.com/v.mp4");
    }

    #[test]
    fn test_material_file_name_ignores_query() {
        let a = material_file_name("https://x.com/v.mp4?sig=1");
        let b = material_file_name("https://x.com/v.mp4?sig=2");
        let c = material_file_name("https://x.com/w.mp4");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("vid-") && a.ends_with(".mp4"));
        // md5 hex digest is 32 characters
        assert_eq!(a.len(), "vid-".len() + 32 + ".mp4".len());
    }

    #[test]
    fn test_resolve_material_dir() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.storage_dir = temp_dir.path().to_path_buf();
        let id = TaskId::new("t1");

        assert_eq!(resolve_material_dir(&config, &id), config.cache_dir());

        config.material.material_directory = "task".into();
        assert_eq!(resolve_material_dir(&config, &id), config.task_dir(&id));

        config.material.material_directory = temp_dir.path().display().to_string();
        assert_eq!(
            resolve_material_dir(&config, &id),
            temp_dir.path().to_path_buf()
        );

        config.material.material_directory = "/definitely/not/here".into();
        assert_eq!(resolve_material_dir(&config, &id), config.cache_dir());
    }

    #[test]
    fn test_media_kind_by_extension() {
        assert!(is_image(Path::new("/a/b.PNG")));
        assert!(is_video(Path::new("/a/b.mp4")));
        assert!(!is_video(Path::new("/a/b.txt")));
        assert!(!is_image(Path::new("/a/noext")));
    }

    #[tokio::test]
    async fn test_remove_and_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f.bin");
        assert_eq!(file_size(&path).await, None);
        tokio::fs::write(&path, b"12345").await.unwrap();
        assert_eq!(file_size(&path).await, Some(5));
        remove_file_if_exists(&path).await;
        remove_file_if_exists(&path).await;
        assert!(!path.exists());
    }
}
