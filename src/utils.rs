//! Utility functions for artifact naming and path manipulation

use crate::config::FileCollisionAction;
use std::io;
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Extension used when neither the response nor the URL reveals one
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Get a unique path for a file, handling collisions according to the specified action
///
/// For `Rename` the result may carry a ` (n)` suffix. For `Skip` an existing file is an
/// [`io::ErrorKind::AlreadyExists`] error. `Overwrite` returns the path unchanged.
///
/// # Examples
///
/// ```
/// use fetch_pool::utils::get_unique_path;
/// use fetch_pool::config::FileCollisionAction;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/cat-42.jpg");
/// let unique = get_unique_path(path, FileCollisionAction::Rename).unwrap();
/// // If /tmp/cat-42.jpg exists, returns /tmp/cat-42 (1).jpg
/// // If that exists too, returns /tmp/cat-42 (2).jpg, etc.
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> io::Result<PathBuf> {
    match action {
        FileCollisionAction::Overwrite => Ok(path.to_path_buf()),
        FileCollisionAction::Skip => {
            if path.exists() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists and collision action is skip", path.display()),
                ));
            }
            Ok(path.to_path_buf())
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(path.to_path_buf());
            }

            let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cannot extract file stem from {}", path.display()),
                )
            })?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path.parent().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cannot extract parent directory of {}", path.display()),
                )
            })?;

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Ok(new_path);
                }
            }

            Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!(
                    "could not find a unique name for {} after {} attempts",
                    path.display(),
                    MAX_RENAME_ATTEMPTS
                ),
            ))
        }
    }
}

/// Pick a file extension for a fetched payload
///
/// The `Content-Type` header wins when it names a known image type. Otherwise the extension
/// of the URL's last path segment is used, and [`DEFAULT_EXTENSION`] as a last resort.
///
/// ```
/// use fetch_pool::utils::extension_for;
///
/// assert_eq!(extension_for(Some("image/png"), "http://example.com/pic"), "png");
/// assert_eq!(extension_for(None, "http://example.com/a/b.GIF?x=1"), "gif");
/// assert_eq!(extension_for(Some("text/html"), "http://example.com/"), "jpg");
/// ```
pub fn extension_for(content_type: Option<&str>, url: &str) -> String {
    if let Some(ext) = content_type.and_then(extension_for_mime) {
        return ext.to_string();
    }

    if let Ok(parsed_url) = url::Url::parse(url)
        && let Some(mut segments) = parsed_url.path_segments()
        && let Some(last_segment) = segments.next_back()
        && let Some(ext) = Path::new(last_segment).extension().and_then(|e| e.to_str())
        && (1..=5).contains(&ext.len())
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return ext.to_ascii_lowercase();
    }

    DEFAULT_EXTENSION.to_string()
}

fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    // Drop parameters such as "; charset=binary"
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/svg+xml" => "svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        _ => return None,
    };
    Some(ext)
}
