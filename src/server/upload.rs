// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Upload validation and storage.

use std::path::Path;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::detection::unique_stem;
use crate::error::{InferenceError, Result};

/// Accepted image extensions (lowercase).
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Lowercased extension after the last dot, if any.
fn extension(filename: &str) -> Option<String> {
    filename.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Whether `filename` carries one of the accepted image extensions.
#[must_use]
pub fn allowed_file(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Reduce a client supplied filename to a safe flat name.
///
/// Path separators become word breaks, whitespace runs become `_`, and only
/// ASCII alphanumerics, `.`, `_` and `-` survive. Leading and trailing `.`/`_`
/// are stripped, so the result never names a parent or hidden file. May be
/// empty.
#[must_use]
pub fn secure_filename(filename: &str) -> String {
    let spaced: String = filename
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Stored name for an upload: `<YYYYMMDD_HHMMSS>_<token>_<secure name>`.
///
/// Falls back to `image.<ext>` when sanitizing drops the name or its extension.
#[must_use]
pub fn stored_filename(original: &str) -> String {
    let mut name = secure_filename(original);
    if !allowed_file(&name) {
        let ext = extension(original).unwrap_or_else(|| "jpg".to_string());
        name = format!("image.{ext}");
    }
    format!("{}_{name}", unique_stem())
}

/// Validate an uploaded file's name.
///
/// # Errors
///
/// Returns [`InferenceError::InvalidInput`] for an empty name or a
/// disallowed extension.
pub fn validate_upload(filename: &str) -> Result<()> {
    if filename.is_empty() {
        return Err(InferenceError::InvalidInput("No file selected".to_string()));
    }
    if !allowed_file(filename) {
        return Err(InferenceError::InvalidInput(
            "Invalid file type. Only PNG, JPG, JPEG and WEBP are allowed".to_string(),
        ));
    }
    Ok(())
}

/// Write an upload into `dir`, returning the stored filename.
///
/// # Errors
///
/// Returns an error if the file can't be created or written.
pub async fn save_upload(dir: &Path, original: &str, data: &[u8]) -> Result<String> {
    let filename = stored_filename(original);
    let path = dir.join(&filename);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(|e| InferenceError::IoError(format!("Failed to create {}: {e}", path.display())))?;
    file.write_all(data).await?;
    file.flush().await?;

    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("photo.jpg"));
        assert!(allowed_file("photo.JPEG"));
        assert!(allowed_file("a.b.webp"));
        assert!(allowed_file("x.png"));
        assert!(!allowed_file("notes.txt"));
        assert!(!allowed_file("jpg"));
        assert!(!allowed_file("archive.jpg.exe"));
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("i contain cool \u{fc}ml\u{e4}uts.txt"), "i_contain_cool_mluts.txt");
        assert_eq!(secure_filename("..\\windows\\evil.png"), "windows_evil.png");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn test_stored_filename() {
        let name = stored_filename("bolt image.png");
        assert!(name.ends_with("_bolt_image.png"));
        assert_eq!(name.split('_').count(), 5);

        // Nothing survives sanitizing
        let name = stored_filename("\u{65e5}\u{672c}.jpg");
        assert!(name.ends_with("_image.jpg"));
    }

    #[test]
    fn test_validate_upload() {
        assert!(validate_upload("a.jpg").is_ok());

        let err = validate_upload("").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: No file selected");
        assert!(err.is_client_error());

        assert!(validate_upload("a.gif").unwrap_err().is_client_error());
    }

    #[tokio::test]
    async fn test_save_upload() {
        let dir = tempfile::tempdir().unwrap();
        let name = save_upload(dir.path(), "part.png", b"bytes").await.unwrap();

        assert!(name.ends_with("_part.png"));
        assert_eq!(std::fs::read(dir.path().join(&name)).unwrap(), b"bytes");
    }
}
