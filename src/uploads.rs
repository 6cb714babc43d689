use std::fs;
use std::path::Path;

use actix_multipart::form::tempfile::TempFile;
use chrono::Utc;
use rand::Rng;

use crate::errors::AppError;

/// The three attachment kinds, each stored under its own directory.
#[derive(Debug, Clone, Copy)]
pub enum Category {
    Invoice,
    Qrcode,
    Screenshot,
}

impl Category {
    pub fn dir(&self) -> &'static str {
        match self {
            Category::Invoice => "invoices",
            Category::Qrcode => "qrcodes",
            Category::Screenshot => "screenshots",
        }
    }
}

/// Create the category directories under the upload root. Runs at startup.
pub fn ensure_upload_dirs(base_dir: &str) -> std::io::Result<()> {
    for category in [Category::Invoice, Category::Qrcode, Category::Screenshot] {
        fs::create_dir_all(Path::new(base_dir).join(category.dir()))?;
    }
    Ok(())
}

/// UTC second timestamp plus six random bytes keeps concurrent uploads from
/// colliding; the original extension is carried over untouched.
fn storage_name(original: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut suffix = [0u8; 6];
    rand::thread_rng().fill(&mut suffix);
    format!(
        "{}_{}{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        hex::encode(suffix),
        ext
    )
}

/// Persist an uploaded file under its category directory and return the
/// stored path, or `None` when no file (or no filename) was supplied.
/// Content and size are passed through unvalidated.
pub fn save_upload(
    upload: Option<&TempFile>,
    base_dir: &str,
    category: Category,
) -> Result<Option<String>, AppError> {
    let Some(upload) = upload else {
        return Ok(None);
    };
    let Some(filename) = upload.file_name.as_deref().filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    let dir = Path::new(base_dir).join(category.dir());
    fs::create_dir_all(&dir)?;
    let dest = dir.join(storage_name(filename));
    fs::copy(upload.file.path(), &dest)?;

    let stored = dest.to_string_lossy().into_owned();
    log::info!("Stored {} upload at {}", category.dir(), stored);
    Ok(Some(stored))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_name_keeps_the_extension() {
        let name = storage_name("invoice.pdf");
        assert!(name.ends_with(".pdf"));
        // 14 timestamp digits, underscore, 12 hex chars
        assert_eq!(name.len(), 14 + 1 + 12 + 4);
        assert!(name[..14].chars().all(|c| c.is_ascii_digit()));
        assert!(name[15..27].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn storage_name_without_extension() {
        let name = storage_name("scan");
        assert_eq!(name.len(), 14 + 1 + 12);
    }

    #[test]
    fn storage_names_do_not_collide() {
        let a = storage_name("a.png");
        let b = storage_name("a.png");
        assert_ne!(a, b);
    }

    #[test]
    fn category_directories() {
        assert_eq!(Category::Invoice.dir(), "invoices");
        assert_eq!(Category::Qrcode.dir(), "qrcodes");
        assert_eq!(Category::Screenshot.dir(), "screenshots");
    }
}
