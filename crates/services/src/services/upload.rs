use std::path::Path;

use tempfile::NamedTempFile;

/// A multipart file spooled to disk. The backing temp file is removed when
/// this value is dropped, whichever way the request ends.
#[derive(Debug)]
pub struct UploadedFile {
    file: NamedTempFile,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Pdf,
}

impl UploadKind {
    fn extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::Image => &["jpeg", "jpg", "png", "gif", "webp"],
            UploadKind::Pdf => &["pdf"],
        }
    }

    fn accepts_mime(self, mime: &str) -> bool {
        match self {
            UploadKind::Image => matches!(
                mime,
                "image/jpeg" | "image/jpg" | "image/png" | "image/gif" | "image/webp"
            ),
            UploadKind::Pdf => mime == "application/pdf",
        }
    }

    fn rejection(self) -> &'static str {
        match self {
            UploadKind::Image => "Only JPEG, PNG, GIF and WEBP images are allowed",
            UploadKind::Pdf => "Only PDF files are allowed",
        }
    }
}

impl UploadedFile {
    pub fn new(
        file: NamedTempFile,
        file_name: Option<String>,
        content_type: Option<String>,
    ) -> Self {
        Self {
            file,
            file_name,
            content_type,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> std::io::Result<u64> {
        Ok(self.file.as_file().metadata()?.len())
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.file.path()).await
    }

    fn extension(&self) -> Option<String> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Declared content type, or a guess from the file name.
    pub fn mime_type(&self) -> String {
        self.content_type
            .as_deref()
            .map(|mime| mime.split(';').next().unwrap_or(mime).trim().to_ascii_lowercase())
            .filter(|mime| !mime.is_empty() && mime != "application/octet-stream")
            .or_else(|| {
                self.file_name
                    .as_deref()
                    .and_then(|name| mime_guess::from_path(name).first_raw())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }

    /// Both the extension and the MIME type must be on the allow-list.
    pub fn check_kind(&self, kind: UploadKind) -> Result<(), &'static str> {
        let extension_ok = self
            .extension()
            .is_some_and(|ext| kind.extensions().contains(&ext.as_str()));
        if extension_ok && kind.accepts_mime(&self.mime_type()) {
            Ok(())
        } else {
            Err(kind.rejection())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::{UploadKind, UploadedFile};

    pub(crate) fn upload(bytes: &[u8], name: &str, content_type: Option<&str>) -> UploadedFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(bytes).expect("write temp file");
        UploadedFile::new(
            file,
            Some(name.to_string()),
            content_type.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn reports_size_and_contents() {
        let file = upload(b"hello", "a.png", Some("image/png"));
        assert_eq!(file.size().unwrap(), 5);
        assert_eq!(file.read().await.unwrap(), b"hello");
    }

    #[test]
    fn kind_checks_extension_and_mime() {
        assert!(upload(b"x", "photo.JPG", Some("image/jpeg"))
            .check_kind(UploadKind::Image)
            .is_ok());
        assert!(upload(b"x", "photo.png", None)
            .check_kind(UploadKind::Image)
            .is_ok());
        assert!(upload(b"x", "photo.png", Some("text/html"))
            .check_kind(UploadKind::Image)
            .is_err());
        assert!(upload(b"x", "photo.svg", Some("image/png"))
            .check_kind(UploadKind::Image)
            .is_err());
        assert!(upload(b"x", "cv.pdf", Some("application/pdf"))
            .check_kind(UploadKind::Pdf)
            .is_ok());
        assert!(upload(b"x", "cv.docx", Some("application/pdf"))
            .check_kind(UploadKind::Pdf)
            .is_err());
    }

    #[test]
    fn dropping_removes_the_temp_file() {
        let file = upload(b"x", "a.png", None);
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }
}
