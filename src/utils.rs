//! File helpers: existence checks before upload, file type sniffing by
//! magic bytes, and image loading.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Tracing target for file helpers.
pub const TRACING_TARGET: &str = "konfuzio_sdk::utils";

/// Files above this size are uploaded anyway, with a warning.
pub const DEFAULT_MAXIMUM_SIZE: u64 = 100_000_000;

/// Make sure a file exists and is not empty.
///
/// Oversized files only produce a warning. Returns the file size.
pub fn check_file(path: &Path, maximum_size: u64, allow_empty: bool) -> Result<u64> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let size = fs::metadata(path)?.len();
    if size == 0 && !allow_empty {
        return Err(Error::EmptyFile {
            path: path.to_path_buf(),
            size,
        });
    }
    if size > maximum_size {
        tracing::warn!(
            target: TRACING_TARGET,
            path = %path.display(),
            size_mb = size as f64 / 1_000_000.0,
            "Please check your BIG file"
        );
    }
    // Hashing reads the whole file, so only do it when someone is listening.
    if tracing::enabled!(target: TRACING_TARGET, tracing::Level::DEBUG) {
        tracing::debug!(
            target: TRACING_TARGET,
            path = %path.display(),
            id = %content_id(&fs::read(path)?),
            "File expected and found"
        );
    }
    Ok(size)
}

/// Stable identifier of some content (hex SHA-256).
pub fn content_id(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Current local time, e.g. `2021-03-04-17-30-12`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// Where file content comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl FileSource {
    fn name(&self) -> String {
        match self {
            FileSource::Path(path) => path.display().to_string(),
            FileSource::Bytes(_) => "bytes".to_string(),
        }
    }

    fn read(&self) -> Result<std::borrow::Cow<'_, [u8]>> {
        match self {
            FileSource::Path(path) => Ok(fs::read(path)?.into()),
            FileSource::Bytes(bytes) => Ok(bytes.as_slice().into()),
        }
    }
}

/// File types the server can extract text from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Image,
    Office,
}

/// Classify content by its magic bytes.
pub fn file_type(source: &FileSource) -> Result<FileType> {
    let bytes = source.read()?;
    let detected = match sniff_extension(&bytes) {
        Some("pdf") => Some(FileType::Pdf),
        Some("png" | "jpg" | "tif") => Some(FileType::Image),
        Some("zip") if is_office_zip(&bytes) => Some(FileType::Office),
        _ => None,
    };
    match detected {
        Some(file_type) => {
            tracing::debug!(target: TRACING_TARGET, file = %source.name(), ?file_type, "Detected file type");
            Ok(file_type)
        }
        None => {
            let message = format!(
                "We do not support file {} with extension {} to get text",
                source.name(),
                sniff_extension(&bytes).unwrap_or("unknown")
            );
            tracing::error!(target: TRACING_TARGET, "{message}");
            Err(Error::NotImplemented(message))
        }
    }
}

fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"%PDF", "pdf"),
        (b"\x89PNG\r\n\x1a\n", "png"),
        (b"\xff\xd8\xff", "jpg"),
        (b"II*\x00", "tif"),
        (b"MM\x00*", "tif"),
        (b"PK\x03\x04", "zip"),
    ];
    SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map(|(_, extension)| *extension)
}

/// Office documents are zip archives with `docProps/` or `_rels/` entries.
fn is_office_zip(bytes: &[u8]) -> bool {
    let Ok(archive) = zip::ZipArchive::new(Cursor::new(bytes)) else {
        return false;
    };
    let is_office = archive
        .file_names()
        .any(|name| name.starts_with("docProps/") || name.starts_with("_rels/"));
    is_office
}

/// Decode an image.
///
/// Path sources must look like an image; content that cannot be decoded
/// yields `Ok(None)` rather than an error.
pub fn load_image(source: &FileSource) -> Result<Option<image::DynamicImage>> {
    if let FileSource::Path(_) = source {
        if file_type(source)? != FileType::Image {
            return Err(Error::NotImplemented(format!(
                "The image file you want to load is not an image: {}",
                source.name()
            )));
        }
    }
    let bytes = source.read()?;
    match image::load_from_memory(&bytes) {
        Ok(image) => Ok(Some(image)),
        Err(err) => {
            tracing::warn!(target: TRACING_TARGET, file = %source.name(), error = %err, "Could not decode image");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn png_bytes() -> Vec<u8> {
        let image = image::DynamicImage::new_rgb8(2, 2);
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn zip_with(names: &[&str]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for name in names {
            writer.start_file(*name, options).unwrap();
            writer.write_all(b"<xml/>").unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn check_file_reports_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");
        assert!(matches!(
            check_file(&missing, DEFAULT_MAXIMUM_SIZE, false),
            Err(Error::FileNotFound(_))
        ));

        let empty = dir.path().join("empty.pdf");
        fs::write(&empty, b"").unwrap();
        assert!(matches!(
            check_file(&empty, DEFAULT_MAXIMUM_SIZE, false),
            Err(Error::EmptyFile { size: 0, .. })
        ));
        assert_eq!(check_file(&empty, DEFAULT_MAXIMUM_SIZE, true).unwrap(), 0);
    }

    #[test]
    fn oversized_file_is_only_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        fs::write(&path, b"%PDF-1.4 0123456789").unwrap();
        assert_eq!(check_file(&path, 4, false).unwrap(), 19);
    }

    #[test]
    fn sniffs_pdf_and_images() {
        let pdf = FileSource::Bytes(b"%PDF-1.7\n...".to_vec());
        assert_eq!(file_type(&pdf).unwrap(), FileType::Pdf);
        assert_eq!(
            file_type(&FileSource::Bytes(png_bytes())).unwrap(),
            FileType::Image
        );
        let jpeg = FileSource::Bytes(vec![0xff, 0xd8, 0xff, 0xe0, 0, 0x10]);
        assert_eq!(file_type(&jpeg).unwrap(), FileType::Image);
    }

    #[test]
    fn office_zip_is_detected_by_entries() {
        let docx = zip_with(&["[Content_Types].xml", "_rels/.rels", "word/document.xml"]);
        assert_eq!(file_type(&FileSource::Bytes(docx)).unwrap(), FileType::Office);

        let plain = zip_with(&["notes.txt"]);
        assert!(matches!(
            file_type(&FileSource::Bytes(plain)),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn truncated_zip_is_not_office() {
        let mut docx = zip_with(&["_rels/.rels", "word/document.xml"]);
        docx.truncate(docx.len() / 2);
        assert!(matches!(
            file_type(&FileSource::Bytes(docx)),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn unknown_content_is_not_implemented() {
        let html = FileSource::Bytes(b"<html></html>".to_vec());
        assert!(matches!(file_type(&html), Err(Error::NotImplemented(_))));
    }

    #[test]
    fn file_type_reads_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        fs::write(&path, png_bytes()).unwrap();
        assert_eq!(file_type(&FileSource::Path(path)).unwrap(), FileType::Image);
    }

    #[test]
    fn load_image_decodes_or_returns_none() {
        let image = load_image(&FileSource::Bytes(png_bytes())).unwrap().unwrap();
        assert_eq!((image.width(), image.height()), (2, 2));

        // PNG signature followed by garbage.
        let mut corrupt = b"\x89PNG\r\n\x1a\n".to_vec();
        corrupt.extend_from_slice(b"garbage");
        assert!(load_image(&FileSource::Bytes(corrupt)).unwrap().is_none());
    }

    #[test]
    fn load_image_rejects_non_image_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();
        assert!(matches!(
            load_image(&FileSource::Path(path)),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn timestamp_has_fixed_shape() {
        let stamp = timestamp();
        assert_eq!(stamp.len(), 19);
        assert_eq!(stamp.split('-').count(), 6);
    }

    #[test]
    fn content_id_is_stable() {
        assert_eq!(content_id(b"abc"), content_id(b"abc"));
        assert_ne!(content_id(b"abc"), content_id(b"abd"));
        assert_eq!(content_id(b"").len(), 64);
    }
}
