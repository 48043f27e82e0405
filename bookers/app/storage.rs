//! File attachments: blob metadata in the database, bytes on disk, and
//! resized image variants computed on demand.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use rand::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result, ValidationErrors};
use crate::models::{self, Attachment, Blob, NewAttachment, NewBlob};
use crate::schema::{storage_attachments, storage_blobs};

const KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const KEY_LENGTH: usize = 28;

pub fn generate_key() -> String {
    let mut rng = rand::thread_rng();
    (0..KEY_LENGTH)
        .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

pub fn checksum(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}

/// Stores blob bytes under `root/<k0k1>/<k2k3>/<key>` and variants under
/// `root/variants/<key>/`.
#[derive(Debug, Clone)]
pub struct DiskService {
    root: PathBuf,
}

impl DiskService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        if key.len() < 4 || !key.is_ascii() {
            return self.root.join(key);
        }
        self.root.join(&key[0..2]).join(&key[2..4]).join(key)
    }

    pub fn upload(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        tracing::debug!(%key, size = bytes.len(), "uploaded blob");
        Ok(())
    }

    pub fn download(&self, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(key))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    /// Missing files are not an error.
    pub fn delete(&self, key: &str) -> io::Result<()> {
        ignore_not_found(fs::remove_file(self.path_for(key)))
    }

    /// Deletes the blob and every variant derived from it.
    pub fn delete_blob(&self, key: &str) -> io::Result<()> {
        self.delete(key)?;
        ignore_not_found(fs::remove_dir_all(self.variants_dir(key)))?;
        tracing::debug!(%key, "deleted blob files");
        Ok(())
    }

    fn variants_dir(&self, key: &str) -> PathBuf {
        self.root.join("variants").join(key)
    }
}

fn ignore_not_found(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// The record slot an attachment hangs off, e.g. `("User", 3, "profile_image")`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot<'a> {
    pub record_type: &'a str,
    pub record_id: i32,
    pub name: &'a str,
}

#[derive(Debug, Clone)]
pub struct Upload<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

fn slot_attachments(slot: Slot<'_>) -> storage_attachments::BoxedQuery<'_, diesel::sqlite::Sqlite> {
    storage_attachments::table
        .filter(storage_attachments::record_type.eq(slot.record_type))
        .filter(storage_attachments::record_id.eq(slot.record_id))
        .filter(storage_attachments::name.eq(slot.name))
        .into_boxed()
}

/// Removes attachment rows (and their blob rows) matching `query`, returning
/// the blobs whose files should now be deleted.
fn detach_where(
    conn: &mut SqliteConnection,
    query: storage_attachments::BoxedQuery<'_, diesel::sqlite::Sqlite>,
) -> Result<Vec<Blob>> {
    let attachments: Vec<Attachment> = query.select(Attachment::as_select()).load(conn)?;
    if attachments.is_empty() {
        return Ok(Vec::new());
    }
    let attachment_ids = attachments.iter().map(|a| a.id).collect::<Vec<_>>();
    let blob_ids = attachments.iter().map(|a| a.blob_id).collect::<Vec<_>>();
    let blobs = storage_blobs::table
        .filter(storage_blobs::id.eq_any(&blob_ids))
        .select(Blob::as_select())
        .load(conn)?;
    diesel::delete(storage_attachments::table.filter(storage_attachments::id.eq_any(&attachment_ids)))
        .execute(conn)?;
    diesel::delete(storage_blobs::table.filter(storage_blobs::id.eq_any(&blob_ids)))
        .execute(conn)?;
    Ok(blobs)
}

/// Stores `upload` and attaches it to `slot`, replacing whatever was there.
pub fn attach(
    conn: &mut SqliteConnection,
    disk: &DiskService,
    slot: Slot<'_>,
    upload: &Upload<'_>,
) -> Result<Blob> {
    let key = generate_key();
    let checksum = checksum(upload.bytes);
    disk.upload(&key, upload.bytes)?;

    let result = conn.transaction(|conn| -> Result<_> {
        let replaced = detach_where(conn, slot_attachments(slot))?;
        let now = models::now();
        let blob = diesel::insert_into(storage_blobs::table)
            .values(&NewBlob {
                key: &key,
                filename: upload.filename,
                content_type: upload.content_type,
                byte_size: upload.bytes.len() as i64,
                checksum: &checksum,
                created_at: now,
            })
            .returning(Blob::as_returning())
            .get_result(conn)?;
        diesel::insert_into(storage_attachments::table)
            .values(&NewAttachment {
                name: slot.name,
                record_type: slot.record_type,
                record_id: slot.record_id,
                blob_id: blob.id,
                created_at: now,
            })
            .execute(conn)?;
        Ok((blob, replaced))
    });

    match result {
        Ok((blob, replaced)) => {
            for old in &replaced {
                disk.delete_blob(&old.key)?;
            }
            tracing::info!(
                record_type = slot.record_type,
                record_id = slot.record_id,
                name = slot.name,
                key = %blob.key,
                "attached blob"
            );
            Ok(blob)
        }
        Err(e) => {
            disk.delete(&key)?;
            Err(e)
        }
    }
}

pub fn attached(conn: &mut SqliteConnection, slot: Slot<'_>) -> Result<Option<Blob>> {
    Ok(storage_attachments::table
        .inner_join(storage_blobs::table)
        .filter(storage_attachments::record_type.eq(slot.record_type))
        .filter(storage_attachments::record_id.eq(slot.record_id))
        .filter(storage_attachments::name.eq(slot.name))
        .order(storage_attachments::id.desc())
        .select(Blob::as_select())
        .first(conn)
        .optional()?)
}

/// Detaches every slot of a record. The caller deletes the returned blobs'
/// files once its transaction commits.
pub fn detach_all(conn: &mut SqliteConnection, record_type: &str, record_id: i32) -> Result<Vec<Blob>> {
    let query = storage_attachments::table
        .filter(storage_attachments::record_type.eq(record_type))
        .filter(storage_attachments::record_id.eq(record_id))
        .into_boxed();
    detach_where(conn, query)
}

/// Detaches `slot` and deletes the stored files. Returns whether anything
/// was attached.
pub fn purge(conn: &mut SqliteConnection, disk: &DiskService, slot: Slot<'_>) -> Result<bool> {
    let purged = conn.transaction(|conn| detach_where(conn, slot_attachments(slot)))?;
    for blob in &purged {
        disk.delete_blob(&blob.key)?;
    }
    Ok(!purged.is_empty())
}

/// Shrinks an image to fit within `width` x `height`, keeping the aspect
/// ratio. Images already inside the box are left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResizeToLimit {
    pub width: u32,
    pub height: u32,
}

impl ResizeToLimit {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let mut errors = ValidationErrors::new();
        if width == 0 {
            errors.add("width", "must be greater than 0");
        }
        if height == 0 {
            errors.add("height", "must be greater than 0");
        }
        errors.into_result()?;
        Ok(Self { width, height })
    }

    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        if image.width() <= self.width && image.height() <= self.height {
            image
        } else {
            image.resize(self.width, self.height, FilterType::Lanczos3)
        }
    }

    fn key(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub blob_key: String,
    pub width: u32,
    pub height: u32,
    pub content_type: String,
    pub path: PathBuf,
}

fn blob_format(blob: &Blob, bytes: Option<&[u8]>) -> Result<ImageFormat> {
    if let Some(format) = ImageFormat::from_mime_type(&blob.content_type) {
        return Ok(format);
    }
    match bytes {
        Some(bytes) => Ok(image::guess_format(bytes)?),
        None => ImageFormat::from_path(&blob.filename).map_err(Error::from),
    }
}

/// Returns the `resize` variant of `blob`, processing and caching it on
/// first request.
pub fn variant(disk: &DiskService, blob: &Blob, resize: ResizeToLimit) -> Result<Variant> {
    let cached_format = blob_format(blob, None).ok();
    if let Some(format) = cached_format {
        let path = variant_path(disk, blob, resize, format);
        if path.is_file() {
            let (width, height) = image::image_dimensions(&path)?;
            tracing::debug!(key = %blob.key, variation = %resize.key(), "variant cache hit");
            return Ok(Variant {
                blob_key: blob.key.clone(),
                width,
                height,
                content_type: format.to_mime_type().to_string(),
                path,
            });
        }
    }

    let bytes = disk.download(&blob.key)?;
    let format = blob_format(blob, Some(&bytes))?;
    let original = image::load_from_memory_with_format(&bytes, format)?;
    let resized = resize.apply(original);
    let path = variant_path(disk, blob, resize, format);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    resized.save_with_format(&path, format)?;
    tracing::info!(
        key = %blob.key,
        variation = %resize.key(),
        width = resized.width(),
        height = resized.height(),
        "processed variant"
    );
    Ok(Variant {
        blob_key: blob.key.clone(),
        width: resized.width(),
        height: resized.height(),
        content_type: format.to_mime_type().to_string(),
        path,
    })
}

fn variant_path(disk: &DiskService, blob: &Blob, resize: ResizeToLimit, format: ImageFormat) -> PathBuf {
    let extension = format.extensions_str().first().copied().unwrap_or("bin");
    disk.variants_dir(&blob.key)
        .join(format!("{}.{}", resize.key(), extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageBuffer, Rgb};

    #[test]
    fn test_generate_key() {
        let key = generate_key();
        assert_eq!(key.len(), KEY_LENGTH);
        assert!(key.bytes().all(|b| KEY_ALPHABET.contains(&b)));
        assert_ne!(key, generate_key());
    }

    #[test]
    fn test_disk_service_layout() {
        let dir = tempfile::tempdir().unwrap();
        let disk = DiskService::new(dir.path());
        let key = "abcdefghijklmnopqrstuvwxyz01";
        assert_eq!(
            disk.path_for(key),
            dir.path().join("ab").join("cd").join(key)
        );
        assert!(!disk.exists(key));
        disk.upload(key, b"hello").unwrap();
        assert!(disk.exists(key));
        assert_eq!(disk.download(key).unwrap(), b"hello");
        disk.delete_blob(key).unwrap();
        assert!(!disk.exists(key));
        // Deleting twice is fine.
        disk.delete(key).unwrap();
    }

    #[test]
    fn test_resize_to_limit_keeps_aspect_ratio() {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(400, 200, Rgb([0u8, 0, 0])));
        let resized = ResizeToLimit::new(100, 100).unwrap().apply(image);
        assert_eq!(resized.dimensions(), (100, 50));
    }

    #[test]
    fn test_resize_to_limit_never_upscales() {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(40, 20, Rgb([0u8, 0, 0])));
        let resized = ResizeToLimit::new(100, 100).unwrap().apply(image);
        assert_eq!(resized.dimensions(), (40, 20));
    }

    #[test]
    fn test_resize_to_limit_rejects_zero() {
        let err = ResizeToLimit::new(0, 10).unwrap_err();
        assert!(err.validation_errors().unwrap().contains("width"));
    }

    #[test]
    fn test_checksum() {
        assert_eq!(checksum(b""), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
    }
}
