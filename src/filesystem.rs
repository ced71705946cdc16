use actix_multipart::Field;
use actix_web::{error, web, Error};
use futures_util::{StreamExt, TryStreamExt};
use image::ImageFormat;
use std::path::{Path, PathBuf};

/// Subdirectory of the media root that holds post images.
pub const POST_IMAGE_DIR: &str = "posts";

/// Upper bound for a single uploaded image.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A file received from a multipart field.
#[derive(Debug)]
pub struct UploadPayload {
    pub data: Vec<u8>,
    pub filename: String,
    pub hash: blake3::Hash,
}

/// Upload that decoded as an image.
#[derive(Debug)]
pub struct ValidImage {
    pub payload: UploadPayload,
    pub format: ImageFormat,
}

/// Local directory that serves user uploads under `/media`.
#[derive(Clone, Debug)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the image under `posts/<blake3>.<ext>` and returns that relative path.
    /// Identical uploads share one file.
    pub async fn save_post_image(&self, image: ValidImage) -> Result<String, Error> {
        let ValidImage { payload, format } = image;
        let ext = format.extensions_str().first().copied().unwrap_or("img");
        let relative = format!("{}/{}.{}", POST_IMAGE_DIR, payload.hash, ext);
        let dir = self.root.join(POST_IMAGE_DIR);
        let target = self.root.join(&relative);
        let data = payload.data;

        web::block(move || -> std::io::Result<()> {
            std::fs::create_dir_all(&dir)?;
            if !target.exists() {
                std::fs::write(&target, &data)?;
            }
            Ok(())
        })
        .await
        .map_err(error::ErrorInternalServerError)?
        .map_err(|e| {
            log::error!("save_post_image: {}", e);
            error::ErrorInternalServerError("Failed to store the uploaded image.")
        })?;

        log::info!("stored upload {:?} as {}", payload.filename, relative);
        Ok(relative)
    }
}

/// Reads a file field to the end, hashing as it goes.
/// Returns `None` for an empty file input (no file chosen).
pub async fn read_upload(field: &mut Field) -> Result<Option<UploadPayload>, Error> {
    let filename = field
        .content_disposition()
        .get_filename()
        .unwrap_or_default()
        .to_owned();

    let mut hasher = blake3::Hasher::new();
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    while let Some(chunk) = field.next().await {
        let bytes = chunk.map_err(|e| {
            log::error!("read_upload: multipart read error: {}", e);
            error::ErrorBadRequest("Error reading upload data.")
        })?;
        if buf.len() + bytes.len() > MAX_UPLOAD_BYTES {
            return Err(error::ErrorPayloadTooLarge("Uploaded file is too large."));
        }
        hasher.update(&bytes);
        buf.extend(bytes);
    }

    if filename.is_empty() && buf.is_empty() {
        return Ok(None);
    }

    Ok(Some(UploadPayload {
        data: buf,
        filename,
        hash: hasher.finalize(),
    }))
}

/// Reads a text field into a string.
pub async fn read_text(field: &mut Field) -> Result<String, Error> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(bytes) = field.try_next().await.map_err(error::ErrorBadRequest)? {
        buf.extend(bytes);
    }
    String::from_utf8(buf).map_err(|_| error::ErrorBadRequest("Form field is not valid UTF-8."))
}

/// Accepts the upload only if its bytes decode as a supported image.
pub fn inspect_image(payload: UploadPayload) -> Result<ValidImage, UploadPayload> {
    let format = match image::guess_format(&payload.data) {
        Ok(format) => format,
        Err(_) => return Err(payload),
    };

    match image::load_from_memory_with_format(&payload.data, format) {
        Ok(_) => Ok(ValidImage { payload, format }),
        Err(e) => {
            log::debug!("inspect_image: {:?} rejected: {}", payload.filename, e);
            Err(payload)
        }
    }
}
