use crate::errors::ApiError;
use crate::models::envelope::Envelope;
use crate::models::files::{StoredFile, UploadedFile};
use crate::policy::{Conversion, TARGET_EXTENSION, UploadPolicy};
use crate::storage::{
    FilesStorage, Partition, convert, file_name_of, replace_extension, sanitize_file_name,
};
use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, http::header, web};
use chrono::Local;
use futures_util::TryStreamExt;
use mime_guess::from_path;

const FILE_FIELD: &str = "file";

/// POST /upload
/// Stores the `file` part under `uploads/<year>/<month>`, normalizing still
/// images to WebP, and answers with the public URL.
pub async fn upload_file(
    req: HttpRequest,
    storage: web::Data<FilesStorage>,
    policy: web::Data<UploadPolicy>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let upload = read_file_part(&mut payload, &policy, authorization).await?;

    let now = Local::now();
    let stamp = now.timestamp_millis();
    let partition = Partition::at(&now);
    let dir = storage.ensure_dir(&partition).await?;

    let original_path = storage
        .persist(&dir, stamp, &upload.original_name, &upload.bytes)
        .await?;
    let mut stored_path = original_path.clone();

    if policy.conversion_for(&upload.mime_type) == Conversion::ToWebp {
        let bytes = upload.bytes.clone();
        let mime_type = upload.mime_type.clone();
        let encoded = web::block(move || convert::to_webp(&bytes, &mime_type))
            .await?
            .map_err(ApiError::Conversion)?;

        let target_name = replace_extension(&upload.original_name, TARGET_EXTENSION);
        stored_path = storage.persist(&dir, stamp, &target_name, &encoded).await?;

        if let Err(e) = storage.delete_file(&original_path).await {
            log::warn!(
                "converted {} but could not remove original: {}",
                original_path.display(),
                e
            );
        }
    }

    let filename = file_name_of(&stored_path);
    let path = storage.public_url(&partition, &filename);
    log::info!(
        "stored {} ({}, {} bytes) as {}",
        upload.original_name,
        upload.mime_type,
        upload.bytes.len(),
        stored_path.display()
    );

    Ok(HttpResponse::Ok().json(Envelope::success(StoredFile {
        filename,
        original_name: upload.original_name,
        mimetype: upload.mime_type,
        size: upload.bytes.len() as u64,
        path,
    })))
}

/// Pulls the `file` part out of the body. Type and size are checked before the
/// caller writes anything to disk.
async fn read_file_part(
    payload: &mut Multipart,
    policy: &UploadPolicy,
    authorization: Option<&str>,
) -> Result<UploadedFile, ApiError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        // A `file` part without a filename is a plain form value or an empty
        // file input, not an upload.
        let original_name = match field.content_disposition().and_then(|cd| cd.get_filename()) {
            Some(name) if !name.is_empty() => sanitize_file_name(name),
            _ => continue,
        };

        let mime_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .or_else(|| from_path(&original_name).first().map(|m| m.essence_str().to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if !policy.is_allowed(&mime_type, authorization) {
            return Err(ApiError::UnsupportedType { mime_type });
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > policy.max_file_size {
                return Err(ApiError::TooLarge {
                    max_size: policy.max_file_size,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile {
            original_name,
            mime_type,
            bytes,
        });
    }

    Err(ApiError::MissingFile)
}
