//! Multipart parsing for the try-on endpoint.
//!
//! Expected parts:
//! - `person_image`, `clothing_image`: the two photos (required, non-empty,
//!   sent as file parts)
//! - `garment_description`, `auto_mask`, `auto_crop`, `denoise_steps`, `seed`:
//!   optional text overrides of the synthesis defaults
//!
//! Anything else is skipped.

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;

use crate::backend::SynthesisOverrides;
use crate::error::TryOnError;

pub const PERSON_FIELD: &str = "person_image";
pub const CLOTHING_FIELD: &str = "clothing_image";
pub const MISSING_IMAGES: &str = "Both person_image and clothing_image are required";

/// One uploaded photo.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Filename as sent by the client, unsanitized
    pub filename: String,
    pub bytes: Bytes,
}

/// The two photos of one try-on request.
#[derive(Debug, Clone)]
pub struct UploadPair {
    pub person: UploadedImage,
    pub garment: UploadedImage,
}

/// Everything a try-on request carries.
#[derive(Debug, Clone)]
pub struct TryOnForm {
    pub uploads: UploadPair,
    pub overrides: SynthesisOverrides,
}

/// Reads the whole multipart body.
///
/// # Errors
/// - [`TryOnError::Validation`] with [`MISSING_IMAGES`] when either photo is absent, empty or
///   not a file part
/// - [`TryOnError::Validation`] when the body is unreadable or an override does not parse
/// - [`TryOnError::TooLarge`] when the body goes over the upload limit
pub async fn read_tryon_form(mut multipart: Multipart) -> Result<TryOnForm, TryOnError> {
    let mut person: Option<UploadedImage> = None;
    let mut garment: Option<UploadedImage> = None;
    let mut overrides = SynthesisOverrides::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| read_error("multipart data", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            PERSON_FIELD | CLOTHING_FIELD => {
                // A part without a filename is a text field, not an upload.
                let Some(filename) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let bytes = field.bytes().await.map_err(|e| read_error(&name, e))?;
                if bytes.is_empty() {
                    continue;
                }

                let image = UploadedImage { filename, bytes };
                if name == PERSON_FIELD {
                    person = Some(image);
                } else {
                    garment = Some(image);
                }
            }
            _ => {
                if field.file_name().is_some() {
                    continue;
                }
                let value = field.text().await.map_err(|e| read_error(&name, e))?;
                overrides
                    .set_field(&name, &value)
                    .map_err(TryOnError::Validation)?;
            }
        }
    }

    match (person, garment) {
        (Some(person), Some(garment)) => Ok(TryOnForm {
            uploads: UploadPair { person, garment },
            overrides,
        }),
        _ => Err(TryOnError::Validation(MISSING_IMAGES.to_string())),
    }
}

fn read_error(what: &str, err: MultipartError) -> TryOnError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        TryOnError::TooLarge(format!("Upload exceeds the size limit: {}", err))
    } else {
        TryOnError::Validation(format!("Failed to read {}: {}", what, err))
    }
}
