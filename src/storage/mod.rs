use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{Datelike, NaiveDate, Utc};
use image::GenericImageView;
use serde::Serialize;
use std::io::Cursor;

use crate::config::Config;

/// Minimum acceptable selfie dimensions.
const MIN_PHOTO_WIDTH: u32 = 200;
const MIN_PHOTO_HEIGHT: u32 = 200;
/// Cache lifetime sent with uploaded objects, in seconds.
const CACHE_MAX_AGE_SECS: u32 = 3600;
const THUMBNAIL_JPEG_QUALITY: u8 = 80;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Employee ID is required")]
    EmptyEmployeeId,
    #[error("Photo data is required")]
    EmptyData,
    #[error("Photo path is required")]
    EmptyPath,
    #[error("Photo data is not valid base64")]
    InvalidBase64,
    #[error("Photo could not be decoded as an image")]
    InvalidImage,
    #[error("Photo is too small ({width}x{height}, minimum {MIN_PHOTO_WIDTH}x{MIN_PHOTO_HEIGHT})")]
    TooSmall { width: u32, height: u32 },
    #[error("Upload failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Storage responded with status {0}")]
    UnexpectedStatus(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoKind {
    CheckIn,
    CheckOut,
    Reference,
}

impl PhotoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoKind::CheckIn => "checkin",
            PhotoKind::CheckOut => "checkout",
            PhotoKind::Reference => "reference",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PhotoUpload {
    pub url: String,
    pub path: String,
}

/// Object path within the bucket. Attendance selfies are partitioned by date
/// then employee; reference photos live under a flat prefix.
pub fn photo_path(employee_id: &str, date: NaiveDate, kind: PhotoKind, epoch_millis: i64) -> String {
    match kind {
        PhotoKind::Reference => {
            format!("employees/reference/{}-{}.jpg", employee_id, epoch_millis)
        }
        _ => format!(
            "attendance/{}/{:02}/{:02}/{}/{}-{}.jpg",
            date.year(),
            date.month(),
            date.day(),
            employee_id,
            kind.as_str(),
            epoch_millis
        ),
    }
}

/// Strips an optional `data:image/...;base64,` prefix and decodes the payload.
fn decode_base64_image(data: &str) -> Result<Vec<u8>, StorageError> {
    let raw = match data.split_once("base64,") {
        Some((_, rest)) => rest,
        None => data,
    };
    BASE64
        .decode(raw.trim())
        .map_err(|_| StorageError::InvalidBase64)
}

/// Resizes a base64 image to fit within a bounding box, preserving aspect
/// ratio, and re-encodes as JPEG.
pub fn generate_thumbnail(
    base64_data: &str,
    max_width: u32,
    max_height: u32,
) -> Result<String, StorageError> {
    let bytes = decode_base64_image(base64_data)?;
    let img = image::load_from_memory(&bytes).map_err(|_| StorageError::InvalidImage)?;
    let thumb = img.thumbnail(max_width, max_height).to_rgb8();

    let mut out = Cursor::new(Vec::new());
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, THUMBNAIL_JPEG_QUALITY);
    thumb
        .write_with_encoder(encoder)
        .map_err(|_| StorageError::InvalidImage)?;

    Ok(BASE64.encode(out.into_inner()))
}

/// Thin client over the object-storage HTTP API. One instance is constructed
/// at startup and cloned into the shared application state.
#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl StorageClient {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.storage_url.trim_end_matches('/').to_string(),
            bucket: config.storage_bucket.clone(),
            api_key: config.storage_api_key.clone(),
        }
    }

    /// Public URL for an object path.
    pub fn photo_url(&self, path: &str) -> Result<String, StorageError> {
        if path.is_empty() {
            return Err(StorageError::EmptyPath);
        }
        Ok(format!(
            "{}/object/public/{}/{}",
            self.base_url, self.bucket, path
        ))
    }

    /// Decodes, validates and uploads a selfie or reference photo.
    pub async fn upload_photo(
        &self,
        employee_id: &str,
        base64_data: &str,
        date: NaiveDate,
        kind: PhotoKind,
    ) -> Result<PhotoUpload, StorageError> {
        if employee_id.is_empty() {
            return Err(StorageError::EmptyEmployeeId);
        }
        if base64_data.is_empty() {
            return Err(StorageError::EmptyData);
        }

        let bytes = decode_base64_image(base64_data)?;
        let img = image::load_from_memory(&bytes).map_err(|_| StorageError::InvalidImage)?;
        let (width, height) = img.dimensions();
        if width < MIN_PHOTO_WIDTH || height < MIN_PHOTO_HEIGHT {
            return Err(StorageError::TooSmall { width, height });
        }

        let path = photo_path(employee_id, date, kind, Utc::now().timestamp_millis());
        let response = self
            .http
            .post(format!("{}/object/{}/{}", self.base_url, self.bucket, path))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .header(
                reqwest::header::CACHE_CONTROL,
                format!("max-age={}", CACHE_MAX_AGE_SECS),
            )
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::UnexpectedStatus(response.status().as_u16()));
        }

        let url = self.photo_url(&path)?;
        tracing::debug!("Uploaded photo to {}", path);
        Ok(PhotoUpload { url, path })
    }

    pub async fn delete_photo(&self, path: &str) -> Result<(), StorageError> {
        if path.is_empty() {
            return Err(StorageError::EmptyPath);
        }

        let response = self
            .http
            .delete(format!("{}/object/{}/{}", self.base_url, self.bucket, path))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::UnexpectedStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_base64(width: u32, height: u32) -> String {
        let img = image::DynamicImage::new_rgb8(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        BASE64.encode(out.into_inner())
    }

    #[test]
    fn attendance_path_is_partitioned_by_date_and_employee() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let path = photo_path("PGN-2026-0042", date, PhotoKind::CheckIn, 1700000000000);
        assert_eq!(
            path,
            "attendance/2026/03/07/PGN-2026-0042/checkin-1700000000000.jpg"
        );
    }

    #[test]
    fn reference_path_uses_flat_prefix() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let path = photo_path("PGN-2026-0042", date, PhotoKind::Reference, 1700000000000);
        assert_eq!(path, "employees/reference/PGN-2026-0042-1700000000000.jpg");
    }

    #[test]
    fn base64_decode_tolerates_data_url_prefix() {
        let encoded = png_base64(4, 4);
        let prefixed = format!("data:image/png;base64,{}", encoded);
        assert_eq!(
            decode_base64_image(&prefixed).unwrap(),
            decode_base64_image(&encoded).unwrap()
        );
        assert!(matches!(
            decode_base64_image("not base64!!!"),
            Err(StorageError::InvalidBase64)
        ));
    }

    #[test]
    fn thumbnail_fits_bounding_box_and_keeps_aspect() {
        let encoded = png_base64(400, 200);
        let thumb_b64 = generate_thumbnail(&encoded, 200, 200).unwrap();
        let bytes = BASE64.decode(thumb_b64).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!(thumb.dimensions(), (200, 100));
    }

    #[tokio::test]
    async fn upload_rejects_bad_input_before_any_network_call() {
        let config = crate::config::Config {
            database_url: String::new(),
            redis_url: String::new(),
            jwt_secret: String::new(),
            jwt_expiration_secs: 0,
            rate_limit_window_secs: 0,
            rate_limit_requests: 0,
            server_host: String::new(),
            server_port: 0,
            api_base_uri: String::new(),
            storage_url: "http://localhost:1".into(),
            storage_bucket: "attendance".into(),
            storage_api_key: "key".into(),
            geocoding_url: String::new(),
        };
        let client = StorageClient::new(&config, reqwest::Client::new());
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();

        let r = client
            .upload_photo("", "abcd", date, PhotoKind::CheckIn)
            .await;
        assert!(matches!(r, Err(StorageError::EmptyEmployeeId)));

        let r = client.upload_photo("e1", "", date, PhotoKind::CheckIn).await;
        assert!(matches!(r, Err(StorageError::EmptyData)));

        let small = png_base64(100, 100);
        let r = client
            .upload_photo("e1", &small, date, PhotoKind::CheckIn)
            .await;
        assert!(matches!(
            r,
            Err(StorageError::TooSmall {
                width: 100,
                height: 100
            })
        ));
    }

    #[test]
    fn photo_url_rejects_empty_path() {
        let config = crate::config::Config {
            database_url: String::new(),
            redis_url: String::new(),
            jwt_secret: String::new(),
            jwt_expiration_secs: 0,
            rate_limit_window_secs: 0,
            rate_limit_requests: 0,
            server_host: String::new(),
            server_port: 0,
            api_base_uri: String::new(),
            storage_url: "http://localhost:9000/".into(),
            storage_bucket: "attendance".into(),
            storage_api_key: "key".into(),
            geocoding_url: String::new(),
        };
        let client = StorageClient::new(&config, reqwest::Client::new());
        assert!(client.photo_url("").is_err());
        assert_eq!(
            client.photo_url("a/b.jpg").unwrap(),
            "http://localhost:9000/object/public/attendance/a/b.jpg"
        );
    }
}
