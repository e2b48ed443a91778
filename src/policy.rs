use crate::config::Config;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

/// Raster sources that get normalized to WebP on upload.
const CONVERTIBLE_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/svg+xml"];

pub const TARGET_EXTENSION: &str = "webp";

/// What happens to a stored upload after it has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Re-encode to WebP and drop the original.
    ToWebp,
    /// Store as received. Animated GIFs, files already in WebP, admin uploads.
    Keep,
}

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub allowed_mime_types: &'static [&'static str],
    pub max_file_size: usize,
    pub admin_token: String,
}

impl UploadPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            allowed_mime_types: ALLOWED_MIME_TYPES,
            max_file_size: config.max_file_size,
            admin_token: config.admin_token.clone(),
        }
    }

    pub fn is_admin(&self, authorization: Option<&str>) -> bool {
        authorization.is_some_and(|value| value == self.admin_token)
    }

    pub fn is_allowed(&self, mime_type: &str, authorization: Option<&str>) -> bool {
        self.allowed_mime_types.contains(&mime_type) || self.is_admin(authorization)
    }

    pub fn conversion_for(&self, mime_type: &str) -> Conversion {
        if CONVERTIBLE_MIME_TYPES.contains(&mime_type) {
            Conversion::ToWebp
        } else {
            Conversion::Keep
        }
    }
}
