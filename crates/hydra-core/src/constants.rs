//! Constants shared across crates

use uuid::Uuid;

/// Uploader recorded when the caller supplies no identity (CLI and tests).
pub const ANONYMOUS_UPLOADER_ID: Uuid = Uuid::from_u128(0x00000000_0000_0000_0000_000000000001);

/// MIME type of every generated thumbnail and preview.
pub const DERIVATIVE_MIME_TYPE: &str = "image/jpeg";

/// Extension of every generated thumbnail and preview.
pub const DERIVATIVE_EXTENSION: &str = "jpg";

/// Fallback when neither the declared content type nor the extension is recognized.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
