//! Shared key generation for storage backends.
//!
//! Key format: `files/{shard}/{id}` where `shard` is the first two hex digits of the ID.

use uuid::Uuid;

fn prefix(id: Uuid) -> String {
    let simple = id.simple().to_string();
    format!("files/{}/{}", &simple[..2], id)
}

/// Key of the canonical bytes of a file
pub fn blob_key(id: Uuid) -> String {
    prefix(id)
}

/// Key of the type-specific metadata sidecar
pub fn meta_key(id: Uuid) -> String {
    format!("{}.meta.json", prefix(id))
}

/// Key of the thumbnail-set sidecar
pub fn thumbnails_key(id: Uuid) -> String {
    format!("{}.thumbnails.json", prefix(id))
}
