//! Filesystem infrastructure: implements `KeyFileReader`.

use std::path::Path;

use crate::application::ports::KeyFileReader;

/// Production filesystem implementation of the local file ports.
pub struct LocalFs;

impl KeyFileReader for LocalFs {
    async fn read_key_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}
