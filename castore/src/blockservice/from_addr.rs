use url::Url;

use crate::Error;

use super::{BlockService, MemoryBlockService, SimpleFilesystemBlockService, SledBlockService};

/// Constructs a new instance of a [BlockService] from an URI.
///
/// The following schemes are supported by the following services:
/// - `memory://` ([MemoryBlockService])
/// - `sled://` ([SledBlockService]), temporary without a path
/// - `fs://` ([SimpleFilesystemBlockService]), with an absolute path
pub async fn from_addr(uri: &str) -> Result<Box<dyn BlockService>, Error> {
    let url =
        Url::parse(uri).map_err(|e| Error::StorageError(format!("unable to parse url: {}", e)))?;

    let block_service: Box<dyn BlockService> = match url.scheme() {
        "memory" => {
            // memory doesn't support host or path in the URL.
            if url.has_host() || !url.path().is_empty() {
                return Err(Error::StorageError("invalid url".to_string()));
            }
            Box::<MemoryBlockService>::default()
        }
        "sled" => {
            // sled doesn't support host, and a path can be provided (otherwise
            // it'll live in memory only).
            if url.has_host() {
                return Err(Error::StorageError("no host allowed".to_string()));
            }

            if url.path() == "/" {
                return Err(Error::StorageError(
                    "cowardly refusing to open / with sled".to_string(),
                ));
            }

            Box::new(if url.path().is_empty() {
                SledBlockService::new_temporary()?
            } else {
                SledBlockService::new(url.path())?
            })
        }
        "fs" => {
            if url.has_host() {
                return Err(Error::StorageError("no host allowed".to_string()));
            }

            if url.path().is_empty() || url.path() == "/" {
                return Err(Error::StorageError(
                    "a directory other than / is required".to_string(),
                ));
            }

            Box::new(SimpleFilesystemBlockService::new(url.path().into()).await?)
        }
        scheme => {
            return Err(Error::StorageError(format!(
                "unknown scheme: {}",
                scheme
            )))
        }
    };

    Ok(block_service)
}
