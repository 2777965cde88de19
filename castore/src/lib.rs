mod digests;
mod errors;

pub mod archive;
pub mod assembler;
pub mod blockservice;
pub mod cids;
pub mod fixtures;
pub mod import;
pub mod nodes;
pub mod proto;
pub mod resolver;

pub use digests::{ContentHash, SHA256_LEN};
pub use errors::Error;
pub use nodes::{decode_node, Directory, DirectoryEntry, FileChunk, FileNode, Node};
pub use resolver::{resolve, Resolved};


// Required by rstest_reuse's #[template] macro, which expands to `$crate::rstest_reuse`.
#[cfg(test)]
#[allow(clippy::single_component_path_imports)]
use rstest_reuse;
