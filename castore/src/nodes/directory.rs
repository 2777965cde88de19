use std::collections::HashSet;

use cid::Cid;

use crate::proto::PbLink;

/// A named link inside a [Directory].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    name: String,
    cid: Cid,
    /// Cumulative size of the linked DAG, as recorded by the producer.
    size: u64,
}

impl DirectoryEntry {
    pub fn new(name: impl Into<String>, cid: Cid, size: u64) -> Self {
        Self {
            name: name.into(),
            cid,
            size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Errors that occur while assembling a [Directory].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// Elements are not uniquely named
    #[error("{0:?} is a duplicate name")]
    DuplicateName(String),
    /// Invalid name encountered
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    /// A link has no hash, or one that isn't a CID
    #[error("invalid link {0:?}: {1}")]
    InvalidLink(String, String),
}

/// A Directory holds named links to other nodes, in the order the producer
/// wrote them. That order is kept, it's what listings show.
///
/// The names of Directory entries:
///  - MUST not be empty
///  - MUST not contain slashes or null bytes
///  - MUST not be '.' or '..'
///  - MUST be unique
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<DirectoryEntry>,
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != ".." && name != "." && !name.contains(['\0', '/'])
}

impl Directory {
    pub fn new() -> Self {
        Directory { entries: vec![] }
    }

    /// Allows iterating over all entries, in source order.
    pub fn entries(&self) -> impl Iterator<Item = &DirectoryEntry> + Send + Sync + '_ {
        self.entries.iter()
    }

    /// Looks up an entry by its exact name.
    pub fn get(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a Directory from the links of a dag-pb node.
    pub(crate) fn try_from_links(links: Vec<PbLink>) -> Result<Self, DirectoryError> {
        let entries = links
            .into_iter()
            .map(|link| {
                let name = link.name.unwrap_or_default();
                let cid = match &link.hash {
                    Some(hash) => Cid::try_from(hash.as_ref())
                        .map_err(|e| DirectoryError::InvalidLink(name.clone(), e.to_string()))?,
                    None => {
                        return Err(DirectoryError::InvalidLink(
                            name,
                            "missing hash".to_string(),
                        ))
                    }
                };
                Ok(DirectoryEntry::new(name, cid, link.tsize.unwrap_or(0)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::try_from(entries)
    }
}

impl TryFrom<Vec<DirectoryEntry>> for Directory {
    type Error = DirectoryError;

    fn try_from(entries: Vec<DirectoryEntry>) -> Result<Self, Self::Error> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !is_valid_name(&entry.name) {
                return Err(DirectoryError::InvalidName(entry.name.clone()));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(DirectoryError::DuplicateName(entry.name.clone()));
            }
        }

        Ok(Self { entries })
    }
}
