//! Wire types for `dag-pb` merkledag nodes and the UnixFS payload they carry.
//!
//! These mirror `merkledag.proto` and `unixfs.proto`. They're written out as
//! plain prost messages, the two schemas are small and frozen.

/// An IPFS MerkleDAG Link.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbLink {
    /// Binary CID (with no multibase prefix) of the target object.
    #[prost(bytes = "bytes", optional, tag = "1")]
    pub hash: ::core::option::Option<::prost::bytes::Bytes>,
    /// UTF-8 string name.
    #[prost(string, optional, tag = "2")]
    pub name: ::core::option::Option<::prost::alloc::string::String>,
    /// Cumulative size of target object.
    #[prost(uint64, optional, tag = "3")]
    pub tsize: ::core::option::Option<u64>,
}

/// An IPFS MerkleDAG Node.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbNode {
    /// References to other objects.
    #[prost(message, repeated, tag = "2")]
    pub links: ::prost::alloc::vec::Vec<PbLink>,
    /// Opaque user data.
    #[prost(bytes = "bytes", optional, tag = "1")]
    pub data: ::core::option::Option<::prost::bytes::Bytes>,
}

/// The UnixFS payload inside [PbNode::data].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Data {
    #[prost(enumeration = "DataType", optional, tag = "1")]
    pub r#type: ::core::option::Option<i32>,
    #[prost(bytes = "bytes", optional, tag = "2")]
    pub data: ::core::option::Option<::prost::bytes::Bytes>,
    #[prost(uint64, optional, tag = "3")]
    pub filesize: ::core::option::Option<u64>,
    #[prost(uint64, repeated, packed = "false", tag = "4")]
    pub blocksizes: ::prost::alloc::vec::Vec<u64>,
    #[prost(uint64, optional, tag = "5")]
    pub hash_type: ::core::option::Option<u64>,
    #[prost(uint64, optional, tag = "6")]
    pub fanout: ::core::option::Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DataType {
    Raw = 0,
    Directory = 1,
    File = 2,
    Metadata = 3,
    Symlink = 4,
    HamtShard = 5,
}
