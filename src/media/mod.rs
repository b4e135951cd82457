//! Playback media
//!
//! Decoding of embedded payloads, the registry of local handles, and the
//! resolver that maps recordings to playable references.

pub mod payload;
pub mod registry;
pub mod resolver;

pub use payload::{decode_payload, DecodeError, DecodedMedia};
pub use registry::{BlobRegistry, LocalHandle, RegistryStats, StoredMedia};
pub use resolver::{MediaResolver, ReferenceMap, ResolvedReference};
