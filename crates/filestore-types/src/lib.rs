//! Foundation types for filestore.
//!
//! Every other filestore crate depends on `filestore-types`. The types here
//! describe what the local storage adapter stores and reports, never how.
//!
//! # Key Types
//!
//! - [`ObjectKey`]: validated, root-relative name of one stored object
//! - [`FileDescriptor`]: caller-owned identity of a logical file
//! - [`FileRecord`]: owned in-memory [`FileDescriptor`]
//! - [`CopyInfo`]: per-store record of where a descriptor's bytes live
//! - [`ChangeEvent`]: normalized filesystem change under a store root
//! - [`ObjectStats`]: filesystem metadata for one stored object
//! - [`PutOptions`]: write behaviour for `put` / `put_stream`

pub mod descriptor;
pub mod error;
pub mod event;
pub mod key;
pub mod options;
pub mod stats;

pub use descriptor::{ByteStream, CopyInfo, FileDescriptor, FileRecord};
pub use error::TypeError;
pub use event::{ChangeEvent, ChangeKind};
pub use key::ObjectKey;
pub use options::PutOptions;
pub use stats::ObjectStats;
