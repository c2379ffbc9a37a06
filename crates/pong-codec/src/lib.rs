pub mod delta;
pub mod error;
pub mod snapshot;

pub use delta::DeltaCodec;
pub use error::{CodecError, Result};
pub use snapshot::{EncodedSnapshot, SnapshotDecoder, SnapshotGenerator};
