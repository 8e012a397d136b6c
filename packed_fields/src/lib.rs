//! # packed_fields
//!
//! Unsigned fields and flags stored in a single bit string on a remote bit
//! store, each operation one atomic round trip.
//!
//! - [`PackedFields`]: a fixed record of 1..=32-bit fields packed into one
//!   value; set, increment and read every field in one batched command, with
//!   saturating arithmetic per field.
//! - [`FlagMap`]: one boolean per integer offset.
//! - [`FieldAccessor`]: a single segment at a caller-chosen type and offset.
//!
//! ```rust
//! use packed_fields::{MemoryStore, PackedFields};
//!
//! let store = MemoryStore::new();
//! // level (7 bits), experience (20 bits), deaths (10 bits)
//! let player = PackedFields::new(&store, "player:9", &[7, 20, 10]).unwrap();
//!
//! player.auto_set(&[12, 5_000, 3]).unwrap();
//! player.auto_incr_by(&[1, 250, 0]).unwrap();
//! assert_eq!(player.auto_get().unwrap(), vec![13, 5_250, 3]);
//! assert_eq!(player.layout().offsets(), &[0, 8, 29]);
//! ```
//!
//! Against a real server (with the default `net` feature):
//!
//! ```no_run
//! use packed_fields::{ClientConfig, PackedFields, RespStore};
//!
//! let store = RespStore::connect(ClientConfig::from_env().unwrap()).unwrap();
//! let login = PackedFields::new(store, "login:42", &[32, 32]).unwrap();
//! let previous = login.auto_set(&[0x0A00_0001, 1_700_000_000]).unwrap();
//! # let _ = previous;
//! ```

pub mod error;
pub use error::{FieldError, Result};

mod width;
pub use width::{MAX_WIDTH, Width};

pub mod layout;
pub use layout::{FieldLayout, LayoutBuilder};

pub mod packed;
pub use packed::PackedFields;

pub mod flags;
pub use flags::{FlagMap, FlagsIter};

pub mod accessor;
pub use accessor::FieldAccessor;

pub use bit_store::{BitOp, BitRange, BitStore, MemoryStore, Offset, StoreError};

#[cfg(feature = "net")]
pub use bit_store::{ClientConfig, RespStore};
