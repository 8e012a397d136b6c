//! # bit_store
//!
//! Boundary to a bit-addressable key-value store: the command model, the
//! [`BitStore`] trait, an in-process [`MemoryStore`], and (with the `net`
//! feature) a RESP2 [`RespStore`] client.
//!
//! ```rust
//! use bit_store::{BitStore, FieldOp, FieldType, MemoryStore, Offset, Overflow};
//!
//! let store = MemoryStore::new();
//! let ty = FieldType::unsigned(8).unwrap();
//! let replies = store
//!     .bitfield(
//!         "counters",
//!         &[
//!             FieldOp::Overflow(Overflow::Sat),
//!             FieldOp::IncrBy { ty, offset: Offset::Bit(0), delta: 300 },
//!         ],
//!     )
//!     .unwrap();
//! assert_eq!(replies, vec![Some(255)]);
//! ```

#[doc(hidden)]
pub mod bit_ops;
pub mod command;
pub mod error;
pub mod memory;
mod store;
pub mod trace;

#[cfg(feature = "net")]
pub mod client;
#[cfg(feature = "net")]
pub mod resp;

pub use command::{
    BitOp, BitRange, Command, FieldOp, FieldType, MAX_BIT_OFFSET, MAX_FIELD_BITS, Offset, Overflow,
    check_bit_offset,
};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use store::BitStore;

#[cfg(feature = "net")]
pub use client::{ClientConfig, RespStore};
