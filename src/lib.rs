//! Boot loader stream simplifier for ADSP-SC58x/BF70x `.ldr` images.
//!
//! The boot ROM pays a fixed execution cost per block it processes, so a
//! loader file made of many small blocks boots slower than an equivalent
//! file made of a few large ones. This crate merges contiguous memory-write
//! blocks into single chunks and unrolls small FILL blocks into literal
//! data, producing a functionally identical stream with fewer blocks.

pub mod chunk;
pub mod converter;
pub mod error;
pub mod header;
pub mod reader;
pub mod writer;

pub use converter::{ConvertStats, Converter};
pub use error::ShrinkError;
