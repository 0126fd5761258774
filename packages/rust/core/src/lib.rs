//! Core domain logic for kbindex.
//!
//! Turns an ordered topic list into a linked Markdown index: slug
//! derivation, registry validation, rendering, assembly on disk, and
//! checking an existing index for drift.

pub mod assembler;
pub mod check;
pub mod parse;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod slug;
