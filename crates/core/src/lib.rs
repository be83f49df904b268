//! Domain logic for the virtual try-on client.
//!
//! Everything here is pure and synchronous: wire payload types, image
//! normalization and background compositing, and the retry policy shared
//! by the HTTP layers. Network and filesystem access live in
//! `tryon-vertex` and the binaries.

pub mod composite;
pub mod error;
pub mod imaging;
pub mod matte;
pub mod payload;
pub mod retry;
