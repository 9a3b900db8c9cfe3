//! hlsforge-common: shared ids, storage layout, and errors.
//!
//! - **Namespaces**: random, collision-resistant ids naming one upload's directory
//! - **Path Utilities**: the on-disk layout of a namespace and upload type checks
//! - **Error Handling**: the error taxonomy of the upload pipeline
//!
//! # Examples
//!
//! ```
//! use hlsforge_common::{Namespace, Error, Result};
//! use hlsforge_common::paths::{namespace_dir, upload_extension};
//! use std::path::Path;
//!
//! let ns = Namespace::generate()?;
//! let dir = namespace_dir(Path::new("./storage"), &ns);
//! assert!(dir.ends_with(ns.as_str()));
//!
//! fn check(name: &str) -> Result<&'static str> {
//!     upload_extension(name).ok_or_else(|| Error::unsupported_media_type(name))
//! }
//! assert!(check("movie.mkv").is_ok());
//! # Ok::<(), hlsforge_common::Error>(())
//! ```

pub mod error;
pub mod ids;
pub mod paths;

pub use error::{Error, Result};
pub use ids::Namespace;
