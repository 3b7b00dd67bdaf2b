//! Catalog storage, indexing and lazy loading.
//!
//! A catalog is a directory of chunks, one per provider namespace and api
//! version, plus a single index mapping `name@apiVersion` to the chunk and
//! record position of each resource type:
//!
//! ```text
//! <base>/index.json
//! <base>/Microsoft.Storage/2021-01-01/types.json
//! <base>/Microsoft.Storage/2022-05-01/types.json
//! ```
//!
//! ## Building
//!
//! ```rust,no_run
//! use bicep_types::catalog::builder::write_index;
//! use std::path::Path;
//!
//! let report = write_index(Path::new("generated")).unwrap();
//! println!("{} types, {} duplicates", report.index.len(), report.duplicates.len());
//! ```
//!
//! ## Loading
//!
//! ```rust,no_run
//! use bicep_types::TypeLoader;
//!
//! let loader = TypeLoader::from_dir("generated");
//! if let Some(resolved) = loader.resolve("Microsoft.Storage/storageAccounts", "2021-01-01").unwrap() {
//!     println!("{} -> {:?}", resolved.name(), resolved.body());
//! }
//! ```

pub mod builder;
pub mod index;
pub mod loader;
pub mod source;
pub mod writer;
