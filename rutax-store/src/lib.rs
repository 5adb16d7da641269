// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # rutax Store
//!
//! Durable storage for session credentials.
//!
//! This crate provides:
//!
//! - **Persistence**: TOML credential file load/save with atomic replace
//! - **Persister**: a single-writer background task that owns the file
//! - **CredentialSink**: the seam the request path hands refreshed credentials to
//!
//! ## Usage
//!
//! ```ignore
//! use rutax_store::{CredentialPersister, CredentialSink, load_credentials};
//!
//! let creds = load_credentials(&path).await?;
//! let persister = CredentialPersister::spawn(path);
//!
//! // Returns once the new set is on disk.
//! persister.persist(new_creds).await?;
//! ```

pub mod error;
pub mod persistence;
pub mod persister;

pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_config_path, default_credentials_path, load_credentials,
    save_credentials,
};
pub use persister::{CredentialPersister, CredentialSink, PersisterHandle, PersisterStatus};
