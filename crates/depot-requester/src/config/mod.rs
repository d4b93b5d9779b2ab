//! Configuration management for depot
//!
//! ## Architecture
//!
//! - `schema` - Configuration data structures
//! - `io` - Reading and writing the config file
//! - `paths` - Directory path management
//!
//! ## Usage
//!
//! ```rust,no_run
//! use depot_requester::config;
//!
//! # fn example() -> anyhow::Result<()> {
//! // Load config (returns default if file doesn't exist)
//! let config = config::load_config()?;
//! let store_dir = config.store_dir()?;
//! # Ok(())
//! # }
//! ```

pub mod io;
pub mod paths;
pub mod schema;

pub use io::{load_config, load_config_from, save_config_to};
pub use paths::{get_config_path, get_default_store_dir, get_depot_dir};
pub use schema::RequesterConfig;
