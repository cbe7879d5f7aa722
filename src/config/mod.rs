//! Configuration module for kb-ingest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use kb_ingest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("kb-ingest.toml")).unwrap();
//! println!("Serving on {}", config.server.bind_address);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, EnhancerConfig, ExtractionConfig, ServerConfig, StorageConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
