//! Image Uploadr Library
//!
//! Opportunistic image upload for terminal and desktop applications. A file
//! dropped or pasted into the host is sent to a user-configured endpoint
//! and the public URL is returned in place of the local path.
//!
//! # Features
//!
//! - **Graceful Degradation**: Disabled, unconfigured, oversized or
//!   non-image files fall back to the local path
//! - **Three Wire Formats**: `multipart`, `json` (base64) and `binary`
//! - **Response Extraction**: `json:<path>` and `regex:<pattern>` rules
//! - **Static Headers**: Ordered `Name: Value` entries for API keys
//!
//! # Example
//!
//! ```no_run
//! use image_uploadr::{config::Config, upload::Uploader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let uploader = Uploader::new(config.upload)?;
//!     let outcome = uploader.upload("screenshot.png").await;
//!     println!("{}", outcome.into_path_or_url("screenshot.png".as_ref()));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod extract;
pub mod metrics;
pub mod upload;

// Re-export commonly used types
pub use config::{Config, UploadConfig};
pub use upload::{upload_blocking, UploadOutcome, Uploader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
