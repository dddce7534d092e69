//! Footage acquisition
//!
//! - [`MaterialDownloader`]: one URL into the content-addressed cache, with
//!   retries and integrity verification
//! - [`DownloadPool`]: the bound on simultaneous downloads
//! - [`MaterialAcquirer`]: search, download and select enough footage
//! - [`preprocess_local`]: caller-supplied local files instead of a search

mod acquisition;
mod downloader;
mod local;
mod pool;

pub use acquisition::{AcquisitionRequest, MaterialAcquirer};
pub use downloader::{MaterialDownloader, MaterialSource, ReqwestSource, SourceResponse};
pub use local::preprocess_local;
pub use pool::DownloadPool;
