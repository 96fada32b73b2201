//! Service trait seams between the pipeline and its I/O implementations.

pub mod scraping_services;

pub use scraping_services::PageFetcher;
