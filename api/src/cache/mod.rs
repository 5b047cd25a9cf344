//! In-process caches

pub mod chart_urls;
