//! Drama Scraper Library
//!
//! This library scrapes Indonesian drama catalog sites, resolves their
//! mirror and embedded players into playable links, and exposes the result
//! through REST API endpoints.

pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod extractor;
pub mod models;
pub mod parser;
pub mod resolver;
pub mod routes;
pub mod scraper;
pub mod sites;
