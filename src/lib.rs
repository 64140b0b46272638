pub mod app;
pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod domain;
pub mod error;
pub mod export;
pub mod metadata;
pub mod output;
pub mod s3_store;
pub mod store;
pub mod submission;
