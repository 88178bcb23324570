//! recordshape - declarative validation and serialization of JSON records
//!
//! A [`schema::RecordShape`] declares typed fields with constraints, plus
//! optional field hooks, cross-field rules and computed fields. Constructing
//! a [`record::Record`] from a JSON object either yields an immutable record
//! or a [`schema::RecordError`] listing every violation found. Records dump
//! back to JSON with include/exclude selections and unset-only filtering.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod observability;
pub mod record;
pub mod schema;
