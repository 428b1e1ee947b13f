//! Syllabus template builder
//!
//! A syllabus template is a tree of sections stored as a flat, ordered node
//! list with parent back-references. Field values are kept in a separate map
//! keyed by node id and merged with the template only for statistics and
//! document generation.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
