//! Use-case helpers on top of the store manager.
//!
//! # Responsibility
//! - Build the fetch requests behind the notebook list, the note list of one
//!   notebook and the note search.
//! - Seed sample data on the view or background path.

pub mod notebook_service;
pub mod sample_data;
