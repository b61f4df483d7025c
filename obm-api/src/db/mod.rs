//! Database operations for obm-api

pub mod authors;
pub mod books;
pub mod categories;
pub mod scanned;
pub mod sequences;
pub mod sessions;
pub mod wishlist;
