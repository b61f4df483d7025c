//! API route modules

pub mod auth;
pub mod authors;
pub mod books;
pub mod categories;
pub mod exports;
pub mod health;
pub mod scan;
pub mod wishlist;
