//! Model layer of a small book-sharing site: accounts, a follow graph,
//! books with favorites and comments, and profile images.

pub mod accounts;
pub mod auth;
pub mod books;
pub mod comments;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod favorites;
pub mod models;
pub mod profile_image;
pub mod relationships;
pub mod schema;
pub mod search;
pub mod storage;
pub mod tokens;
pub mod validation;

pub use crate::context::AppCtx;
pub use crate::error::{Error, Result, ValidationErrors};
pub use crate::models::{Book, BookComment, Favorite, Relationship, User};
pub use crate::search::SearchMode;
