pub mod error;
pub mod extract;
pub mod merger;
pub mod quality;
