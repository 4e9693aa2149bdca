pub mod index;
pub mod profile;
pub mod score;
