pub mod embedding;
pub mod ranking;
pub mod search;
pub mod text;
