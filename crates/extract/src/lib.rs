pub mod archive;
pub mod feed;
pub mod file;
pub mod fm;
pub mod html;
pub mod pdf;
pub mod stopwords;
pub mod text;

mod error;

pub use error::ExtractError;
pub use file::{extract, Extraction};

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
