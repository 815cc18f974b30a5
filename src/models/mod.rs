pub mod enums;
pub mod metadata;
pub mod report;

pub use enums::*;
pub use metadata::*;
pub use report::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid value '{value}' for {field}")]
    InvalidEnum { field: String, value: String },
}
