pub mod config;
pub mod error;
pub mod types;

pub use error::{NigoriError, NigoriResult};
pub use types::{KeyDerivationMethod, NigoriType};
