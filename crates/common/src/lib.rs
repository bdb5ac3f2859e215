pub mod error;
pub mod types;
pub mod utils;

pub use error::{QrlError, Result, ValidationError};
pub use types::{Address, NodeTarget, TransferRequest};
