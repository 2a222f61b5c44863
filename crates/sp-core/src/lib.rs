pub mod error;
pub mod types;
pub mod value;

pub use error::HarnessError;
pub use types::*;
pub use value::*;
