pub mod addresses;
pub mod error;
pub mod results;

pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
