pub mod callback;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod network;
pub mod outcome;
pub mod payload;
pub mod plan;
pub mod wallet;

pub type Result<T> = std::result::Result<T, error::Error>;
pub use error::Error;
