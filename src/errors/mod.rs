pub mod types;

pub use types::AstraError;
