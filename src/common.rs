pub mod documents;
pub mod error;
pub mod secret;
pub mod signature;
