pub mod payment;
pub mod registration;
pub mod statistics;
