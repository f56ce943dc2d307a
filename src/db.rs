pub mod registration_store;
pub use registration_store::{RegistrationStore, SettleOutcome, SettlementInput};
pub mod registration_repo;
pub use registration_repo::RegistrationRepository;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory_repo;
#[cfg(any(test, feature = "test-utils"))]
pub use memory_repo::InMemoryRegistrationStore;
