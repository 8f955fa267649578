pub mod keyring;
pub mod scheduler;
pub mod store;
