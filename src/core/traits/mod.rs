pub mod action_subject;
pub mod keyring;
pub mod scheduler;
