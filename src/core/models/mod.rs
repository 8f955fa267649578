pub mod fingerprint;
pub mod health;
pub mod managed_key;
pub mod outcome;
pub mod store_records;
