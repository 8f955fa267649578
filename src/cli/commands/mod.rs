pub mod key;
pub mod rotate;
pub mod schedule;
pub mod team;
