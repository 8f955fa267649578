pub mod keygen;
pub mod maintenance_service;
pub mod policy;
