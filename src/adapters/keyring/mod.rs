pub mod colons;
pub mod gpg_keyring;
