pub mod analysis;
pub mod contact;
pub mod stage;
