//! Row models and DTOs, one module per table group.

pub mod inventory;
pub mod order;
