//! Pure business rules: no I/O, no framework types.

pub mod balance;
pub mod business_days;
pub mod policy;
