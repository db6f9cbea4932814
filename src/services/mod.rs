pub mod availability;
pub mod identifiers;
pub mod identity;
pub mod lifecycle;
pub mod ozytrip;
pub mod sales;
pub mod validation;
