//! OzyTrip tour-provider integration: token cache, typed client, and the
//! wire types shared with the sale saga.

pub mod client;
pub mod token;
pub mod types;

pub use client::{OzyTripClient, TourProviderApi, DEFAULT_CURRENCY};
pub use token::OzyTripTokenCache;
