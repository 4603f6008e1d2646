//! Client data layer for the folio API: a typed fetch wrapper and an
//! optimistic mutation cache. Presentation concerns stay out of this crate.

pub mod cache;
pub mod client;

pub use cache::{CacheError, MutationState, MutationTicket, OptimisticCache};
pub use client::{ApiClient, AuthSession, ClientError};
