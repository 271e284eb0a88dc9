//! Directory query handlers.

mod search_profiles;

pub use search_profiles::{SearchProfilesHandler, SearchProfilesQuery};
