//! Authentication adapters.
//!
//! Implementations of the `SessionValidator` port:
//!
//! - `supabase` - Production Supabase JWT validation (HS256, local)
//! - `mock` - Test implementation that doesn't require an auth service

mod mock;
mod supabase;

pub use mock::MockSessionValidator;
pub use supabase::{SupabaseJwtConfig, SupabaseSessionValidator};
