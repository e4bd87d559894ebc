pub mod error;
pub mod retry;
pub mod supabase;
pub mod tables;

pub use error::BackendError;
pub use retry::{with_retry, RetryDecision, RetryPolicy, RetryableError};
pub use supabase::SupabaseClient;
