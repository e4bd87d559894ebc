pub mod transactions;

pub use transactions::{summarize, FinanceService};
