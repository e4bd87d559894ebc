pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::ConnectivityStatus;
pub use router::monitoring_routes;
pub use services::ConnectivityMonitor;
