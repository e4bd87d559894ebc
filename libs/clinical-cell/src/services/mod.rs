pub mod diagnostic;
pub mod evolution;

pub use diagnostic::DiagnosticService;
pub use evolution::EvolutionService;
