pub mod lstm;
pub mod registry;
pub mod scaler;
