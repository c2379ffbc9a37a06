pub mod error;
pub mod predictor;
pub mod reconciler;
pub mod time_sync;

pub use error::{ClientError, Result};
pub use predictor::Predictor;
pub use reconciler::{Reconciler, ReconciliationResult};
pub use time_sync::TimeSync;
