//! Natural-language query pipeline.
//!
//! Classification, translation to SQL, execution and result shaping are kept
//! in separate stages so each can be tested on its own.

pub mod executor;
pub mod intent;
pub mod shaper;
pub mod translator;

pub use executor::{QueryExecutor, QueryOutcome};
pub use intent::Intent;
pub use shaper::{ExportFile, QueryPayload, QueryResponse, ResultShaper};
pub use translator::QueryTranslator;
