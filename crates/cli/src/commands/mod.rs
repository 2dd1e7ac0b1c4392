//! Command implementations.

mod info;
mod query;
mod run;
mod validate;

pub use info::run_info;
pub use query::run_query;
pub use run::run_pipeline;
pub use validate::run_validate;
