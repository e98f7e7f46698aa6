pub mod batch;
pub mod completions;
pub mod history;
pub mod importances;
pub mod predict;
pub mod provision;
pub mod util;
