#![forbid(unsafe_code)]

pub mod compose;
pub mod config;
pub mod error;
pub mod generate;
pub mod item;
pub mod media;
pub mod pipeline;
pub mod project;
pub mod segment;
pub mod slide;
pub mod store;
pub mod template;
pub mod text;

pub use error::{ReelError, ReelResult};
pub use item::Item;
pub use pipeline::{PipelineReport, RunContext, ScriptRequest, StageId, run_pipeline};
pub use store::ItemStore;
pub use template::Template;
