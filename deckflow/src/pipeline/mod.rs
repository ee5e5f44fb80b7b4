//! Pipeline engine, builder, and canonical wiring.

mod builder;
mod engine;
mod factory;

pub use builder::PipelineBuilder;
pub use engine::Pipeline;
pub use factory::{
    content_generation_handler, input_validation_handler, presentation_assembly_handler,
    slide_creation_handler, stage_names, PipelineFactory,
};
