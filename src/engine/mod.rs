//! Plan execution: dependency-ordered scheduling, checkpoints, event stream.

mod emitter;
mod encoder;
mod events;
mod executor;
mod synthesizer;

pub use emitter::EventEmitter;
pub use encoder::{WireFormat, encode};
pub use events::ExecutionEvent;
pub use executor::{ExecutionOutcome, ExecutionRequest, Executor, plan_modality};
pub use synthesizer::{
    ConcatSynthesizer, LlmSynthesizer, StepResult, SynthesisInput, Synthesizer, concat_summary,
};
