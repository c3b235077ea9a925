mod client;
mod convert;
mod model;
mod tracer;

pub use client::{OpenAiChatModel, DEFAULT_MODEL, DEFAULT_TIMEOUT};
pub use model::{ChatModel, ModelOptions};
pub use tracer::{LangSmithTracer, TracingError, TracingProvider, DEFAULT_TRACE_TIMEOUT};
