pub mod engine;
pub mod prompt;
pub mod recognizer;

pub use engine::{InferenceBackend, MockInference, ModelError, ModelManager};
pub use prompt::build_prompt;
pub use recognizer::{Recognition, StatementTextRecognizer};
