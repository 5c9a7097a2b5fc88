//! subtrack-classify: membership classification over normalized
//! transactions — rule-based and model-assisted strategies, one-time-payment
//! demotion, and monthly-cost estimation.

pub mod classifier;
pub mod llm;
pub mod response;
pub mod rules;

pub use classifier::{BATCH_SIZE, MembershipClassifier, Strategy};
pub use llm::{LlmConfig, Provider, ProviderSettings, select_provider};
