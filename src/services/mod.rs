pub mod audit_log;
pub mod candidate_retrieval;
pub mod llm_service;
pub mod normalization;
pub mod oracle;
pub mod split_writer;
pub mod validator;
pub mod vocab_repository;

pub use audit_log::AuditLog;
pub use candidate_retrieval::{ensure_candidates, CandidateRetriever};
pub use llm_service::LlmService;
pub use oracle::DisambiguationOracle;
pub use split_writer::{plan, ApplyPlan, SplitWriter};
pub use validator::{validate, ValidatedBatch};
pub use vocab_repository::{SelectionPolicy, VocabRepository};
