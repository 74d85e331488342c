pub mod audit;
pub mod candidate;
pub mod sense;
pub mod vocab;

pub use audit::{ActionRecord, AnomalyRecord, BatchRecord, InsertRecord, SenseRecord};
pub use candidate::{CandidateMap, DictionaryCandidate};
pub use sense::{OracleCandidate, OracleItem, OracleRequest, OracleResponse, Sense, SenseResult};
pub use vocab::{VocabularyEntry, WorkMode};
