//! Evidence post-processing
//!
//! Stage 4 maps free-form evidence keys onto canonical option labels; stage 5
//! snaps each evidence sentence to the closest discourse unit of its item.
//!
//! ## Modules
//!
//! - `fuzzy`: Ratcliff/Obershelp similarity and best-candidate search
//! - `normalize`: key normalization and evidence coercion
//! - `filter`: discourse filtering of one record
//! - `stages`: dataset-level runners with ordered parallelism

pub mod filter;
pub mod fuzzy;
pub mod normalize;
pub mod stages;

pub use filter::filter_evidence;
pub use fuzzy::{best_match, similarity_ratio, MATCH_THRESHOLD};
pub use normalize::{coerce_evidence, parse_normalized, KeyNormalizer};
pub use stages::{PostProcessor, FILTERED_FIELD, NORMALIZED_FIELD, STRUCTURED_FIELD};
