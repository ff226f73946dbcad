//! Best-effort recovery of structured data from LLM text.
//!
//! Model output is prose wrapped around the thing we asked for. This module
//! digs it out:
//!
//! - [`extract_json`] finds a JSON object (fenced, embedded or bare) and runs
//!   it through the [`rescue`] chain, substituting a domain default when
//!   nothing can be recovered.
//! - [`extract_code_block`] and [`extract_explanation`] split a fenced code
//!   answer into code and trailing prose.
//!
//! Extraction never fails. Callers always get a value.

pub mod arith;
mod code;
mod json;
pub mod rescue;
mod scan;

pub use code::{extract_code_block, extract_explanation, NO_EXPLANATION};
pub use json::{extract_json, try_extract_json};
pub use rescue::{rescue, rescue_value, RescuePass, Rescued};
