//! Programming-challenge catalog.
//!
//! [`LeetCodeClient`] lists free problems by difficulty and fetches their
//! statements. Both operations degrade instead of failing, see
//! [`ProblemCatalog`].

pub mod client;
pub mod types;

pub use client::{
    parse_problem_list, LeetCodeClient, CATALOG_USER_AGENT, DEFAULT_PER_DIFFICULTY_LIMIT,
    LEETCODE_BASE_URL, NO_STATEMENT_PLACEHOLDER, STATEMENT_ERROR_PLACEHOLDER,
};
pub use types::{Difficulty, ProblemCatalog, ProblemSummary};
