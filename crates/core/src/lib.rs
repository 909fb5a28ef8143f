//! # Guidance Core
//!
//! Per-file documentation ("guidance") that stays in sync with the source it
//! describes without losing prose that cannot be regenerated.
//!
//! ## Flow
//!
//! ```text
//! external parser ──> fresh Document ──┐
//!                                      ├──> merge ──> reconciled Document
//! store ──> persisted Document ────────┘        │
//!                                               └──> MergeStats (added/updated/removed/stale)
//!
//! generator output ──> sanitize gate ──> comment on a Member
//! ```
//!
//! Members are matched by name within each sibling list. A member whose
//! `match_hash` is unchanged keeps its persisted comment, tags and patterns;
//! a changed hash blanks the comment so it can be regenerated.
//!
//! ## Example
//!
//! ```rust
//! use guidance_core::{merge_members, Member, MemberKind};
//!
//! let existing = vec![Member::new(MemberKind::Function, "foo")
//!     .match_hash("h1")
//!     .comment("Doc.")];
//! let fresh = vec![Member::new(MemberKind::Function, "foo").match_hash("h1")];
//!
//! let outcome = merge_members(&fresh, &existing, true);
//! assert_eq!(outcome.members[0].comment.as_deref(), Some("Doc."));
//! assert!(!outcome.stats.has_changes);
//! ```

mod error;
mod generate;
mod merge;
pub mod sanitize;
mod types;

pub use error::GenerateError;
pub use generate::{fill_missing_comments, CommentGenerator, CommentRequest, FillOptions, FillStats};
pub use merge::{merge_documents, merge_members, DocumentMerge, MergeOptions, MergeOutcome, MergeStats};
pub use sanitize::{
    extract_comment_tag, is_leaked_prompt, is_malformed_response, sanitize_generated,
    strip_preamble, strip_think_block,
};
pub use types::{Document, Member, MemberKind, MemberWalk, Param, Pattern, PatternKind, Skill};
