//! # Guidance Store
//!
//! File-backed persistence for guidance documents.
//!
//! ## Pipeline
//!
//! ```text
//! fresh Document (external parser)
//!     │
//!     ├──> load stored guidance ──> decode (leaked prompts dropped)
//!     │
//!     ├──> merge_documents
//!     │
//!     └──> save (only when changed, created, or cleaned)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use guidance_core::{Document, Member, MemberKind};
//! use guidance_store::{sync_document, GuidanceStore};
//!
//! let store = GuidanceStore::open("/path/to/project")?;
//! let fresh = Document::new("lexer", "src/lexer.zig")
//!     .member(Member::new(MemberKind::Function, "lex").match_hash("h1"));
//!
//! let report = sync_document(&store, &fresh, store.config().merge_options())?;
//! println!("{}: {}", report.source, report.stats);
//! # Ok::<(), guidance_store::StoreError>(())
//! ```

pub mod codec;
mod config;
mod error;
mod store;
mod sync;

pub use codec::{decode, decode_fresh, encode, LoadedDocument};
pub use config::GuidanceConfig;
pub use error::{Result, StoreError};
pub use store::GuidanceStore;
pub use sync::{clean_document, sync_document, SyncReport, SyncSummary};
