//! Reconciliation of a freshly parsed member tree with persisted guidance.
//!
//! Structure always comes from the fresh side. Documentation, tags and
//! patterns come from the persisted side only while the symbol's
//! `match_hash` is unchanged; otherwise the old comment is treated as stale.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{has_text, Document, Member};

/// Knobs for a merge pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Carry persisted comments over to members that come without one
    pub preserve_existing_comments: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            preserve_existing_comments: true,
        }
    }
}

/// What a merge changed, counted per sibling level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Members with no persisted counterpart
    pub added: usize,

    /// Member updates (moved, re-documented, or implementation changed)
    pub updated: usize,

    /// Persisted members no longer present in the source
    pub removed: usize,

    /// Comments blanked because the implementation changed
    pub stale: usize,

    /// Whether the persisted representation needs a rewrite
    pub has_changes: bool,
}

impl MergeStats {
    /// Fold another pass (typically another file) into this one
    pub fn absorb(&mut self, other: &Self) {
        self.added += other.added;
        self.updated += other.updated;
        self.removed += other.removed;
        self.stale += other.stale;
        self.has_changes |= other.has_changes;
    }
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added={} updated={} removed={} stale={} changed={}",
            self.added, self.updated, self.removed, self.stale, self.has_changes
        )
    }
}

/// Result of [`merge_members`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub members: Vec<Member>,
    pub stats: MergeStats,
}

/// Result of [`merge_documents`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMerge {
    pub document: Document,
    pub stats: MergeStats,
}

/// Reconcile fresh members against persisted ones, matching by name.
///
/// Output follows the order of `fresh`. The result owns all of its data; both
/// inputs can be dropped right after the call.
///
/// When a sibling list holds several members with the same name, only the
/// first persisted one is ever matched.
#[must_use]
pub fn merge_members(
    fresh: &[Member],
    existing: &[Member],
    preserve_existing_comments: bool,
) -> MergeOutcome {
    let mut index: HashMap<&str, &Member> = HashMap::with_capacity(existing.len());
    for member in existing {
        index.entry(member.name.as_str()).or_insert(member);
    }

    let mut stats = MergeStats::default();
    let mut members = Vec::with_capacity(fresh.len());

    for src in fresh {
        match index.get(src.name.as_str()) {
            None => {
                members.push(src.clone());
                stats.added += 1;
                stats.has_changes = true;
            }
            Some(old) => {
                members.push(reconcile_pair(
                    src,
                    old,
                    preserve_existing_comments,
                    &mut stats,
                ));
            }
        }
    }

    let fresh_names: HashSet<&str> = fresh.iter().map(|m| m.name.as_str()).collect();
    stats.removed = existing
        .iter()
        .filter(|old| !fresh_names.contains(old.name.as_str()))
        .count();
    if stats.removed > 0 {
        stats.has_changes = true;
    }

    MergeOutcome { members, stats }
}

fn reconcile_pair(
    src: &Member,
    old: &Member,
    preserve_existing_comments: bool,
    stats: &mut MergeStats,
) -> Member {
    let mut merged = src.clone();

    let unchanged = matches!(
        (&src.match_hash, &old.match_hash),
        (Some(new_hash), Some(old_hash)) if new_hash == old_hash
    );

    if unchanged {
        if src.line != old.line {
            stats.updated += 1;
            stats.has_changes = true;
        }

        if merged.has_comment() {
            if merged.comment != old.comment {
                // Inline doc edited at the source wins.
                stats.updated += 1;
                stats.has_changes = true;
            }
        } else if preserve_existing_comments {
            merged.comment = old.comment.clone();
        } else if has_text(old.comment.as_deref()) {
            stats.has_changes = true;
        }

        if merged.tags.is_empty() && !old.tags.is_empty() {
            merged.tags = old.tags.clone();
        }
        if merged.patterns.is_empty() && !old.patterns.is_empty() {
            merged.patterns = old.patterns.clone();
        }
    } else {
        stats.updated += 1;
        stats.has_changes = true;
        if !merged.has_comment() {
            merged.comment = None;
            stats.stale += 1;
        }
    }

    if !src.members.is_empty() && !old.members.is_empty() {
        let nested = merge_members(&src.members, &old.members, preserve_existing_comments);
        if nested.stats.has_changes {
            stats.has_changes = true;
        }
        merged.members = nested.members;
    }

    merged
}

/// Reconcile a whole document.
///
/// `module`, `source` and the member structure come from `fresh`. Skills,
/// hashtags and `used_by` cannot be derived from source, so they are carried
/// over from `existing` whenever the fresh side has none.
#[must_use]
pub fn merge_documents(
    fresh: &Document,
    existing: &Document,
    options: MergeOptions,
) -> DocumentMerge {
    let outcome = merge_members(
        &fresh.members,
        &existing.members,
        options.preserve_existing_comments,
    );
    let mut stats = outcome.stats;

    let mut document = Document {
        module: fresh.module.clone(),
        source: fresh.source.clone(),
        comment: fresh.comment.clone(),
        skills: fresh.skills.clone(),
        hashtags: fresh.hashtags.clone(),
        used_by: fresh.used_by.clone(),
        members: outcome.members,
    };

    if document.has_comment() {
        if document.comment != existing.comment {
            stats.has_changes = true;
        }
    } else if options.preserve_existing_comments {
        document.comment = existing.comment.clone();
    } else if existing.has_comment() {
        stats.has_changes = true;
    }

    // Empty fresh metadata means "not derived this time": keep what is stored.
    if document.skills.is_empty() {
        document.skills = existing.skills.clone();
    } else if document.skills != existing.skills {
        stats.has_changes = true;
    }
    if document.hashtags.is_empty() {
        document.hashtags = existing.hashtags.clone();
    } else if document.hashtags != existing.hashtags {
        stats.has_changes = true;
    }
    if document.used_by.is_empty() {
        document.used_by = existing.used_by.clone();
    } else if document.used_by != existing.used_by {
        stats.has_changes = true;
    }

    if fresh.module != existing.module || fresh.source != existing.source {
        stats.has_changes = true;
    }

    log::debug!("merged guidance for {}: {stats}", document.source);
    DocumentMerge { document, stats }
}
