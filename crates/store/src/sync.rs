use std::path::PathBuf;

use guidance_core::{merge_documents, Document, MergeOptions, MergeStats};
use serde::{Deserialize, Serialize};

use crate::store::GuidanceStore;
use crate::Result;

/// What happened to one file during a sync pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub source: String,
    pub path: PathBuf,
    pub stats: MergeStats,
    /// The guidance file was (re)written
    pub written: bool,
    /// No prior guidance existed
    pub created: bool,
    pub leaked_prompt_detected: bool,
    /// Members still lacking a comment after the merge
    pub missing_comments: usize,
}

/// Totals over many [`SyncReport`]s
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub files: usize,
    pub written: usize,
    pub created: usize,
    pub leaked: usize,
    pub missing_comments: usize,
    pub stats: MergeStats,
}

impl SyncSummary {
    pub fn record(&mut self, report: &SyncReport) {
        self.files += 1;
        self.written += usize::from(report.written);
        self.created += usize::from(report.created);
        self.leaked += usize::from(report.leaked_prompt_detected);
        self.missing_comments += report.missing_comments;
        self.stats.absorb(&report.stats);
    }
}

/// Reconcile a freshly parsed document with what is stored, writing only
/// when something actually changed.
pub fn sync_document(
    store: &GuidanceStore,
    fresh: &Document,
    options: MergeOptions,
) -> Result<SyncReport> {
    let path = store.path_for_source(&fresh.source)?;
    let loaded = store.load(&fresh.source)?;

    let created = loaded.is_none();
    let leaked_prompt_detected = loaded
        .as_ref()
        .is_some_and(|loaded| loaded.leaked_prompt_detected);
    let existing = loaded.map_or_else(
        || Document::new(fresh.module.clone(), fresh.source.clone()),
        |loaded| loaded.document,
    );

    let merged = merge_documents(fresh, &existing, options);
    let written = created || leaked_prompt_detected || merged.stats.has_changes;
    if written {
        store.save(&merged.document)?;
    } else {
        log::debug!("guidance for {} is up to date", fresh.source);
    }

    Ok(SyncReport {
        source: fresh.source.clone(),
        path,
        stats: merged.stats,
        written,
        created,
        leaked_prompt_detected,
        missing_comments: merged.document.members_missing_comments().len(),
    })
}

/// Rewrite stored guidance whose leaked prompts were dropped on load.
///
/// Returns `None` when nothing is stored for `source`.
pub fn clean_document(store: &GuidanceStore, source: &str) -> Result<Option<SyncReport>> {
    let path = store.path_for_source(source)?;
    let Some(loaded) = store.load(source)? else {
        return Ok(None);
    };

    if loaded.leaked_prompt_detected {
        store.save(&loaded.document)?;
    }

    Ok(Some(SyncReport {
        source: loaded.document.source.clone(),
        path,
        stats: MergeStats::default(),
        written: loaded.leaked_prompt_detected,
        created: false,
        leaked_prompt_detected: loaded.leaked_prompt_detected,
        missing_comments: loaded.document.members_missing_comments().len(),
    }))
}
