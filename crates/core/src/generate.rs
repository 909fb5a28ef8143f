use serde::{Deserialize, Serialize};

use crate::error::GenerateError;
use crate::sanitize::sanitize_generated;
use crate::types::{Document, Member, MemberKind};

/// Backend that writes a comment for one member.
///
/// Implementations live outside this crate (HTTP client, local model, ...).
/// The returned text is raw: it goes through the sanitization gate before it
/// is attached to anything.
pub trait CommentGenerator {
    fn generate(&self, request: &CommentRequest) -> Result<String, GenerateError>;
}

impl<F> CommentGenerator for F
where
    F: Fn(&CommentRequest) -> Result<String, GenerateError>,
{
    fn generate(&self, request: &CommentRequest) -> Result<String, GenerateError> {
        self(request)
    }
}

/// Everything a generator gets to know about the member it documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRequest {
    pub module: String,
    pub source: String,
    /// Names from the root member down to the target
    pub path: Vec<String>,
    pub kind: MemberKind,
    pub signature: Option<String>,
    pub params: Vec<String>,
}

impl CommentRequest {
    fn for_member(document: &Document, path: Vec<String>, member: &Member) -> Self {
        let params = member
            .params
            .iter()
            .map(|param| match &param.type_name {
                Some(type_name) => format!("{}: {type_name}", param.name),
                None => param.name.clone(),
            })
            .collect();
        Self {
            module: document.module.clone(),
            source: document.source.clone(),
            path,
            kind: member.kind,
            signature: member.signature.clone(),
            params,
        }
    }

    /// Dotted member path, e.g. `Parser.next`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.path.join(".")
    }
}

/// Limits for [`fill_missing_comments`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillOptions {
    /// Upper bound on generator calls for one document
    pub max_requests: usize,

    /// Whether the generator is prompted to answer inside `<comment>` tags
    pub expect_comment_tag: bool,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            max_requests: 32,
            expect_comment_tag: true,
        }
    }
}

/// Outcome counters of [`fill_missing_comments`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillStats {
    pub requested: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl FillStats {
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.accepted > 0
    }
}

/// Ask `generator` for a comment on every undocumented member, in pre-order.
///
/// Rejected or failed responses leave the member undocumented; the walk
/// always continues.
pub fn fill_missing_comments(
    document: &mut Document,
    generator: &dyn CommentGenerator,
    options: FillOptions,
) -> FillStats {
    let mut stats = FillStats::default();

    let snapshot: &Document = document;
    let targets: Vec<(Vec<usize>, CommentRequest)> = snapshot
        .walk_positions()
        .filter(|(_, _, member)| !member.has_comment())
        .take(options.max_requests)
        .map(|(positions, path, member)| {
            (positions, CommentRequest::for_member(snapshot, path, member))
        })
        .collect();

    for (positions, request) in targets {
        stats.requested += 1;
        let raw = match generator.generate(&request) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!(
                    "comment generation failed for {}::{}: {err}",
                    request.source,
                    request.qualified_name()
                );
                stats.failed += 1;
                continue;
            }
        };

        let Some(comment) = sanitize_generated(&raw, options.expect_comment_tag) else {
            stats.rejected += 1;
            continue;
        };

        if let Some(member) = document.member_at_mut(&positions) {
            member.comment = Some(comment);
            stats.accepted += 1;
        }
    }

    if stats.requested > 0 {
        log::debug!(
            "filled comments for {}: requested={} accepted={} rejected={} failed={}",
            document.source,
            stats.requested,
            stats.accepted,
            stats.rejected,
            stats.failed
        );
    }
    stats
}
