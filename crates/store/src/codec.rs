//! Wire format of a guidance file.
//!
//! ```text
//! {
//!   "meta": { "module": "...", "source": "..." },
//!   "comment": "...",
//!   "skills": [ { "ref": "...", "context": "..." } ],
//!   "hashtags": [ "..." ],
//!   "used_by": [ "..." ],
//!   "members": [ { "type": "fn", "name": "...", "match_hash": "...", ..., "members": [ ... ] } ]
//! }
//! ```
//!
//! Decoding is all-or-nothing for required keys (`meta.module`, `meta.source`,
//! member `type`/`name`, param/pattern `name`, skill `ref`): if any is missing
//! the document is reported as absent. Optional keys with the wrong shape are
//! skipped one by one. Unknown keys are ignored.

use guidance_core::{
    is_leaked_prompt, Document, Member, MemberKind, Param, Pattern, PatternKind, Skill,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::Result;

/// A decoded document plus what the decoder had to drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub document: Document,

    /// A stored comment was generator reasoning and has been discarded; the
    /// file should be rewritten even if nothing else changed.
    pub leaked_prompt_detected: bool,
}

/// Decode a stored guidance file. `None` means "no usable prior guidance".
#[must_use]
pub fn decode(bytes: &[u8]) -> Option<LoadedDocument> {
    decode_with(bytes, Decoder::stored())
}

/// Decode freshly parsed output. Comments come from the source itself, so
/// they are kept verbatim rather than screened for leaked prompts.
#[must_use]
pub fn decode_fresh(bytes: &[u8]) -> Option<Document> {
    decode_with(bytes, Decoder::default()).map(|loaded| loaded.document)
}

fn decode_with(bytes: &[u8], mut decoder: Decoder) -> Option<LoadedDocument> {
    let value: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(err) => {
            log::debug!("guidance payload is not valid JSON: {err}");
            return None;
        }
    };

    let document = decoder.document(&value)?;
    Some(LoadedDocument {
        document,
        leaked_prompt_detected: decoder.leaked_prompt_detected,
    })
}

/// Encode a document deterministically (fixed key order, trailing newline).
pub fn encode(document: &Document) -> Result<Vec<u8>> {
    let wire = WireDocument::from(document);
    let mut bytes = serde_json::to_vec_pretty(&wire)?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[derive(Default)]
struct Decoder {
    filter_leaked: bool,
    leaked_prompt_detected: bool,
}

impl Decoder {
    fn stored() -> Self {
        Self {
            filter_leaked: true,
            ..Self::default()
        }
    }

    fn document(&mut self, value: &Value) -> Option<Document> {
        let root = expect_object(value, "document")?;
        let meta = expect_object(root.get("meta")?, "meta")?;

        let mut document = Document::new(
            required_str(meta, "module", "meta")?,
            required_str(meta, "source", "meta")?,
        );
        document.comment = self.comment(root.get("comment"));
        document.skills = list(root.get("skills"), |item| self.skill(item))?;
        document.hashtags = strings(root.get("hashtags"));
        document.used_by = strings(root.get("used_by"));
        document.members = self.members(root.get("members"))?;
        Some(document)
    }

    fn members(&mut self, value: Option<&Value>) -> Option<Vec<Member>> {
        let Some(items) = value.and_then(Value::as_array) else {
            return Some(Vec::new());
        };
        let mut members = Vec::with_capacity(items.len());
        for item in items {
            members.push(self.member(item)?);
        }
        Some(members)
    }

    fn member(&mut self, value: &Value) -> Option<Member> {
        let obj = expect_object(value, "member")?;
        let name = required_str(obj, "name", "member")?;
        let kind_name = required_str(obj, "type", "member")?;
        let Some(kind) = MemberKind::from_wire(&kind_name) else {
            log::debug!("member {name:?} has unknown type {kind_name:?}");
            return None;
        };

        let mut member = Member::new(kind, name);
        member.match_hash = optional_str(obj.get("match_hash"));
        member.signature = optional_str(obj.get("signature"));
        member.comment = self.comment(obj.get("comment"));
        member.returns = optional_str(obj.get("returns"));
        member.is_pub = obj.get("is_pub").and_then(Value::as_bool).unwrap_or(false);
        member.line = obj
            .get("line")
            .and_then(Value::as_u64)
            .and_then(|line| u32::try_from(line).ok());
        member.params = list(obj.get("params"), param)?;
        member.tags = strings(obj.get("tags"));
        member.patterns = list(obj.get("patterns"), pattern)?;
        member.members = self.members(obj.get("members"))?;
        Some(member)
    }

    fn skill(&mut self, value: &Value) -> Option<Skill> {
        let obj = expect_object(value, "skill")?;
        let mut skill = Skill::new(required_str(obj, "ref", "skill")?);
        skill.context = optional_str(obj.get("context"));
        Some(skill)
    }

    fn comment(&mut self, value: Option<&Value>) -> Option<String> {
        let text = optional_str(value)?;
        if self.filter_leaked && is_leaked_prompt(&text) {
            log::debug!("dropping leaked prompt from stored comment: {text:?}");
            self.leaked_prompt_detected = true;
            return None;
        }
        Some(text)
    }
}

fn param(value: &Value) -> Option<Param> {
    let obj = expect_object(value, "param")?;
    let mut param = Param::new(required_str(obj, "name", "param")?);
    param.type_name = optional_str(obj.get("type"));
    param.default = optional_str(obj.get("default"));
    Some(param)
}

fn pattern(value: &Value) -> Option<Pattern> {
    let obj = expect_object(value, "pattern")?;
    let mut pattern = Pattern::new(required_str(obj, "name", "pattern")?);
    pattern.kind = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(PatternKind::from_wire)
        .unwrap_or_default();
    pattern.reference = optional_str(obj.get("ref"));
    Some(pattern)
}

/// Decode every element of an optional list; a bad element poisons the load.
fn list<T>(value: Option<&Value>, mut decode_item: impl FnMut(&Value) -> Option<T>) -> Option<Vec<T>> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Some(Vec::new());
    };
    items.iter().map(|item| decode_item(item)).collect()
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn optional_str(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn required_str(obj: &Map<String, Value>, key: &str, context: &str) -> Option<String> {
    let found = obj.get(key).and_then(Value::as_str).map(str::to_string);
    if found.is_none() {
        log::debug!("guidance {context} is missing required key {key:?}");
    }
    found
}

fn expect_object<'a>(value: &'a Value, context: &str) -> Option<&'a Map<String, Value>> {
    let obj = value.as_object();
    if obj.is_none() {
        log::debug!("guidance {context} is not an object");
    }
    obj
}

#[derive(Serialize)]
struct WireDocument<'a> {
    meta: WireMeta<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skills: Vec<WireSkill<'a>>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    hashtags: &'a [String],
    #[serde(skip_serializing_if = "is_empty_slice")]
    used_by: &'a [String],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    members: Vec<WireMember<'a>>,
}

#[derive(Serialize)]
struct WireMeta<'a> {
    module: &'a str,
    source: &'a str,
}

#[derive(Serialize)]
struct WireSkill<'a> {
    #[serde(rename = "ref")]
    reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

#[derive(Serialize)]
struct WireMember<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    match_hash: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    returns: Option<&'a str>,
    #[serde(skip_serializing_if = "is_false")]
    is_pub: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    params: Vec<WireParam<'a>>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    tags: &'a [String],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    patterns: Vec<WirePattern<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    members: Vec<WireMember<'a>>,
}

#[derive(Serialize)]
struct WireParam<'a> {
    name: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    type_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<&'a str>,
}

#[derive(Serialize)]
struct WirePattern<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    reference: Option<&'a str>,
}

impl<'a> From<&'a Document> for WireDocument<'a> {
    fn from(doc: &'a Document) -> Self {
        Self {
            meta: WireMeta {
                module: &doc.module,
                source: &doc.source,
            },
            comment: doc.comment.as_deref(),
            skills: doc
                .skills
                .iter()
                .map(|skill| WireSkill {
                    reference: &skill.reference,
                    context: skill.context.as_deref(),
                })
                .collect(),
            hashtags: &doc.hashtags,
            used_by: &doc.used_by,
            members: doc.members.iter().map(WireMember::from).collect(),
        }
    }
}

impl<'a> From<&'a Member> for WireMember<'a> {
    fn from(member: &'a Member) -> Self {
        Self {
            kind: member.kind.as_str(),
            name: &member.name,
            match_hash: member.match_hash.as_deref(),
            signature: member.signature.as_deref(),
            comment: member.comment.as_deref(),
            returns: member.returns.as_deref(),
            is_pub: member.is_pub,
            line: member.line,
            params: member
                .params
                .iter()
                .map(|param| WireParam {
                    name: &param.name,
                    type_name: param.type_name.as_deref(),
                    default: param.default.as_deref(),
                })
                .collect(),
            tags: &member.tags,
            patterns: member
                .patterns
                .iter()
                .map(|pattern| WirePattern {
                    name: &pattern.name,
                    kind: pattern.kind.as_str(),
                    reference: pattern.reference.as_deref(),
                })
                .collect(),
            members: member.members.iter().map(WireMember::from).collect(),
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

fn is_empty_slice<T>(value: &&[T]) -> bool {
    value.is_empty()
}
