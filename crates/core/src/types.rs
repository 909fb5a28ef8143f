use serde::{Deserialize, Serialize};

/// Persisted documentation for one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Logical module name
    pub module: String,

    /// Source path, relative to the project root
    pub source: String,

    /// File-level documentation
    pub comment: Option<String>,

    /// Skills this file is associated with
    pub skills: Vec<Skill>,

    /// Free-form hashtags
    pub hashtags: Vec<String>,

    /// Modules known to depend on this one
    pub used_by: Vec<String>,

    /// Root-level members, in source order
    pub members: Vec<Member>,
}

impl Document {
    /// Create an empty document for a source file
    pub fn new(module: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            source: source.into(),
            comment: None,
            skills: Vec::new(),
            hashtags: Vec::new(),
            used_by: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Builder: set file-level comment
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Builder: append a root-level member
    #[must_use]
    pub fn member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Whether the file-level comment carries any text
    #[must_use]
    pub fn has_comment(&self) -> bool {
        has_text(self.comment.as_deref())
    }

    /// Pre-order traversal of every member in the tree.
    ///
    /// Each item carries the member's path: the names from the root down to
    /// and including the member itself.
    pub fn walk_members(&self) -> MemberWalk<'_> {
        MemberWalk::new(&self.members)
    }

    /// Like [`Document::walk_members`], but also yields each member's
    /// position path (sibling indices from the root down), which stays
    /// unambiguous when siblings share a name.
    pub fn walk_positions(&self) -> impl Iterator<Item = (Vec<usize>, Vec<String>, &Member)> + '_ {
        let mut walk = MemberWalk::new(&self.members);
        std::iter::from_fn(move || walk.advance())
    }

    /// Total number of members at every nesting level
    #[must_use]
    pub fn count_members(&self) -> usize {
        self.walk_members().count()
    }

    /// Paths of members whose comment is absent or blank
    #[must_use]
    pub fn members_missing_comments(&self) -> Vec<Vec<String>> {
        self.walk_members()
            .filter(|(_, member)| !member.has_comment())
            .map(|(path, _)| path)
            .collect()
    }

    /// Resolve a member by path (first match per level)
    #[must_use]
    pub fn find_member(&self, path: &[String]) -> Option<&Member> {
        let (first, rest) = path.split_first()?;
        let mut current = self.members.iter().find(|m| &m.name == first)?;
        for name in rest {
            current = current.members.iter().find(|m| &m.name == name)?;
        }
        Some(current)
    }

    /// Resolve a member by position path, see [`Document::walk_positions`]
    pub fn member_at_mut(&mut self, positions: &[usize]) -> Option<&mut Member> {
        let (first, rest) = positions.split_first()?;
        let mut current = self.members.get_mut(*first)?;
        for &index in rest {
            current = current.members.get_mut(index)?;
        }
        Some(current)
    }
}

/// One documented code symbol; members nest to form a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Symbol kind
    pub kind: MemberKind,

    /// Symbol name, unique only within its sibling list
    pub name: String,

    /// Opaque fingerprint of the current implementation
    pub match_hash: Option<String>,

    /// Rendered signature
    pub signature: Option<String>,

    /// Documentation text
    pub comment: Option<String>,

    /// Description of the return value
    pub returns: Option<String>,

    /// Visibility
    pub is_pub: bool,

    /// Source line (1-indexed)
    pub line: Option<u32>,

    /// Parameters in declaration order
    pub params: Vec<Param>,

    /// Classification tags
    pub tags: Vec<String>,

    /// Recognised patterns
    pub patterns: Vec<Pattern>,

    /// Nested members
    pub members: Vec<Member>,
}

impl Member {
    /// Create a member with only the required fields set
    pub fn new(kind: MemberKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            match_hash: None,
            signature: None,
            comment: None,
            returns: None,
            is_pub: false,
            line: None,
            params: Vec::new(),
            tags: Vec::new(),
            patterns: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Builder: set match hash
    #[must_use]
    pub fn match_hash(mut self, hash: impl Into<String>) -> Self {
        self.match_hash = Some(hash.into());
        self
    }

    /// Builder: set signature
    #[must_use]
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Builder: set comment
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Builder: set return description
    #[must_use]
    pub fn returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = Some(returns.into());
        self
    }

    /// Builder: mark as public
    #[must_use]
    pub const fn public(mut self) -> Self {
        self.is_pub = true;
        self
    }

    /// Builder: set source line
    #[must_use]
    pub const fn line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Builder: add parameter
    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Builder: add tag
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Builder: add pattern
    #[must_use]
    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Builder: add nested member
    #[must_use]
    pub fn member(mut self, member: Self) -> Self {
        self.members.push(member);
        self
    }

    /// Whether the comment carries any text
    #[must_use]
    pub fn has_comment(&self) -> bool {
        has_text(self.comment.as_deref())
    }
}

/// A function or method parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub type_name: Option<String>,
    pub default: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            default: None,
        }
    }

    #[must_use]
    pub fn typed(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            default: None,
        }
    }
}

/// Reference to a skill the file is relevant for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skill {
    pub reference: String,
    pub context: Option<String>,
}

impl Skill {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            context: None,
        }
    }
}

/// A recognised pattern attached to a member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub name: String,
    pub kind: PatternKind,
    pub reference: Option<String>,
}

impl Pattern {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PatternKind::default(),
            reference: None,
        }
    }
}

/// Kind of code symbol a member describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// Free function
    #[serde(rename = "fn")]
    Function,
    /// Function declared inside a container type
    Method,
    /// Struct declaration
    Struct,
    /// Enum declaration
    Enum,
    /// Union declaration
    Union,
    /// Opaque type
    Opaque,
    /// Type alias or type-returning declaration
    Type,
    /// Constant
    Const,
    /// Variable
    Var,
    /// Container field
    Field,
    /// Error set
    ErrorSet,
    /// Test block
    Test,
}

impl MemberKind {
    /// Stable name used in persisted documents
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "fn",
            Self::Method => "method",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Union => "union",
            Self::Opaque => "opaque",
            Self::Type => "type",
            Self::Const => "const",
            Self::Var => "var",
            Self::Field => "field",
            Self::ErrorSet => "error_set",
            Self::Test => "test",
        }
    }

    /// Parse a persisted kind name
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        let kind = match name {
            "fn" | "function" => Self::Function,
            "method" => Self::Method,
            "struct" => Self::Struct,
            "enum" => Self::Enum,
            "union" => Self::Union,
            "opaque" => Self::Opaque,
            "type" => Self::Type,
            "const" => Self::Const,
            "var" => Self::Var,
            "field" => Self::Field,
            "error_set" => Self::ErrorSet,
            "test" => Self::Test,
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for MemberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a recognised pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    #[default]
    Domain,
    Design,
    Idiom,
    Architecture,
    AntiPattern,
}

impl PatternKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "Domain",
            Self::Design => "Design",
            Self::Idiom => "Idiom",
            Self::Architecture => "Architecture",
            Self::AntiPattern => "AntiPattern",
        }
    }

    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        let kind = match name {
            "Domain" => Self::Domain,
            "Design" => Self::Design,
            "Idiom" => Self::Idiom,
            "Architecture" => Self::Architecture,
            "AntiPattern" => Self::AntiPattern,
            _ => return None,
        };
        Some(kind)
    }
}

/// Pre-order iterator over a member tree, see [`Document::walk_members`]
pub struct MemberWalk<'a> {
    stack: Vec<(Vec<usize>, Vec<String>, &'a Member)>,
}

impl<'a> MemberWalk<'a> {
    fn new(roots: &'a [Member]) -> Self {
        let stack = roots
            .iter()
            .enumerate()
            .rev()
            .map(|(index, member)| (vec![index], vec![member.name.clone()], member))
            .collect();
        Self { stack }
    }

    fn advance(&mut self) -> Option<(Vec<usize>, Vec<String>, &'a Member)> {
        let (positions, path, member) = self.stack.pop()?;
        for (index, child) in member.members.iter().enumerate().rev() {
            let mut child_positions = positions.clone();
            child_positions.push(index);
            let mut child_path = path.clone();
            child_path.push(child.name.clone());
            self.stack.push((child_positions, child_path, child));
        }
        Some((positions, path, member))
    }
}

impl<'a> Iterator for MemberWalk<'a> {
    type Item = (Vec<String>, &'a Member);

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().map(|(_, path, member)| (path, member))
    }
}

pub(crate) fn has_text(text: Option<&str>) -> bool {
    text.is_some_and(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        Document::new("parser", "src/parser.zig")
            .member(
                Member::new(MemberKind::Struct, "Parser")
                    .comment("Token parser.")
                    .member(Member::new(MemberKind::Field, "tokens"))
                    .member(Member::new(MemberKind::Method, "next").comment("Advances.")),
            )
            .member(Member::new(MemberKind::Function, "parse"))
    }

    #[test]
    fn walk_is_pre_order_with_paths() {
        let doc = sample();
        let paths: Vec<String> = doc
            .walk_members()
            .map(|(path, _)| path.join("."))
            .collect();
        assert_eq!(
            paths,
            vec!["Parser", "Parser.tokens", "Parser.next", "parse"]
        );
        assert_eq!(doc.count_members(), 4);
    }

    #[test]
    fn positions_tell_same_named_siblings_apart() {
        let mut doc = Document::new("t", "t.zig").member(
            Member::new(MemberKind::Struct, "Suite")
                .member(Member::new(MemberKind::Test, "t"))
                .member(Member::new(MemberKind::Test, "t")),
        );
        let positions: Vec<Vec<usize>> = doc.walk_positions().map(|(pos, _, _)| pos).collect();
        assert_eq!(positions, vec![vec![0], vec![0, 0], vec![0, 1]]);

        doc.member_at_mut(&[0, 1]).unwrap().comment = Some("Second.".to_string());
        assert_eq!(doc.members[0].members[0].comment, None);
        assert_eq!(doc.members[0].members[1].comment.as_deref(), Some("Second."));
        assert!(doc.member_at_mut(&[0, 2]).is_none());
        assert!(doc.member_at_mut(&[]).is_none());
    }

    #[test]
    fn missing_comments_lists_blank_and_absent() {
        let mut doc = sample();
        doc.members[1].comment = Some("   ".to_string());
        let missing: Vec<String> = doc
            .members_missing_comments()
            .into_iter()
            .map(|p| p.join("."))
            .collect();
        assert_eq!(missing, vec!["Parser.tokens", "parse"]);
    }

    #[test]
    fn find_member_follows_path() {
        let doc = sample();
        let path = vec!["Parser".to_string(), "next".to_string()];
        assert_eq!(
            doc.find_member(&path).and_then(|m| m.comment.as_deref()),
            Some("Advances.")
        );
        assert!(doc.find_member(&["nope".to_string()]).is_none());
        assert!(doc.find_member(&[]).is_none());
    }

    #[test]
    fn clone_owns_every_field() {
        let original = sample();
        let copy = original.clone();
        drop(original);
        assert_eq!(copy.members[0].members[1].name, "next");
        assert_eq!(copy.members[0].comment.as_deref(), Some("Token parser."));
    }

    #[test]
    fn kind_wire_names_round_trip() {
        for kind in [
            MemberKind::Function,
            MemberKind::Method,
            MemberKind::Struct,
            MemberKind::Enum,
            MemberKind::Union,
            MemberKind::Opaque,
            MemberKind::Type,
            MemberKind::Const,
            MemberKind::Var,
            MemberKind::Field,
            MemberKind::ErrorSet,
            MemberKind::Test,
        ] {
            assert_eq!(MemberKind::from_wire(kind.as_str()), Some(kind));
        }
        assert_eq!(MemberKind::from_wire("function"), Some(MemberKind::Function));
        assert_eq!(MemberKind::from_wire("klass"), None);
        assert_eq!(PatternKind::from_wire("Idiom"), Some(PatternKind::Idiom));
        assert_eq!(PatternKind::from_wire("idiom"), None);
    }
}
