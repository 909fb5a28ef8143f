use guidance_core::{merge_members, Member, MemberKind, Pattern, PatternKind};
use pretty_assertions::assert_eq;

fn func(name: &str, hash: &str) -> Member {
    Member::new(MemberKind::Function, name).match_hash(hash)
}

fn documented(name: &str, hash: &str, line: u32) -> Member {
    let mut pattern = Pattern::new("visitor");
    pattern.kind = PatternKind::Design;
    func(name, hash)
        .line(line)
        .comment(format!("Documents {name}."))
        .tag("core")
        .pattern(pattern)
}

#[test]
fn disjoint_names_are_all_added_and_removed() {
    let cases: Vec<(Vec<Member>, Vec<Member>)> = vec![
        (vec![], vec![]),
        (vec![func("a", "1")], vec![]),
        (vec![], vec![func("x", "1"), func("y", "2")]),
        (
            vec![func("a", "1"), func("b", "2"), func("c", "3")],
            vec![func("x", "1")],
        ),
    ];

    for (fresh, existing) in cases {
        let out = merge_members(&fresh, &existing, true);
        assert_eq!(out.stats.added, fresh.len());
        assert_eq!(out.stats.removed, existing.len());
        assert_eq!(out.stats.has_changes, fresh.len() + existing.len() > 0);
        assert_eq!(out.members, fresh);
    }
}

#[test]
fn fully_unchanged_tree_is_a_no_op() {
    let existing = vec![
        documented("alpha", "h1", 1),
        documented("beta", "h2", 9).member(documented("inner", "h3", 10)),
    ];
    let fresh = vec![
        func("alpha", "h1").line(1),
        func("beta", "h2")
            .line(9)
            .member(func("inner", "h3").line(10)),
    ];

    let out = merge_members(&fresh, &existing, true);
    assert!(!out.stats.has_changes);
    assert_eq!(out.members, existing);
}

#[test]
fn each_changed_hash_without_new_comment_is_one_stale() {
    let existing = vec![
        documented("a", "h1", 1),
        documented("b", "h2", 2),
        documented("c", "h3", 3),
    ];
    let fresh = vec![
        func("a", "h1-new").line(1),
        func("b", "h2").line(2),
        func("c", "h3-new").line(3).comment("Rewritten inline."),
    ];

    let out = merge_members(&fresh, &existing, true);
    assert_eq!(out.stats.stale, 1);
    assert_eq!(out.stats.updated, 2);
    assert_eq!(out.members[0].comment, None);
    assert_eq!(out.members[1].comment.as_deref(), Some("Documents b."));
    assert_eq!(out.members[2].comment.as_deref(), Some("Rewritten inline."));
}

#[test]
fn output_survives_dropping_inputs() {
    let existing = vec![documented("foo", "h1", 4).member(documented("bar", "h2", 5))];
    let fresh = vec![func("foo", "h1")
        .line(4)
        .member(func("bar", "h2").line(5))];

    let out = merge_members(&fresh, &existing, true);
    drop(existing);
    drop(fresh);

    assert_eq!(out.members[0].comment.as_deref(), Some("Documents foo."));
    assert_eq!(out.members[0].members[0].name, "bar");
    assert_eq!(out.members[0].members[0].tags, vec!["core".to_string()]);
    assert_eq!(out.members[0].patterns[0].name, "visitor");
}

#[test]
fn end_to_end_hash_scenarios() {
    let existing = vec![func("foo", "h1").comment("Doc.")];

    let out = merge_members(&[func("foo", "h1")], &existing, true);
    assert_eq!(out.members, vec![func("foo", "h1").comment("Doc.")]);
    assert!(!out.stats.has_changes);

    let out = merge_members(&[func("foo", "h2")], &existing, true);
    assert_eq!(out.members, vec![func("foo", "h2")]);
    assert_eq!(out.stats.stale, 1);
    assert!(out.stats.has_changes);
}

#[test]
fn nested_list_only_merged_when_both_sides_have_children() {
    let existing = vec![Member::new(MemberKind::Struct, "S")
        .match_hash("s")
        .member(documented("field", "f", 2))];
    let fresh = vec![Member::new(MemberKind::Struct, "S").match_hash("s")];

    let out = merge_members(&fresh, &existing, true);
    assert!(out.members[0].members.is_empty());
}

// Known edge case: duplicate names in one sibling list are not deduplicated.
// The first persisted member with a given name is the only one ever matched.
#[test]
fn duplicate_names_first_match_wins_known_edge_case() {
    let existing = vec![
        func("init", "h1").comment("First."),
        func("init", "h9").comment("Second."),
    ];
    let fresh = vec![func("init", "h1"), func("init", "h9")];

    let out = merge_members(&fresh, &existing, true);
    assert_eq!(out.members.len(), 2);
    assert_eq!(out.members[0].comment.as_deref(), Some("First."));
    // Matched against the first entry ("h1"), so the hash looks changed.
    assert_eq!(out.members[1].comment, None);
    assert_eq!(out.stats.stale, 1);
    assert_eq!(out.stats.removed, 0);
}
