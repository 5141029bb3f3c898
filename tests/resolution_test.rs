use docxref::diagnostics::{CollectingSink, Severity};
use docxref::errors::XrefError;
use docxref::resolution::{
    reciprocal_reference, ClassIndex, ResolverOptions, TreeTransform, UsesResolver,
};
use docxref::tree::DocTree;
use docxref::types::*;

/// Entities of the tree built by `setup_tree`.
struct Fixture {
    tree: DocTree,
    file_a: EntityId,
    a: EntityId,
    a_m1: EntityId,
    a_count: EntityId,
    a_max: EntityId,
    b: EntityId,
    b_helper: EntityId,
    b_items: EntityId,
    b_limit: EntityId,
    baz: EntityId,
}

/// Two files: `src/A.php` with class `A` (method `m1`, property `count`,
/// constant `MAX`) and a free function `baz`; `src/B.php` with class `B`
/// (method `helper`, property `items`, constant `LIMIT`).
fn setup_tree() -> Fixture {
    let mut tree = DocTree::new("demo");

    let file_a = tree.add_file("src/A.php").unwrap();
    let a = tree.add_class(file_a, "A", "A").unwrap();
    let a_m1 = tree.add_method(a, "m1").unwrap();
    let a_count = tree.add_property(a, "$count").unwrap();
    let a_max = tree.add_constant(a, "MAX").unwrap();
    let baz = tree.add_function(file_a, "baz").unwrap();

    let file_b = tree.add_file("src/B.php").unwrap();
    let b = tree.add_class(file_b, "B", "B").unwrap();
    let b_helper = tree.add_method(b, "helper").unwrap();
    let b_items = tree.add_property(b, "items").unwrap();
    let b_limit = tree.add_constant(b, "LIMIT").unwrap();

    Fixture {
        tree,
        file_a,
        a,
        a_m1,
        a_count,
        a_max,
        b,
        b_helper,
        b_items,
        b_limit,
        baz,
    }
}

fn used_by_refs(tree: &DocTree, id: EntityId) -> Vec<String> {
    tree.get(id)
        .unwrap()
        .tags()
        .iter()
        .filter(|t| t.name == USED_BY_TAG)
        .map(|t| t.refers.clone())
        .collect()
}

fn resolve(tree: &mut DocTree) -> (ResolutionReport, CollectingSink) {
    let mut sink = CollectingSink::new();
    let report = UsesResolver::default()
        .resolve(tree, &mut sink)
        .expect("resolution should succeed");
    (report, sink)
}

#[test]
fn test_end_to_end_method_to_method() {
    let mut fx = setup_tree();
    fx.tree
        .add_tag(fx.a_m1, Tag::uses("B::helper()", Some(12)))
        .unwrap();

    let (report, sink) = resolve(&mut fx.tree);

    assert_eq!(report.total, 1);
    assert_eq!(report.resolved_count(), 1);
    assert!(sink.is_empty());

    let tags = fx.tree.get(fx.b_helper).unwrap().tags();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "used_by");
    assert_eq!(tags[0].refers, "A::m1()");
    assert_eq!(tags[0].description, "A::m1()");
    assert_eq!(tags[0].line, None);

    assert_eq!(
        report.links[0],
        UsedByLink {
            origin: fx.a_m1,
            origin_ref: "A::m1()".to_string(),
            refers: "B::helper()".to_string(),
            target: fx.b_helper,
        }
    );
}

#[test]
fn test_origin_class_docblock() {
    let mut fx = setup_tree();
    fx.tree.add_tag(fx.a, Tag::uses("B", Some(3))).unwrap();

    resolve(&mut fx.tree);

    assert_eq!(used_by_refs(&fx.tree, fx.b), vec!["A"]);
}

#[test]
fn test_origin_free_function() {
    let mut fx = setup_tree();
    fx.tree.add_tag(fx.baz, Tag::uses("B", Some(30))).unwrap();

    resolve(&mut fx.tree);

    assert_eq!(used_by_refs(&fx.tree, fx.b), vec!["baz()"]);
}

#[test]
fn test_origin_property_has_no_sigil() {
    let mut fx = setup_tree();
    fx.tree.add_tag(fx.a_count, Tag::uses("B", Some(5))).unwrap();

    resolve(&mut fx.tree);

    assert_eq!(used_by_refs(&fx.tree, fx.b), vec!["A::count"]);
}

#[test]
fn test_origin_constant() {
    let mut fx = setup_tree();
    fx.tree.add_tag(fx.a_max, Tag::uses("B", Some(7))).unwrap();

    resolve(&mut fx.tree);

    assert_eq!(used_by_refs(&fx.tree, fx.b), vec!["A::MAX"]);
}

#[test]
fn test_target_property_and_constant() {
    let mut fx = setup_tree();
    fx.tree.add_tag(fx.a_m1, Tag::uses("B::$items", None)).unwrap();
    fx.tree.add_tag(fx.a_m1, Tag::uses("B::LIMIT", None)).unwrap();

    let (report, _) = resolve(&mut fx.tree);

    assert_eq!(report.resolved_count(), 2);
    assert_eq!(used_by_refs(&fx.tree, fx.b_items), vec!["A::m1()"]);
    assert_eq!(used_by_refs(&fx.tree, fx.b_limit), vec!["A::m1()"]);
    assert!(used_by_refs(&fx.tree, fx.b).is_empty());
}

#[test]
fn test_class_reference_never_matches_member() {
    let mut fx = setup_tree();
    // A constant and a method named like the referenced class.
    fx.tree.add_constant(fx.a, "B").unwrap();
    fx.tree.add_method(fx.a, "B").unwrap();
    fx.tree.add_tag(fx.baz, Tag::uses("B", None)).unwrap();

    let (report, sink) = resolve(&mut fx.tree);

    assert_eq!(report.resolved_count(), 1);
    assert_eq!(report.links[0].target, fx.b);
    assert!(sink.is_empty());
}

#[test]
fn test_method_suffix_wins_over_property_prefix() {
    let mut fx = setup_tree();
    let odd = fx.tree.add_method(fx.b, "$odd").unwrap();
    let prop = fx.tree.add_property(fx.b, "odd").unwrap();
    fx.tree.add_tag(fx.a_m1, Tag::uses("B::$odd()", None)).unwrap();

    let (report, _) = resolve(&mut fx.tree);

    assert_eq!(report.resolved_count(), 1);
    assert_eq!(used_by_refs(&fx.tree, odd), vec!["A::m1()"]);
    assert!(used_by_refs(&fx.tree, prop).is_empty());
}

#[test]
fn test_member_kind_must_match() {
    let mut fx = setup_tree();
    // `helper` exists as a method, not as a constant.
    fx.tree.add_tag(fx.a_m1, Tag::uses("B::helper", None)).unwrap();

    let (report, _) = resolve(&mut fx.tree);

    assert_eq!(report.resolved_count(), 0);
    assert_eq!(report.unresolved.len(), 1);
    assert!(used_by_refs(&fx.tree, fx.b_helper).is_empty());
}

#[test]
fn test_ambiguous_class_reference() {
    let mut tree = DocTree::new("demo");
    let f1 = tree.add_file("one.php").unwrap();
    let f2 = tree.add_file("two.php").unwrap();
    let dup1 = tree.add_class(f1, "Dup", "Dup").unwrap();
    let dup2 = tree.add_class(f2, "Dup", "Dup").unwrap();
    let user = tree.add_function(f1, "user").unwrap();
    tree.add_tag(user, Tag::uses("Dup", Some(1))).unwrap();

    let (report, sink) = resolve(&mut tree);

    assert!(used_by_refs(&tree, dup1).is_empty());
    assert!(used_by_refs(&tree, dup2).is_empty());
    assert_eq!(sink.count(Severity::Error), 1);
    assert_eq!(sink.diagnostics.len(), 1);
    assert!(sink.diagnostics[0].message.contains("\"Dup\""));
    assert_eq!(report.ambiguous.len(), 1);
    assert_eq!(report.ambiguous[0].candidates, 2);
    assert_eq!(report.resolved_count(), 0);
}

#[test]
fn test_member_lookup_across_same_named_classes() {
    let mut tree = DocTree::new("demo");
    let f1 = tree.add_file("one.php").unwrap();
    let f2 = tree.add_file("two.php").unwrap();
    let dup1 = tree.add_class(f1, "Dup", "Dup").unwrap();
    let dup2 = tree.add_class(f2, "Dup", "Dup").unwrap();
    let run1 = tree.add_method(dup1, "run").unwrap();
    tree.add_method(dup2, "run").unwrap();
    let only = tree.add_method(dup2, "only").unwrap();
    let user = tree.add_function(f1, "user").unwrap();
    tree.add_tag(user, Tag::uses("Dup::run()", None)).unwrap();
    tree.add_tag(user, Tag::uses("Dup::only()", None)).unwrap();

    let (report, sink) = resolve(&mut tree);

    assert_eq!(report.ambiguous.len(), 1);
    assert_eq!(report.ambiguous[0].refers, "Dup::run()");
    assert!(used_by_refs(&tree, run1).is_empty());
    assert_eq!(used_by_refs(&tree, only), vec!["user()"]);
    assert_eq!(sink.count(Severity::Error), 1);
}

#[test]
fn test_zero_match_leaves_tree_untouched() {
    let mut fx = setup_tree();
    fx.tree.add_tag(fx.a_m1, Tag::uses("Nope", None)).unwrap();
    fx.tree
        .add_tag(fx.a_m1, Tag::uses("B::missing()", None))
        .unwrap();
    let before = fx.tree.clone();

    let (report, sink) = resolve(&mut fx.tree);

    assert_eq!(fx.tree, before);
    assert!(sink.is_empty());
    assert_eq!(report.unresolved.len(), 2);
    assert_eq!(report.unresolved[0].refers, "Nope");
    assert_eq!(report.unresolved[0].origin_ref, "A::m1()");
}

#[test]
fn test_report_unresolved_emits_notice() {
    let mut fx = setup_tree();
    fx.tree.add_tag(fx.a_m1, Tag::uses("Nope", None)).unwrap();

    let resolver = UsesResolver::new(ResolverOptions {
        report_unresolved: true,
        ..ResolverOptions::default()
    });
    let mut sink = CollectingSink::new();
    let report = resolver.resolve(&mut fx.tree, &mut sink).unwrap();

    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(sink.count(Severity::Notice), 1);
    assert_eq!(sink.count(Severity::Error), 0);
}

#[test]
fn test_malformed_references_are_unresolved() {
    let mut fx = setup_tree();
    fx.tree.add_tag(fx.a_m1, Tag::uses("B::$", None)).unwrap();
    fx.tree.add_tag(fx.a_m1, Tag::uses("B::()", None)).unwrap();
    fx.tree.add_tag(fx.a_m1, Tag::uses("::helper()", None)).unwrap();
    fx.tree.add_tag(fx.a_m1, Tag::uses("", None)).unwrap();
    fx.tree.add_tag(fx.a_m1, Tag::uses("B::helper()", None)).unwrap();

    let (report, sink) = resolve(&mut fx.tree);

    assert!(sink.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(report.unresolved.len(), 4);
    assert!(report.unresolved.iter().all(|u| u.reason.is_some()));
    assert_eq!(report.resolved_count(), 1);
    assert_eq!(used_by_refs(&fx.tree, fx.b_helper), vec!["A::m1()"]);
}

#[test]
fn test_control_characters_fail_lookup() {
    let mut fx = setup_tree();
    fx.tree.add_tag(fx.a_m1, Tag::uses("B\u{0}", None)).unwrap();
    fx.tree.add_tag(fx.a_m1, Tag::uses("B::helper()", None)).unwrap();

    let (report, sink) = resolve(&mut fx.tree);

    assert_eq!(sink.count(Severity::Critical), 1);
    assert_eq!(sink.diagnostics.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].reason.is_some());
    // Processing continues with the next tag.
    assert_eq!(report.resolved_count(), 1);
    assert_eq!(used_by_refs(&fx.tree, fx.b_helper), vec!["A::m1()"]);
}

#[test]
fn test_reference_with_quotes_resolves() {
    let mut tree = DocTree::new("demo");
    let file = tree.add_file("quotes.php").unwrap();
    let class = tree.add_class(file, "O'Brien", "O'Brien").unwrap();
    let method = tree.add_method(class, "say\"hi\"").unwrap();
    let user = tree.add_function(file, "user").unwrap();
    tree.add_tag(user, Tag::uses("O'Brien", None)).unwrap();
    tree.add_tag(user, Tag::uses("O'Brien::say\"hi\"()", None))
        .unwrap();

    let (report, sink) = resolve(&mut tree);

    assert!(sink.is_empty());
    assert_eq!(report.resolved_count(), 2);
    assert_eq!(used_by_refs(&tree, class), vec!["user()"]);
    assert_eq!(used_by_refs(&tree, method), vec!["user()"]);
}

#[test]
fn test_full_names_match_exactly() {
    let mut tree = DocTree::new("demo");
    let file = tree.add_file("src/Foo.php").unwrap();
    let foo = tree.add_class(file, "Foo", "\\My\\Foo").unwrap();
    let bar = tree.add_method(foo, "bar").unwrap();
    let other = tree.add_method(foo, "other").unwrap();
    tree.add_tag(other, Tag::uses("\\My\\Foo::bar()", None))
        .unwrap();
    tree.add_tag(other, Tag::uses("Foo::bar()", None)).unwrap();

    let (report, _) = resolve(&mut tree);

    assert_eq!(report.resolved_count(), 1);
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(used_by_refs(&tree, bar), vec!["\\My\\Foo::other()"]);
}

#[test]
fn test_running_twice_duplicates_used_by() {
    let mut fx = setup_tree();
    fx.tree
        .add_tag(fx.a_m1, Tag::uses("B::helper()", None))
        .unwrap();

    resolve(&mut fx.tree);
    resolve(&mut fx.tree);

    assert_eq!(
        used_by_refs(&fx.tree, fx.b_helper),
        vec!["A::m1()", "A::m1()"]
    );
}

#[test]
fn test_new_tags_are_not_revisited() {
    let mut fx = setup_tree();
    fx.tree
        .add_tag(fx.a_m1, Tag::uses("B::helper()", None))
        .unwrap();

    // Synthesized tags share the name of the tags being resolved.
    let resolver = UsesResolver::new(ResolverOptions {
        used_by_tag: USES_TAG.to_string(),
        ..ResolverOptions::default()
    });
    let mut sink = CollectingSink::new();
    let report = resolver.resolve(&mut fx.tree, &mut sink).unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(fx.tree.get(fx.a_m1).unwrap().tags().len(), 1);
    let helper_tags = fx.tree.get(fx.b_helper).unwrap().tags();
    assert_eq!(helper_tags.len(), 1);
    assert_eq!(helper_tags[0].name, "uses");
    assert_eq!(helper_tags[0].refers, "A::m1()");
}

#[test]
fn test_used_by_tags_follow_document_order() {
    let mut fx = setup_tree();
    fx.tree.add_tag(fx.baz, Tag::uses("B", None)).unwrap();
    fx.tree.add_tag(fx.a_count, Tag::uses("B", None)).unwrap();
    fx.tree.add_tag(fx.a, Tag::uses("B", None)).unwrap();
    fx.tree.add_tag(fx.a_m1, Tag::uses("B", None)).unwrap();

    resolve(&mut fx.tree);

    assert_eq!(
        used_by_refs(&fx.tree, fx.b),
        vec!["A", "A::m1()", "A::count", "baz()"]
    );
}

#[test]
fn test_existing_docblock_is_appended_to() {
    let mut fx = setup_tree();
    fx.tree
        .add_tag(fx.b_helper, Tag::new("return", "int", Some(40)))
        .unwrap();
    fx.tree
        .add_tag(fx.a_m1, Tag::uses("B::helper()", None))
        .unwrap();
    assert!(fx.tree.get(fx.b_limit).unwrap().docblock.is_none());
    fx.tree.add_tag(fx.a_m1, Tag::uses("B::LIMIT", None)).unwrap();

    resolve(&mut fx.tree);

    let helper_tags = fx.tree.get(fx.b_helper).unwrap().tags();
    assert_eq!(helper_tags.len(), 2);
    assert_eq!(helper_tags[0].name, "return");
    assert_eq!(helper_tags[1].name, "used_by");

    let limit_docblock = fx.tree.get(fx.b_limit).unwrap().docblock.as_ref();
    assert_eq!(limit_docblock.map(|d| d.tags.len()), Some(1));
}

#[test]
fn test_uses_on_file_docblock_is_skipped() {
    let mut fx = setup_tree();
    fx.tree
        .add_tag(fx.a_m1, Tag::uses("B::helper()", None))
        .unwrap();
    fx.tree.add_tag(fx.file_a, Tag::uses("A", None)).unwrap();
    fx.tree.add_tag(fx.tree.root(), Tag::uses("B", None)).unwrap();

    let (report, sink) = resolve(&mut fx.tree);

    assert_eq!(report.total, 3);
    assert_eq!(report.resolved_count(), 1);
    assert_eq!(used_by_refs(&fx.tree, fx.b_helper), vec!["A::m1()"]);

    assert_eq!(report.failed.len(), 2);
    assert_eq!(sink.count(Severity::Error), 2);
    let origins: Vec<&str> = report.failed.iter().map(|f| f.origin_ref.as_str()).collect();
    assert_eq!(origins, vec!["demo", "src/A.php"]);
    // Neither target gained a reciprocal tag.
    assert!(used_by_refs(&fx.tree, fx.a).is_empty());
    assert!(used_by_refs(&fx.tree, fx.b).is_empty());
}

#[test]
fn test_broken_tree_is_rejected_before_writing() {
    let json = r#"{"entities":[
        {"kind":"project","name":"demo","children":[1]},
        {"kind":"file","name":"a.php","parent":0,"children":[2]},
        {"kind":"class","name":"A","full_name":"A","parent":1,"children":[3],
         "docblock":{"tags":[{"name":"uses","refers":"A::run()","description":"","line":""}]}},
        {"kind":"method","name":"run","parent":1}
    ]}"#;
    let mut tree: DocTree = serde_json::from_str(json).unwrap();
    let before = tree.clone();

    let mut sink = CollectingSink::new();
    let result = UsesResolver::default().resolve(&mut tree, &mut sink);

    assert!(matches!(result, Err(XrefError::MalformedTree { .. })));
    assert_eq!(tree, before);
    assert!(sink.is_empty());
}

#[test]
fn test_reciprocal_reference_formats() {
    let fx = setup_tree();

    assert_eq!(reciprocal_reference(&fx.tree, fx.a).unwrap(), "A");
    assert_eq!(reciprocal_reference(&fx.tree, fx.a_m1).unwrap(), "A::m1()");
    assert_eq!(reciprocal_reference(&fx.tree, fx.a_count).unwrap(), "A::count");
    assert_eq!(reciprocal_reference(&fx.tree, fx.a_max).unwrap(), "A::MAX");
    assert_eq!(reciprocal_reference(&fx.tree, fx.baz).unwrap(), "baz()");
    assert!(reciprocal_reference(&fx.tree, fx.file_a).is_none());
    assert!(reciprocal_reference(&fx.tree, fx.tree.root()).is_none());
    assert!(reciprocal_reference(&fx.tree, EntityId(999)).is_none());
}

#[test]
fn test_class_index_groups_by_full_name() {
    let mut fx = setup_tree();
    let extra = fx.tree.add_file("src/A2.php").unwrap();
    let a2 = fx.tree.add_class(extra, "A", "A").unwrap();

    let index = ClassIndex::build(&fx.tree);

    assert_eq!(index.len(), 2);
    assert_eq!(index.classes("A"), &[fx.a, a2]);
    assert_eq!(index.classes("B"), &[fx.b]);
    assert!(index.classes("C").is_empty());
}

#[test]
fn test_tree_transform_runs_resolution() {
    let mut fx = setup_tree();
    fx.tree
        .add_tag(fx.a_m1, Tag::uses("B::helper()", None))
        .unwrap();

    let resolver = UsesResolver::default();
    let transform: &dyn TreeTransform = &resolver;
    let mut sink = CollectingSink::new();
    let report = transform.transform(&mut fx.tree, &mut sink).unwrap();

    assert_eq!(transform.name(), "uses");
    assert_eq!(report.resolved_count(), 1);
    assert_eq!(used_by_refs(&fx.tree, fx.b_helper), vec!["A::m1()"]);
}

#[test]
fn test_empty_tree_resolves_nothing() {
    let mut tree = DocTree::new("empty");
    let (report, sink) = resolve(&mut tree);

    assert_eq!(report, ResolutionReport::default());
    assert!(sink.is_empty());
}
