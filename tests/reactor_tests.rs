//! Reactor Integration Tests
//!
//! Builds small inline module sets through every phase and inspects the
//! resulting schema context.

use yang_reactor::{
    BuildSession, BuiltinType, ConditionKind, ErrorKind, Interval, QName, ReactorConfig, ReactorError,
    Revision, SchemaContext, SchemaNode, SourceIdentifier, YangSource,
};

fn sources(texts: &[&str]) -> Vec<YangSource> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| YangSource::from_text(format!("test-{}.yang", i), text).unwrap())
        .collect()
}

fn build(texts: &[&str]) -> Result<SchemaContext, ReactorError> {
    let mut session = BuildSession::new();
    session.add_sources(sources(texts));
    session.build_effective()
}

fn build_sequential(texts: &[&str]) -> Result<SchemaContext, ReactorError> {
    let mut config = ReactorConfig::default();
    config.reactor.parallel = false;
    let mut session = BuildSession::with_config(&config);
    session.add_sources(sources(texts));
    session.build_effective()
}

fn build_err(texts: &[&str]) -> ReactorError {
    match build(texts) {
        Ok(_) => panic!("build unexpectedly succeeded"),
        Err(e) => e,
    }
}

fn q(namespace: &str, local: &str) -> QName {
    QName::new(namespace, None, local)
}

fn arguments_of<'a>(context: &'a SchemaContext, node: &'a SchemaNode, keyword: &str) -> Vec<&'a str> {
    context
        .children(node)
        .filter(|c| c.keyword().identifier == keyword)
        .filter_map(|c| c.argument())
        .collect()
}

const TOP: &str = "module t { namespace urn:t; prefix t; container top { leaf a { type string; } } }";

// =============================================================================
// Groupings and uses
// =============================================================================

#[test]
fn test_grouping_from_imported_module() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; grouping g { leaf x { type string; } } }",
        "module b { namespace urn:b; prefix b; import a { prefix a; } container c { uses a:g; } }",
    ])
    .unwrap();

    let x = context.find_path(&[q("urn:b", "c"), q("urn:b", "x")]).unwrap();
    assert!(x.is_added_by_uses());
    assert!(!x.is_augmenting());
    assert_eq!(context.parent(x).unwrap().argument(), Some("c"));

    // grouping bodies are not part of the data tree
    assert!(context.find_nodes(&q("urn:a", "x")).is_empty());
}

#[test]
fn test_grouping_cycle_fails() {
    let err = build_err(&[
        "module a { namespace urn:a; prefix a; grouping g1 { uses g2; } grouping g2 { uses g1; } }",
    ]);
    assert_eq!(err.kind(), ErrorKind::GroupingCycle);
    assert!(err.to_string().contains("a:g1"), "{}", err);
}

#[test]
fn test_unknown_grouping_and_typedef() {
    let err = build_err(&["module a { namespace urn:a; prefix a; container c { uses nope; } }"]);
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    assert!(err.to_string().contains("grouping 'nope'"));

    let err = build_err(&["module a { namespace urn:a; prefix a; leaf x { type nope; } }"]);
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    assert!(err.to_string().contains("typedef 'nope'"));
}

#[test]
fn test_local_grouping_shadows_top_level() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; \
           grouping g { leaf outer { type string; } } \
           container c { grouping g { leaf inner { type string; } } uses g; } }",
    ])
    .unwrap();

    let c = context.find_node(&q("urn:a", "c")).unwrap();
    assert!(context.child(c, &q("urn:a", "inner")).is_some());
    assert!(context.child(c, &q("urn:a", "outer")).is_none());
}

#[test]
fn test_own_prefix_reference_uses_enclosing_scope() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; \
           typedef t { type int8; } \
           container c { \
             grouping g { leaf x { type string; } } \
             typedef local { type uint16; } \
             uses a:g; \
             leaf y { type a:local; } \
             leaf z { type a:t; } } }",
    ])
    .unwrap();

    let c = context.find_node(&q("urn:a", "c")).unwrap();
    let x = context.child(c, &q("urn:a", "x")).unwrap();
    assert!(x.is_added_by_uses());

    let y = context.child(c, &q("urn:a", "y")).unwrap();
    assert_eq!(context.effective_type(y).unwrap().base, BuiltinType::Uint16);
    let z = context.child(c, &q("urn:a", "z")).unwrap();
    assert_eq!(context.effective_type(z).unwrap().base, BuiltinType::Int8);

    // an imported module's nested groupings stay out of reach
    let err = build_err(&[
        "module a { namespace urn:a; prefix a; container c { grouping g { leaf x { type string; } } } }",
        "module b { namespace urn:b; prefix b; import a { prefix a; } container d { uses a:g; } }",
    ]);
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    assert!(err.to_string().contains("grouping 'a:g'"), "{}", err);
}

#[test]
fn test_refine_replaces_and_adds() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; \
           grouping g { \
             leaf x { type string; description \"old\"; must \"1\"; } \
             container inner { leaf y { type int8; } } } \
           container top { uses g { \
             refine x { description \"new\"; default \"d\"; must \"2\"; } \
             refine inner/y { mandatory true; } } } }",
    ])
    .unwrap();

    let top = context.find_node(&q("urn:a", "top")).unwrap();
    let x = context.child(top, &q("urn:a", "x")).unwrap();
    assert_eq!(arguments_of(&context, x, "description"), vec!["new"]);
    assert_eq!(arguments_of(&context, x, "default"), vec!["d"]);
    assert_eq!(arguments_of(&context, x, "must"), vec!["1", "2"]);

    let y = context
        .find_path(&[q("urn:a", "top"), q("urn:a", "inner"), q("urn:a", "y")])
        .unwrap();
    assert_eq!(arguments_of(&context, y, "mandatory"), vec!["true"]);
}

#[test]
fn test_refine_errors() {
    let err = build_err(&[
        "module a { namespace urn:a; prefix a; grouping g { leaf x { type string; } } \
           container top { uses g { refine x { presence \"p\"; } } } }",
    ]);
    assert_eq!(err.kind(), ErrorKind::Cardinality);

    let err = build_err(&[
        "module a { namespace urn:a; prefix a; grouping g { leaf x { type string; } } \
           container top { uses g { refine x { units \"s\"; } } } }",
    ]);
    assert_eq!(err.kind(), ErrorKind::Cardinality);

    let err = build_err(&[
        "module a { namespace urn:a; prefix a; grouping g { leaf x { type string; } } \
           container top { uses g { refine nope { description \"d\"; } } } }",
    ]);
    assert_eq!(err.kind(), ErrorKind::RefineTarget);
}

#[test]
fn test_uses_augment_and_conditions() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; feature f; \
           grouping g { container c { leaf x { type string; } } } \
           container top { uses g { when \"../enabled\"; if-feature f; \
             augment \"c\" { when \"x = 'on'\"; leaf z { type string; } } } } }",
    ])
    .unwrap();

    let c = context.find_path(&[q("urn:a", "top"), q("urn:a", "c")]).unwrap();
    let kinds: Vec<ConditionKind> = c.conditions().iter().map(|cond| cond.kind).collect();
    assert_eq!(kinds, vec![ConditionKind::When, ConditionKind::IfFeature]);

    let z = context.child(c, &q("urn:a", "z")).unwrap();
    assert!(z.is_augmenting());
    assert!(z.is_added_by_uses());
    assert_eq!(z.conditions()[0].expression, "x = 'on'");
    assert_eq!(z.conditions()[0].origin.name(), "a");

    let err = build_err(&[
        "module a { namespace urn:a; prefix a; grouping g { container c { leaf x { type string; } } } \
           container top { uses g { augment \"c\" { leaf x { type int8; } } } } }",
    ]);
    assert_eq!(err.kind(), ErrorKind::AugmentTarget);
}

// =============================================================================
// Augmentation
// =============================================================================

#[test]
fn test_cross_module_augment() {
    let context = build(&[
        TOP,
        "module b { namespace urn:b; prefix b; import t { prefix t; } feature f; \
           augment \"/t:top\" { if-feature f; when \"a\"; leaf y { type string; } } }",
    ])
    .unwrap();

    let top = context.find_node(&q("urn:t", "top")).unwrap();
    let y = context.child(top, &q("urn:b", "y")).unwrap();
    assert!(y.is_augmenting());
    assert!(!y.is_added_by_uses());
    assert_eq!(context.module_of(y).name(), "t");

    let kinds: Vec<ConditionKind> = y.conditions().iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![ConditionKind::IfFeature, ConditionKind::When]);
    assert_eq!(y.conditions()[0].origin, SourceIdentifier::unrevisioned("b"));

    let a = context.child(top, &q("urn:t", "a")).unwrap();
    assert!(!a.is_augmenting());
}

#[test]
fn test_augment_missing_target() {
    let err = build_err(&[
        TOP,
        "module b { namespace urn:b; prefix b; import t { prefix t; } \
           augment \"/t:top/t:nothing\" { leaf y { type string; } } }",
    ]);
    assert_eq!(err.kind(), ErrorKind::AugmentTarget);
    assert!(err.to_string().contains("t:nothing"), "{}", err);
}

#[test]
fn test_augment_of_leaf_fails() {
    let err = build_err(&[
        TOP,
        "module b { namespace urn:b; prefix b; import t { prefix t; } \
           augment \"/t:top/t:a\" { leaf y { type string; } } }",
    ]);
    assert_eq!(err.kind(), ErrorKind::AugmentTarget);
}

#[test]
fn test_chained_augments_across_modules() {
    // c sorts first but depends on the node z adds
    let context = build(&[
        "module c { namespace urn:c; prefix c; import t { prefix t; } import z { prefix z; } \
           augment \"/t:top/z:extra\" { leaf deep { type string; } } }",
        TOP,
        "module z { namespace urn:z; prefix z; import t { prefix t; } \
           augment \"/t:top\" { container extra; } }",
    ])
    .unwrap();

    let deep = context
        .find_path(&[q("urn:t", "top"), q("urn:z", "extra"), q("urn:c", "deep")])
        .unwrap();
    assert!(deep.is_augmenting());
}

#[test]
fn test_augments_within_module_in_any_order() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; container top; \
           augment \"/a:top/a:inner\" { leaf y { type string; } } \
           augment \"/a:top\" { container inner; } }",
    ])
    .unwrap();

    let y = context
        .find_path(&[q("urn:a", "top"), q("urn:a", "inner"), q("urn:a", "y")])
        .unwrap();
    assert!(y.is_augmenting());
}

#[test]
fn test_augment_name_collision() {
    let err = build_err(&[
        "module a { namespace urn:a; prefix a; container top { leaf x { type string; } } \
           augment \"/a:top\" { leaf x { type int8; } } }",
    ]);
    assert_eq!(err.kind(), ErrorKind::AugmentTarget);
    assert!(err.to_string().contains("already contains 'x'"), "{}", err);

    // same local name in another namespace is fine
    build(&[
        TOP,
        "module b { namespace urn:b; prefix b; import t { prefix t; } \
           augment \"/t:top\" { leaf a { type string; } } }",
    ])
    .unwrap();
}

#[test]
fn test_mutual_augmentation_fails() {
    let err = build_err(&[
        "module a { namespace urn:a; prefix a; import b { prefix b; } container x; \
           augment \"/b:y\" { leaf p { type string; } } }",
        "module b { namespace urn:b; prefix b; import a { prefix a; } container y; \
           augment \"/a:x\" { leaf q { type string; } } }",
    ]);
    assert_eq!(err.kind(), ErrorKind::EffectiveModel);
    match err {
        ReactorError::EffectiveModel { modules, .. } => {
            let names: Vec<&str> = modules.iter().map(|m| m.name()).collect();
            assert_eq!(names, vec!["a", "b"]);
        }
        other => panic!("Expected EffectiveModel, got {:?}", other),
    }
}

#[test]
fn test_augment_choice_with_case() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; container top { choice ch { \
           case one { leaf l1 { type string; } } } } }",
        "module b { namespace urn:b; prefix b; import a { prefix a; } \
           augment \"/a:top/a:ch\" { case two { leaf l2 { type string; } } } }",
    ])
    .unwrap();

    let l2 = context
        .find_path(&[q("urn:a", "top"), q("urn:a", "ch"), q("urn:b", "two"), q("urn:b", "l2")])
        .unwrap();
    assert!(l2.is_augmenting());
}

#[test]
fn test_rpc_input_augment() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; rpc r { input { leaf x { type string; } } } }",
        "module b { namespace urn:b; prefix b; import a { prefix a; } \
           augment \"/a:r/a:input\" { leaf y { type string; } } }",
    ])
    .unwrap();

    let input = context.find_path(&[q("urn:a", "r"), q("urn:a", "input")]).unwrap();
    let names: Vec<&str> = context
        .schema_children(input)
        .map(|n| n.qname().unwrap().local_name())
        .collect();
    assert_eq!(names, vec!["x", "y"]);
}

// =============================================================================
// Deviations
// =============================================================================

const DEVIATED: &str = "module t { namespace urn:t; prefix t; container top { \
    leaf a { type string; default \"x\"; } \
    leaf b { type string; } \
    leaf c { type string; must \"1\"; } } }";

fn deviate(body: &str) -> Result<SchemaContext, ReactorError> {
    let deviating = format!(
        "module d {{ namespace urn:d; prefix d; import t {{ prefix t; }} {} }}",
        body
    );
    build(&[DEVIATED, &deviating])
}

#[test]
fn test_deviations_apply() {
    let context = deviate(
        "deviation \"/t:top/t:b\" { deviate not-supported; } \
         deviation \"/t:top/t:a\" { deviate replace { default \"y\"; } } \
         deviation \"/t:top/t:c\" { deviate add { must \"2\"; } }",
    )
    .unwrap();

    let top = context.find_node(&q("urn:t", "top")).unwrap();
    assert!(context.child(top, &q("urn:t", "b")).is_none());
    assert!(context.find_node(&q("urn:t", "b")).is_none());

    let a = context.child(top, &q("urn:t", "a")).unwrap();
    assert_eq!(arguments_of(&context, a, "default"), vec!["y"]);

    let c = context.child(top, &q("urn:t", "c")).unwrap();
    assert_eq!(arguments_of(&context, c, "must"), vec!["1", "2"]);
}

#[test]
fn test_deviation_replaces_type() {
    let context = deviate("deviation \"/t:top/t:b\" { deviate replace { type int32; } }").unwrap();
    let b = context.find_path(&[q("urn:t", "top"), q("urn:t", "b")]).unwrap();
    assert_eq!(context.effective_type(b).unwrap().base, BuiltinType::Int32);
}

#[test]
fn test_deviation_errors() {
    for body in [
        "deviation \"/t:top/t:a\" { deviate add { default \"z\"; } }",
        "deviation \"/t:top/t:b\" { deviate replace { default \"z\"; } }",
        "deviation \"/t:top/t:c\" { deviate delete { must \"nope\"; } }",
        "deviation \"/t:top/t:c\" { deviate not-supported; deviate add { must \"2\"; } }",
        "deviation \"/t:top/t:missing\" { deviate not-supported; }",
    ] {
        match deviate(body) {
            Ok(_) => panic!("deviation unexpectedly applied: {}", body),
            Err(e) => assert_eq!(e.kind(), ErrorKind::Deviation, "{}", body),
        }
    }
}

#[test]
fn test_deviations_run_after_augments() {
    // d deviates a node that only exists once b's augment is applied
    let context = build(&[
        TOP,
        "module b { namespace urn:b; prefix b; import t { prefix t; } \
           augment \"/t:top\" { leaf y { type string; } } }",
        "module a-dev { namespace urn:ad; prefix ad; import t { prefix t; } import b { prefix b; } \
           deviation \"/t:top/b:y\" { deviate not-supported; } }",
    ])
    .unwrap();

    let top = context.find_node(&q("urn:t", "top")).unwrap();
    assert!(context.child(top, &q("urn:b", "y")).is_none());
}

// =============================================================================
// Types
// =============================================================================

#[test]
fn test_typedef_narrowing() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; \
           typedef small { type int32 { range \"1..100\"; } units \"items\"; } \
           leaf x { type small { range \"10..20 | 30\"; } } }",
    ])
    .unwrap();

    let x = context.find_node(&q("urn:a", "x")).unwrap();
    let ty = context.effective_type(x).unwrap();
    assert_eq!(ty.base, BuiltinType::Int32);
    assert_eq!(ty.name, "small");
    assert_eq!(ty.typedefs, vec!["a:small"]);
    assert_eq!(ty.units.as_deref(), Some("items"));
    assert_eq!(ty.ranges, vec![Interval { min: 10, max: 20 }, Interval { min: 30, max: 30 }]);
    assert!(ty.range_contains(15));
    assert!(!ty.range_contains(25));
}

#[test]
fn test_restriction_errors() {
    for text in [
        "module a { namespace urn:a; prefix a; typedef small { type int32 { range \"1..100\"; } } \
           leaf x { type small { range \"0..200\"; } } }",
        "module a { namespace urn:a; prefix a; typedef s { type string { length \"1..10\"; } } \
           leaf x { type s { length \"1..20\"; } } }",
        "module a { namespace urn:a; prefix a; leaf x { type string { pattern \"[a-\"; } } }",
        "module a { namespace urn:a; prefix a; typedef e { type enumeration { enum a; enum b; } } \
           leaf x { type e { enum c; } } }",
        "module a { namespace urn:a; prefix a; leaf x { type int8 { length \"1..2\"; } } }",
        "module a { namespace urn:a; prefix a; leaf x { type uint8 { range \"0..300\"; } } }",
        "module a { namespace urn:a; prefix a; leaf x { type leafref; } }",
        "module a { namespace urn:a; prefix a; leaf x { type decimal64; } }",
    ] {
        match build(&[text]) {
            Ok(_) => panic!("restriction unexpectedly accepted: {}", text),
            Err(e) => assert_eq!(e.kind(), ErrorKind::Restriction, "{}", text),
        }
    }
}

#[test]
fn test_typedef_cycle() {
    let err = build_err(&[
        "module a { namespace urn:a; prefix a; typedef t1 { type t2; } typedef t2 { type t1; } }",
    ]);
    assert_eq!(err.kind(), ErrorKind::TypeCycle);
    assert!(err.to_string().contains("a:t1"), "{}", err);
}

#[test]
fn test_union_and_decimal64() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; \
           leaf u { type union { type int8; type string { length \"1..4\"; } } } \
           leaf d { type decimal64 { fraction-digits 2; range \"0.01..99.99\"; } } }",
    ])
    .unwrap();

    let u = context.find_node(&q("urn:a", "u")).unwrap();
    let bases: Vec<BuiltinType> = context.effective_type(u).unwrap().members.iter().map(|m| m.base).collect();
    assert_eq!(bases, vec![BuiltinType::Int8, BuiltinType::String]);

    let d = context.find_node(&q("urn:a", "d")).unwrap();
    let ty = context.effective_type(d).unwrap();
    assert_eq!(ty.fraction_digits, Some(2));
    assert_eq!(ty.ranges, vec![Interval { min: 1, max: 9999 }]);
}

#[test]
fn test_typedef_resolved_where_grouping_is_defined() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; \
           typedef percent { type uint8 { range \"0..100\"; } } \
           grouping g { leaf p { type percent; } } }",
        "module b { namespace urn:b; prefix b; import a { prefix a; } \
           typedef percent { type string; } \
           container c { uses a:g; } }",
    ])
    .unwrap();

    let p = context.find_path(&[q("urn:b", "c"), q("urn:b", "p")]).unwrap();
    let ty = context.effective_type(p).unwrap();
    assert_eq!(ty.base, BuiltinType::Uint8);
    assert_eq!(ty.typedefs, vec!["a:percent"]);
}

// =============================================================================
// Linkage
// =============================================================================

#[test]
fn test_unqualified_import_prefers_latest_revision() {
    let context = build(&[
        "module m { namespace urn:m; prefix m; container old; }",
        "module m { namespace urn:m; prefix m; revision 2020-01-01; container new; }",
        "module b { namespace urn:b; prefix b; import m { prefix m; } \
           augment \"/m:new\" { leaf y { type string; } } }",
    ])
    .unwrap();

    let latest = SourceIdentifier::with_revision("m", "2020-01-01").unwrap();
    let b = SourceIdentifier::unrevisioned("b");
    assert_eq!(context.module_graph().imports_of(&b), vec![&latest]);
    assert_eq!(context.latest_module("m").unwrap().id(), &latest);
    assert_eq!(context.module("m", None).unwrap().id(), &latest);
    assert!(context.module("m", Some(Revision::parse("2019-01-01").unwrap())).is_none());

    let revision = Revision::parse("2020-01-01").unwrap();
    let new = QName::new("urn:m", Some(revision), "new");
    let y = context.child(context.find_node(&new).unwrap(), &q("urn:b", "y"));
    assert!(y.is_some());
}

#[test]
fn test_submodule_content() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; include s; container top; }",
        "submodule s { belongs-to a { prefix a; } \
           grouping g { leaf from-group { type string; } } \
           leaf from-sub { type string; } \
           augment \"/a:top\" { uses g; } }",
    ])
    .unwrap();

    let module = context.latest_module("a").unwrap();
    assert_eq!(module.submodules(), &[SourceIdentifier::unrevisioned("s")]);
    assert!(context.latest_module("s").is_none());

    let sub_leaf = context.find_node(&q("urn:a", "from-sub")).unwrap();
    assert_eq!(context.module_of(sub_leaf).name(), "a");

    let from_group = context
        .find_path(&[q("urn:a", "top"), q("urn:a", "from-group")])
        .unwrap();
    assert!(from_group.is_augmenting());
    assert!(from_group.is_added_by_uses());
}

#[test]
fn test_include_cycle_fails() {
    let err = build_err(&[
        "module a { namespace urn:a; prefix a; include s1; }",
        "submodule s1 { belongs-to a { prefix a; } include s2; }",
        "submodule s2 { belongs-to a { prefix a; } include s1; }",
    ]);
    assert_eq!(err.kind(), ErrorKind::Linkage);
}

#[test]
fn test_missing_import_fails() {
    let err = build_err(&["module a { namespace urn:a; prefix a; import nope { prefix n; } }"]);
    assert_eq!(err.kind(), ErrorKind::Linkage);
}

// =============================================================================
// Context
// =============================================================================

#[test]
fn test_fingerprint_is_stable() {
    let texts = [
        TOP,
        "module b { namespace urn:b; prefix b; import t { prefix t; } \
           grouping g { leaf y { type string; } } augment \"/t:top\" { uses g; } }",
    ];
    let first = build(&texts).unwrap();
    let reversed = build(&[texts[1], texts[0]]).unwrap();
    let sequential = build_sequential(&texts).unwrap();

    let fingerprint = first.fingerprint().unwrap();
    assert_eq!(fingerprint.len(), 64);
    assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));

    assert_eq!(fingerprint, reversed.fingerprint().unwrap());
    assert_eq!(fingerprint, sequential.fingerprint().unwrap());
    assert_ne!(fingerprint, build(&[TOP]).unwrap().fingerprint().unwrap());
}

#[test]
fn test_lookups_outlive_their_arguments() {
    let context = build(&[TOP]).unwrap();
    let module = context.latest_module("t").unwrap();
    let top = context.find_node(&q("urn:t", "top")).unwrap();

    let a = {
        let name = String::from("a");
        context.child(top, &q("urn:t", &name)).unwrap()
    };
    assert_eq!(a.argument(), Some("a"));

    let again = context.node(module, a.id()).unwrap();
    assert_eq!(again.qname(), a.qname());
}

#[test]
fn test_context_navigation() {
    let context = build(&[
        "module a { namespace urn:a; prefix a; \
           container top { list entry { key name; leaf name { type string; } \
             container nested { leaf deep { type int8; } } } } }",
    ])
    .unwrap();

    let module = context.latest_module("a").unwrap();
    assert_eq!(module.data_children().count(), 1);

    let top = context.find_node(&q("urn:a", "top")).unwrap();
    let names: Vec<&str> = context
        .descendants(top)
        .into_iter()
        .filter_map(|n| n.qname().map(QName::local_name))
        .collect();
    assert_eq!(names, vec!["entry", "name", "nested", "deep"]);

    let deep = context.find_node(&q("urn:a", "deep")).unwrap();
    let mut path = Vec::new();
    let mut current = Some(deep);
    while let Some(node) = current {
        if let Some(qname) = node.qname() {
            path.push(qname.local_name().to_string());
        }
        current = context.parent(node);
    }
    assert_eq!(path, vec!["deep", "nested", "entry", "top"]);
}

#[test]
fn test_context_shared_across_threads() {
    let context = build(&[TOP]).unwrap();
    let qname = q("urn:t", "a");

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let node = context.find_node(&qname).unwrap();
                assert_eq!(context.effective_type(node).unwrap().base, BuiltinType::String);
            });
        }
    });
}

#[test]
fn test_module_graph_export() {
    let context = build(&[
        TOP,
        "module b { namespace urn:b; prefix b; import t { prefix t; } }",
    ])
    .unwrap();

    let graph = context.module_graph();
    assert_eq!(graph.source_count(), 2);
    assert_eq!(graph.edge_count(), 1);

    let dot = context.to_dot();
    assert!(dot.contains("\"b\" -> \"t\" [label=\"import\""), "{}", dot);
}
