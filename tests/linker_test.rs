use callscope::analyzer::merge_units;
use callscope::extraction::GoExtractor;
use callscope::graph::DeclarationTable;
use callscope::resolution::CallLinker;
use callscope::syntax::SourceMap;
use callscope::traversal::{walk_unit, UnitTable};
use callscope::types::*;

fn units(sources: &[(&str, &str)]) -> (SourceMap, Vec<UnitTable>) {
    let mut source_map = SourceMap::new();
    let mut tables = Vec::new();
    for (name, source) in sources {
        let base = source_map.add_file(name, source);
        let file = GoExtractor::extract_source(name, source, base).unwrap();
        tables.push(walk_unit(&file));
    }
    (source_map, tables)
}

fn linked(sources: &[(&str, &str)]) -> (DeclarationTable, LinkStats) {
    let (source_map, tables) = units(sources);
    let mut table = merge_units(source_map, tables);
    let stats = CallLinker::link_all(&mut table);
    (table, stats)
}

#[test]
fn test_call_is_attributed_to_enclosing_declaration() {
    let source = "package p\n\nfunc main() {\n\tgetA()\n}\n\nfunc getA() {}\n";
    let (table, stats) = linked(&[("main.go", source)]);

    let get_a = table.lookup_id("p.getA").unwrap();
    let inbound = table.inbound(get_a);
    assert_eq!(inbound.len(), 1);

    let caller = inbound[0].caller.and_then(|id| table.get(id)).unwrap();
    assert_eq!(caller.identifier(), "p.main");
    assert_eq!(inbound[0].resolved, Some(get_a));

    let position = inbound[0].position.as_ref().unwrap();
    assert_eq!(position.file, "main.go");
    assert_eq!(position.line, 4);
    assert_eq!(position.column, 2);

    assert_eq!(
        stats,
        LinkStats {
            total: 1,
            resolved: 1,
            unresolved: 0,
            changed: 1
        }
    );
}

#[test]
fn test_unresolved_call_is_not_an_error() {
    let source = "package p\n\nfunc main() {\n\tx.getA()\n}\n";
    let (table, stats) = linked(&[("main.go", source)]);

    let (_, site) = table.all_calls().next().unwrap();
    assert_eq!(site.callee, "x.getA");
    assert!(!site.is_resolved());
    assert!(site.position.is_some());
    assert_eq!(stats.unresolved, 1);
    assert_eq!(stats.resolved, 0);
    assert!(table.inbound(table.lookup_id("p.main").unwrap()).is_empty());
}

#[test]
fn test_linking_is_idempotent() {
    let source = "package p\n\nfunc main() {\n\tgetA()\n\tgetA()\n\tfmt.Println()\n}\n\nfunc getA() {}\n";
    let (mut table, first) = linked(&[("main.go", source)]);
    assert_eq!(first.changed, 2);

    let snapshot = table.clone();
    let second = CallLinker::link_all(&mut table);
    assert_eq!(snapshot, table);
    assert_eq!(second.changed, 0);
    assert_eq!(second.total, first.total);
    assert_eq!(second.resolved, first.resolved);
    assert_eq!(table.inbound(table.lookup_id("p.getA").unwrap()).len(), 2);
}

#[test]
fn test_package_level_calls_have_no_caller() {
    let source = "package p\n\nvar x = build()\n\nfunc build() int {\n\treturn 1\n}\n";
    let (table, stats) = linked(&[("vars.go", source)]);
    let build = table.lookup_id("p.build").unwrap();
    let inbound = table.inbound(build);
    assert_eq!(inbound.len(), 1);
    assert_eq!(inbound[0].caller, None);
    assert_eq!(stats.resolved, 1);
}

#[test]
fn test_calls_inside_function_literals_belong_to_enclosing_declaration() {
    let source = "package p\n\nfunc run() {\n\tgo func() {\n\t\twork()\n\t}()\n}\n\nfunc work() {}\n";
    let (table, _) = linked(&[("run.go", source)]);
    let run = table.lookup_id("p.run").unwrap();
    let work = table.lookup_id("p.work").unwrap();
    let inbound = table.inbound(work);
    assert_eq!(inbound.len(), 1);
    assert_eq!(inbound[0].caller, Some(run));
    // The literal itself is invoked too.
    assert_eq!(table.outbound(run).len(), 2);
}

#[test]
fn test_cross_file_and_method_expression_lookup() {
    let a = "package p\n\ntype T struct{}\n\nfunc (t T) M() {}\n";
    let b = "package p\n\nfunc use() {\n\tT.M(T{})\n\thelper()\n}\n";
    let c = "package p\n\nfunc helper() {}\n";
    let (table, stats) = linked(&[("a.go", a), ("b.go", b), ("c.go", c)]);

    assert_eq!(stats.resolved, 2);
    assert_eq!(table.inbound(table.lookup_id("p.T.M").unwrap()).len(), 1);
    let helper_calls = table.inbound(table.lookup_id("p.helper").unwrap());
    assert_eq!(helper_calls[0].position.as_ref().unwrap().file, "b.go");
}

#[test]
fn test_imported_calls_are_not_package_qualified() {
    // A local `Println` must not capture a call to the imported package.
    let source = "package fmt2\n\nimport fmt \"fmt\"\n\nfunc Println() {}\n\nfunc f() {\n\tfmt.Println()\n}\n";
    let (table, stats) = linked(&[("f.go", source)]);
    let (_, site) = table.all_calls().next().unwrap();
    assert!(site.imported);
    assert_eq!(site.callee, "fmt.Println");
    assert!(!site.is_resolved());
    assert_eq!(stats.unresolved, 1);
}

#[test]
fn test_relinking_after_overwrite_moves_edges() {
    let first = "package p\n\nfunc main() {\n\ttarget()\n}\n\nfunc target() {}\n";
    let (source_map, tables) = units(&[("a.go", first)]);
    let mut table = merge_units(source_map, tables);
    CallLinker::link_all(&mut table);
    let old = table.lookup_id("p.target").unwrap();
    assert_eq!(table.inbound(old).len(), 1);

    // A later unit redeclares the same identity.
    let (_, mut more) = units(&[("b.go", "package p\n\nfunc target() {}\n")]);
    table.merge(more.remove(0));
    let new = table.lookup_id("p.target").unwrap();
    assert_ne!(old, new);

    let stats = CallLinker::link_all(&mut table);
    assert_eq!(stats.changed, 1);
    assert!(table.inbound(old).is_empty());
    assert_eq!(table.inbound(new).len(), 1);
}

#[test]
fn test_explicit_type_arguments_resolve_to_generic_function() {
    let source = "package p\n\nfunc Map[T any](x T) T {\n\treturn x\n}\n\nfunc main() {\n\tMap[int](1)\n\tMap(2)\n\tPair[string, []byte](\"a\", nil)\n}\n\nfunc Pair[K comparable, V any](k K, v V) {}\n";
    let (table, stats) = linked(&[("map.go", source)]);

    let map = table.lookup_id("p.Map").unwrap();
    let inbound = table.inbound(map);
    assert_eq!(inbound.len(), 2);
    assert_eq!(inbound[0].callee, "p.Map[int]");
    assert_eq!(inbound[1].callee, "p.Map");

    let pair = table.lookup_id("p.Pair").unwrap();
    assert_eq!(table.inbound(pair).len(), 1);
    assert_eq!(stats.resolved, 3);
    assert_eq!(stats.unresolved, 0);
}
