use std::fs;

use callscope::analyzer::Analyzer;
use callscope::config::{load_config, save_config, AnalyzerConfig};
use callscope::graph::GraphQueries;
use callscope::report::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_full_pipeline() {
    let dir = TempDir::new().unwrap();
    let project = dir.path();

    // A small two-package Go project
    fs::create_dir_all(project.join("store")).unwrap();
    fs::write(
        project.join("main.go"),
        r#"package main

import (
	"fmt"

	kv "example.com/app/store"
)

func main() {
	s := kv.New()
	s.Put("a", 1)
	fmt.Println(render(s))
}

func render(s *kv.Store) string {
	return fmt.Sprint(s)
}

func leftover() {}
"#,
    )
    .unwrap();
    fs::write(
        project.join("store/store.go"),
        r#"package store

type Store struct {
	items map[string]int
}

func New() *Store {
	return &Store{items: make(map[string]int)}
}

func (s *Store) Put(key string, value int) {
	s.items[key] = value
	s.touch()
}

func (s *Store) touch() {}
"#,
    )
    .unwrap();

    // Config round-trip through the project directory
    save_config(project, &AnalyzerConfig::default()).unwrap();
    let config = load_config(project).unwrap();

    let analysis = Analyzer::new(config).analyze_dir(project).await.unwrap();
    assert!(analysis.failures.is_empty());
    let table = &analysis.table;

    // kv.New() is rewritten to the declared package name and resolves.
    let new = table.lookup_id("store.New").unwrap();
    let inbound = table.inbound(new);
    assert_eq!(inbound.len(), 1);
    assert!(inbound[0].imported);
    assert_eq!(inbound[0].callee, "store.New");

    // Method calls through variables stay unresolved.
    let put = table.lookup_id("store.Store.Put").unwrap();
    assert!(table.inbound(put).is_empty());

    let store = table.structure("store.Store").unwrap();
    assert_eq!(store.methods.len(), 2);

    let render = table.lookup_id("main.render").unwrap();
    let queries = GraphQueries::new(table);
    let main = table.lookup_id("main.main").unwrap();
    let callees: Vec<_> = queries.callees(main, 2).into_iter().map(|(d, _)| d).collect();
    assert_eq!(callees, vec![new, render]);

    let dead: Vec<String> = queries
        .unreferenced()
        .into_iter()
        .map(|(_, d)| d.identifier())
        .collect();
    assert_eq!(dead, vec!["main.leftover", "store.Store.touch"]);

    // Reports
    let report = GraphReport::from_analysis(&analysis);
    let md = format_report_as_markdown(&report);
    assert!(md.contains("#### main.go"));
    assert!(md.contains("#### store/store.go"));
    assert!(md.contains("**store.New**"));
    assert!(md.contains("- **store.Store** (struct)"));

    let json = format_report_as_json(&report);
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["summary"]["declarations"], 6);
    assert_eq!(parsed["summary"]["failures"], 0);

    let related = format_related_as_markdown(table, "Callers of store.New", &queries.callers(new, 1));
    assert!(related.contains("**main.main** via main.go:10"));
}
