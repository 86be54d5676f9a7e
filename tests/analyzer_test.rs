use std::fs;
use std::sync::Arc;

use callscope::analyzer::{analyze_unit, Analyzer};
use callscope::config::AnalyzerConfig;
use callscope::errors::CallScopeError;
use callscope::extraction::{GoExtractor, LanguageExtractor};
use callscope::traversal::WalkOptions;
use callscope::types::TypeKind;
use tempfile::TempDir;

const SAMPLE: &str = r#"package sample

import (
	"log"
	"os"
	t "strings"

	_ "github.com/ariyn/golang-analyzer/analyzer"
)

func main() {
	log.Println("hello, world!")

	a := 2
	b := getB()
	b2 := getB()
	b3 := getB()

	result := multiply(a, b)

	checkResult(result)
	log.Println(b2, b3)

	sampleFunc1()
}

// getB is test function
func getB() int { // test
	t.Contains("", "")
	return 3
}

// multiply is test function
func multiply(a, b int) (result int) {
	result = a * b
	return
}

func checkResult(result int) {
	log.Println(result)
}

type x int

func (recv *x) SampleFunction(a, b int, c *string, d bool) (aa, bb int) {
	log.Println(a, b)
	aa = a + b
	return a, b
}

func (x) SampleFunction3(a, b int, c *string, d bool) (aa, bb int) {
	return a, b
}

func (*x) SampleFunction5(log.Logger, *os.File) (aa, bb int) {
	return
}
"#;

fn sources(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(name, source)| (name.to_string(), source.to_string()))
        .collect()
}

#[tokio::test]
async fn test_sample_program_call_graph() {
    let analyzer = Analyzer::new(AnalyzerConfig::default());
    let analysis = analyzer
        .analyze_sources(sources(&[("sample/main.go", SAMPLE)]))
        .await;
    assert!(analysis.failures.is_empty());
    let table = &analysis.table;

    let get_b = table.lookup_id("sample.getB").unwrap();
    let callers = table.inbound(get_b);
    assert_eq!(callers.len(), 3);
    let main = table.lookup_id("sample.main").unwrap();
    assert!(callers.iter().all(|c| c.caller == Some(main)));
    let lines: Vec<u32> = callers
        .iter()
        .map(|c| c.position.as_ref().unwrap().line)
        .collect();
    assert_eq!(lines, vec![15, 16, 17]);

    let multiply = table.lookup("sample.multiply").unwrap();
    assert_eq!(multiply.inbound.len(), 1);
    assert_eq!(multiply.to_string(), "func multiply(a, b int) (result int)");

    // Imported and unknown callees stay unresolved.
    let unresolved: Vec<&str> = table
        .all_calls()
        .filter(|(_, c)| !c.is_resolved())
        .map(|(_, c)| c.callee.as_str())
        .collect();
    assert!(unresolved.contains(&"strings.Contains"));
    assert!(unresolved.contains(&"log.Println"));
    assert!(unresolved.contains(&"sample.sampleFunc1"));

    let contains = table
        .all_calls()
        .map(|(_, c)| c)
        .find(|c| c.callee == "strings.Contains")
        .unwrap();
    assert!(contains.imported);
    assert_eq!(contains.caller, Some(get_b));

    let x = table.structure("sample.x").unwrap();
    assert_eq!(x.kind, TypeKind::Named);
    assert_eq!(x.methods.len(), 3);

    let five = table.lookup("sample.x.SampleFunction5").unwrap();
    assert_eq!(
        five.to_string(),
        "func (*x) SampleFunction5(log.Logger, *os.File) (aa, bb int)"
    );
    assert!(five.source_text.as_deref().unwrap().starts_with("func (*x)"));

    assert_eq!(analysis.link.total, table.call_count());
    assert_eq!(analysis.link.resolved, 5);
    assert_eq!(analysis.table.imports_for("sample/main.go").len(), 4);
}

#[tokio::test]
async fn test_merge_is_independent_of_unit_order() {
    let a = ("a.go", "package p\n\nfunc dup() int {\n\treturn 1\n}\n\nfunc f() {\n\tdup()\n}\n");
    let b = ("b.go", "package p\n\nfunc dup() string {\n\treturn \"\"\n}\n\nfunc g() {\n\tf()\n}\n");
    let c = ("c.go", "package q\n\nfunc h() {\n\tdup()\n}\n");

    let analyzer = Analyzer::new(AnalyzerConfig {
        channel_capacity: 1,
        ..AnalyzerConfig::default()
    });
    let forward = analyzer.analyze_sources(sources(&[a, b, c])).await;
    let backward = analyzer.analyze_sources(sources(&[c, b, a])).await;

    assert_eq!(forward.table, backward.table);
    assert_eq!(forward.link, backward.link);

    // Last unit in name order wins the duplicate identity.
    let dup = forward.table.lookup("p.dup").unwrap();
    assert_eq!(dup.file, "b.go");
    assert_eq!(dup.inbound.len(), 1);
}

#[tokio::test]
async fn test_parse_failure_is_isolated() {
    let good = ("good.go", "package p\n\nfunc ok() {\n\tok()\n}\n");
    let bad = ("bad.go", "package p\n\nfunc broken( {\n");
    let analysis = Analyzer::new(AnalyzerConfig::default())
        .analyze_sources(sources(&[bad, good]))
        .await;

    assert_eq!(analysis.failures.len(), 1);
    assert_eq!(analysis.failures[0].unit, "bad.go");
    assert!(matches!(
        analysis.failures[0].error,
        CallScopeError::Parse { .. }
    ));
    assert_eq!(analysis.table.declaration_count(), 1);
    assert_eq!(analysis.link.resolved, 1);
}

#[tokio::test]
async fn test_many_units_with_small_channel() {
    let units: Vec<(String, String)> = (0..40)
        .map(|i| {
            let next = (i + 1) % 40;
            (
                format!("f{i:02}.go"),
                format!("package p\n\nfunc f{i}() {{\n\tf{next}()\n}}\n"),
            )
        })
        .collect();
    let analysis = Analyzer::new(AnalyzerConfig {
        channel_capacity: 2,
        ..AnalyzerConfig::default()
    })
    .analyze_sources(units)
    .await;

    assert!(analysis.failures.is_empty());
    assert_eq!(analysis.table.declaration_count(), 40);
    assert_eq!(analysis.link.resolved, 40);
    for (id, _) in analysis.table.all_declarations() {
        assert_eq!(analysis.table.inbound(id).len(), 1);
    }
}

#[tokio::test]
async fn test_capture_source_can_be_disabled() {
    let analysis = Analyzer::new(AnalyzerConfig {
        capture_source: false,
        ..AnalyzerConfig::default()
    })
    .analyze_sources(sources(&[("a.go", "package p\n\nfunc f() {}\n")]))
    .await;
    assert!(analysis.table.lookup("p.f").unwrap().source_text.is_none());
}

#[tokio::test]
async fn test_analyze_dir_filters_files() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("cmd/app")).unwrap();
    fs::create_dir_all(root.join("vendor/lib")).unwrap();
    fs::create_dir_all(root.join(".hidden")).unwrap();

    fs::write(
        root.join("cmd/app/main.go"),
        "package main\n\nfunc main() {\n\trun()\n}\n",
    )
    .unwrap();
    fs::write(root.join("cmd/app/run.go"), "package main\n\nfunc run() {}\n").unwrap();
    fs::write(
        root.join("cmd/app/run_test.go"),
        "package main\n\nfunc TestRun() {\n\trun()\n}\n",
    )
    .unwrap();
    fs::write(root.join("vendor/lib/lib.go"), "package lib\n\nfunc Lib() {}\n").unwrap();
    fs::write(root.join(".hidden/x.go"), "package x\n\nfunc X() {}\n").unwrap();
    fs::write(root.join("notes.txt"), "not go").unwrap();

    let config = AnalyzerConfig {
        include_tests: false,
        ..AnalyzerConfig::default()
    };
    let analysis = Analyzer::new(config).analyze_dir(root).await.unwrap();

    assert!(analysis.failures.is_empty());
    assert_eq!(analysis.table.declaration_count(), 2);
    assert!(analysis.table.lookup("lib.Lib").is_none());
    assert!(analysis.table.lookup("x.X").is_none());

    let run = analysis.table.lookup_id("main.run").unwrap();
    let callers = analysis.table.inbound(run);
    assert_eq!(callers.len(), 1);
    assert_eq!(
        callers[0].position.as_ref().unwrap().to_string(),
        "cmd/app/main.go:4"
    );
}

#[tokio::test]
async fn test_analyze_dir_rejects_missing_root() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let err = Analyzer::new(AnalyzerConfig::default())
        .analyze_dir(&missing)
        .await
        .unwrap_err();
    assert!(matches!(err, CallScopeError::File { .. }));
}

#[test]
fn test_analyze_unit_directly() {
    let extractor: Arc<dyn LanguageExtractor> = Arc::new(GoExtractor);
    let unit = analyze_unit(
        extractor.as_ref(),
        "u.go",
        "package u\n\nfunc a() {\n\tb()\n}\n",
        1,
        &WalkOptions::default(),
    )
    .unwrap();
    assert_eq!(unit.package, "u");
    assert_eq!(unit.calls.len(), 1);
    let (id, _) = unit.declaration("a").unwrap();
    assert_eq!(unit.calls[0].caller, Some(id));
    assert!(unit.diagnostics.is_empty());
}

#[tokio::test]
async fn test_repeated_unit_name_is_reported_once() {
    let first = ("x.go", "package p\n\nfunc f() int {\n\treturn 1\n}\n");
    let second = ("x.go", "package p\n\nfunc f() string {\n\treturn \"\"\n}\n");
    let analyzer = Analyzer::new(AnalyzerConfig::default());

    for _ in 0..10 {
        let analysis = analyzer.analyze_sources(sources(&[first, second])).await;
        assert_eq!(analysis.table.lookup("p.f").unwrap().to_string(), "func f() int");
        assert_eq!(analysis.table.declaration_count(), 1);
        assert_eq!(analysis.failures.len(), 1);
        assert_eq!(analysis.failures[0].unit, "x.go");
        assert!(matches!(
            analysis.failures[0].error,
            CallScopeError::File { .. }
        ));
    }
}
