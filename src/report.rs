use std::collections::BTreeMap;

use serde::Serialize;

use crate::analyzer::Analysis;
use crate::graph::DeclarationTable;
use crate::types::*;

/// Serializable snapshot of a linked call graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphReport {
    pub summary: Summary,
    pub declarations: Vec<DeclarationEntry>,
    pub structures: Vec<StructureEntry>,
    /// Call sites that did not link to any declaration.
    pub unresolved: Vec<CallEntry>,
    pub failures: Vec<FailureEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub declarations: usize,
    pub structures: usize,
    pub calls: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeclarationEntry {
    pub identifier: String,
    pub signature: String,
    pub file: String,
    pub line: u32,
    pub callers: Vec<CallEntry>,
    pub callees: Vec<CallEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructureEntry {
    pub identifier: String,
    pub kind: String,
    pub fields: Vec<String>,
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallEntry {
    /// Callee with rendered arguments, e.g. `p.getA(x)`.
    pub call: String,
    pub caller: Option<String>,
    pub target: Option<String>,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEntry {
    pub unit: String,
    pub error: String,
}

impl GraphReport {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let mut report = Self::from_table(&analysis.table);
        report.failures = analysis
            .failures
            .iter()
            .map(|f| FailureEntry {
                unit: f.unit.clone(),
                error: f.error.to_string(),
            })
            .collect();
        report.summary.failures = report.failures.len();
        report.diagnostics = analysis.diagnostics.clone();
        report
    }

    pub fn from_table(table: &DeclarationTable) -> Self {
        let declarations: Vec<DeclarationEntry> = table
            .sorted_declarations()
            .into_iter()
            .map(|(id, decl)| declaration_entry(table, id, decl))
            .collect();

        let mut structures: Vec<StructureEntry> = table
            .all_structures()
            .iter()
            .map(|s| StructureEntry {
                identifier: s.identifier(),
                kind: s.kind.as_str().to_string(),
                fields: s.fields.iter().map(|f| f.to_string()).collect(),
                methods: s
                    .methods
                    .iter()
                    .filter_map(|m| table.get(*m).map(|d| d.to_string()))
                    .collect(),
            })
            .collect();
        structures.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        let unresolved: Vec<CallEntry> = table
            .all_calls()
            .filter(|(_, site)| !site.is_resolved())
            .map(|(_, site)| call_entry(table, site))
            .collect();

        let calls = table.call_count();
        Self {
            summary: Summary {
                declarations: declarations.len(),
                structures: structures.len(),
                calls,
                resolved: calls - unresolved.len(),
                unresolved: unresolved.len(),
                failures: 0,
            },
            declarations,
            structures,
            unresolved,
            failures: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

fn declaration_entry(table: &DeclarationTable, id: DeclId, decl: &Declaration) -> DeclarationEntry {
    DeclarationEntry {
        identifier: decl.identifier(),
        signature: decl.to_string(),
        file: decl.file.clone(),
        line: declaration_line(table, decl),
        callers: table
            .inbound(id)
            .into_iter()
            .map(|site| call_entry(table, site))
            .collect(),
        callees: table
            .outbound(id)
            .into_iter()
            .map(|site| call_entry(table, site))
            .collect(),
    }
}

fn call_entry(table: &DeclarationTable, site: &CallSite) -> CallEntry {
    let name = |id: Option<DeclId>| id.and_then(|d| table.get(d)).map(|d| d.identifier());
    CallEntry {
        call: site.to_string(),
        caller: name(site.caller),
        target: name(site.resolved),
        position: site.position.clone(),
    }
}

fn declaration_line(table: &DeclarationTable, decl: &Declaration) -> u32 {
    table
        .source_map()
        .position(decl.span.start)
        .map(|p| p.line)
        .unwrap_or(0)
}

/// Formats a [`GraphReport`] as a Markdown document.
pub fn format_report_as_markdown(report: &GraphReport) -> String {
    let mut out = String::new();
    let s = &report.summary;

    out.push_str("## Call Graph\n");
    out.push_str(&format!(
        "**Declarations:** {} | **Calls:** {} ({} resolved, {} unresolved) | **Failed units:** {}\n\n",
        s.declarations, s.calls, s.resolved, s.unresolved, s.failures
    ));

    out.push_str("### Declarations\n");
    if report.declarations.is_empty() {
        out.push_str("_No declarations found._\n\n");
    } else {
        // Group by file
        let mut by_file: BTreeMap<&str, Vec<&DeclarationEntry>> = BTreeMap::new();
        for entry in &report.declarations {
            by_file.entry(&entry.file).or_default().push(entry);
        }
        for (file, entries) in by_file {
            out.push_str(&format!("#### {}\n", file));
            for entry in entries {
                out.push_str(&format!(
                    "- **{}** (line {}) - {} caller(s), {} call(s)\n",
                    entry.identifier,
                    entry.line,
                    entry.callers.len(),
                    entry.callees.len()
                ));
                out.push_str(&format!("  `{}`\n", entry.signature));
                for caller in &entry.callers {
                    out.push_str(&format!("  - called from {}\n", describe_call(caller)));
                }
            }
            out.push('\n');
        }
    }

    if !report.structures.is_empty() {
        out.push_str("### Types\n");
        for st in &report.structures {
            out.push_str(&format!("- **{}** ({})", st.identifier, st.kind));
            if !st.methods.is_empty() {
                out.push_str(&format!(": {}", st.methods.join("; ")));
            }
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str("### Unresolved Calls\n");
    if report.unresolved.is_empty() {
        out.push_str("_All calls resolved._\n\n");
    } else {
        for call in &report.unresolved {
            out.push_str(&format!("- `{}` in {}\n", call.call, describe_call(call)));
        }
        out.push('\n');
    }

    if !report.failures.is_empty() {
        out.push_str("### Failed Units\n");
        for failure in &report.failures {
            out.push_str(&format!("- {}: {}\n", failure.unit, failure.error));
        }
        out.push('\n');
    }

    out
}

/// Formats a [`GraphReport`] as pretty-printed JSON.
pub fn format_report_as_json(report: &GraphReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_default()
}

/// Formats caller/callee query results as a Markdown list.
pub fn format_related_as_markdown(
    table: &DeclarationTable,
    heading: &str,
    related: &[(DeclId, CallId)],
) -> String {
    let mut out = format!("### {}\n", heading);
    if related.is_empty() {
        out.push_str("_None._\n");
        return out;
    }
    for (decl, call) in related {
        let Some(decl) = table.get(*decl) else {
            continue;
        };
        let location = table
            .call(*call)
            .and_then(|site| site.position.as_ref())
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        out.push_str(&format!(
            "- **{}** via {}\n  `{}`\n",
            decl.identifier(),
            location,
            decl
        ));
    }
    out
}

/// Formats caller/callee query results as JSON call entries.
pub fn format_related_as_json(table: &DeclarationTable, related: &[(DeclId, CallId)]) -> String {
    let entries: Vec<CallEntry> = related
        .iter()
        .filter_map(|(_, call)| table.call(*call))
        .map(|site| call_entry(table, site))
        .collect();
    serde_json::to_string_pretty(&entries).unwrap_or_default()
}

/// Formats a list of declarations, one per line, with their location.
pub fn format_declarations_as_markdown(
    table: &DeclarationTable,
    heading: &str,
    declarations: &[(DeclId, &Declaration)],
) -> String {
    let mut out = format!("### {}\n", heading);
    if declarations.is_empty() {
        out.push_str("_None._\n");
        return out;
    }
    for (_, decl) in declarations {
        out.push_str(&format!(
            "- **{}** - {}:{}\n",
            decl.identifier(),
            decl.file,
            declaration_line(table, decl)
        ));
    }
    out
}

fn describe_call(call: &CallEntry) -> String {
    let caller = call.caller.as_deref().unwrap_or("package scope");
    match &call.position {
        Some(position) => format!("{} ({})", caller, position),
        None => caller.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::config::AnalyzerConfig;

    const SOURCE: &str = "package p\n\nfunc main() {\n\tgetA()\n\tfmt.Println()\n}\n\nfunc getA() {}\n";

    async fn analysis() -> Analysis {
        Analyzer::new(AnalyzerConfig::default())
            .analyze_sources(vec![("main.go".to_string(), SOURCE.to_string())])
            .await
    }

    #[tokio::test]
    async fn test_markdown_contains_declarations_and_callers() {
        let report = GraphReport::from_analysis(&analysis().await);
        let md = format_report_as_markdown(&report);
        assert!(md.contains("## Call Graph"));
        assert!(md.contains("#### main.go"));
        assert!(md.contains("**p.getA** (line 8)"));
        assert!(md.contains("called from p.main (main.go:4)"));
        assert!(md.contains("`fmt.Println()`"));
    }

    #[tokio::test]
    async fn test_json_roundtrip() {
        let report = GraphReport::from_analysis(&analysis().await);
        let json = format_report_as_json(&report);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["summary"]["declarations"], 2);
        assert_eq!(parsed["summary"]["resolved"], 1);
        assert_eq!(parsed["unresolved"][0]["call"], "fmt.Println()");
        assert_eq!(parsed["declarations"][0]["identifier"], "p.getA");
    }

    #[test]
    fn test_empty_table_markdown() {
        let report = GraphReport::from_table(&DeclarationTable::new());
        let md = format_report_as_markdown(&report);
        assert!(md.contains("_No declarations found._"));
        assert!(md.contains("_All calls resolved._"));
    }
}
