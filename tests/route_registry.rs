use std::collections::BTreeSet;

use wikiwalkthrough::api::openapi::ROUTES;

/// 从 handler 源码中收集 (METHOD, path)
fn routes_in_source() -> BTreeSet<(String, String)> {
    let api_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/api");
    let route_re = regex::Regex::new(r#"\.route\(\s*"([^"]+)",\s*(.+)\)\s*$"#).expect("route regex");
    let method_re = regex::Regex::new(r"(?:^|[\s.(])(get|post|put|patch|delete)\(").expect("method regex");

    let mut found = BTreeSet::new();
    for entry in std::fs::read_dir(&api_dir).expect("read src/api") {
        let path = entry.expect("dir entry").path();
        if path.extension().and_then(|e| e.to_str()) != Some("rs") {
            continue;
        }
        let src = std::fs::read_to_string(&path).expect("read router source");
        for line in src.lines() {
            let Some(cap) = route_re.captures(line) else {
                continue;
            };
            for m in method_re.captures_iter(&cap[2]) {
                found.insert((m[1].to_uppercase(), cap[1].to_string()));
            }
        }
    }
    found
}

#[test]
fn registered_routes_match_router_source() {
    let source = routes_in_source();
    let documented: BTreeSet<(String, String)> = ROUTES
        .iter()
        .map(|r| (r.method.to_string(), r.path.to_string()))
        .collect();

    assert!(!source.is_empty(), "no routes found in src/api");
    assert_eq!(source, documented, "route registry drift");
}

#[test]
fn every_route_has_summary_and_tag() {
    for r in ROUTES {
        assert!(!r.summary.trim().is_empty(), "missing summary for {} {}", r.method, r.path);
        assert!(!r.tag.trim().is_empty(), "missing tag for {} {}", r.method, r.path);
    }
}
