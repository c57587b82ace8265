// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use indexmap::IndexMap;
use rr_core::ProbeResult;

fn pool() -> IndexMap<String, HostEntry> {
    let mut hosts = IndexMap::new();
    hosts.insert("build01".to_string(), {
        let mut e = HostEntry::new(vec!["10.0.0.1".into()], "/srv/build01");
        e.tags = vec!["ci".into()];
        e
    });
    hosts.insert("build02".to_string(), {
        let mut e = HostEntry::new(vec!["10.0.0.2".into()], "/srv/build02");
        e.tags = vec!["ci".into()];
        e
    });
    hosts
}

#[test]
fn filter_by_explicit_host_name_yields_single_candidate() {
    let prefs = SelectPreferences { host: Some("build02".into()), ..Default::default() };
    let candidates = filter(&pool(), &prefs);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].0, "build02");
}

#[test]
fn filter_by_tag_yields_all_matches() {
    let prefs = SelectPreferences { tag: Some("ci".into()), ..Default::default() };
    let candidates = filter(&pool(), &prefs);
    assert_eq!(candidates.len(), 2);
}

#[test]
fn filter_with_unknown_tag_yields_nothing() {
    let prefs = SelectPreferences { tag: Some("nope".into()), ..Default::default() };
    assert!(filter(&pool(), &prefs).is_empty());
}

#[test]
fn best_alias_picks_lowest_latency() {
    let probed = vec![
        ProbeResult::ok("a", Duration::from_millis(50)),
        ProbeResult::ok("b", Duration::from_millis(10)),
    ];
    let (alias, latency) = best_alias(&probed).unwrap();
    assert_eq!(alias, "b");
    assert_eq!(latency, Duration::from_millis(10));
}

#[test]
fn best_alias_breaks_ties_by_declaration_order() {
    let probed = vec![
        ProbeResult::ok("first", Duration::from_millis(10)),
        ProbeResult::ok("second", Duration::from_millis(10)),
    ];
    let (alias, _) = best_alias(&probed).unwrap();
    assert_eq!(alias, "first");
}

#[test]
fn best_alias_ignores_failed_probes() {
    let probed = vec![ProbeResult::failed("a", ProbeOutcome::Refused, "refused")];
    assert!(best_alias(&probed).is_none());
}

#[tokio::test]
async fn choose_candidate_is_ambiguous_without_picker() {
    let selector = Selector::new(Duration::from_secs(30));
    let prefs = SelectPreferences { tag: Some("ci".into()), ..Default::default() };
    let candidates = filter(&pool(), &prefs);
    let result = selector.choose_candidate(&candidates, &prefs);
    assert!(result.is_err());
}

#[tokio::test]
async fn choose_candidate_uses_picker_when_ambiguous() {
    let selector = Selector::new(Duration::from_secs(30));
    let prefs = SelectPreferences {
        tag: Some("ci".into()),
        picker: Some(Arc::new(|names: &[String]| names.last().cloned())),
        ..Default::default()
    };
    let candidates = filter(&pool(), &prefs);
    let chosen = selector.choose_candidate(&candidates, &prefs).unwrap();
    assert_eq!(chosen, "build02");
}

#[test]
fn cache_freshness_respects_ttl() {
    let selector = Selector::new(Duration::from_millis(20));
    selector.cache.write().insert(
        "a".to_string(),
        CachedProbe { outcome: ProbeOutcome::Ok, latency: Duration::from_millis(5), checked_at: Instant::now() },
    );
    assert!(selector.cached_fresh("a"));
    std::thread::sleep(Duration::from_millis(30));
    assert!(!selector.cached_fresh("a"));
}

#[test]
fn invalidate_removes_cached_entry() {
    let selector = Selector::new(Duration::from_secs(30));
    selector.cache.write().insert(
        "a".to_string(),
        CachedProbe { outcome: ProbeOutcome::Ok, latency: Duration::from_millis(5), checked_at: Instant::now() },
    );
    selector.invalidate("a");
    assert!(!selector.cached_fresh("a"));
}
