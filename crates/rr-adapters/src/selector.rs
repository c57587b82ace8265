// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host selection: filter the pool, probe candidate aliases, pick the
//! fastest reachable one, and open a connection (§4.2).

use crate::connection::Connection;
use crate::probe;
use parking_lot::RwLock;
use rr_core::{HostEntry, ProbeOutcome, RrError, RrResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Caller preferences narrowing host selection.
pub struct SelectPreferences {
    pub host: Option<String>,
    pub tag: Option<String>,
    pub probe_timeout: Duration,
    pub local_fallback: bool,
    /// External picker invoked when more than one candidate matches and the
    /// caller permits interactivity. The Selector never renders a TUI itself.
    pub picker: Option<Arc<dyn Fn(&[String]) -> Option<String> + Send + Sync>>,
}

impl Default for SelectPreferences {
    fn default() -> Self {
        Self { host: None, tag: None, probe_timeout: Duration::from_secs(5), local_fallback: false, picker: None }
    }
}

#[derive(Clone, Copy)]
struct CachedProbe {
    outcome: ProbeOutcome,
    latency: Duration,
    checked_at: Instant,
}

/// Caches recent probe outcomes keyed by alias with a TTL, invalidated
/// explicitly on connection failure observed in later phases (§4.2).
pub struct Selector {
    cache: RwLock<HashMap<String, CachedProbe>>,
    ttl: Duration,
}

impl Selector {
    pub fn new(ttl: Duration) -> Self {
        Self { cache: RwLock::new(HashMap::new()), ttl }
    }

    pub fn invalidate(&self, alias: &str) {
        self.cache.write().remove(alias);
    }

    /// Run the full selection algorithm and return the chosen host name and
    /// an open connection.
    pub async fn select(
        &self,
        hosts: &indexmap::IndexMap<String, HostEntry>,
        prefs: &SelectPreferences,
    ) -> RrResult<(String, Connection)> {
        let candidates = filter(hosts, prefs);
        let chosen_name = self.choose_candidate(&candidates, prefs)?;
        let entry = hosts.get(&chosen_name).expect("chosen candidate came from hosts");

        let probed = self.probe_aliases(&entry.aliases, prefs.probe_timeout).await;
        match best_alias(&probed) {
            Some((alias, latency)) => {
                tracing::info!(host = %chosen_name, alias = %alias, latency_ms = latency.as_millis() as u64, "host selected");
                let conn = Connection::dial(&chosen_name, alias, &entry.dir, prefs.probe_timeout).map_err(|e| {
                    self.invalidate(alias);
                    RrError::host_selection(&chosen_name, &probed_pairs(&entry.aliases, &probed))
                        .with_cause(std::io::Error::other(e.to_string()))
                })?;
                Ok((chosen_name, conn))
            }
            None if prefs.local_fallback => {
                tracing::warn!(host = %chosen_name, "no reachable alias, falling back to local shell");
                Ok((chosen_name, Connection::Local))
            }
            None => Err(RrError::host_selection(&chosen_name, &probed_pairs(&entry.aliases, &probed))),
        }
    }

    fn choose_candidate(&self, candidates: &[(String, HostEntry)], prefs: &SelectPreferences) -> RrResult<String> {
        match candidates.len() {
            0 => Err(RrError::config(match (&prefs.host, &prefs.tag) {
                (Some(h), _) => format!("no host named '{h}' configured"),
                (None, Some(t)) => format!("no host tagged '{t}' configured"),
                (None, None) => "no hosts configured".to_string(),
            })),
            1 => Ok(candidates[0].0.clone()),
            _ => {
                let names: Vec<String> = candidates.iter().map(|(n, _)| n.clone()).collect();
                match &prefs.picker {
                    Some(picker) => picker(&names).ok_or_else(|| {
                        RrError::config("host selection cancelled").with_suggestion("pass --host to disambiguate")
                    }),
                    None => Err(RrError::config(format!(
                        "ambiguous host selection among [{}]",
                        names.join(", ")
                    ))
                    .with_suggestion("pass --host to disambiguate")),
                }
            }
        }
    }

    async fn probe_aliases(&self, aliases: &[String], timeout: Duration) -> Vec<rr_core::ProbeResult> {
        let to_probe: Vec<String> = aliases
            .iter()
            .filter(|a| !self.cached_fresh(a))
            .cloned()
            .collect();
        if !to_probe.is_empty() {
            let fresh = probe::probe_all(&to_probe, timeout).await;
            let mut cache = self.cache.write();
            for result in &fresh {
                cache.insert(
                    result.alias.clone(),
                    CachedProbe { outcome: result.outcome, latency: result.latency, checked_at: Instant::now() },
                );
            }
        }
        let cache = self.cache.read();
        aliases
            .iter()
            .map(|alias| {
                let cached = cache.get(alias).expect("probed or already cached");
                if cached.outcome.is_ok() {
                    rr_core::ProbeResult::ok(alias.clone(), cached.latency)
                } else {
                    rr_core::ProbeResult::failed(alias.clone(), cached.outcome, "cached probe failure")
                }
            })
            .collect()
    }

    fn cached_fresh(&self, alias: &str) -> bool {
        self.cache
            .read()
            .get(alias)
            .map(|c| c.checked_at.elapsed() < self.ttl)
            .unwrap_or(false)
    }
}

fn filter(hosts: &indexmap::IndexMap<String, HostEntry>, prefs: &SelectPreferences) -> Vec<(String, HostEntry)> {
    hosts
        .iter()
        .filter(|(name, entry)| {
            let name_ok = prefs.host.as_deref().map(|h| h == name.as_str()).unwrap_or(true);
            let tag_ok = prefs.tag.as_deref().map(|t| entry.has_tag(t)).unwrap_or(true);
            name_ok && tag_ok
        })
        .map(|(n, e)| (n.clone(), e.clone()))
        .collect()
}

/// Lowest-latency alias among successful probes, ties broken by declaration
/// order (the order `probed` was produced in, which mirrors `aliases`).
fn best_alias(probed: &[rr_core::ProbeResult]) -> Option<(&str, Duration)> {
    probed
        .iter()
        .filter(|r| r.outcome.is_ok())
        .min_by_key(|r| r.latency)
        .map(|r| (r.alias.as_str(), r.latency))
}

fn probed_pairs(aliases: &[String], probed: &[rr_core::ProbeResult]) -> Vec<(String, ProbeOutcome)> {
    aliases
        .iter()
        .zip(probed.iter())
        .map(|(alias, result)| (alias.clone(), result.outcome))
        .collect()
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
