// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reachability probing over the secure-shell client library (§4.1).
//!
//! Honors `~/.ssh/config` host aliases (`HostName`/`Port`/`User`) and
//! verifies the server's host key against `~/.ssh/known_hosts`, trusting
//! and recording a key on first contact the way `ssh` itself does.

use rr_core::{ProbeOutcome, ProbeResult};
use std::io;
use std::net::TcpStream;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Dial `alias` (a `host:port` or bare hostname, which defaults to port 22,
/// resolved through `~/.ssh/config` aliasing) and classify the outcome
/// within `timeout`.
///
/// This blocks the calling thread on network I/O and must be driven via
/// `tokio::task::spawn_blocking` by callers on the async runtime.
pub fn probe_blocking(alias: &str, timeout: Duration) -> ProbeResult {
    let started = Instant::now();
    let target = resolve_ssh_config(alias, &load_ssh_config());
    let addr = normalize_addr(&target.hostname, target.port);

    let socket_addr = match addr.parse() {
        Ok(a) => a,
        Err(_) => match std::net::ToSocketAddrs::to_socket_addrs(&addr) {
            Ok(mut it) => match it.next() {
                Some(a) => a,
                None => return ProbeResult::failed(alias, ProbeOutcome::DnsFailure, "name did not resolve"),
            },
            Err(_) => return ProbeResult::failed(alias, ProbeOutcome::DnsFailure, "name did not resolve"),
        },
    };

    let stream = match TcpStream::connect_timeout(&socket_addr, timeout) {
        Ok(s) => s,
        Err(e) => return ProbeResult::failed(alias, classify_dial_error(&e), e.to_string()),
    };
    if stream.set_read_timeout(Some(timeout)).is_err() || stream.set_write_timeout(Some(timeout)).is_err() {
        return ProbeResult::failed(alias, ProbeOutcome::Unknown, "failed to set socket timeouts");
    }

    let mut session = match ssh2::Session::new() {
        Ok(s) => s,
        Err(e) => return ProbeResult::failed(alias, ProbeOutcome::Unknown, e.to_string()),
    };
    session.set_tcp_stream(stream);

    if let Err(e) = session.handshake() {
        return ProbeResult::failed(alias, classify_handshake_error(&e), e.to_string());
    }

    if let Err((outcome, reason)) = verify_host_key(&session, &target.hostname) {
        return ProbeResult::failed(alias, outcome, reason);
    }

    let user = target.user.unwrap_or_else(current_user);
    if let Err(e) = session.userauth_agent(&user) {
        return ProbeResult::failed(alias, ProbeOutcome::AuthFailed, e.to_string());
    }
    if !session.authenticated() {
        return ProbeResult::failed(alias, ProbeOutcome::AuthFailed, "agent authentication did not complete");
    }

    ProbeResult::ok(alias, started.elapsed())
}

/// Async wrapper around [`probe_blocking`].
pub async fn probe(alias: &str, timeout: Duration) -> ProbeResult {
    let owned = alias.to_string();
    let for_panic = owned.clone();
    tokio::task::spawn_blocking(move || probe_blocking(&owned, timeout))
        .await
        .unwrap_or_else(|_| ProbeResult::failed(for_panic, ProbeOutcome::Unknown, "probe task panicked"))
}

/// Probe every alias concurrently; results are returned in input order (§4.1).
pub async fn probe_all(aliases: &[String], timeout: Duration) -> Vec<ProbeResult> {
    let handles: Vec<_> = aliases
        .iter()
        .map(|alias| {
            let alias = alias.clone();
            tokio::spawn(async move { probe(&alias, timeout).await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (alias, handle) in aliases.iter().zip(handles) {
        let result = handle
            .await
            .unwrap_or_else(|_| ProbeResult::failed(alias.clone(), ProbeOutcome::Unknown, "probe task panicked"));
        results.push(result);
    }
    results
}

fn normalize_addr(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}

fn current_user() -> String {
    std::env::var("USER").unwrap_or_else(|_| "root".to_string())
}

fn classify_dial_error(e: &io::Error) -> ProbeOutcome {
    use io::ErrorKind::*;
    match e.kind() {
        TimedOut => ProbeOutcome::Timeout,
        ConnectionRefused => ProbeOutcome::Refused,
        _ => ProbeOutcome::Unreachable,
    }
}

fn classify_handshake_error(e: &ssh2::Error) -> ProbeOutcome {
    match e.code() {
        ssh2::ErrorCode::Session(-18) => ProbeOutcome::HostKeyMismatch, // LIBSSH2_ERROR_HOSTKEY_VERIFY
        _ => ProbeOutcome::Unknown,
    }
}

/// Verify the just-negotiated host key against `~/.ssh/known_hosts`,
/// trusting (and recording) it on first contact like `ssh` itself does.
/// A missing or unreadable `known_hosts` file is treated the same as
/// "not found" rather than a hard failure.
fn verify_host_key(session: &ssh2::Session, host: &str) -> Result<(), (ProbeOutcome, String)> {
    let mut known_hosts = session.known_hosts().map_err(|e| (ProbeOutcome::Unknown, e.to_string()))?;
    let path = known_hosts_path();
    if let Some(path) = &path {
        let _ = known_hosts.read_file(path, ssh2::KnownHostFileKind::OpenSSH);
    }

    let Some((key, key_type)) = session.host_key() else {
        return Ok(());
    };

    match known_hosts.check(host, key) {
        ssh2::CheckResult::Match => Ok(()),
        ssh2::CheckResult::NotFound => {
            if let Some(path) = &path {
                if known_hosts.add(host, key, "", key_type.into()).is_ok() {
                    let _ = known_hosts.write_file(path, ssh2::KnownHostFileKind::OpenSSH);
                }
            }
            Ok(())
        }
        ssh2::CheckResult::Mismatch => {
            Err((ProbeOutcome::HostKeyMismatch, format!("host key for {host} does not match known_hosts")))
        }
        ssh2::CheckResult::Failure => Err((ProbeOutcome::Unknown, "known_hosts check failed".to_string())),
    }
}

fn known_hosts_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".ssh").join("known_hosts"))
}

/// A parsed `Host` block from `~/.ssh/config`.
#[derive(Debug, Default, Clone, PartialEq)]
struct SshConfigEntry {
    host_pattern: String,
    hostname: Option<String>,
    port: Option<u16>,
    user: Option<String>,
}

/// The effective (hostname, port, user) to dial after applying any matching
/// `~/.ssh/config` entries, later entries overriding earlier ones (matching
/// `ssh`'s first-match-wins-per-key behavior closely enough for probing).
struct ResolvedTarget {
    hostname: String,
    port: u16,
    user: Option<String>,
}

fn resolve_ssh_config(alias: &str, entries: &[SshConfigEntry]) -> ResolvedTarget {
    let (host, port) = split_host_port(alias);
    let mut resolved = ResolvedTarget { hostname: host.clone(), port, user: None };
    for entry in entries {
        if !matches_host_pattern(&entry.host_pattern, &host) {
            continue;
        }
        if let Some(hostname) = &entry.hostname {
            resolved.hostname = hostname.clone();
        }
        if let Some(port) = entry.port {
            resolved.port = port;
        }
        if let Some(user) = &entry.user {
            resolved.user = Some(user.clone());
        }
    }
    resolved
}

fn split_host_port(alias: &str) -> (String, u16) {
    if let Some((host, port)) = alias.rsplit_once(':') {
        if let Ok(port) = port.parse() {
            return (host.to_string(), port);
        }
    }
    (alias.to_string(), 22)
}

/// `ssh_config(5)` glob patterns are a strict subset we support here: a bare
/// `*` (match everything) or a `prefix*` wildcard; anything else is an exact,
/// case-insensitive match.
fn matches_host_pattern(pattern: &str, host: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => host.starts_with(prefix),
        None => pattern.eq_ignore_ascii_case(host),
    }
}

fn load_ssh_config() -> Vec<SshConfigEntry> {
    let Some(home) = dirs::home_dir() else { return Vec::new() };
    let path = home.join(".ssh").join("config");
    match std::fs::read_to_string(&path) {
        Ok(contents) => parse_ssh_config(&contents),
        Err(_) => Vec::new(),
    }
}

fn parse_ssh_config(contents: &str) -> Vec<SshConfigEntry> {
    let mut entries = Vec::new();
    let mut current: Option<SshConfigEntry> = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let Some(key) = parts.next() else { continue };
        let value = parts.next().unwrap_or("").trim();

        match key.to_ascii_lowercase().as_str() {
            "host" => {
                if let Some(entry) = current.take() {
                    entries.push(entry);
                }
                current = Some(SshConfigEntry { host_pattern: value.to_string(), ..Default::default() });
            }
            "hostname" => {
                if let Some(entry) = current.as_mut() {
                    entry.hostname = Some(value.to_string());
                }
            }
            "port" => {
                if let Some(entry) = current.as_mut() {
                    entry.port = value.parse().ok();
                }
            }
            "user" => {
                if let Some(entry) = current.as_mut() {
                    entry.user = Some(value.to_string());
                }
            }
            _ => {}
        }
    }
    if let Some(entry) = current.take() {
        entries.push(entry);
    }
    entries
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
