// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn local_connection_reports_local_label() {
    let conn = Connection::Local;
    assert!(conn.is_local());
    assert_eq!(conn.host_label(), "local");
    assert_eq!(conn.alias(), None);
    assert_eq!(conn.remote_dir(), None);
}

#[test]
fn dial_to_closed_port_fails_fast() {
    let result = Connection::dial("build01", "127.0.0.1:1", "/srv/proj", Duration::from_millis(200));
    assert!(result.is_err());
}
