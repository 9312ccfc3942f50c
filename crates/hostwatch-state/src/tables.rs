//! redb table definitions for the hostwatch backend.
//!
//! Values are JSON-serialized rows. Request-log keys combine host and
//! label as `{host}\u{1f}{label}`; failure-log keys are an increasing
//! sequence number so the table behaves as an append-only log.

use redb::TableDefinition;

/// Host status rows keyed by host name.
pub const HOST_STATUS: TableDefinition<&str, &[u8]> = TableDefinition::new("host_status");

/// Latest request sample per `{host}\u{1f}{label}`.
pub const REQUEST_LOG: TableDefinition<&str, &[u8]> = TableDefinition::new("request_log");

/// Failure and recovery records keyed by sequence number.
pub const FAILURE_LOG: TableDefinition<u64, &[u8]> = TableDefinition::new("failure_log");

/// Separator between host and label in request-log keys. Neither part may
/// contain it.
pub const KEY_SEPARATOR: char = '\u{1f}';

/// First character after [`KEY_SEPARATOR`]; bounds a per-host key range.
pub(crate) const KEY_SEPARATOR_NEXT: char = '\u{20}';
