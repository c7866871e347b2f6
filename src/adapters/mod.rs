//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `audit_file`   | AuditSink          | Append-only events file  |
//! | `config_file`  | ConfigProvider     | `config.json`            |
//! | `console`      | (control surface)  | stdin / stdout           |
//! | `log_sink`     | AuditSink          | Process log              |
//!
//! Sensor banks live in [`crate::sensors`], alert channels in
//! [`crate::alerts`].

pub mod audit_file;
pub mod config_file;
pub mod console;
pub mod log_sink;
