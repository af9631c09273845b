//! Pure rendering of a service into systemd unit text.

use crate::model::Service;
use std::fmt::Write;

/// Renders a service to its runtime unit representation.
///
/// Returns the empty string when the service carries no start command,
/// which callers treat as "cannot render". The bootstrap path escalates
/// that to a hard error.
pub fn render_unit(service: &Service) -> String {
    if service.start.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    // write! to a String cannot fail
    let _ = writeln!(out, "[Unit]");
    let _ = writeln!(out, "Description=noded managed service {}", service.name);
    if !service.after.is_empty() {
        let _ = writeln!(out, "After={}", service.after.join(" "));
    }
    if !service.requires.is_empty() {
        let _ = writeln!(out, "Requires={}", service.requires.join(" "));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "[Service]");
    if let Some(ref pid_file) = service.pid_file {
        let _ = writeln!(out, "Type=forking");
        let _ = writeln!(out, "PIDFile={}", pid_file);
    }
    let _ = writeln!(out, "ExecStart={}", service.start);
    if let Some(ref stop) = service.stop {
        let _ = writeln!(out, "ExecStop={}", stop);
    }
    if let Some(ref restart) = service.restart {
        let _ = writeln!(out, "ExecReload={}", restart);
    }
    let _ = writeln!(out, "Restart=on-failure");
    let _ = writeln!(out, "RestartSec=10");

    let _ = writeln!(out);
    let _ = writeln!(out, "[Install]");
    let _ = writeln!(out, "WantedBy=multi-user.target");

    out
}
