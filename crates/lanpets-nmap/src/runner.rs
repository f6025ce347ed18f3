//! Runs `nmap` on a dedicated OS thread so a multi-minute scan never ties
//! up a tokio worker thread, mirroring the original's one-thread-per-scan
//! model (a single long-lived `nmap` invocation, not one process per host).

use std::collections::HashMap;
use std::process::Command;
use std::sync::{Arc, Mutex};

use crate::xml::{ScanHost, parse_scan_xml};

struct RunnerState {
    in_progress: bool,
    result: Option<Result<HashMap<String, ScanHost>, String>>,
}

#[derive(Clone)]
pub struct NmapRunner {
    state: Arc<Mutex<RunnerState>>,
}

impl NmapRunner {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(RunnerState { in_progress: false, result: None })) }
    }

    pub fn in_progress(&self) -> bool {
        self.state.lock().expect("nmap runner mutex poisoned").in_progress
    }

    /// Starts a scan over `ip_ranges` (nmap target syntax, e.g.
    /// `192.168.1.0/24`). Returns `false` without starting anything if a
    /// scan is already running — overlapping scans are rejected at the
    /// source, the caller only needs to log it.
    pub fn scan_ranges(&self, ip_ranges: &str, nmap_flags: Option<&str>, use_sudo: bool) -> bool {
        let mut guard = self.state.lock().expect("nmap runner mutex poisoned");
        if guard.in_progress {
            return false;
        }
        guard.in_progress = true;
        drop(guard);

        let state = self.state.clone();
        let ip_ranges = ip_ranges.to_string();
        let nmap_flags = nmap_flags.map(str::to_string);
        std::thread::Builder::new()
            .name("nmap-runner".into())
            .spawn(move || {
                let result = run_nmap_blocking(&ip_ranges, nmap_flags.as_deref(), use_sudo);
                let mut guard = state.lock().expect("nmap runner mutex poisoned");
                guard.result = Some(result);
                guard.in_progress = false;
            })
            .expect("spawn nmap runner thread");
        true
    }

    /// Takes the last completed scan's result, if any, clearing it so the
    /// next `check()` doesn't re-ingest it.
    pub fn take_result(&self) -> Option<Result<HashMap<String, ScanHost>, String>> {
        self.state.lock().expect("nmap runner mutex poisoned").result.take()
    }
}

impl Default for NmapRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn run_nmap_blocking(ip_ranges: &str, nmap_flags: Option<&str>, use_sudo: bool) -> Result<HashMap<String, ScanHost>, String> {
    let mut command = if use_sudo {
        let mut c = Command::new("sudo");
        c.arg("nmap");
        c
    } else {
        Command::new("nmap")
    };
    command.arg("-oX").arg("-");
    match nmap_flags {
        Some(flags) => command.args(flags.split_whitespace()),
        None => command.arg("-sn"),
    };
    command.arg(ip_ranges);

    let output = command.output().map_err(|error| format!("spawn nmap: {error}"))?;
    if !output.status.success() {
        return Err(format!("nmap exited with {}: {}", output.status, String::from_utf8_lossy(&output.stderr)));
    }
    let xml = String::from_utf8(output.stdout).map_err(|error| format!("nmap output not utf8: {error}"))?;
    parse_scan_xml(&xml)
}
