use chrono::Local;
use lazy_static::lazy_static;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

lazy_static! {
    static ref AUDIT_FILE: Mutex<Option<File>> = Mutex::new(None);
}

/// Initialize the verdict audit log
pub fn init_audit_log() -> anyhow::Result<()> {
    let log_path = get_audit_path();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let mut audit_file = AUDIT_FILE.lock().unwrap();
    *audit_file = Some(file);

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    if let Some(ref mut f) = *audit_file {
        let _ = writeln!(f, "\n=== Omniseal session started at {} ===\n", timestamp);
    }

    Ok(())
}

/// Get the audit log path
fn get_audit_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("omniseal").join("omniseal.log")
    } else {
        PathBuf::from("omniseal.log")
    }
}

/// Append one line to the audit log
pub fn audit(event: &str, detail: &str) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let formatted = format!("[{}] {}: {}", timestamp, event, detail);

    let mut audit_file = AUDIT_FILE.lock().unwrap();
    if let Some(ref mut f) = *audit_file {
        let _ = writeln!(f, "{}", formatted);
        let _ = f.flush();
    }
}
