//! Linux fallbacks for minimal container images
//!
//! Audit jobs often run in images without procps or coreutils. These helpers
//! answer the two most common audit command shapes (`ps ... | grep <name>`
//! and `stat ...`) straight from the kernel's view of the system.

use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// List command lines of processes whose cmdline contains `target`
///
/// Entries are visited in ascending PID order. Unreadable entries (the
/// process exited, or access is denied) are skipped.
pub fn scan_proc(root: &Path, target: &str) -> String {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => return format!("Error reading /proc fallback: {}", e),
    };

    let mut pids: Vec<(u64, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some((name.parse().ok()?, entry.path()))
        })
        .collect();
    pids.sort_by_key(|(pid, _)| *pid);

    let matches: Vec<String> = pids
        .iter()
        .filter_map(|(_, dir)| read_cmdline(dir))
        .filter(|cmdline| cmdline.contains(target))
        .collect();

    if matches.is_empty() {
        format!("No {} process found in /proc", target)
    } else {
        matches.join("\n")
    }
}

fn read_cmdline(pid_dir: &Path) -> Option<String> {
    let raw = fs::read(pid_dir.join("cmdline")).ok()?;
    Some(
        String::from_utf8_lossy(&raw)
            .replace('\0', " ")
            .trim()
            .to_string(),
    )
}

/// Answer a `stat ...` command from file metadata
pub fn stat_fallback(command: &str) -> String {
    for token in command.split_whitespace().skip(1) {
        let token = token.trim_matches(|c| c == '"' || c == '\'');
        if token.is_empty() || !Path::new(token).exists() {
            continue;
        }

        return match fs::metadata(token) {
            Ok(metadata) => format!(
                "permissions={:04o} ownership={}:{} file={}",
                metadata.permissions().mode() & 0o777,
                get_username(metadata.uid()),
                get_groupname(metadata.gid()),
                token
            ),
            Err(e) => format!("Error inspecting {}: {}", token, e),
        };
    }

    String::from("No valid file found for stat fallback")
}

/// Get username from UID
pub fn get_username(uid: u32) -> String {
    lookup_id(Path::new("/etc/passwd"), uid).unwrap_or_else(|| uid.to_string())
}

/// Get group name from GID
pub fn get_groupname(gid: u32) -> String {
    lookup_id(Path::new("/etc/group"), gid).unwrap_or_else(|| gid.to_string())
}

/// Find the name bound to a numeric id in a passwd/group style database
fn lookup_id(database: &Path, id: u32) -> Option<String> {
    let content = fs::read_to_string(database).ok()?;
    content.lines().find_map(|line| {
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() >= 3 && parts[2].parse::<u32>().ok() == Some(id) {
            Some(parts[0].to_string())
        } else {
            None
        }
    })
}

/// Resolve an executable by name on a search path
pub fn find_in_path(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let search_path = search_path?;
    std::env::split_paths(search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
