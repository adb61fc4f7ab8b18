//! Pure projection of a snapshot into the ordered list presentation renders.

use std::cmp::Ordering;

use crate::types::{ProcessSample, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum SortField {
    Pid,
    Name,
    Username,
    MemoryRssMb,
    MemoryPercent,
    CpuPercent,
    StartTime,
}

impl SortField {
    /// Field name as the backend's `sort_by` query parameter expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Pid => "pid",
            SortField::Name => "name",
            SortField::Username => "username",
            SortField::MemoryRssMb => "memory_rss_mb",
            SortField::MemoryPercent => "memory_percent",
            SortField::CpuPercent => "cpu_percent",
            SortField::StartTime => "start_time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct ViewParams {
    /// Case-insensitive substring matched against name, decimal pid, and
    /// username. Empty keeps everything.
    pub filter: String,
    pub sort_field: SortField,
    pub direction: SortDirection,
    /// Keep only the first N rows after sorting; 0 means unbounded.
    pub top_n: usize,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            filter: String::new(),
            sort_field: SortField::MemoryPercent,
            direction: SortDirection::Desc,
            top_n: 20,
        }
    }
}

/// Derive the sorted, filtered, bounded process list. Deterministic and
/// side-effect free; ties always break by ascending pid.
pub fn project(snapshot: &Snapshot, params: &ViewParams) -> Vec<ProcessSample> {
    let needle = params.filter.to_lowercase();
    let mut rows: Vec<ProcessSample> = snapshot
        .processes
        .iter()
        .filter(|p| matches_filter(p, &needle))
        .cloned()
        .collect();

    rows.sort_by(|a, b| {
        let ordering = compare(a, b, params.sort_field);
        let ordering = match params.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        ordering.then(a.pid.cmp(&b.pid))
    });

    if params.top_n > 0 {
        rows.truncate(params.top_n);
    }
    rows
}

fn matches_filter(sample: &ProcessSample, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    sample.name.to_lowercase().contains(needle)
        || sample.pid.to_string().contains(needle)
        || sample.username.to_lowercase().contains(needle)
}

fn compare(a: &ProcessSample, b: &ProcessSample, field: SortField) -> Ordering {
    match field {
        SortField::Pid => a.pid.cmp(&b.pid),
        SortField::Name => compare_str(&a.name, &b.name),
        SortField::Username => compare_str(&a.username, &b.username),
        SortField::MemoryRssMb => compare_f64(a.memory_rss_mb, b.memory_rss_mb),
        SortField::MemoryPercent => compare_f64(a.memory_percent as f64, b.memory_percent as f64),
        SortField::CpuPercent => compare_f64(a.cpu_percent as f64, b.cpu_percent as f64),
        // "%Y-%m-%d %H:%M:%S" sorts chronologically as text
        SortField::StartTime => a.start_time.cmp(&b.start_time),
    }
}

fn compare_str(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SystemMemorySample;

    fn sample(pid: u32, name: &str, username: &str, mem: f32, cpu: f32) -> ProcessSample {
        ProcessSample {
            pid,
            name: name.to_string(),
            username: username.to_string(),
            status: "running".to_string(),
            start_time: String::new(),
            memory_rss_mb: mem as f64 * 10.0,
            memory_percent: mem,
            cpu_percent: cpu,
        }
    }

    fn snapshot(processes: Vec<ProcessSample>) -> Snapshot {
        Snapshot {
            sequence: 1,
            processes,
            system_memory: SystemMemorySample::default(),
        }
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let snap = snapshot(vec![
            sample(3, "bash", "root", 1.0, 1.0),
            sample(1, "chrome", "alice", 9.0, 2.0),
            sample(2, "chrome", "bob", 9.0, 3.0),
        ]);
        let params = ViewParams::default();
        assert_eq!(project(&snap, &params), project(&snap, &params));
    }

    #[test]
    fn filters_by_name_pid_and_username() {
        let snap = snapshot(vec![
            sample(100, "chrome.exe", "alice", 5.0, 1.0),
            sample(200, "bash", "bob", 5.0, 1.0),
        ]);

        let mut params = ViewParams {
            filter: "chrome".to_string(),
            ..ViewParams::default()
        };
        let rows = project(&snap, &params);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pid, 100);

        params.filter = "20".to_string();
        assert_eq!(project(&snap, &params)[0].pid, 200);

        params.filter = "ALICE".to_string();
        assert_eq!(project(&snap, &params)[0].pid, 100);

        params.filter = "nothing".to_string();
        assert!(project(&snap, &params).is_empty());
    }

    #[test]
    fn sorts_numeric_descending() {
        let snap = snapshot(vec![
            sample(1, "a", "u", 1.0, 10.0),
            sample(2, "b", "u", 1.0, 50.0),
        ]);
        let params = ViewParams {
            sort_field: SortField::CpuPercent,
            direction: SortDirection::Desc,
            ..ViewParams::default()
        };
        let pids: Vec<u32> = project(&snap, &params).iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![2, 1]);
    }

    #[test]
    fn sorts_strings_case_insensitively() {
        let snap = snapshot(vec![
            sample(1, "Zsh", "u", 1.0, 1.0),
            sample(2, "bash", "u", 1.0, 1.0),
        ]);
        let params = ViewParams {
            sort_field: SortField::Name,
            direction: SortDirection::Asc,
            ..ViewParams::default()
        };
        let pids: Vec<u32> = project(&snap, &params).iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![2, 1]);
    }

    #[test]
    fn ties_break_by_ascending_pid_regardless_of_direction() {
        let snap = snapshot(vec![
            sample(5, "x", "u", 7.0, 1.0),
            sample(2, "y", "u", 7.0, 1.0),
            sample(9, "z", "u", 7.0, 1.0),
        ]);
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let params = ViewParams {
                sort_field: SortField::MemoryPercent,
                direction,
                top_n: 0,
                ..ViewParams::default()
            };
            let pids: Vec<u32> = project(&snap, &params).iter().map(|p| p.pid).collect();
            assert_eq!(pids, vec![2, 5, 9]);
        }
    }

    #[test]
    fn bounds_to_top_n() {
        let snap = snapshot(vec![
            sample(1, "a", "u", 3.0, 1.0),
            sample(2, "b", "u", 2.0, 1.0),
            sample(3, "c", "u", 1.0, 1.0),
        ]);

        let params = ViewParams {
            top_n: 1,
            ..ViewParams::default()
        };
        assert_eq!(project(&snap, &params).len(), 1);

        let empty = snapshot(Vec::new());
        assert!(project(&empty, &params).is_empty());

        let unbounded = ViewParams {
            top_n: 0,
            ..ViewParams::default()
        };
        assert_eq!(project(&snap, &unbounded).len(), 3);
    }
}
