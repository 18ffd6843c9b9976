use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{fill, fill_int, to_datetime};

/// One observed execution of a program
///
/// Several artifacts may each describe part of the same execution; they are
/// reconciled by the process correlator through [`Process::absorb`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub timestamp: i64,
    pub full_path: String,
    /// Canonical name; a process without one is never kept
    pub filename: String,
    pub pid: i64,
    pub commandline: String,
    pub ppid: i64,
    /// Full path of the parent image
    pub parent_process_name: String,
    pub parent_commandline: String,
    pub user: String,
    pub user_domain: String,
    pub parent_user: String,
    pub parent_user_domain: String,
    pub logon_id: i64,
    pub computer: String,
    pub hash: String,
    pub evidence: Vec<String>,
}

impl Process {
    pub fn date(&self) -> DateTime<Utc> {
        to_datetime(self.timestamp)
    }

    /// Merge another partial record of the same execution into this one
    ///
    /// Populated fields of `self` win; evidence is concatenated.
    pub fn absorb(&mut self, other: Process) {
        fill_int(&mut self.timestamp, other.timestamp);
        fill(&mut self.full_path, &other.full_path);
        fill(&mut self.filename, &other.filename);
        fill_int(&mut self.pid, other.pid);
        fill(&mut self.commandline, &other.commandline);
        fill_int(&mut self.ppid, other.ppid);
        fill(&mut self.parent_process_name, &other.parent_process_name);
        fill(&mut self.parent_commandline, &other.parent_commandline);
        fill(&mut self.user, &other.user);
        fill(&mut self.user_domain, &other.user_domain);
        fill(&mut self.parent_user, &other.parent_user);
        fill(&mut self.parent_user_domain, &other.parent_user_domain);
        fill_int(&mut self.logon_id, other.logon_id);
        fill(&mut self.computer, &other.computer);
        fill(&mut self.hash, &other.hash);
        self.evidence.extend(other.evidence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_fills_gaps_only() {
        let mut audit = Process {
            timestamp: 100,
            full_path: r"C:\Tools\a.exe".to_string(),
            filename: "a.exe".to_string(),
            pid: 4,
            evidence: vec!["audit".to_string()],
            ..Default::default()
        };
        let prefetch = Process {
            timestamp: 200,
            full_path: r"\VOLUME{x}\TOOLS\A.EXE".to_string(),
            filename: "A.EXE".to_string(),
            commandline: "a.exe -x".to_string(),
            computer: "WS01".to_string(),
            evidence: vec!["prefetch".to_string()],
            ..Default::default()
        };

        audit.absorb(prefetch);
        assert_eq!(audit.timestamp, 100);
        assert_eq!(audit.full_path, r"C:\Tools\a.exe");
        assert_eq!(audit.filename, "a.exe");
        assert_eq!(audit.commandline, "a.exe -x");
        assert_eq!(audit.computer, "WS01");
        assert_eq!(audit.pid, 4);
        assert_eq!(audit.evidence, vec!["audit", "prefetch"]);
    }
}
