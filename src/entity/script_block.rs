use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{fill, to_datetime, union_evidence};

/// One numbered part of a script block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptFragment {
    pub number: i64,
    pub text: String,
}

/// A PowerShell script block (4104) or pipeline execution record (4103)
///
/// Large scripts are logged as several 4104 events sharing one
/// `script_block_id`; merging the parts rebuilds the complete text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptBlock {
    pub timestamp: i64,
    pub computer: String,
    pub script_block_id: String,
    pub process_id: i64,
    pub text: String,
    pub message_number: i64,
    pub message_total: i64,
    pub path: String,
    pub context: String,
    /// Parts seen so far, ordered by number
    pub fragments: Vec<ScriptFragment>,
    pub evidence: Vec<String>,
}

impl ScriptBlock {
    pub fn date(&self) -> DateTime<Utc> {
        to_datetime(self.timestamp)
    }

    pub fn same_block(&self, other: &ScriptBlock) -> bool {
        !self.script_block_id.is_empty()
            && self.script_block_id.eq_ignore_ascii_case(&other.script_block_id)
            && self.computer == other.computer
    }

    /// Fold another part of the same block into this one
    pub fn merge(&mut self, other: ScriptBlock) {
        if other.timestamp != 0 && (self.timestamp == 0 || other.timestamp < self.timestamp) {
            self.timestamp = other.timestamp;
        }
        if self.process_id == 0 {
            self.process_id = other.process_id;
        }
        self.message_total = self.message_total.max(other.message_total);
        fill(&mut self.path, &other.path);
        fill(&mut self.context, &other.context);

        for fragment in other.fragments {
            if !self.fragments.iter().any(|f| f.number == fragment.number) {
                self.fragments.push(fragment);
            }
        }
        self.fragments.sort_by_key(|f| f.number);
        if !self.fragments.is_empty() {
            self.text = self.fragments.iter().map(|f| f.text.as_str()).collect();
        }
        union_evidence(&mut self.evidence, other.evidence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(number: i64, text: &str, ts: i64) -> ScriptBlock {
        ScriptBlock {
            timestamp: ts,
            computer: "WS01".to_string(),
            script_block_id: "{a1}".to_string(),
            process_id: 4242,
            text: text.to_string(),
            message_number: number,
            message_total: 3,
            fragments: vec![ScriptFragment {
                number,
                text: text.to_string(),
            }],
            evidence: vec![format!("part{}", number)],
            ..Default::default()
        }
    }

    #[test]
    fn test_parts_reassemble_in_order() {
        let mut block = part(2, "Write-Host ", 20);
        block.merge(part(3, "'done'", 30));
        assert_eq!(block.fragments.len(), 2);
        block.merge(part(1, "$x = 1; ", 10));
        assert_eq!(block.fragments.len(), 3);
        assert_eq!(block.text, "$x = 1; Write-Host 'done'");
        assert_eq!(block.timestamp, 10);
        assert_eq!(block.evidence.len(), 3);
    }

    #[test]
    fn test_duplicate_part_is_ignored() {
        let mut block = part(1, "a", 10);
        block.merge(part(1, "a", 10));
        assert_eq!(block.fragments.len(), 1);
        assert_eq!(block.evidence, vec!["part1"]);
    }
}
