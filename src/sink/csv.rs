//! CSV output
//!
//! Fixed columns with a header row. Cells are not quoted: values containing
//! commas or newlines (command lines, raw evidence) break the column layout.

use std::path::Path;

use super::{KindWriter, Mapped, OutputDir, SinkResult};
use crate::graph::PropertyValue;

pub struct CsvSink {
    out: OutputDir,
}

impl CsvSink {
    pub fn new(dir: &Path) -> SinkResult<Self> {
        Ok(Self {
            out: OutputDir::create(dir, "csv")?,
        })
    }
}

pub fn header<T: Mapped>() -> String {
    T::COLUMNS
        .iter()
        .map(|(header, _)| *header)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn row<T: Mapped>(item: &T) -> String {
    let properties = item.properties();
    T::COLUMNS
        .iter()
        .map(|(_, key)| cell(properties.get(*key)))
        .collect::<Vec<_>>()
        .join(",")
}

fn cell(value: Option<&PropertyValue>) -> String {
    match value {
        Some(PropertyValue::List(items)) => items.join(" | "),
        Some(value) => value.to_string(),
        None => String::new(),
    }
}

impl KindWriter for CsvSink {
    fn write<T: Mapped>(&mut self, items: &[T]) -> SinkResult<()> {
        let (mut file, fresh) = self.out.open(T::KIND)?;
        if fresh {
            file.line(&header::<T>())?;
        }
        for item in items {
            file.line(&row(item))?;
        }
        file.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Computer, ScheduledTask};
    use crate::sink::write_batch;
    use crate::collection::EntityBatch;

    #[test]
    fn test_header_and_row() {
        assert_eq!(header::<ScheduledTask>(), "Application,Comment,Trigger,User");
        let task = ScheduledTask {
            application: r"C:\u.exe".to_string(),
            comment: "updater".to_string(),
            trigger: "DAILY".to_string(),
            user: "SYSTEM".to_string(),
            ..Default::default()
        };
        assert_eq!(row(&task), r"C:\u.exe,updater,DAILY,SYSTEM");
    }

    #[test]
    fn test_every_kind_gets_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();
        let mut batch = EntityBatch::new();
        batch.computers.add(Computer {
            name: "WS01".to_string(),
            domain: "CORP".to_string(),
        });
        write_batch(&mut sink, &batch).unwrap();

        let computers = std::fs::read_to_string(dir.path().join("computer.csv")).unwrap();
        assert_eq!(computers, "Name,Domain\nWS01,CORP\n");
        let processes = std::fs::read_to_string(dir.path().join("process.csv")).unwrap();
        assert!(processes.starts_with("Timestamp,CreatedTime,Filename,FullPath"));
        assert_eq!(processes.lines().count(), 1);

        write_batch(&mut sink, &batch).unwrap();
        let computers = std::fs::read_to_string(dir.path().join("computer.csv")).unwrap();
        assert_eq!(computers.lines().count(), 3);
    }
}
