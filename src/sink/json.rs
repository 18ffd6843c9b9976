//! JSON lines output, one serialized entity per line

use serde::de::DeserializeOwned;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{KindWriter, Mapped, OutputDir, SinkError, SinkResult};

pub struct JsonSink {
    out: OutputDir,
}

impl JsonSink {
    pub fn new(dir: &Path) -> SinkResult<Self> {
        Ok(Self {
            out: OutputDir::create(dir, "json")?,
        })
    }
}

impl KindWriter for JsonSink {
    fn write<T: Mapped>(&mut self, items: &[T]) -> SinkResult<()> {
        let (mut file, _) = self.out.open(T::KIND)?;
        for item in items {
            file.line(&serde_json::to_string(item)?)?;
        }
        file.close()
    }
}

/// Read back a file written by [`JsonSink`]
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> SinkResult<Vec<T>> {
    let path = path.as_ref();
    let io_error = |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::open(path).map_err(io_error)?;

    let mut items = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(io_error)?;
        if line.trim().is_empty() {
            continue;
        }
        items.push(serde_json::from_str(&line)?);
    }
    Ok(items)
}

/// Read back every entity of kind `T` from an output directory
pub fn load_kind<T: Mapped>(dir: impl AsRef<Path>) -> SinkResult<Vec<T>> {
    load(dir.as_ref().join(format!("{}.json", T::KIND)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::EntityBatch;
    use crate::entity::{Event, EventType, User};
    use crate::sink::write_batch;

    #[test]
    fn test_written_entities_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = EntityBatch::new();
        batch.users.add(User {
            username: "alice".to_string(),
            sid: "S-1-5-21-1-1001".to_string(),
            ..Default::default()
        });
        batch.events.add(Event {
            timestamp: 7,
            event_type: EventType::Logoff,
            user_source: "alice".to_string(),
            evidence: vec!["<Event/>".to_string()],
            ..Default::default()
        });

        let mut sink = JsonSink::new(dir.path()).unwrap();
        write_batch(&mut sink, &batch).unwrap();

        let users: Vec<User> = load_kind(dir.path()).unwrap();
        assert_eq!(users, batch.users.as_slice());
        let events: Vec<Event> = load_kind(dir.path()).unwrap();
        assert_eq!(events, batch.events.as_slice());
        let processes: Vec<crate::entity::Process> = load_kind(dir.path()).unwrap();
        assert!(processes.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result: SinkResult<Vec<User>> = load(dir.path().join("nope.json"));
        assert!(matches!(result, Err(SinkError::Io { .. })));
    }
}
