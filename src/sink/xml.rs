//! XML output, one element per entity per line

use std::path::Path;

use super::{KindWriter, Mapped, OutputDir, SinkResult};

pub struct XmlSink {
    out: OutputDir,
}

impl XmlSink {
    pub fn new(dir: &Path) -> SinkResult<Self> {
        Ok(Self {
            out: OutputDir::create(dir, "xml")?,
        })
    }
}

impl KindWriter for XmlSink {
    fn write<T: Mapped>(&mut self, items: &[T]) -> SinkResult<()> {
        let (mut file, _) = self.out.open(T::KIND)?;
        for item in items {
            file.line(&quick_xml::se::to_string(item)?)?;
        }
        file.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::EntityBatch;
    use crate::entity::Computer;
    use crate::sink::write_batch;

    #[test]
    fn test_one_element_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = EntityBatch::new();
        for name in ["WS01", "DC01"] {
            batch.computers.add(Computer {
                name: name.to_string(),
                domain: "CORP".to_string(),
            });
        }

        let mut sink = XmlSink::new(dir.path()).unwrap();
        write_batch(&mut sink, &batch).unwrap();

        let text = std::fs::read_to_string(dir.path().join("computer.xml")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "<Computer><name>WS01</name><domain>CORP</domain></Computer>");
        assert!(dir.path().join("webhistory.xml").exists());
    }
}
