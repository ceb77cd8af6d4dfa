use crate::domain::events::DomainEvent;
use crate::error::Result;
use std::io::Write;

/// Appends domain events as JSON lines, one object per event.
pub struct EventLog<W: Write> {
    sink: W,
    written: usize,
}

impl<W: Write> EventLog<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, written: 0 }
    }

    pub fn append(&mut self, events: &[DomainEvent]) -> Result<()> {
        for event in events {
            serde_json::to_writer(&mut self.sink, event)?;
            self.sink.write_all(b"\n")?;
            self.written += 1;
        }
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}
