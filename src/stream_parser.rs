//! Line-by-line streaming parser over a session file.
//!
//! Implemented as a plain `Iterator`, not a hand-rolled state machine: a
//! `BufRead`'s `lines()` iterator already pulls one line at a time from disk,
//! so wrapping it keeps the whole pipeline lazy without needing async or a
//! buffering layer. Consumers (the sync orchestrator) can therefore process
//! one classified event at a time regardless of file size.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::MemoryNexusError;
use crate::event::{self, ClassifiedEvent};

/// Lazily classified events from a session file, one line at a time.
///
/// A single line can classify into more than one event (an assistant line
/// with `tool_use` blocks, a user line with `tool_result` blocks), so the
/// iterator keeps a small pending buffer for the spillover rather than
/// changing its `Item` type to `Vec<ClassifiedEvent>`.
pub struct StreamingParser {
    lines: Lines<BufReader<File>>,
    line_no: usize,
    pending: VecDeque<ClassifiedEvent>,
}

impl StreamingParser {
    pub fn open(path: &Path) -> Result<Self, MemoryNexusError> {
        let file = File::open(path)
            .map_err(|e| MemoryNexusError::FileUnreadable(path.to_path_buf(), e.to_string()))?;
        Ok(StreamingParser {
            lines: BufReader::new(file).lines(),
            line_no: 0,
            pending: VecDeque::new(),
        })
    }
}

impl Iterator for StreamingParser {
    type Item = ClassifiedEvent;

    fn next(&mut self) -> Option<ClassifiedEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        let raw = self.lines.next()?;
        self.line_no += 1;
        let line_no = self.line_no;
        let mut events = match raw {
            Err(e) => vec![ClassifiedEvent::Skipped {
                reason: format!("I/O error reading line {line_no}: {e}"),
            }],
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    vec![ClassifiedEvent::Skipped {
                        reason: format!("Empty line at {line_no}"),
                    }]
                } else {
                    match serde_json::from_str::<serde_json::Value>(trimmed) {
                        Ok(value) => event::classify(&value),
                        Err(e) => vec![ClassifiedEvent::Skipped {
                            reason: format!("Malformed JSON at line {line_no}: {e}"),
                        }],
                    }
                }
            }
        };

        if events.is_empty() {
            return self.next();
        }
        let first = events.remove(0);
        self.pending.extend(events);
        Some(first)
    }
}
