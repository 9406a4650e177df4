//! CSV trace parsing.
//!
//! Each line is `timestamp, pid, type, arg0, arg1, ...`. Comments start
//! with `#` and run to end of line, blank lines are skipped, and fields
//! are trimmed. Numbers are decimal or `0x`-prefixed hex. A malformed
//! line is logged and skipped; it never aborts the run.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use log::warn;

use crate::event::{EventKind, EventQueue};
use crate::utils::{parse_u32, parse_u64};

/// Reads a trace file and pushes its events onto `queue`. Returns the
/// number of events pushed. Only a fundamentally unreadable file is an
/// error.
pub fn load_trace<P: AsRef<Path>>(path: P, queue: &mut EventQueue) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("failed to open trace file {}", path.display()))?;
    Ok(parse_into(BufReader::new(file), queue))
}

/// The reader-driven core of [`load_trace`], usable on in-memory traces.
pub fn parse_into<R: BufRead>(reader: R, queue: &mut EventQueue) -> usize {
    let mut pushed = 0;

    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let raw = match line {
            Ok(raw) => raw,
            Err(err) => {
                warn!("trace: unreadable line {lineno}: {err}");
                continue;
            }
        };

        let line = match raw.find('#') {
            Some(i) => &raw[..i],
            None => raw.as_str(),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 3 {
            warn!("trace: malformed line {lineno}: {raw}");
            continue;
        }

        let Some(time) = parse_u64(fields[0]) else {
            warn!("trace: invalid timestamp at line {lineno}: {raw}");
            continue;
        };
        let Some(pid) = parse_u32(fields[1]) else {
            warn!("trace: invalid pid at line {lineno}: {raw}");
            continue;
        };

        let kind = EventKind::from_name(fields[2]);
        let args: Vec<String> = fields[3..].iter().map(|s| (*s).to_owned()).collect();
        let priority = kind.priority();

        queue.push_parts(time, priority, pid, kind, args, raw.clone());
        pushed += 1;
    }

    pushed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (EventQueue, usize) {
        let mut queue = EventQueue::new();
        let pushed = parse_into(text.as_bytes(), &mut queue);
        (queue, pushed)
    }

    #[test]
    fn parses_fields_and_preserves_args() {
        let (mut q, pushed) = parse("5, 1, PROC_START, 0x1000, 0x9000\n");
        assert_eq!(pushed, 1);

        let ev = q.pop().unwrap();
        assert_eq!(ev.key.time, 5);
        assert_eq!(ev.key.pid, 1);
        assert_eq!(ev.key.priority, 4);
        assert_eq!(ev.kind, EventKind::ProcStart);
        assert_eq!(ev.args, vec!["0x1000", "0x9000"]);
        assert_eq!(ev.raw, "5, 1, PROC_START, 0x1000, 0x9000");
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let (mut q, pushed) = parse(
            "# header comment\n\
             \n\
             1, 1, ACCESS, 0x2000  # trailing comment\n\
             \t \n",
        );
        assert_eq!(pushed, 1);
        let ev = q.pop().unwrap();
        assert_eq!(ev.args, vec!["0x2000"]);
    }

    #[test]
    fn hex_timestamps_are_accepted() {
        let (mut q, _) = parse("0x10, 2, FREE, 0x1000\n");
        assert_eq!(q.pop().unwrap().key.time, 16);
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let (mut q, pushed) = parse(
            "nonsense\n\
             zz, 1, ACCESS, 0x0\n\
             3, -1, ACCESS, 0x0\n\
             3, 1\n\
             4, 1, ACCESS, 0x0\n",
        );
        assert_eq!(pushed, 1);
        assert_eq!(q.pop().unwrap().key.time, 4);
    }

    #[test]
    fn priorities_come_from_the_event_kind() {
        let (mut q, _) = parse(
            "7, 1, MALLOC, 64\n\
             7, 1, PAGEIN_COMPLETE, 3\n",
        );
        // same timestamp: the page-in completion dispatches first
        assert_eq!(q.pop().unwrap().kind, EventKind::PageinComplete);
        assert_eq!(q.pop().unwrap().kind, EventKind::Malloc);
    }

    #[test]
    fn unknown_kinds_are_kept_with_lowest_priority() {
        let (mut q, _) = parse("1, 1, SNAPSHOT, a, b\n");
        let ev = q.pop().unwrap();
        assert_eq!(ev.kind, EventKind::from_name("SNAPSHOT"));
        assert_eq!(ev.key.priority, 5);
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut queue = EventQueue::new();
        assert!(load_trace("/no/such/trace.csv", &mut queue).is_err());
    }
}
