//! The transformation log text format.
//!
//! A log is an ordinary text file with a marked region:
//!
//! ```text
//! anything            <- opaque, preserved verbatim
//! # Squirrel Pipeline start
//! <entries>
//! # Add new code here (keep this comment line)
//! # Squirrel Pipeline end
//! anything
//! ```
//!
//! Inside the region, consecutive non-blank lines accumulate until one of
//! them carries a `#sq_action:` trailer, which closes them into an entry.
//! Everything else (the markers, the anchor, blank lines, stray comments,
//! half-finished buffers at the end marker) stays a raw line and survives
//! every mutation byte-for-byte.

use crate::error::{PipelineError, Result};

pub const START_MARKER: &str = "# Squirrel Pipeline start";
pub const ANCHOR_MARKER: &str = "# Add new code here (keep this comment line)";
pub const END_MARKER: &str = "# Squirrel Pipeline end";
pub const TRAILER_TAG: &str = "#sq_action:";

/// One logged action: its verbatim lines, trailer included on the last.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub lines: Vec<String>,
}

impl Entry {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// The trailer label, empty if the tag is somehow blank.
    pub fn label(&self) -> &str {
        self.lines
            .last()
            .and_then(|line| line.split_once(TRAILER_TAG))
            .map(|(_, label)| label.trim())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Raw(String),
    Entry(Entry),
}

/// Parsed log. Entry ids are positional: the n-th entry in file order has
/// id n.
#[derive(Debug, Clone, PartialEq)]
pub struct Log {
    items: Vec<Item>,
    /// Index into `items` of the anchor line.
    anchor: usize,
    trailing_newline: bool,
}

impl Log {
    /// The minimal valid log.
    pub fn boilerplate() -> String {
        format!("{START_MARKER}\n{ANCHOR_MARKER}\n{END_MARKER}\n")
    }

    pub fn parse(source: &str) -> Result<Self> {
        let mut items: Vec<Item> = Vec::new();
        let mut anchor: Option<usize> = None;
        let mut seen_start = false;
        let mut seen_end = false;
        let mut in_region = false;
        let mut pending: Vec<String> = Vec::new();

        for line in source.lines() {
            let trimmed = line.trim();
            if trimmed == START_MARKER {
                if seen_start {
                    return Err(PipelineError::DuplicateMarker(START_MARKER));
                }
                if seen_end {
                    return Err(PipelineError::MarkerOrder);
                }
                seen_start = true;
                in_region = true;
                items.push(Item::Raw(line.to_string()));
                continue;
            }
            if trimmed == END_MARKER {
                if seen_end {
                    return Err(PipelineError::DuplicateMarker(END_MARKER));
                }
                if !seen_start {
                    return Err(PipelineError::MarkerOrder);
                }
                seen_end = true;
                in_region = false;
                // A buffer with no trailer is not an entry.
                items.extend(pending.drain(..).map(Item::Raw));
                items.push(Item::Raw(line.to_string()));
                continue;
            }
            if trimmed == ANCHOR_MARKER {
                if anchor.is_some() {
                    return Err(PipelineError::DuplicateMarker(ANCHOR_MARKER));
                }
                if !in_region {
                    return Err(PipelineError::AnchorOutsideRegion);
                }
                items.extend(pending.drain(..).map(Item::Raw));
                anchor = Some(items.len());
                items.push(Item::Raw(line.to_string()));
                continue;
            }
            if !in_region {
                items.push(Item::Raw(line.to_string()));
                continue;
            }
            if pending.is_empty() && (trimmed.is_empty() || trimmed.starts_with('#')) {
                items.push(Item::Raw(line.to_string()));
                continue;
            }
            pending.push(line.to_string());
            if line.contains(TRAILER_TAG) {
                items.push(Item::Entry(Entry {
                    lines: std::mem::take(&mut pending),
                }));
            }
        }
        items.extend(pending.drain(..).map(Item::Raw));

        if !seen_start {
            return Err(PipelineError::MissingMarker(START_MARKER));
        }
        if !seen_end {
            return Err(PipelineError::MissingMarker(END_MARKER));
        }
        let anchor = anchor.ok_or(PipelineError::MissingMarker(ANCHOR_MARKER))?;

        Ok(Self {
            items,
            anchor,
            trailing_newline: source.is_empty() || source.ends_with('\n'),
        })
    }

    pub fn serialize(&self) -> String {
        let mut lines: Vec<&str> = Vec::new();
        for item in &self.items {
            match item {
                Item::Raw(line) => lines.push(line),
                Item::Entry(entry) => lines.extend(entry.lines.iter().map(String::as_str)),
            }
        }
        let mut out = lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    pub fn entries(&self) -> impl Iterator<Item = (usize, &Entry)> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Item::Entry(entry) => Some(entry),
                Item::Raw(_) => None,
            })
            .enumerate()
    }

    pub fn entry_count(&self) -> usize {
        self.entries().count()
    }

    /// Leading whitespace of the anchor line, applied to inserted entries.
    pub fn anchor_indent(&self) -> &str {
        let Item::Raw(line) = &self.items[self.anchor] else {
            return "";
        };
        &line[..line.len() - line.trim_start().len()]
    }

    /// Insert a snippet as a new entry immediately before the anchor, each
    /// line re-indented to the anchor's indentation.
    pub fn add_entry(&mut self, snippet: &str) {
        let indent = self.anchor_indent().to_string();
        let lines = snippet
            .lines()
            .map(|line| format!("{indent}{line}"))
            .collect();
        self.items.insert(self.anchor, Item::Entry(Entry { lines }));
        self.anchor += 1;
    }

    fn entry_positions(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| matches!(item, Item::Entry(_)).then_some(i))
            .collect()
    }

    pub fn delete_entry(&mut self, id: usize) -> Result<()> {
        let positions = self.entry_positions();
        let pos = *positions.get(id).ok_or(PipelineError::EntryNotFound(id))?;
        self.items.remove(pos);
        if pos < self.anchor {
            self.anchor -= 1;
        }
        Ok(())
    }

    pub fn edit_entry(&mut self, id: usize, new_text: &str) -> Result<()> {
        let positions = self.entry_positions();
        let pos = *positions.get(id).ok_or(PipelineError::EntryNotFound(id))?;
        let lines = new_text.lines().map(str::to_string).collect();
        self.items[pos] = Item::Entry(Entry { lines });
        Ok(())
    }

    /// Rearrange entries so that position `i` holds the entry that had id
    /// `order[i]`. Raw lines keep their absolute positions; only the entry
    /// slots are refilled. `order` must be a permutation of `0..n`.
    pub fn reorder(&mut self, order: &[usize]) -> Result<()> {
        let positions = self.entry_positions();
        let n = positions.len();
        let mut seen = vec![false; n];
        let valid = order.len() == n
            && order.iter().all(|&id| {
                if id >= n || seen[id] {
                    false
                } else {
                    seen[id] = true;
                    true
                }
            });
        if !valid {
            return Err(PipelineError::MalformedPermutation {
                expected: n,
                got: order.to_vec(),
            });
        }
        let old: Vec<Entry> = positions
            .iter()
            .map(|&pos| match &self.items[pos] {
                Item::Entry(entry) => entry.clone(),
                Item::Raw(_) => unreachable!("entry positions point at entries"),
            })
            .collect();
        for (slot, &id) in positions.iter().zip(order) {
            self.items[*slot] = Item::Entry(old[id].clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SIMPLE: &str = "\
prefix line
# Squirrel Pipeline start
tables['t'] = load_table('src')  #sq_action:Create table t from src
tables['t']['x'] = 1  #sq_action:Add column x on table t
# Add new code here (keep this comment line)
# Squirrel Pipeline end
suffix line
";

    #[test]
    fn test_parse_counts_entries_and_round_trips() {
        let log = Log::parse(SIMPLE).unwrap();
        assert_eq!(log.entry_count(), 2);
        assert_eq!(log.serialize(), SIMPLE);
    }

    #[test]
    fn test_labels() {
        let log = Log::parse(SIMPLE).unwrap();
        let labels: Vec<&str> = log.entries().map(|(_, e)| e.label()).collect();
        assert_eq!(
            labels,
            vec!["Create table t from src", "Add column x on table t"]
        );
    }

    #[test]
    fn test_multiline_entry_closes_on_trailer() {
        let source = "\
# Squirrel Pipeline start
tables['a'] = tables['b']
tables['c'] = tables['a']  #sq_action:Custom action 'x'
# Add new code here (keep this comment line)
# Squirrel Pipeline end
";
        let log = Log::parse(source).unwrap();
        assert_eq!(log.entry_count(), 1);
        let (_, entry) = log.entries().next().unwrap();
        assert_eq!(entry.lines.len(), 2);
    }

    #[test]
    fn test_pending_without_trailer_demotes_to_raw() {
        let source = "\
# Squirrel Pipeline start
tables['a'] = tables['b']
# Add new code here (keep this comment line)
# Squirrel Pipeline end
";
        let log = Log::parse(source).unwrap();
        assert_eq!(log.entry_count(), 0);
        assert_eq!(log.serialize(), source);
    }

    #[test]
    fn test_structural_validation() {
        assert!(matches!(
            Log::parse("# Squirrel Pipeline end\n# Squirrel Pipeline start\n"),
            Err(PipelineError::MarkerOrder)
        ));
        assert!(matches!(
            Log::parse("# Squirrel Pipeline start\n# Squirrel Pipeline end\n"),
            Err(PipelineError::MissingMarker(ANCHOR_MARKER))
        ));
        assert!(matches!(
            Log::parse("# Add new code here (keep this comment line)\n"),
            Err(PipelineError::AnchorOutsideRegion)
        ));
        let doubled = format!("{}{}", SIMPLE, "# Squirrel Pipeline end\n");
        assert!(matches!(
            Log::parse(&doubled),
            Err(PipelineError::DuplicateMarker(END_MARKER))
        ));
    }

    #[test]
    fn test_add_entry_inherits_anchor_indent() {
        let source = "\
# Squirrel Pipeline start
    # Add new code here (keep this comment line)
# Squirrel Pipeline end
";
        let mut log = Log::parse(source).unwrap();
        log.add_entry("tables['t'] = load_table('s')  #sq_action:Create table t from s");
        let (_, entry) = log.entries().next().unwrap();
        assert!(entry.lines[0].starts_with("    tables['t']"));
        // Still before the anchor.
        let serialized = log.serialize();
        let entry_pos = serialized.find("tables['t']").unwrap();
        let anchor_pos = serialized.find(ANCHOR_MARKER).unwrap();
        assert!(entry_pos < anchor_pos);
    }

    #[test]
    fn test_delete_entry() {
        let mut log = Log::parse(SIMPLE).unwrap();
        log.delete_entry(0).unwrap();
        assert_eq!(log.entry_count(), 1);
        assert_eq!(
            log.entries().next().unwrap().1.label(),
            "Add column x on table t"
        );
        assert!(matches!(
            log.delete_entry(5),
            Err(PipelineError::EntryNotFound(5))
        ));
    }

    #[test]
    fn test_reorder_permutes_entries_only() {
        let mut log = Log::parse(SIMPLE).unwrap();
        log.reorder(&[1, 0]).unwrap();
        let labels: Vec<&str> = log.entries().map(|(_, e)| e.label()).collect();
        assert_eq!(
            labels,
            vec!["Add column x on table t", "Create table t from src"]
        );
        // Raw surroundings untouched.
        assert!(log.serialize().starts_with("prefix line\n"));
        assert!(log.serialize().ends_with("suffix line\n"));
    }

    #[test]
    fn test_reorder_rejects_non_permutations() {
        let mut log = Log::parse(SIMPLE).unwrap();
        let before = log.serialize();
        for bad in [&[0usize][..], &[0, 0], &[0, 2], &[0, 1, 1]] {
            assert!(matches!(
                log.reorder(bad),
                Err(PipelineError::MalformedPermutation { .. })
            ));
        }
        assert_eq!(log.serialize(), before);
    }

    #[test]
    fn test_edit_entry_verbatim() {
        let mut log = Log::parse(SIMPLE).unwrap();
        log.edit_entry(1, "tables['t']['x'] = 2  #sq_action:Add column x on table t")
            .unwrap();
        let (_, entry) = log.entries().nth(1).unwrap();
        assert!(entry.text().contains("= 2"));
    }

    fn entry_text_strategy() -> impl Strategy<Value = String> {
        "[a-z]{1,8}".prop_map(|name| {
            format!("tables['{name}'] = load_table('{name}')  #sq_action:Create table {name}")
        })
    }

    proptest! {
        #[test]
        fn prop_round_trip_is_byte_identical(entries in prop::collection::vec(entry_text_strategy(), 0..8)) {
            let mut source = String::from("# Squirrel Pipeline start\n");
            for entry in &entries {
                source.push_str(entry);
                source.push('\n');
            }
            source.push_str("# Add new code here (keep this comment line)\n# Squirrel Pipeline end\n");

            let log = Log::parse(&source).unwrap();
            prop_assert_eq!(log.entry_count(), entries.len());
            prop_assert_eq!(log.serialize(), source);
        }

        #[test]
        fn prop_reorder_preserves_entry_set(count in 2usize..6, seed in 0u64..1000) {
            let mut source = String::from("# Squirrel Pipeline start\n");
            for i in 0..count {
                source.push_str(&format!("tables['t{i}'] = load_table('s')  #sq_action:Create table t{i}\n"));
            }
            source.push_str("# Add new code here (keep this comment line)\n# Squirrel Pipeline end\n");
            let mut log = Log::parse(&source).unwrap();

            // Cheap deterministic permutation from the seed.
            let mut order: Vec<usize> = (0..count).collect();
            for i in 0..count {
                let j = (seed as usize + i * 7) % count;
                order.swap(i, j);
            }
            let before: Vec<String> = log.entries().map(|(_, e)| e.text()).collect();
            log.reorder(&order).unwrap();
            let mut after: Vec<String> = log.entries().map(|(_, e)| e.text()).collect();
            let mut expected = before;
            expected.sort();
            after.sort();
            prop_assert_eq!(after, expected);
        }
    }
}
