//! Tool discovery: pick a tool by keyword and locate its read inputs.
//!
//! Galaxy tool wrappers name their inputs however their authors liked, so
//! these are substring heuristics over parameter names and labels. They are
//! best-effort; the rnaSPAdes wrapper is common enough that
//! [`crate::pipeline::inputs`] special-cases it instead.

use crate::api::{ToolParam, ToolSummary};

/// Parameter types that accept datasets.
const DATA_KINDS: &[&str] = &["data", "data_collection", "data_input"];
const LEFT_MARKERS: &[&str] = &["left", "read1", "r1", "forward", "paired 1", "paired_end_1"];
const RIGHT_MARKERS: &[&str] = &["right", "read2", "r2", "reverse", "paired 2", "paired_end_2"];
const SINGLE_MARKERS: &[&str] = &["reads", "fastq", "sequence"];
const COLLECTION_MARKERS: &[&str] = &["read", "fastq", "sequence", "rna"];

/// First tool whose id or name contains a keyword.
///
/// Keywords are tried in priority order; within one keyword, tools are
/// tried in server order. Matching is case-insensitive; blank keywords
/// match nothing.
pub fn find_tool_by_keywords<'a, S: AsRef<str>>(
    tools: &'a [ToolSummary],
    keywords: &[S],
) -> Option<&'a ToolSummary> {
    keywords.iter().find_map(|kw| {
        let kw = kw.as_ref().trim().to_lowercase();
        if kw.is_empty() {
            return None;
        }
        tools.iter().find(|t| {
            t.id.to_lowercase().contains(&kw)
                || t.name.as_deref().unwrap_or("").to_lowercase().contains(&kw)
        })
    })
}

/// Read-input parameter paths found on a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadSlots {
    pub left: Option<String>,
    pub right: Option<String>,
    pub single: Option<String>,
    pub explicit_single: Option<String>,
    pub explicit_fwd: Option<String>,
    pub explicit_rev: Option<String>,
}

impl ReadSlots {
    /// Forward/reverse pair, preferring explicit `fwd_reads`/`rev_reads`.
    pub fn paired(&self) -> Option<(&str, &str)> {
        let fwd = self.explicit_fwd.as_deref().or(self.left.as_deref())?;
        let rev = self.explicit_rev.as_deref().or(self.right.as_deref())?;
        Some((fwd, rev))
    }

    /// Single-read slot, preferring an explicit `single_reads`.
    pub fn single_end(&self) -> Option<&str> {
        self.explicit_single
            .as_deref()
            .or(self.single.as_deref())
    }
}

/// Walk the input tree and classify read inputs.
pub fn find_read_slots(inputs: &[ToolParam]) -> ReadSlots {
    let mut slots = ReadSlots::default();
    walk_read_slots(inputs, &mut slots);
    slots
}

fn walk_read_slots(inputs: &[ToolParam], slots: &mut ReadSlots) {
    for param in inputs {
        let name = param.key();
        let lname = name.to_lowercase();
        let combined = format!("{} {}", lname, param.description().to_lowercase());

        if lname.contains("single_reads") {
            slots.explicit_single = Some(name.to_string());
        }
        if lname.contains("fwd_reads") || lname.contains("forward_reads") {
            slots.explicit_fwd = Some(name.to_string());
        }
        if lname.contains("rev_reads") || lname.contains("reverse_reads") {
            slots.explicit_rev = Some(name.to_string());
        }

        if DATA_KINDS.contains(&param.kind()) {
            if contains_any(&combined, LEFT_MARKERS) {
                slots.left = Some(name.to_string());
            } else if contains_any(&combined, RIGHT_MARKERS) {
                slots.right = Some(name.to_string());
            } else if contains_any(&combined, SINGLE_MARKERS) && slots.single.is_none() {
                slots.single = Some(name.to_string());
            }
        }

        walk_read_slots(&param.inputs, slots);
    }
}

/// A `data_collection` input, preferring one that mentions reads.
///
/// A nested match wins over an unlabelled collection at the outer level,
/// and the first unlabelled collection is the fallback.
pub fn find_collection_input(inputs: &[ToolParam]) -> Option<String> {
    let mut preferred: Option<String> = None;
    for param in inputs {
        if param.kind() == "data_collection" {
            let text = format!(
                "{} {}",
                param.key().to_lowercase(),
                param.description().to_lowercase()
            );
            if contains_any(&text, COLLECTION_MARKERS) {
                return Some(param.key().to_string());
            }
            if preferred.is_none() {
                preferred = Some(param.key().to_string());
            }
        }
        if let Some(found) = find_collection_input(&param.inputs) {
            return Some(found);
        }
    }
    preferred
}

/// The first plain dataset input anywhere in the tree.
pub fn find_any_data_input(inputs: &[ToolParam]) -> Option<String> {
    inputs.iter().find_map(|param| {
        if matches!(param.kind(), "data" | "data_input") {
            Some(param.key().to_string())
        } else {
            find_any_data_input(&param.inputs)
        }
    })
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
