//! Building the `inputs` payload for a tool run.
//!
//! The plan is computed without network access. When the tool can only take
//! the reads as a collection, the plan says so and the workflow creates the
//! collection before launching the job.

use crate::api::{CollectionDescription, DataRef, ToolInfo, ToolInput, ToolInputs};
use crate::config::{basename, ReadFiles};
use crate::error::GalaxyError;
use crate::pipeline::tools::{find_any_data_input, find_collection_input, find_read_slots};
use std::collections::HashMap;

/// rnaSPAdes nests its read inputs under a repeat and a conditional.
const RNASPADES_PREFIX: &str = "libraries_0|files_0|file_type";

/// How to fill a tool's inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPlan {
    /// Inputs can be posted as-is.
    Ready(ToolInputs),
    /// Create `desc` first, then put its id into `slot` as an `hdca` reference.
    NeedsCollection {
        slot: String,
        desc: CollectionDescription,
    },
}

impl InputPlan {
    /// Resolve the plan once the collection (if any) exists.
    pub fn into_inputs(self, collection_id: Option<&str>) -> ToolInputs {
        match self {
            InputPlan::Ready(inputs) => inputs,
            InputPlan::NeedsCollection { slot, .. } => {
                let mut inputs = ToolInputs::new();
                if let Some(id) = collection_id {
                    inputs.insert(slot, DataRef::hdca(id).into());
                }
                inputs
            }
        }
    }
}

/// Work out how to feed `reads` to the selected tool.
///
/// `tool_id` is the id the tool was selected by; `tool` is its input tree.
/// `datasets` maps uploaded file basenames to their dataset ids.
pub fn plan_assembly(
    tool_id: &str,
    tool: &ToolInfo,
    datasets: &HashMap<String, String>,
    reads: &ReadFiles,
    history_id: &str,
) -> Result<InputPlan, GalaxyError> {
    let r1_name = basename(reads.r1());
    let lookup = |name: &str| -> Result<String, GalaxyError> {
        datasets
            .get(name)
            .cloned()
            .ok_or_else(|| GalaxyError::DatasetMissing {
                file: name.to_string(),
                history_id: history_id.to_string(),
            })
    };

    if tool_id.to_lowercase().contains("rnaspades") {
        return Ok(InputPlan::Ready(rnaspades_inputs(reads, &lookup)?));
    }

    let slots = find_read_slots(&tool.inputs);
    let no_slot = || GalaxyError::NoReadInputSlot {
        tool_id: tool_id.to_string(),
        layout: reads.layout().to_string(),
    };

    if let Some(r2) = reads.r2() {
        let r2_name = basename(r2);
        if let Some((fwd, rev)) = slots.paired() {
            let mut inputs = ToolInputs::new();
            inputs.insert(fwd.to_string(), DataRef::hda(lookup(&r1_name)?).into());
            inputs.insert(rev.to_string(), DataRef::hda(lookup(&r2_name)?).into());
            return Ok(InputPlan::Ready(inputs));
        }
        if let Some(single) = slots.single.as_deref() {
            let desc = CollectionDescription::list(
                "paired_collection_demo",
                [
                    (r1_name.clone(), lookup(&r1_name)?),
                    (r2_name.clone(), lookup(&r2_name)?),
                ],
            );
            return Ok(InputPlan::NeedsCollection {
                slot: single.to_string(),
                desc,
            });
        }
        return Err(no_slot());
    }

    let r1_id = lookup(&r1_name)?;
    if let Some(single) = slots.single_end() {
        let mut inputs = ToolInputs::new();
        inputs.insert(single.to_string(), DataRef::hda(r1_id).into());
        return Ok(InputPlan::Ready(inputs));
    }
    if let Some(slot) = find_collection_input(&tool.inputs) {
        let desc = CollectionDescription::list("reads_list", [(r1_name, r1_id)]);
        return Ok(InputPlan::NeedsCollection { slot, desc });
    }
    if let Some(slot) = find_any_data_input(&tool.inputs) {
        let mut inputs = ToolInputs::new();
        inputs.insert(slot, DataRef::hda(r1_id).into());
        return Ok(InputPlan::Ready(inputs));
    }
    Err(no_slot())
}

/// `separate` fwd/rev libraries for pairs, `unpaired` otherwise.
fn rnaspades_inputs(
    reads: &ReadFiles,
    lookup: &dyn Fn(&str) -> Result<String, GalaxyError>,
) -> Result<ToolInputs, GalaxyError> {
    let key = |leaf: &str| format!("{RNASPADES_PREFIX}|{leaf}");
    let r1_id = lookup(&basename(reads.r1()))?;
    let mut inputs = ToolInputs::new();
    match reads.r2() {
        Some(r2) => {
            let r2_id = lookup(&basename(r2))?;
            inputs.insert(key("type"), ToolInput::Text("separate".into()));
            inputs.insert(key("fwd_reads"), DataRef::hda(r1_id).into());
            inputs.insert(key("rev_reads"), DataRef::hda(r2_id).into());
        }
        None => {
            inputs.insert(key("type"), ToolInput::Text("unpaired".into()));
            inputs.insert(key("unpaired_reads"), DataRef::hda(r1_id).into());
        }
    }
    Ok(inputs)
}

/// Inputs for a FASTQ→FASTA converter.
///
/// Converter wrappers disagree on parameter names, so the dataset is offered
/// under every common name and the "emit FASTA" switch under every common
/// flag. Galaxy ignores names a tool does not declare.
pub fn conversion_inputs(dataset_id: &str) -> ToolInputs {
    let mut inputs = ToolInputs::new();
    for key in ["input_fastq", "input_file", "fastq", "input"] {
        inputs.insert(key.to_string(), DataRef::hda(dataset_id).into());
    }
    for key in ["to_fasta", "fasta_output", "convert_to_fasta"] {
        inputs.insert(key.to_string(), ToolInput::Flag(true));
    }
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DataSource, ToolParam};
    use std::path::PathBuf;

    fn datasets() -> HashMap<String, String> {
        HashMap::from([
            ("s_R1.fastq".to_string(), "d1".to_string()),
            ("s_R2.fastq".to_string(), "d2".to_string()),
        ])
    }

    fn single() -> ReadFiles {
        ReadFiles::new("in/s_R1.fastq", None)
    }

    fn paired() -> ReadFiles {
        ReadFiles::new("in/s_R1.fastq", Some(PathBuf::from("in/s_R2.fastq")))
    }

    fn tool(id: &str, inputs: Vec<ToolParam>) -> ToolInfo {
        ToolInfo {
            id: id.to_string(),
            name: None,
            inputs,
        }
    }

    fn ready(plan: InputPlan) -> ToolInputs {
        match plan {
            InputPlan::Ready(i) => i,
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[test]
    fn rnaspades_paired_uses_separate_libraries() {
        let t = tool("toolshed.g2.bx.psu.edu/repos/iuc/rnaspades/rnaspades/3.15.4", vec![]);
        let inputs = ready(plan_assembly(&t.id, &t, &datasets(), &paired(), "h").unwrap());
        assert_eq!(
            inputs["libraries_0|files_0|file_type|type"],
            ToolInput::Text("separate".into())
        );
        assert_eq!(
            inputs["libraries_0|files_0|file_type|fwd_reads"],
            ToolInput::from(DataRef::hda("d1"))
        );
        assert_eq!(
            inputs["libraries_0|files_0|file_type|rev_reads"],
            ToolInput::from(DataRef::hda("d2"))
        );
    }

    #[test]
    fn rnaspades_single_uses_unpaired() {
        let t = tool("rnaspades", vec![]);
        let inputs = ready(plan_assembly(&t.id, &t, &datasets(), &single(), "h").unwrap());
        assert_eq!(inputs.len(), 2);
        assert_eq!(
            inputs["libraries_0|files_0|file_type|unpaired_reads"],
            ToolInput::from(DataRef::hda("d1"))
        );
    }

    #[test]
    fn rnaspades_is_recognised_by_selected_id() {
        let inputs = ready(
            plan_assembly(
                "toolshed.g2.bx.psu.edu/repos/iuc/rnaspades/rnaspades/3.15.4",
                &ToolInfo::default(),
                &datasets(),
                &single(),
                "h",
            )
            .unwrap(),
        );
        assert_eq!(
            inputs["libraries_0|files_0|file_type|type"],
            ToolInput::Text("unpaired".into())
        );
    }

    #[test]
    fn missing_slot_error_names_selected_tool() {
        let err = plan_assembly("transabyss", &ToolInfo::default(), &datasets(), &single(), "h")
            .unwrap_err();
        match err {
            GalaxyError::NoReadInputSlot { tool_id, layout } => {
                assert_eq!(tool_id, "transabyss");
                assert_eq!(layout, "single-end");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rnaspades_missing_mate_dataset_errors() {
        let t = tool("rnaspades", vec![]);
        let only_r1 = HashMap::from([("s_R1.fastq".to_string(), "d1".to_string())]);
        let err = plan_assembly(&t.id, &t, &only_r1, &paired(), "hist1").unwrap_err();
        match err {
            GalaxyError::DatasetMissing { file, history_id } => {
                assert_eq!(file, "s_R2.fastq");
                assert_eq!(history_id, "hist1");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn paired_slots_get_both_datasets() {
        let t = tool(
            "trinity",
            vec![
                ToolParam::new("left_input", "data"),
                ToolParam::new("right_input", "data"),
            ],
        );
        let inputs = ready(plan_assembly(&t.id, &t, &datasets(), &paired(), "h").unwrap());
        assert_eq!(inputs["left_input"], ToolInput::from(DataRef::hda("d1")));
        assert_eq!(inputs["right_input"], ToolInput::from(DataRef::hda("d2")));
    }

    #[test]
    fn paired_reads_into_single_slot_need_collection() {
        let t = tool("oases", vec![ToolParam::new("reads", "data_collection")]);
        match plan_assembly(&t.id, &t, &datasets(), &paired(), "h").unwrap() {
            InputPlan::NeedsCollection { slot, desc } => {
                assert_eq!(slot, "reads");
                assert_eq!(desc.name, "paired_collection_demo");
                assert_eq!(desc.collection_type, "list");
                assert_eq!(desc.elements.len(), 2);
                assert_eq!(desc.elements[1].id, "d2");
                assert_eq!(desc.elements[1].src, DataSource::Hda);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn paired_reads_without_any_slot_error() {
        let t = tool("transabyss", vec![ToolParam::new("kmer", "integer")]);
        let err = plan_assembly(&t.id, &t, &datasets(), &paired(), "h").unwrap_err();
        assert!(matches!(err, GalaxyError::NoReadInputSlot { .. }));
        assert!(err.to_string().contains("paired-end"));
    }

    #[test]
    fn single_read_prefers_explicit_single_slot() {
        let t = tool(
            "x",
            vec![
                ToolParam::new("input_sequences", "data"),
                ToolParam::new("single_reads", "data"),
            ],
        );
        let inputs = ready(plan_assembly(&t.id, &t, &datasets(), &single(), "h").unwrap());
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs["single_reads"], ToolInput::from(DataRef::hda("d1")));
    }

    #[test]
    fn single_read_falls_back_to_collection_then_any_data() {
        let coll = tool("x", vec![ToolParam::new("samples", "data_collection")]);
        match plan_assembly(&coll.id, &coll, &datasets(), &single(), "h").unwrap() {
            InputPlan::NeedsCollection { slot, desc } => {
                assert_eq!(slot, "samples");
                assert_eq!(desc.name, "reads_list");
                assert_eq!(desc.elements[0].name, "s_R1.fastq");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let any = tool("x", vec![ToolParam::new("infile", "data")]);
        let inputs = ready(plan_assembly(&any.id, &any, &datasets(), &single(), "h").unwrap());
        assert_eq!(inputs["infile"], ToolInput::from(DataRef::hda("d1")));

        let none = tool("x", vec![ToolParam::new("k", "integer")]);
        assert!(matches!(
            plan_assembly(&none.id, &none, &datasets(), &single(), "h"),
            Err(GalaxyError::NoReadInputSlot { .. })
        ));
    }

    #[test]
    fn collection_plan_resolves_to_hdca() {
        let plan = InputPlan::NeedsCollection {
            slot: "reads".into(),
            desc: CollectionDescription::list("reads_list", [("a".to_string(), "d1".to_string())]),
        };
        let inputs = plan.into_inputs(Some("c9"));
        assert_eq!(inputs["reads"], ToolInput::from(DataRef::hdca("c9")));
    }

    #[test]
    fn conversion_inputs_cover_common_names() {
        let inputs = conversion_inputs("d1");
        assert_eq!(inputs.len(), 7);
        assert_eq!(inputs["input_fastq"], ToolInput::from(DataRef::hda("d1")));
        assert_eq!(inputs["input"], ToolInput::from(DataRef::hda("d1")));
        assert_eq!(inputs["to_fasta"], ToolInput::Flag(true));
    }
}
