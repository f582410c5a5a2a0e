//! Run the filter engine against a chat fixture.
//!
//! Fixture format:
//!
//! ```json
//! {
//!   "entries":  [{ "id": "A", "emotes": ["PatrickBoo"] }, { "id": "B" }],
//!   "injected": [{ "id": "D", "emotes": ["PatrickBoo"] }]
//! }
//! ```
//!
//! `entries` are present before activation, `injected` arrive afterwards.
//! An entry with `"container": false` lacks the chat-entry class.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use er_core::memory::{MemoryDocument, MemoryWatcher, NodeId};
use er_core::{Document, DomError, EngineConfig, FilterEngine};

#[derive(Debug, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub entries: Vec<FixtureEntry>,
    #[serde(default)]
    pub injected: Vec<FixtureEntry>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureEntry {
    pub id: String,
    #[serde(default)]
    pub emotes: Vec<String>,
    #[serde(default = "default_container")]
    pub container: bool,
}

fn default_container() -> bool {
    true
}

pub struct SimulateOptions {
    pub keys: Vec<String>,
    pub bulk: bool,
    pub stop: Vec<String>,
    pub stop_all: bool,
}

/// Visible chat entries after each phase.
#[derive(Debug, PartialEq, Eq)]
pub struct SimulationReport {
    pub initial: Vec<String>,
    pub after_start: Vec<String>,
    pub after_inject: Vec<String>,
    pub after_stop: Vec<String>,
    pub hidden_at_end: usize,
}

pub fn load_fixture(path: &Path) -> Result<Fixture, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid fixture '{}': {}", path.display(), e))
}

pub fn run(
    fixture: &Fixture,
    config: EngineConfig,
    opts: &SimulateOptions,
) -> Result<SimulationReport, String> {
    run_on(MemoryDocument::new(), fixture, config, opts)
}

fn run_on(
    mut doc: MemoryDocument,
    fixture: &Fixture,
    config: EngineConfig,
    opts: &SimulateOptions,
) -> Result<SimulationReport, String> {
    let body = doc.body().ok_or_else(|| DomError::NoBody.to_string())?;
    let list = doc.create_element("div", &[("id", "chat")]);
    doc.append_child(body, list).map_err(|e| e.to_string())?;
    for entry in &fixture.entries {
        append_entry(&mut doc, list, entry, &config)?;
    }

    let mut engine = FilterEngine::new(doc, MemoryWatcher::new(), config.clone());
    let initial = visible(&engine, list);

    engine.start(opts.keys.iter().cloned());
    if opts.bulk {
        engine.start_bulk();
    }
    engine.settle();
    let after_start = visible(&engine, list);

    for entry in &fixture.injected {
        append_entry(engine.document_mut(), list, entry, &config)?;
    }
    engine.settle();
    let after_inject = visible(&engine, list);

    for key in &opts.stop {
        engine.stop(key);
    }
    if opts.stop_all {
        engine.stop_all();
    }
    engine.settle();

    Ok(SimulationReport {
        initial,
        after_start,
        after_inject,
        after_stop: visible(&engine, list),
        hidden_at_end: engine.hidden_count(),
    })
}

fn append_entry(
    doc: &mut MemoryDocument,
    list: NodeId,
    entry: &FixtureEntry,
    config: &EngineConfig,
) -> Result<(), String> {
    let class = if entry.container {
        config.container_class.as_str()
    } else {
        "system-message"
    };
    let node = doc.create_element("div", &[("id", entry.id.as_str()), ("class", class)]);
    for emote in &entry.emotes {
        let img = doc.create_element("img", &[(config.attribute.as_str(), emote.as_str())]);
        doc.append_child(node, img)
            .map_err(|e| format!("Fixture entry '{}': {}", entry.id, e))?;
    }
    doc.append_child(list, node)
        .map_err(|e| format!("Fixture entry '{}': {}", entry.id, e))
}

fn visible(engine: &FilterEngine<MemoryDocument, MemoryWatcher>, list: NodeId) -> Vec<String> {
    let doc = engine.document();
    doc.children(list)
        .iter()
        .map(|node| doc.attribute(*node, "id").unwrap_or("?").to_string())
        .collect()
}

pub fn print_report(report: &SimulationReport) {
    println!("Simulation");
    println!("  Initial:       {}", report.initial.join(" "));
    println!("  After start:   {}", report.after_start.join(" "));
    println!("  After inject:  {}", report.after_inject.join(" "));
    println!("  After stop:    {}", report.after_stop.join(" "));
    println!("  Still hidden:  {}", report.hidden_at_end);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Fixture {
        serde_json::from_str(
            r#"{
                "entries": [
                    {"id": "A", "emotes": ["X"]},
                    {"id": "B", "emotes": ["Y"]},
                    {"id": "C"},
                    {"id": "S", "emotes": ["X"], "container": false}
                ],
                "injected": [{"id": "D", "emotes": ["X"]}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_key_scenario() {
        let opts = SimulateOptions {
            keys: vec!["X".to_string()],
            bulk: false,
            stop: vec!["X".to_string()],
            stop_all: false,
        };
        let report = run(&fixture(), EngineConfig::default(), &opts).unwrap();

        assert_eq!(report.initial, vec!["A", "B", "C", "S"]);
        assert_eq!(report.after_start, vec!["B", "C", "S"]);
        assert_eq!(report.after_inject, vec!["B", "C", "S"]);
        assert_eq!(report.after_stop, vec!["A", "B", "C", "S", "D"]);
        assert_eq!(report.hidden_at_end, 0);
    }

    #[test]
    fn test_bulk_until_stop_all() {
        let opts = SimulateOptions {
            keys: Vec::new(),
            bulk: true,
            stop: Vec::new(),
            stop_all: true,
        };
        let report = run(&fixture(), EngineConfig::default(), &opts).unwrap();

        assert_eq!(report.after_start, vec!["C", "S"]);
        assert_eq!(report.after_inject, vec!["C", "S"]);
        assert_eq!(report.after_stop, vec!["A", "B", "C", "S", "D"]);
    }

    #[test]
    fn test_without_stop_entries_stay_hidden() {
        let opts = SimulateOptions {
            keys: vec!["X".to_string(), "Y".to_string()],
            bulk: false,
            stop: vec!["Y".to_string()],
            stop_all: false,
        };
        let report = run(&fixture(), EngineConfig::default(), &opts).unwrap();
        assert_eq!(report.after_stop, vec!["B", "C", "S"]);
        assert_eq!(report.hidden_at_end, 2);
    }

    #[test]
    fn test_document_without_body_is_an_error() {
        let opts = SimulateOptions {
            keys: vec!["X".to_string()],
            bulk: false,
            stop: Vec::new(),
            stop_all: false,
        };
        let err = run_on(MemoryDocument::without_body(), &fixture(), EngineConfig::default(), &opts)
            .unwrap_err();
        assert_eq!(err, "Document has no body");
    }
}
