//! `arbor walk`: acquire a path of children and report reads and releases

use crate::path::parse_segment;
use anyhow::{Context, Result};
use arbor_core::{ResourceNode, TreeConfig, Value};
use arbor_testkit::{FakeProvider, HandleKind, ObjectModel};
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub struct WalkArgs {
    /// Object model (TOML)
    #[arg(short, long)]
    pub model: PathBuf,

    /// Root identifier to instantiate
    #[arg(short, long)]
    pub root: String,

    /// Segments to acquire, `Name` or `Name:arg1,arg2`
    pub path: Vec<String>,

    /// Property to read on the last node (repeatable)
    #[arg(long = "read")]
    pub reads: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct WalkReport {
    pub root: String,
    pub path: Vec<String>,
    pub values: BTreeMap<String, Value>,
    pub released: Vec<String>,
}

pub fn run(args: WalkArgs, config: TreeConfig) -> Result<()> {
    let model = ObjectModel::load_from_file(&args.model)?;
    let report = walk(model, config, &args.root, &args.path, &args.reads)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} / {}", report.root, report.path.join(" / "));
        for (name, value) in &report.values {
            println!("  {name} = {value}");
        }
        println!("released:");
        for entry in &report.released {
            println!("  {entry}");
        }
    }
    Ok(())
}

pub fn walk(
    model: ObjectModel,
    config: TreeConfig,
    identifier: &str,
    path: &[String],
    reads: &[String],
) -> Result<WalkReport> {
    let provider = Arc::new(FakeProvider::new(model));
    let root = ResourceNode::create_root_with_config(provider.clone(), identifier, config)
        .with_context(|| format!("creating root {identifier}"))?;

    // The root is closed on every exit path, including failed lookups.
    let values = read_along(&root, path, reads);
    root.close();
    let values = values?;

    let released = provider
        .release_log()
        .into_iter()
        .map(|entry| match entry.kind {
            HandleKind::Application => format!("{} (application)", entry.object),
            HandleKind::Dispatch => entry.object,
        })
        .collect();
    info!(root = identifier, depth = path.len(), "walk finished");

    Ok(WalkReport {
        root: identifier.to_string(),
        path: path.to_vec(),
        values,
        released,
    })
}

fn read_along(
    root: &ResourceNode,
    path: &[String],
    reads: &[String],
) -> Result<BTreeMap<String, Value>> {
    let mut current = root.clone();
    for raw in path {
        let segment = parse_segment(raw)?;
        current = current
            .acquire_child(&segment.name, &segment.args)
            .with_context(|| format!("acquiring {raw}"))?;
    }

    let mut values = BTreeMap::new();
    for name in reads {
        let value = current
            .get(name, &[])
            .with_context(|| format!("reading {name}"))?;
        values.insert(name.clone(), value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_testkit::{workbook_model, EXCEL};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_walk_reads_and_releases_bottom_up() {
        let report = walk(
            workbook_model(),
            TreeConfig::default(),
            EXCEL,
            &strings(&["Workbooks", "Item:1", "Sheets", "Item:2"]),
            &strings(&["Name", "Index"]),
        )
        .unwrap();

        assert_eq!(report.values["Name"], Value::from("Sheet2"));
        assert_eq!(report.values["Index"], Value::Int(2));
        assert_eq!(
            report.released,
            strings(&[
                "sheet2",
                "sheets",
                "book1",
                "workbooks",
                "app",
                "app (application)",
            ])
        );
    }

    #[test]
    fn test_failed_lookup_still_releases_root() {
        let err = walk(
            workbook_model(),
            TreeConfig::default(),
            EXCEL,
            &strings(&["Sheets", "Item:9"]),
            &[],
        )
        .unwrap_err();

        assert!(format!("{err:#}").contains("acquiring Item:9"));
    }
}
