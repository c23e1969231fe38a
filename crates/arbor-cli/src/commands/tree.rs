//! `arbor tree`: print a model's object graph

use anyhow::Result;
use arbor_testkit::ObjectModel;
use std::collections::BTreeSet;
use std::path::Path;

pub fn run(model_path: &Path) -> Result<()> {
    let model = ObjectModel::load_from_file(model_path)?;
    for line in render(&model) {
        println!("{line}");
    }
    Ok(())
}

pub fn render(model: &ObjectModel) -> Vec<String> {
    let mut lines = Vec::new();
    for (identifier, object) in &model.roots {
        lines.push(format!("{identifier} -> {object}"));
        let mut visiting = BTreeSet::new();
        render_object(model, object, 1, &mut visiting, &mut lines);
    }
    lines
}

fn render_object(
    model: &ObjectModel,
    object: &str,
    depth: usize,
    visiting: &mut BTreeSet<String>,
    lines: &mut Vec<String>,
) {
    let Some(spec) = model.objects.get(object) else {
        return;
    };
    if !visiting.insert(object.to_string()) {
        return;
    }

    let indent = "  ".repeat(depth);
    for (name, value) in &spec.properties {
        lines.push(format!("{indent}{name} = {}", value.to_value()));
    }
    for method in &spec.methods {
        lines.push(format!("{indent}{method}()"));
    }
    for (name, target) in &spec.children {
        lines.push(format!("{indent}{name} -> {target}"));
        render_object(model, target, depth + 1, visiting, lines);
    }
    for (name, targets) in &spec.items {
        for (i, target) in targets.iter().enumerate() {
            lines.push(format!("{indent}{name}({}) -> {target}", i + 1));
            render_object(model, target, depth + 1, visiting, lines);
        }
    }

    visiting.remove(object);
}
