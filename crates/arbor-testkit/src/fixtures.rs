//! Ready-made object models

use crate::model::ObjectModel;
use crate::provider::FakeProvider;
use arbor_core::ResourceNode;
use std::sync::Arc;

/// Root identifier of the workbook fixture
pub const EXCEL: &str = "Excel.Application";

const WORKBOOK_TOML: &str = include_str!("../fixtures/workbook.toml");

/// Spreadsheet-like object graph: application, workbooks, sheets, rows
pub fn workbook_model() -> ObjectModel {
    ObjectModel::from_toml_str(WORKBOOK_TOML).expect("workbook fixture is valid")
}

/// Provider serving the workbook fixture
pub fn workbook_provider() -> Arc<FakeProvider> {
    Arc::new(FakeProvider::new(workbook_model()))
}

/// Provider serving the workbook fixture plus its root node
pub fn workbook_root() -> (Arc<FakeProvider>, ResourceNode) {
    let provider = workbook_provider();
    let root = ResourceNode::create_root(provider.clone(), EXCEL).expect("fixture root");
    (provider, root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workbook_fixture_loads() {
        let model = workbook_model();
        assert_eq!(model.roots[EXCEL], "app");
        assert!(model.objects["sheets"].children.contains_key("Rows"));
    }
}
