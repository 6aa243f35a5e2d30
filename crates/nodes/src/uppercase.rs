//! Uppercase Node: maps each item's `text` to `{ original, uppercase }`.

use node_core::{
    ExecutionId, FieldDefinition, FieldSchema, Item, NodeTypeDescription, ProgrammaticNode,
};
use serde_json::{Map, Value};
use tracing::{debug, debug_span};

pub const NODE_NAME: &str = "uppercaseNode";
/// Name of the `text` property and of the item key it is read from.
pub const TEXT: &str = "text";

/// The node declares a single `text` property. The host resolves it per item
/// and hands it over as the item's `text` key, which is what
/// [`UppercaseNode::execute`] reads.
pub fn description() -> NodeTypeDescription {
    NodeTypeDescription::transform(
        NODE_NAME,
        "Uppercase Node",
        "Converts input text to uppercase",
        FieldSchema::new(vec![FieldDefinition::string(TEXT, "Text")
            .with_placeholder("Enter text...")
            .described("Text to convert to uppercase, read from each item's `text` key")]),
    )
}

#[derive(Debug, Clone)]
pub struct UppercaseNode {
    description: NodeTypeDescription,
}

impl UppercaseNode {
    pub fn new() -> Self {
        Self {
            description: description(),
        }
    }
}

impl Default for UppercaseNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgrammaticNode for UppercaseNode {
    fn description(&self) -> &NodeTypeDescription {
        &self.description
    }

    /// A missing or non-string `text` is treated as `""`.
    fn execute(&self, items: &[Item]) -> Vec<Item> {
        let span = debug_span!("execute", node = NODE_NAME, execution_id = %ExecutionId::new_random());
        let _entered = span.enter();

        let output: Vec<Item> = items
            .iter()
            .map(|item| {
                let text = item.get_str(TEXT).unwrap_or_default();
                let mut json = Map::new();
                json.insert("original".to_owned(), Value::String(text.to_owned()));
                json.insert("uppercase".to_owned(), Value::String(text.to_uppercase()));
                Item { json }
            })
            .collect();

        debug!(items = output.len(), "uppercased items");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items(values: Vec<Value>) -> Vec<Item> {
        values.into_iter().map(Item::from_value).collect()
    }

    #[test]
    fn test_declared_property_is_the_key_read_from_items() {
        let node = UppercaseNode::new();
        let fields: Vec<&str> = node
            .description()
            .properties
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(fields, vec![TEXT]);

        let out = node.execute(&items(vec![json!({ fields[0]: "hi" })]));
        assert_eq!(out[0].get_str("uppercase"), Some("HI"));
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(UppercaseNode::new().execute(&[]).is_empty());
    }

    #[test]
    fn test_single_item() {
        let out = UppercaseNode::new().execute(&items(vec![json!({ "text": "abc" })]));
        assert_eq!(out, items(vec![json!({ "original": "abc", "uppercase": "ABC" })]));
    }

    #[test]
    fn test_empty_and_missing_text() {
        let out = UppercaseNode::new().execute(&items(vec![
            json!({ "text": "" }),
            json!({}),
            json!({ "text": 42 }),
        ]));
        let expected = json!({ "original": "", "uppercase": "" });
        assert_eq!(out, items(vec![expected.clone(), expected.clone(), expected]));
    }

    #[test]
    fn test_unicode_case_mapping() {
        let out = UppercaseNode::new().execute(&items(vec![json!({ "text": "straße ñ" })]));
        assert_eq!(out[0].get_str("uppercase"), Some("STRASSE Ñ"));
    }

    #[test]
    fn test_order_and_cardinality_preserved() {
        let input = items(vec![
            json!({ "text": "c" }),
            json!({ "text": "a" }),
            json!({ "text": "b" }),
        ]);
        let out = UppercaseNode::new().execute(&input);
        assert_eq!(out.len(), input.len());
        let originals: Vec<&str> = out.iter().filter_map(|i| i.get_str("original")).collect();
        assert_eq!(originals, vec!["c", "a", "b"]);
    }
}
