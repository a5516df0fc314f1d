//! Update batches - the payload of one `redraw` notification.
//!
//! A redraw notification carries a list of updates, each an update name
//! followed by one or more argument tuples:
//!
//! ```text
//! [ ["cursor_goto", [0, 4]],
//!   ["put", ["h"], ["i"]],
//!   ["highlight_set", [{"bold": true}]] ]
//! ```
//!
//! A batch is built on the remote-event thread, moved into a work item and
//! applied once on the presentation thread.

use serde_json::Value;

use crate::error::BridgeError;
use crate::profiling;
use crate::surface::PresentationSurface;

/// One named update with its argument tuples, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Update kind (e.g. `put`, `cursor_goto`).
    pub name: String,
    /// Argument tuples; the handler runs once per tuple.
    pub arg_tuples: Vec<Vec<Value>>,
}

/// Ordered updates from a single redraw notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBatch {
    updates: Vec<Update>,
}

impl UpdateBatch {
    /// Build a batch from a redraw notification's params.
    pub fn from_redraw(params: Vec<Value>) -> Result<Self, BridgeError> {
        let updates = params
            .into_iter()
            .map(parse_update)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { updates })
    }

    /// Updates in arrival order.
    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    /// Number of updates (not tuples).
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// `true` if the notification carried no updates.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Apply every update in order, then refresh the cursor once.
    ///
    /// Stops at the first failing handler; the cursor refresh is skipped
    /// in that case since the batch was not fully applied.
    pub fn apply<S: PresentationSurface>(&self, surface: &mut S) -> Result<(), BridgeError> {
        for update in &self.updates {
            for args in &update.arg_tuples {
                profiling::scope(&update.name, || surface.apply_update(&update.name, args))?;
            }
        }
        profiling::scope("cursor_refresh", || surface.cursor_refresh())
    }
}

fn parse_update(update: Value) -> Result<Update, BridgeError> {
    let parts = match update {
        Value::Array(parts) => parts,
        other => {
            return Err(BridgeError::MalformedUpdate(format!(
                "update is not an array: {other}"
            )))
        }
    };
    let mut parts = parts.into_iter();
    let name = match parts.next() {
        Some(Value::String(name)) => name,
        Some(other) => {
            return Err(BridgeError::MalformedUpdate(format!(
                "update name is not a string: {other}"
            )))
        }
        None => return Err(BridgeError::MalformedUpdate("empty update".to_string())),
    };
    let arg_tuples = parts
        .map(|args| match args {
            Value::Array(args) => Ok(args),
            other => Err(BridgeError::MalformedUpdate(format!(
                "arguments of '{name}' are not an array: {other}"
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Update { name, arg_tuples })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_redraw_keeps_update_and_tuple_order() {
        let params = vec![
            json!(["cursor_goto", [0, 4]]),
            json!(["put", ["h"], ["i"]]),
            json!(["clear"]),
        ];
        let batch = UpdateBatch::from_redraw(params).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.updates()[0].name, "cursor_goto");
        assert_eq!(batch.updates()[0].arg_tuples, vec![vec![json!(0), json!(4)]]);
        assert_eq!(
            batch.updates()[1].arg_tuples,
            vec![vec![json!("h")], vec![json!("i")]]
        );
        assert!(batch.updates()[2].arg_tuples.is_empty());
    }

    #[test]
    fn test_from_redraw_empty_params() {
        let batch = UpdateBatch::from_redraw(Vec::new()).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_from_redraw_rejects_non_string_name() {
        let result = UpdateBatch::from_redraw(vec![json!([42, [1]])]);
        assert!(matches!(result, Err(BridgeError::MalformedUpdate(_))));
    }

    #[test]
    fn test_from_redraw_rejects_non_array_update() {
        let result = UpdateBatch::from_redraw(vec![json!("put")]);
        assert!(matches!(result, Err(BridgeError::MalformedUpdate(_))));
    }

    #[test]
    fn test_from_redraw_rejects_non_array_tuple() {
        let result = UpdateBatch::from_redraw(vec![json!(["put", "a"])]);
        assert!(matches!(result, Err(BridgeError::MalformedUpdate(_))));
    }

    #[test]
    fn test_from_redraw_rejects_empty_update() {
        let result = UpdateBatch::from_redraw(vec![json!([])]);
        assert!(matches!(result, Err(BridgeError::MalformedUpdate(_))));
    }
}
