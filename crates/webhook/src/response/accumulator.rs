//! [`PatchAccumulator`]: per-request store of JSON Patch operations and the
//! deny decision.

use common::{BuildError, DecisionResponse, PatchOp, PatchOperation};
use serde::Serialize;

use super::builder;

/// Append-only record of what a handler decided for one admission request.
///
/// A fresh accumulator is handed to the handler for every request and turned
/// into a [`DecisionResponse`] by [`PatchAccumulator::build`] once the handler
/// returns. Operations are emitted in the order they were staged.
///
/// Staging never fails. A value that cannot be serialized is remembered and
/// reported by `build`, unless the request was denied.
#[derive(Debug, Default)]
pub struct PatchAccumulator {
    pub(super) operations: Vec<PatchOperation>,
    /// The first staged value that failed to serialize.
    pub(super) unencodable: Option<BuildError>,
    pub(super) deny: String,
}

impl PatchAccumulator {
    /// Create an empty accumulator: no operations, allowed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny the request with `message`.
    ///
    /// Calling again replaces the message. An empty message means "allow".
    /// Staged operations are kept but never emitted while the request is denied.
    pub fn deny(&mut self, message: impl Into<String>) {
        self.deny = message.into();
    }

    /// Append an operation exactly as given.
    pub fn patch_raw(&mut self, operation: PatchOperation) {
        self.operations.push(operation);
    }

    /// Append an `add` operation.
    pub fn patch_add(&mut self, path: impl Into<String>, value: impl Serialize) {
        self.push_value(PatchOp::Add, path.into(), value);
    }

    /// Append a `remove` operation.
    pub fn patch_remove(&mut self, path: impl Into<String>) {
        self.patch_raw(PatchOperation {
            op: PatchOp::Remove,
            path: path.into(),
            value: None,
            from: None,
        });
    }

    /// Append a `replace` operation.
    pub fn patch_replace(&mut self, path: impl Into<String>, value: impl Serialize) {
        self.push_value(PatchOp::Replace, path.into(), value);
    }

    /// Append a `copy` operation from `from` to `path`.
    pub fn patch_copy(&mut self, path: impl Into<String>, from: impl Into<String>) {
        self.push_from(PatchOp::Copy, path.into(), from.into());
    }

    /// Append a `move` operation from `from` to `path`.
    pub fn patch_move(&mut self, path: impl Into<String>, from: impl Into<String>) {
        self.push_from(PatchOp::Move, path.into(), from.into());
    }

    /// Append a `test` operation.
    pub fn patch_test(&mut self, path: impl Into<String>, value: impl Serialize) {
        self.push_value(PatchOp::Test, path.into(), value);
    }

    /// Operations staged so far, in application order.
    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    /// The current deny message, if the request is denied.
    pub fn deny_message(&self) -> Option<&str> {
        (!self.deny.is_empty()).then_some(self.deny.as_str())
    }

    /// Turn the final state into the decision for request `uid`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the request is allowed and a staged value or
    /// the operation list cannot be encoded.
    pub fn build(self, uid: impl Into<String>) -> Result<DecisionResponse, BuildError> {
        builder::build(self, uid.into())
    }

    fn push_value<T: Serialize>(&mut self, op: PatchOp, path: String, value: T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => Some(v),
            Err(source) => {
                if self.unencodable.is_none() {
                    self.unencodable = Some(BuildError::Value {
                        index: self.operations.len(),
                        op,
                        path: path.clone(),
                        source,
                    });
                }
                None
            }
        };
        self.patch_raw(PatchOperation {
            op,
            path,
            value,
            from: None,
        });
    }

    fn push_from(&mut self, op: PatchOp, path: String, from: String) {
        self.patch_raw(PatchOperation {
            op,
            path,
            value: None,
            from: Some(from),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn typed_calls_set_op_and_fields() {
        let mut acc = PatchAccumulator::new();
        acc.patch_add("/a", 1);
        acc.patch_remove("/b");
        acc.patch_replace("/c", "x");
        acc.patch_copy("/d", "/a");
        acc.patch_move("/e", "/c");
        acc.patch_test("/a", true);

        let ops: Vec<Value> = acc
            .operations()
            .iter()
            .map(|op| serde_json::to_value(op).unwrap())
            .collect();
        assert_eq!(
            ops,
            vec![
                json!({"op": "add", "path": "/a", "value": 1}),
                json!({"op": "remove", "path": "/b"}),
                json!({"op": "replace", "path": "/c", "value": "x"}),
                json!({"op": "copy", "path": "/d", "from": "/a"}),
                json!({"op": "move", "path": "/e", "from": "/c"}),
                json!({"op": "test", "path": "/a", "value": true}),
            ]
        );
    }

    #[test]
    fn raw_operation_is_kept_verbatim() {
        let mut acc = PatchAccumulator::new();
        let op = PatchOperation {
            op: PatchOp::Add,
            path: "not a pointer".into(),
            value: Some(json!({"nested": [1, 2, 3]})),
            from: Some("/ignored".into()),
        };
        acc.patch_raw(op.clone());
        assert_eq!(acc.operations(), &[op]);
    }

    #[test]
    fn deny_overwrites_and_keeps_operations() {
        let mut acc = PatchAccumulator::new();
        assert_eq!(acc.deny_message(), None);
        acc.patch_add("/x", 1);
        acc.deny("first");
        acc.deny("second");
        acc.patch_add("/y", 2);
        assert_eq!(acc.deny_message(), Some("second"));
        assert_eq!(acc.operations().len(), 2);
    }

    #[test]
    fn empty_deny_means_allow() {
        let mut acc = PatchAccumulator::new();
        acc.deny("no");
        acc.deny("");
        assert_eq!(acc.deny_message(), None);
    }

    #[test]
    fn unencodable_value_is_recorded_not_raised() {
        struct Broken;
        impl Serialize for Broken {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("cannot encode"))
            }
        }

        let mut acc = PatchAccumulator::new();
        acc.patch_add("/ok", 1);
        acc.patch_replace("/broken", Broken);
        acc.patch_test("/also-broken", Broken);
        assert_eq!(acc.operations().len(), 3);
        assert!(matches!(
            acc.unencodable,
            Some(BuildError::Value { index: 1, .. })
        ));
    }
}
