//! Plan computation from a resource schema.
//!
//! The host proposes a new state from configuration. Planning fills in the
//! computed attributes the user did not set and reports what changes.

use serde_json::{Map, Value};

use crate::schema::Schema;
use crate::types::{AttributeChange, PlanResult};
use crate::value;

const LAST_UPDATED: &str = "last_updated";

/// Plans a create, update or destroy.
///
/// - Destroy (`proposed` is null): nothing to plan.
/// - Create (no prior state): computed attributes missing from `proposed`
///   become unknown, every set attribute is an addition.
/// - Update: computed attributes missing from `proposed` keep their prior
///   value; `last_updated` becomes unknown when anything changed. A change to
///   a `force_new` attribute requires replacement.
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: Value) -> PlanResult {
    let Value::Object(mut planned) = proposed else {
        return PlanResult::no_change(Value::Null);
    };
    let prior = prior.and_then(Value::as_object);

    match prior {
        None => plan_create(schema, planned),
        Some(prior) => {
            for (name, attr) in &schema.block.attributes {
                if attr.flags.computed && is_unset(planned.get(name)) {
                    if let Some(previous) = prior.get(name) {
                        planned.insert(name.clone(), previous.clone());
                    }
                }
            }
            plan_update(schema, prior, planned)
        },
    }
}

fn plan_create(schema: &Schema, mut planned: Map<String, Value>) -> PlanResult {
    let mut changes = Vec::new();
    for (name, attr) in &schema.block.attributes {
        if attr.flags.computed && is_unset(planned.get(name)) {
            planned.insert(name.clone(), value::unknown());
        } else if let Some(v) = planned.get(name).filter(|v| !v.is_null()) {
            changes.push(AttributeChange::added(name, v.clone()));
        }
    }
    PlanResult::with_changes(Value::Object(planned), changes, false)
}

fn plan_update(
    schema: &Schema,
    prior: &Map<String, Value>,
    mut planned: Map<String, Value>,
) -> PlanResult {
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in &schema.block.attributes {
        if name == LAST_UPDATED {
            continue;
        }
        let before = prior.get(name).cloned().unwrap_or(Value::Null);
        let after = planned.get(name).cloned().unwrap_or(Value::Null);
        if before != after {
            requires_replace |= attr.force_new;
            changes.push(AttributeChange::modified(name, before, after));
        }
    }

    if !changes.is_empty() && schema.attribute(LAST_UPDATED).is_some() {
        planned.insert(LAST_UPDATED.to_string(), value::unknown());
    }
    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn is_unset(value: Option<&Value>) -> bool {
    value.is_none_or(Value::is_null)
}
