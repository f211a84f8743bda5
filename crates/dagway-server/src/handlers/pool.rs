//! `pool`: create, read and delete slot pools.

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::envelope::HandlerOutput;

const SET_FORMAT_HINT: &str = "Expected input in the form: NAME SLOT_COUNT POOL_DESCRIPTION";

/// One of `set`, `get` or `delete`, checked in that order.
pub fn pool(ctx: &HandlerContext<'_>) -> HandlerResult {
    let store = &ctx.state.metadata;

    if let Some(spec) = ctx.args.non_empty("set") {
        let (name, slots, description) = parse_set(spec)?;
        let (pool, changed) = store.set_pool(name, slots, &description)?;
        if !changed {
            tracing::debug!(pool = name, "Pool unchanged");
        }
        return encode(&pool);
    }

    if let Some(name) = ctx.args.non_empty("get") {
        return match store.get_pool(name)? {
            Some(pool) => encode(&pool),
            None => Err(HandlerError::BadRequest(format!(
                "The {} record does not exist",
                name
            ))),
        };
    }

    if let Some(name) = ctx.args.non_empty("delete") {
        store.delete_pool(name)?;
        return Ok(HandlerOutput::new("The record has been deleted"));
    }

    Err(HandlerError::BadRequest(
        "One of the arguments set, get or delete should be provided".to_string(),
    ))
}

/// Split `NAME SLOTS [DESCRIPTION...]`. The description keeps its inner spacing
/// collapsed to single spaces and may be empty.
fn parse_set(spec: &str) -> Result<(&str, i64, String), HandlerError> {
    let mut parts = spec.split_whitespace();
    let (Some(name), Some(slots)) = (parts.next(), parts.next()) else {
        return Err(HandlerError::BadRequest(SET_FORMAT_HINT.to_string()));
    };
    let slots = slots.parse::<i64>().map_err(|_| {
        HandlerError::BadRequest(format!(
            "The slot count '{}' is not an integer. {}",
            slots, SET_FORMAT_HINT
        ))
    })?;
    let description = parts.collect::<Vec<_>>().join(" ");
    Ok((name, slots, description))
}

fn encode(pool: &dagway_metadata::Pool) -> HandlerResult {
    serde_json::to_value(pool)
        .map(HandlerOutput::new)
        .map_err(|e| HandlerError::Internal(format!("Failed to encode pool: {}", e)))
}
