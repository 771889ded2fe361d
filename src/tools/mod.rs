//! The representative tool handlers (§4.10 of SPEC_FULL.md). The real
//! ~100-tool GitHub surface is out of scope (§1/§5); these are the
//! handlers the registry/dispatch/shaper/lockdown machinery exercises.

pub mod actions;
pub mod context;
pub mod issues;
pub mod pull_requests;
pub mod repos;
pub mod users;

use crate::registry::catalog::ToolRecord;

/// Build the full process-wide tool catalog.
pub fn build_catalog() -> Vec<ToolRecord> {
    let mut tools = Vec::new();
    tools.extend(context::tools());
    tools.extend(repos::tools());
    tools.extend(issues::tools());
    tools.extend(pull_requests::tools());
    tools.extend(actions::tools());
    tools.extend(users::tools());
    tools
}
