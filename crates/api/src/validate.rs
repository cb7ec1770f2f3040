//! Input validation and defaulting for create requests. Runs before any call
//! reaches the orchestrator.

use hashirama_core::{ChainRequest, MadaraChainSpec, DEFAULT_PORT, MAX_NAME_LEN};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::{GatewayError, GatewayResult};

// RFC 1123 label: lowercase alphanumerics and '-', alphanumeric at both ends
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("static name regex"));

pub fn validate_name(name: &str) -> GatewayResult<()> {
    if name.is_empty() {
        return Err(GatewayError::InvalidInput("name is required".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(GatewayError::InvalidInput(format!("name must be at most {} characters", MAX_NAME_LEN)));
    }
    if !NAME_RE.is_match(name) {
        return Err(GatewayError::InvalidInput(format!(
            "invalid name {:?}: must consist of lowercase alphanumeric characters or '-', and start and end with an alphanumeric character",
            name
        )));
    }
    Ok(())
}

/// Validate a create request and produce the name plus defaulted spec.
pub fn validate_request(req: &ChainRequest) -> GatewayResult<(String, MadaraChainSpec)> {
    validate_name(&req.name)?;
    if req.chain_id.is_empty() {
        return Err(GatewayError::InvalidInput("chainID is required".into()));
    }
    let replicas = match req.replicas {
        Some(n) if n > i32::MAX as i64 => {
            return Err(GatewayError::InvalidInput(format!("replicas out of range: {}", n)));
        }
        Some(n) if n > 0 => Some(n as i32),
        _ => None,
    };
    if let Some(port) = req.port.filter(|p| *p != DEFAULT_PORT as i64) {
        debug!(port, pinned = DEFAULT_PORT, "ignoring caller-supplied port");
    }
    Ok((req.name.clone(), MadaraChainSpec::with_defaults(req.chain_id.clone(), replicas)))
}
