//! Originating identity sent by the broker host
//!
//! The header value is `<platform> <base64 JSON>`; on Kubernetes the JSON is
//! the requesting user's `UserInfo`.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fuse_broker_models::UserInfo;

pub const ORIGINATING_IDENTITY_HEADER: &str = "X-Broker-API-Originating-Identity";

pub fn parse_originating_identity(value: &str) -> Result<UserInfo> {
    let (platform, encoded) = value
        .trim()
        .split_once(' ')
        .context("originating identity must be '<platform> <value>'")?;

    if platform != "kubernetes" {
        bail!("unsupported originating identity platform: {}", platform);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .context("originating identity is not valid base64")?;
    let user: UserInfo =
        serde_json::from_slice(&decoded).context("originating identity is not valid JSON")?;

    if user.username.is_empty() {
        bail!("originating identity has no username");
    }
    Ok(user)
}

#[cfg(test)]
pub(crate) fn encode_identity(username: &str) -> String {
    let json = serde_json::json!({ "username": username, "uid": "1234", "groups": ["system:authenticated"] });
    format!("kubernetes {}", STANDARD.encode(json.to_string()))
}
