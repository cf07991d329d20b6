use crate::error::IdentityError;
use ethers::abi::{Abi, Function};

/// Name of the registry view that reports an account's identity level.
pub const GET_PROFILE_LEVEL: &str = "GetProfileLevel";

/// Published ABI fragment of the profile registry (read-only subset).
pub const PROFILE_REGISTRY_ABI: &str = r#"[{
    "constant": true,
    "inputs": [
        {
            "name": "_owner",
            "type": "address"
        }
    ],
    "name": "GetProfileLevel",
    "outputs": [
        {
            "name": "",
            "type": "uint8"
        }
    ],
    "payable": false,
    "stateMutability": "view",
    "type": "function"
}]"#;

/// Parse the registry ABI and return the `GetProfileLevel` definition.
///
/// Runs once at construction; a malformed ABI or a missing function makes the
/// extension unusable, so both are reported as configuration errors.
pub fn get_profile_level_function() -> Result<Function, IdentityError> {
    let abi = Abi::load(PROFILE_REGISTRY_ABI.as_bytes())
        .map_err(|e| IdentityError::Configuration(format!("failed to parse profile registry ABI: {}", e)))?;

    let function = abi.function(GET_PROFILE_LEVEL).map_err(|_| {
        IdentityError::Configuration(format!("failed to find {} in parsed ABI", GET_PROFILE_LEVEL))
    })?;

    Ok(function.clone())
}
