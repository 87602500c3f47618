//! WireGuard key-pool maintenance: keeps a standing pool of pre-generated
//! key pairs so a newly desired peer can be assigned one without an
//! interface-creation tick blocking on key generation, then advertises the
//! pool's public halves to the controller.

use netctl_proc::{run_checked, AllowedProgram};
use netctl_store::NodeStore;
use netctl_types::WireGuardKeyPair;
use tracing::debug;

use crate::error::NetworktoolsError;

/// Target size of the local key pool. Not specified numerically upstream;
/// chosen generously relative to a single node's expected peer count so
/// key generation is never on the hot path of interface creation.
pub const KEY_POOL_SIZE: usize = 20;

async fn generate_key_pair() -> Result<WireGuardKeyPair, NetworktoolsError> {
    let private = run_checked(AllowedProgram::Wg, &["genkey"]).await?.trim().to_string();
    let output = netctl_proc::run_with_stdin(AllowedProgram::Wg, &["pubkey"], Some(private.as_bytes())).await?;
    if !output.success() {
        return Err(netctl_proc::ProcError::NonZeroExit {
            program: AllowedProgram::Wg.as_str(),
            args: vec!["pubkey".to_string()],
            exit_code: output.exit_code,
            stderr: output.stderr_lossy(),
        }
        .into());
    }
    let public = output.stdout_lossy().trim().to_string();
    Ok(WireGuardKeyPair { private, public })
}

/// Tops the pool up to [`KEY_POOL_SIZE`] and returns every public key
/// currently in it, for the caller to advertise via
/// [`netctl_controller::ControllerClient::sync_wireguard_keys`].
///
/// # Errors
///
/// Returns [`NetworktoolsError`] if key generation or persistence fails.
pub async fn sync_key_pool(store: &NodeStore) -> Result<Vec<String>, NetworktoolsError> {
    loop {
        let existing = store.get_all_wireguard_keys();
        if existing.len() >= KEY_POOL_SIZE {
            return Ok(existing.into_iter().map(|pair| pair.public).collect());
        }
        let pair = generate_key_pair().await?;
        debug!(public = %pair.public, "generated wireguard key pair for the pool");
        store.create_wireguard_key(pair)?;
    }
}
