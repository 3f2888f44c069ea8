//! Key generation for worker identities

use std::path::Path;

use dcf_worker::{WorkerIdentity, WorkerResult};

pub fn handle_keygen_command(path: &Path) -> WorkerResult<()> {
    let identity = WorkerIdentity::generate(path)?;

    println!("✓ Generated worker key pair");
    println!("  Private key: {}", identity.private_key_path().display());
    println!("  Public key:  {}", identity.public_key_path().display());
    println!("  Share the public key with the coordinator to allow registration.");
    Ok(())
}
