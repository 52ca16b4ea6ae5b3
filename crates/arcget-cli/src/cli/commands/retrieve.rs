//! `arcget retrieve <file_id>` – fetch a stored file to disk.

use anyhow::Result;
use arcget_core::checksum;
use arcget_core::client::ArchiveClient;
use arcget_core::config::ClientConfig;
use std::path::Path;

pub fn run_retrieve(
    cfg: &ClientConfig,
    file_id: &str,
    file_version: Option<u32>,
    output_dir: Option<&Path>,
    with_checksum: bool,
) -> Result<()> {
    let dest_dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => match &cfg.retrieve_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        },
    };

    let client = ArchiveClient::from_config(cfg);
    let report = client.retrieve_to(file_id, file_version, &dest_dir)?;
    println!(
        "Retrieved {} ({} bytes) to {}",
        file_id,
        report.bytes,
        report.path.display()
    );

    if with_checksum {
        let digest = checksum::sha256_path(&report.path)?;
        println!("{}  {}", digest, report.path.display());
    }
    Ok(())
}
