//! `arcget status` – print the server status document.

use anyhow::Result;
use arcget_core::client::ArchiveClient;
use arcget_core::config::ClientConfig;

pub fn run_status(cfg: &ClientConfig) -> Result<()> {
    let client = ArchiveClient::from_config(cfg);
    let document = client.server_status()?;
    print!("{}", document);
    if !document.ends_with('\n') {
        println!();
    }
    Ok(())
}
