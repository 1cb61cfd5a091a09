//! Session status display.

use std::sync::Arc;

use anyhow::Result;
use apixlab_core::config::Config;
use apixlab_core::sequencer::AuthSequencer;
use apixlab_core::session::mask_secret;
use apixlab_core::wallet::AutoApprove;

pub async fn run(config: &Config) -> Result<()> {
    let mut sequencer = super::build_sequencer(config, Arc::new(AutoApprove))?;

    // Rehydrated sessions without a profile get one silent fetch.
    sequencer.run_scheduled().await?;

    print_summary(&sequencer);
    Ok(())
}

pub(super) fn print_summary(sequencer: &AuthSequencer) {
    let session = sequencer.session();
    let Some(credentials) = session.credentials() else {
        println!("Not logged in.");
        println!("Next: {}", sequencer.header());
        return;
    };

    if session.profile_name().is_empty() {
        println!("Logged in (profile not loaded).");
    } else {
        println!("Logged in as {}.", session.profile_name());
    }
    println!("User ID: {}", credentials.user_id);
    println!("Token:   {}", mask_secret(&credentials.token));
}
