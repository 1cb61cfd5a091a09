//! Login, refresh, and logout handlers.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use apixlab_core::config::Config;
use apixlab_core::wallet::{AutoApprove, SignApproval};

use super::status::print_summary;
use super::{build_sequencer, spawn_progress};

/// Asks on the terminal before signing. Anything but `y`/`yes` declines.
struct TerminalApproval;

impl TerminalApproval {
    fn confirm(prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let _ = io::stderr().flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        }
    }
}

impl SignApproval for TerminalApproval {
    fn approve_signature(&self, message: &str, address: &str) -> bool {
        eprintln!("Signature request for {address}:");
        for line in message.lines() {
            eprintln!("  {line}");
        }
        Self::confirm("Sign this message?")
    }
}

pub struct LoginOptions<'a> {
    pub config: &'a Config,
    pub connector: Option<&'a str>,
    pub invite_code: Option<&'a str>,
    pub auto_approve: bool,
}

pub async fn login(options: LoginOptions<'_>) -> Result<()> {
    let approval: Arc<dyn SignApproval> = if options.auto_approve {
        Arc::new(AutoApprove)
    } else {
        Arc::new(TerminalApproval)
    };
    let mut sequencer = build_sequencer(options.config, approval)?;
    if let Some(id) = options.connector {
        sequencer.choose_connector(id)?;
    }

    let progress = spawn_progress(sequencer.subscribe());
    let result = match sequencer.connect(None).await {
        Ok(()) => sequencer.login(options.invite_code).await,
        Err(e) => Err(e),
    };
    progress.abort();
    result?;

    print_summary(&sequencer);
    Ok(())
}

pub async fn refresh(config: &Config) -> Result<()> {
    let mut sequencer = build_sequencer(config, Arc::new(AutoApprove))?;
    if !sequencer.session().is_authenticated() {
        anyhow::bail!("Not logged in. Run `apixlab login` first.");
    }

    let progress = spawn_progress(sequencer.subscribe());
    let result = sequencer.refresh_profile().await;
    progress.abort();
    result?;

    print_summary(&sequencer);
    Ok(())
}

pub async fn logout(config: &Config) -> Result<()> {
    let mut sequencer = build_sequencer(config, Arc::new(AutoApprove))?;
    sequencer.logout().await?;
    println!("{}", sequencer.status().message);
    Ok(())
}
