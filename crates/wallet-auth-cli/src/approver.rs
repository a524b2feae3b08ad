/*
[INPUT]:  Connect and sign prompts raised by the local wallet
[OUTPUT]: User decisions read from the terminal
[POS]:    CLI interaction layer - wallet approval prompts
[UPDATE]: When prompt wording or approval policy changes
*/

use async_trait::async_trait;
use dialoguer::{Confirm, theme::ColorfulTheme};
use tracing::warn;
use wallet_auth_adapter::Approver;

/// Asks the user on the terminal before connecting or signing
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalApprover {
    assume_yes: bool,
}

impl TerminalApprover {
    /// `assume_yes` accepts every prompt without asking
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    async fn confirm(&self, prompt: String) -> bool {
        if self.assume_yes {
            return true;
        }

        let answer = tokio::task::spawn_blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .default(false)
                .interact()
        })
        .await;

        match answer {
            Ok(Ok(accepted)) => accepted,
            Ok(Err(err)) => {
                warn!(error = %err, "prompt failed, treating as rejection");
                false
            }
            Err(err) => {
                warn!(error = %err, "prompt task failed, treating as rejection");
                false
            }
        }
    }
}

#[async_trait]
impl Approver for TerminalApprover {
    async fn approve_connect(&self, provider_id: &str, address: &str) -> bool {
        self.confirm(format!("Connect wallet {address} ({provider_id})?"))
            .await
    }

    async fn approve_sign(&self, address: &str, message: &str) -> bool {
        eprintln!("\n{message}\n");
        self.confirm(format!("Sign the message above with {address}?"))
            .await
    }
}
