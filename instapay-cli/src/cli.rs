use std::time::Duration;

use async_trait::async_trait;
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use instapay_app::{
    error::InstapayError,
    session::ActiveRequest,
    share::{CommandShare, NativeShare, NativeShareResult, NoNativeShare, ShareOutcome, SharePayload},
};
use instapay_core::{
    amount::{is_acceptable_input, AmountValidator},
    format::format_inr,
    payee::Payee,
    primitives::HistoryEntry,
    qr::render_terminal,
};
use tracing_subscriber::EnvFilter;

pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

pub fn progress_bar() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    Ok(pb)
}

/// Asks for an amount, rejecting keystroke sequences the amount field would not accept.
pub fn prompt_amount() -> anyhow::Result<String> {
    let amount = dialoguer::Input::<String>::new()
        .with_prompt("Amount (₹)")
        .validate_with(|raw: &String| -> Result<(), String> {
            if !is_acceptable_input(raw.trim()) {
                return Err("Use digits with at most two decimal places.".to_owned());
            }
            AmountValidator::validate(raw)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;
    Ok(amount)
}

/// Prints a transient notification.
pub fn notify(term: &Term, title: &str, description: &str) -> anyhow::Result<()> {
    term.write_line(&format!("{} {}", style(title).red().bold(), description))?;
    Ok(())
}

pub fn show_request(term: &Term, active: &ActiveRequest) -> anyhow::Result<()> {
    let payee = active.request.payee();
    term.write_line(&format!("{}", style("Scan & Pay").bold()))?;
    term.write_line("Use any UPI app to scan the QR code below.")?;
    term.write_line(&render_terminal(&active.uri)?)?;
    term.write_line(&format!(
        "Amount to be paid {}",
        style(format!("₹{}", format_inr(&active.request.amount()))).cyan().bold()
    ))?;
    term.write_line(&format!("Paying to: {} ({})", payee.name, payee.id))?;
    Ok(())
}

pub fn history_line(entry: &HistoryEntry) -> String {
    let when = entry
        .timestamp()
        .map(|t| t.format("%d %b %Y, %H:%M").to_string())
        .unwrap_or_else(|_| entry.date.clone());
    format!("{when}  ₹{}", format_inr(&entry.amount))
}

pub fn show_history(term: &Term, entries: &[HistoryEntry]) -> anyhow::Result<()> {
    if entries.is_empty() {
        term.write_line("No payment requests yet.")?;
        return Ok(());
    }
    term.write_line(&format!(
        "{} payment requests",
        style(entries.len()).cyan()
    ))?;
    for entry in entries {
        term.write_line(&format!(" - {}", history_line(entry)))?;
    }
    Ok(())
}

pub fn show_share_outcome(term: &Term, outcome: &ShareOutcome) -> anyhow::Result<()> {
    match outcome {
        ShareOutcome::Shared => term.write_line("Payment card shared.")?,
        ShareOutcome::Dismissed => {}
        ShareOutcome::Saved(path) => term.write_line(&format!(
            "Sharing not supported, saved the QR code to {}",
            style(path.display()).cyan()
        ))?,
    }
    Ok(())
}

pub fn show_share_error(term: &Term, err: &InstapayError) -> anyhow::Result<()> {
    match err {
        InstapayError::SharePreparation(_) => {
            notify(term, "Could not prepare share image.", &err.to_string())
        }
        _ => notify(term, "Uh oh! Something went wrong.", &err.to_string()),
    }
}

pub fn show_payee(term: &Term, payee: &Payee) -> anyhow::Result<()> {
    term.write_line(&format!("Payments will be sent to {}", style(&payee.id).cyan()))?;
    Ok(())
}

/// The share surface picked from configuration.
#[derive(Debug, Clone)]
pub enum ShareTarget {
    Command(CommandShare),
    Unavailable(NoNativeShare),
}

impl ShareTarget {
    pub fn from_config(command: Option<&str>, staging_dir: std::path::PathBuf) -> Self {
        command
            .and_then(|c| CommandShare::from_command_line(c, staging_dir))
            .map(Self::Command)
            .unwrap_or(Self::Unavailable(NoNativeShare))
    }
}

#[async_trait(?Send)]
impl NativeShare for ShareTarget {
    fn can_share(&self, payload: &SharePayload) -> bool {
        match self {
            Self::Command(c) => c.can_share(payload),
            Self::Unavailable(n) => n.can_share(payload),
        }
    }

    async fn share(&self, payload: &SharePayload) -> Result<NativeShareResult, InstapayError> {
        match self {
            Self::Command(c) => c.share(payload).await,
            Self::Unavailable(n) => n.share(payload).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use instapay_app::share::{NativeShare, ShareFile, SharePayload};
    use instapay_core::{amount::Amount, primitives::HistoryEntry};
    use pretty_assertions::assert_eq;

    use super::{history_line, ShareTarget};

    #[test]
    fn test_history_line() {
        let entry = HistoryEntry {
            id: "2024-05-01T10:20:30.000Z".to_owned(),
            amount: Amount::from_paise(12_345_600),
            date: "2024-05-01T10:20:30.000Z".to_owned(),
        };
        assert_eq!("01 May 2024, 10:20  ₹1,23,456.00", history_line(&entry));
    }

    #[test]
    fn test_history_line_bad_date() {
        let entry = HistoryEntry {
            id: "x".to_owned(),
            amount: Amount::from_paise(100),
            date: "yesterday".to_owned(),
        };
        assert_eq!("yesterday  ₹1.00", history_line(&entry));
    }

    #[test]
    fn test_share_target_from_config() {
        let payload = SharePayload {
            files: vec![ShareFile {
                name: "upi-qr-payment.png".to_owned(),
                mime: "image/png".to_owned(),
                bytes: vec![],
            }],
            title: "Scan to Pay".to_owned(),
            text: String::new(),
        };
        let none = ShareTarget::from_config(None, std::env::temp_dir());
        assert!(!none.can_share(&payload));
        let blank = ShareTarget::from_config(Some("   "), std::env::temp_dir());
        assert!(!blank.can_share(&payload));
        let command = ShareTarget::from_config(Some("kdeconnect-cli --share"), std::env::temp_dir());
        assert!(command.can_share(&payload));
    }
}
