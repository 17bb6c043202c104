use std::env;

use clap::Parser;
use console::{style, Term};
use instapay_app::{
    card::CardRenderer,
    error::InstapayError,
    http::CrossPlatformHttpClient,
    localstore::{file::FileSnapshotStorage, PaymentHistoryStore},
    session::{DisplayOutcome, PaymentSession},
    share::{DirectoryDownloadSink, ShareDispatcher},
};
use instapay_core::error::InstapayCoreError;
use instapaycli::{
    cli::{self, ShareTarget},
    config::{Command, Opts},
};
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    if matches!(env::var("INSTAPAY_APP_ENV"), Ok(v) if v.trim() == "dev") {
        if let Err(e) = dotenvy::dotenv() {
            eprintln!("Could not load .env file: {e}");
        }
    }

    let opts = Opts::parse();
    cli::init_tracing(opts.log_json);

    let term = Term::stdout();
    let data_dir = opts.history.data_dir()?;
    let storage = FileSnapshotStorage::with_dir(&data_dir);
    let mut history = PaymentHistoryStore::load(storage, opts.history.policy()).await;

    let (amount, share) = match opts.command.clone() {
        Command::History => {
            cli::show_history(&term, history.entries())?;
            return Ok(());
        }
        Command::ClearHistory { yes } => {
            if history.is_empty() {
                term.write_line("History is already empty.")?;
                return Ok(());
            }
            let confirmed = yes
                || dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Delete {} payment requests from history?",
                        history.entries().len()
                    ))
                    .default(false)
                    .interact()?;
            if confirmed {
                match history.clear().await {
                    Ok(()) => term.write_line("History cleared.")?,
                    Err(e) => cli::notify(&term, "Could not clear history.", &e.to_string())?,
                }
            }
            return Ok(());
        }
        Command::Info => {
            let version = style(env!("CARGO_PKG_VERSION")).cyan();
            let history_path = style(history.storage().dir().display()).cyan();
            let endpoint = if opts.qr.offline {
                style("offline".to_owned()).cyan()
            } else {
                style(opts.qr.qr_endpoint.to_string()).cyan()
            };
            term.write_line(&format!("Version: {version}"))?;
            term.write_line(&format!("History: {history_path}"))?;
            term.write_line(&format!("QR endpoint: {endpoint}"))?;
            if let Ok(payee) = opts.payee.payee() {
                cli::show_payee(&term, &payee)?;
            }
            return Ok(());
        }
        Command::Generate { amount, share } => (amount, share),
        Command::Share { amount } => (amount, true),
    };

    let payee = opts.payee.payee()?;
    let amount = match amount {
        Some(amount) => amount,
        None => {
            cli::show_payee(&term, &payee)?;
            cli::prompt_amount()?
        }
    };

    let mut session = PaymentSession::builder()
        .with_payee(payee)
        .with_qr_source(opts.qr.source())
        .with_loader(CrossPlatformHttpClient::new())
        .with_history(history)
        .build()?;

    let progress_bar = cli::progress_bar()?;
    progress_bar.set_message("Generating QR code ...");
    let outcome = session.submit(&amount).await;
    progress_bar.finish_and_clear();

    match outcome {
        Ok(DisplayOutcome::Displayed { history_error }) => {
            if let Some(active) = session.active() {
                cli::show_request(&term, active)?;
            }
            if let Some(e) = history_error {
                warn!("payment request not saved to history: {e}");
                cli::notify(&term, "Not saved to history.", &e.to_string())?;
            }
        }
        Ok(DisplayOutcome::Superseded) => {
            info!("qr load superseded by a newer request");
            return Ok(());
        }
        Err(InstapayError::Core(InstapayCoreError::Amount(e))) => {
            term.write_line(&format!("{}", style(e).red()))?;
            return Ok(());
        }
        Err(e) => {
            cli::notify(&term, "Could not load the QR code.", &e.to_string())?;
            return Ok(());
        }
    }

    if share {
        let staging_dir = data_dir.join("share");
        let dispatcher = ShareDispatcher::new(
            ShareTarget::from_config(opts.share.share_command.as_deref(), staging_dir),
            DirectoryDownloadSink::new(opts.share.download_dir()?),
        );

        let progress_bar = cli::progress_bar()?;
        progress_bar.set_message("Preparing share image ...");
        let result = session
            .share(&CardRenderer::new(opts.share.card_layout()), &dispatcher)
            .await;
        progress_bar.finish_and_clear();

        match result {
            Ok(outcome) => {
                info!(?outcome, "share dispatched");
                cli::show_share_outcome(&term, &outcome)?
            }
            Err(e) => {
                warn!("share failed: {e}");
                cli::show_share_error(&term, &e)?
            }
        }
    }

    Ok(())
}
