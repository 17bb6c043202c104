use std::path::PathBuf;

use clap::{Parser, Subcommand};
use instapay_app::{
    card::CardLayout,
    config_path,
    error::InstapayError,
    localstore::PersistPolicy,
};
use instapay_core::{
    payee::Payee,
    qr::{LocalQrRenderer, QrImageResolver, QrRenderOptions, DEFAULT_QR_ENDPOINT},
};
use url::Url;

#[derive(Parser, Debug)]
#[command(arg_required_else_help(true), version)]
pub struct Opts {
    #[clap(flatten)]
    pub payee: PayeeConfig,

    #[clap(flatten)]
    pub qr: QrConfig,

    #[clap(flatten)]
    pub history: HistoryConfig,

    #[clap(flatten)]
    pub share: ShareConfig,

    /// Emit logs as JSON
    #[clap(long, env = "INSTAPAY_LOG_JSON")]
    pub log_json: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate a payment QR code. Prompts for the amount when it is omitted.
    Generate {
        #[arg(allow_hyphen_values = true)]
        amount: Option<String>,

        /// Share the payment card right away
        #[clap(long)]
        share: bool,
    },

    /// Generate a payment QR code and share it as an image
    Share {
        #[arg(allow_hyphen_values = true)]
        amount: Option<String>,
    },

    /// Show issued payment requests, most recent first
    History,

    /// Delete the local payment history
    ClearHistory {
        /// Skip the confirmation prompt
        #[clap(long)]
        yes: bool,
    },

    /// Show version and configuration
    Info,
}

#[derive(Debug, Clone, Default, Parser)]
pub struct PayeeConfig {
    /// Settlement identifier (VPA or mobile number) payments are sent to
    #[clap(long, env = "INSTAPAY_PAYEE_ID")]
    pub payee_id: Option<String>,

    /// Name shown to the payer
    #[clap(long, env = "INSTAPAY_PAYEE_NAME")]
    pub payee_name: Option<String>,
}

impl PayeeConfig {
    pub fn payee(&self) -> Result<Payee, InstapayError> {
        let id = self
            .payee_id
            .clone()
            .ok_or(InstapayError::MissingComponent("--payee-id / INSTAPAY_PAYEE_ID"))?;
        let name = self
            .payee_name
            .clone()
            .ok_or(InstapayError::MissingComponent("--payee-name / INSTAPAY_PAYEE_NAME"))?;
        Ok(Payee::new(id, name)?)
    }
}

#[derive(Debug, Clone, Parser)]
pub struct QrConfig {
    #[clap(long, default_value = DEFAULT_QR_ENDPOINT, env = "INSTAPAY_QR_ENDPOINT")]
    pub qr_endpoint: Url,

    #[clap(long, default_value_t = 300, env = "INSTAPAY_QR_SIZE")]
    pub qr_size: u32,

    #[clap(long, default_value_t = 1, env = "INSTAPAY_QR_QUIET_ZONE")]
    pub qr_quiet_zone: u32,

    #[clap(long, default_value_t = 10, env = "INSTAPAY_QR_MARGIN")]
    pub qr_margin: u32,

    /// Render QR codes locally instead of calling the QR endpoint
    #[clap(long, env = "INSTAPAY_OFFLINE")]
    pub offline: bool,
}

impl QrConfig {
    pub fn options(&self) -> QrRenderOptions {
        QrRenderOptions {
            size: self.qr_size,
            quiet_zone: self.qr_quiet_zone,
            margin: self.qr_margin,
        }
    }

    pub fn source(&self) -> instapay_app::session::QrSource {
        use instapay_app::session::QrSource;

        if self.offline {
            QrSource::Local(LocalQrRenderer::new(self.options()))
        } else {
            QrSource::Remote(QrImageResolver::new(self.qr_endpoint.clone(), self.options()))
        }
    }
}

#[derive(Debug, Clone, Parser)]
pub struct HistoryConfig {
    /// Directory holding the payment history (defaults to ~/.instapay)
    #[clap(long, env = "INSTAPAY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// What to do when the history cannot be written: surface, retry or accept
    #[clap(long, default_value = "surface", env = "INSTAPAY_PERSIST_POLICY")]
    pub persist_policy: PersistPolicy,

    #[clap(long, default_value_t = 2, env = "INSTAPAY_PERSIST_RETRIES")]
    pub persist_retries: u8,
}

impl HistoryConfig {
    pub fn data_dir(&self) -> Result<PathBuf, InstapayError> {
        match &self.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Ok(dir.clone())
            }
            None => config_path::data_dir(),
        }
    }

    pub fn policy(&self) -> PersistPolicy {
        match self.persist_policy {
            PersistPolicy::Retry { .. } => PersistPolicy::Retry {
                attempts: self.persist_retries,
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone, Parser)]
pub struct ShareConfig {
    /// Program used as the native share surface, e.g. `kdeconnect-cli --share`
    #[clap(long, env = "INSTAPAY_SHARE_COMMAND")]
    pub share_command: Option<String>,

    /// Where the payment card is saved when it cannot be shared
    #[clap(long, env = "INSTAPAY_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Pixel density of the shared card, 1 to 4
    #[clap(
        long,
        default_value_t = 2,
        env = "INSTAPAY_CARD_SCALE",
        value_parser = clap::value_parser!(u32).range(1..=4)
    )]
    pub card_scale: u32,
}

impl ShareConfig {
    pub fn download_dir(&self) -> Result<PathBuf, InstapayError> {
        match &self.download_dir {
            Some(dir) => Ok(dir.clone()),
            None => config_path::download_dir_or_default(),
        }
    }

    pub fn card_layout(&self) -> CardLayout {
        CardLayout {
            scale: self.card_scale,
            ..CardLayout::default()
        }
    }
}
