//! Delivering a rasterized card to the user.
//!
//! Native sharing is a two-step protocol: ask the share target whether it can take the payload,
//! and only then hand it over. When the target declines (or there is none) the same image is
//! saved as a download instead.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use instapay_core::{format::format_inr_compact, primitives::PaymentRequest};
#[cfg(test)]
use mockall::automock;
use tracing::{debug, info, instrument, warn};

use crate::{card::RenderedCard, error::InstapayError};

pub const SHARE_FILE_NAME: &str = "upi-qr-payment.png";
pub const SHARE_TITLE: &str = "Scan to Pay";
pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl From<RenderedCard> for ShareFile {
    fn from(card: RenderedCard) -> Self {
        Self {
            name: SHARE_FILE_NAME.to_owned(),
            mime: PNG_MIME.to_owned(),
            bytes: card.png,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub files: Vec<ShareFile>,
    pub title: String,
    pub text: String,
}

impl SharePayload {
    pub fn for_request(card: RenderedCard, request: &PaymentRequest) -> Self {
        Self {
            files: vec![card.into()],
            title: SHARE_TITLE.to_owned(),
            text: format!(
                "Scan this QR code to pay ₹{} to {}.",
                format_inr_compact(&request.amount()),
                request.payee().name
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeShareResult {
    Completed,
    /// the user dismissed the share sheet
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    /// share sheet dismissed, nothing to report
    Dismissed,
    Saved(PathBuf),
}

#[cfg_attr(test, automock)]
#[async_trait(?Send)]
pub trait NativeShare {
    /// Capability query. Must be asked before every [`NativeShare::share`] call.
    fn can_share(&self, payload: &SharePayload) -> bool;

    async fn share(&self, payload: &SharePayload) -> Result<NativeShareResult, InstapayError>;
}

#[cfg_attr(test, automock)]
#[async_trait(?Send)]
pub trait DownloadSink {
    async fn save(&self, file: &ShareFile) -> Result<PathBuf, InstapayError>;
}

/// A runtime without a native share surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNativeShare;

#[async_trait(?Send)]
impl NativeShare for NoNativeShare {
    fn can_share(&self, _payload: &SharePayload) -> bool {
        false
    }

    async fn share(&self, _payload: &SharePayload) -> Result<NativeShareResult, InstapayError> {
        Err(InstapayError::ShareFailed(
            "native sharing is not available".to_owned(),
        ))
    }
}

/// Shares by running an external program with the staged image paths as trailing arguments.
///
/// The title and text are passed in `INSTAPAY_SHARE_TITLE` and `INSTAPAY_SHARE_TEXT`. An exit
/// status of 130 or termination by a signal counts as the user cancelling.
#[derive(Debug, Clone)]
pub struct CommandShare {
    program: String,
    args: Vec<String>,
    staging_dir: PathBuf,
}

impl CommandShare {
    pub fn new(program: impl Into<String>, args: Vec<String>, staging_dir: PathBuf) -> Self {
        Self {
            program: program.into(),
            args,
            staging_dir,
        }
    }

    /// Parses a whitespace separated command line such as `kdeconnect-cli --share`.
    pub fn from_command_line(command: &str, staging_dir: PathBuf) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_owned);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect(), staging_dir))
    }
}

#[async_trait(?Send)]
impl NativeShare for CommandShare {
    fn can_share(&self, payload: &SharePayload) -> bool {
        !self.program.is_empty()
            && !payload.files.is_empty()
            && payload.files.iter().all(|f| f.mime.starts_with("image/"))
    }

    #[instrument(level = "debug", skip_all, fields(program = %self.program))]
    async fn share(&self, payload: &SharePayload) -> Result<NativeShareResult, InstapayError> {
        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let mut paths = vec![];
        for file in &payload.files {
            let path = self.staging_dir.join(&file.name);
            tokio::fs::write(&path, &file.bytes).await?;
            paths.push(path);
        }

        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .args(&paths)
            .env("INSTAPAY_SHARE_TITLE", &payload.title)
            .env("INSTAPAY_SHARE_TEXT", &payload.text)
            .stdin(Stdio::null())
            .status()
            .await?;
        debug!("share command exited with {}", status);

        match status.code() {
            Some(0) => Ok(NativeShareResult::Completed),
            Some(130) | None => Ok(NativeShareResult::Cancelled),
            Some(code) => Err(InstapayError::ShareFailed(format!(
                "share command exited with status {code}"
            ))),
        }
    }
}

/// Saves downloads into a directory without overwriting earlier ones, naming repeats
/// `upi-qr-payment (1).png`, `upi-qr-payment (2).png` and so on.
#[derive(Debug, Clone)]
pub struct DirectoryDownloadSink {
    dir: PathBuf,
}

impl DirectoryDownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn free_path(&self, name: &str) -> PathBuf {
        let candidate = self.dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem, format!(".{ext}")),
            None => (name, String::new()),
        };
        (1..)
            .map(|n| self.dir.join(format!("{stem} ({n}){ext}")))
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

#[async_trait(?Send)]
impl DownloadSink for DirectoryDownloadSink {
    async fn save(&self, file: &ShareFile) -> Result<PathBuf, InstapayError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.free_path(&file.name);
        tokio::fs::write(&path, &file.bytes).await?;
        Ok(path)
    }
}

pub struct ShareDispatcher<N: NativeShare, D: DownloadSink> {
    native: N,
    download: D,
}

impl<N: NativeShare, D: DownloadSink> ShareDispatcher<N, D> {
    pub const fn new(native: N, download: D) -> Self {
        Self { native, download }
    }

    #[instrument(level = "debug", skip_all)]
    pub async fn dispatch(&self, payload: SharePayload) -> Result<ShareOutcome, InstapayError> {
        self.try_dispatch(payload)
            .await
            .map_err(InstapayError::into_share_failure)
    }

    async fn try_dispatch(&self, payload: SharePayload) -> Result<ShareOutcome, InstapayError> {
        if self.native.can_share(&payload) {
            return match self.native.share(&payload).await? {
                NativeShareResult::Completed => {
                    info!("shared payment card");
                    Ok(ShareOutcome::Shared)
                }
                NativeShareResult::Cancelled => {
                    debug!("share dismissed by user");
                    Ok(ShareOutcome::Dismissed)
                }
            };
        }

        warn!("native sharing unavailable, saving payment card instead");
        let file = payload
            .files
            .first()
            .ok_or_else(|| InstapayError::ShareFailed(String::new()))?;
        let path = self.download.save(file).await?;
        info!("saved payment card to {}", path.display());
        Ok(ShareOutcome::Saved(path))
    }
}

#[cfg(test)]
mod tests {
    use instapay_core::{amount::Amount, payee::Payee, primitives::PaymentRequest};
    use pretty_assertions::assert_eq;

    use super::{
        DirectoryDownloadSink, DownloadSink, MockDownloadSink, MockNativeShare,
        NativeShareResult, NoNativeShare, ShareDispatcher, ShareFile, ShareOutcome,
        SharePayload, SHARE_FILE_NAME,
    };
    use crate::{
        card::RenderedCard,
        error::{InstapayError, GENERIC_SHARE_FAILURE},
    };

    fn payload() -> anyhow::Result<SharePayload> {
        let request = PaymentRequest::new(
            Amount::from_paise(10_000_000),
            Payee::new("merchant@upi", "Asha Stores")?,
        );
        let card = RenderedCard {
            png: vec![1, 2, 3],
            width: 800,
            height: 1200,
        };
        Ok(SharePayload::for_request(card, &request))
    }

    #[test]
    fn test_payload() -> anyhow::Result<()> {
        let payload = payload()?;
        assert_eq!("Scan to Pay", payload.title);
        assert_eq!(
            "Scan this QR code to pay ₹1,00,000 to Asha Stores.",
            payload.text
        );
        assert_eq!(SHARE_FILE_NAME, payload.files[0].name);
        assert_eq!("image/png", payload.files[0].mime);
        Ok(())
    }

    #[tokio::test]
    async fn test_fallback_when_capability_declines() -> anyhow::Result<()> {
        let mut native = MockNativeShare::new();
        native.expect_can_share().times(1).returning(|_| false);
        native.expect_share().never();

        let mut download = MockDownloadSink::new();
        download
            .expect_save()
            .times(1)
            .returning(|f| Ok(std::path::PathBuf::from("/tmp").join(&f.name)));

        let outcome = ShareDispatcher::new(native, download)
            .dispatch(payload()?)
            .await?;
        assert_eq!(
            ShareOutcome::Saved(std::path::PathBuf::from("/tmp/upi-qr-payment.png")),
            outcome
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_native_share() -> anyhow::Result<()> {
        let mut native = MockNativeShare::new();
        native.expect_can_share().returning(|_| true);
        native
            .expect_share()
            .times(1)
            .returning(|_| Ok(NativeShareResult::Completed));
        let mut download = MockDownloadSink::new();
        download.expect_save().never();

        let outcome = ShareDispatcher::new(native, download)
            .dispatch(payload()?)
            .await?;
        assert_eq!(ShareOutcome::Shared, outcome);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_is_not_an_error() -> anyhow::Result<()> {
        let mut native = MockNativeShare::new();
        native.expect_can_share().returning(|_| true);
        native
            .expect_share()
            .returning(|_| Ok(NativeShareResult::Cancelled));
        let mut download = MockDownloadSink::new();
        download.expect_save().never();

        let outcome = ShareDispatcher::new(native, download)
            .dispatch(payload()?)
            .await?;
        assert_eq!(ShareOutcome::Dismissed, outcome);
        Ok(())
    }

    #[tokio::test]
    async fn test_share_error_collapses() -> anyhow::Result<()> {
        let mut native = MockNativeShare::new();
        native.expect_can_share().returning(|_| true);
        native
            .expect_share()
            .returning(|_| Err(InstapayError::ShareFailed(String::new())));

        let result = ShareDispatcher::new(native, MockDownloadSink::new())
            .dispatch(payload()?)
            .await;
        match result {
            Err(InstapayError::ShareFailed(message)) => {
                assert_eq!(GENERIC_SHARE_FAILURE, message)
            }
            other => panic!("unexpected result {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_download_error_keeps_message() -> anyhow::Result<()> {
        let mut download = MockDownloadSink::new();
        download.expect_save().returning(|_| {
            Err(InstapayError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        });

        let result = ShareDispatcher::new(NoNativeShare, download)
            .dispatch(payload()?)
            .await;
        match result {
            Err(InstapayError::ShareFailed(message)) => assert!(message.contains("read-only")),
            other => panic!("unexpected result {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_directory_sink_does_not_clobber() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let sink = DirectoryDownloadSink::new(dir.path());
        let file = ShareFile {
            name: SHARE_FILE_NAME.to_owned(),
            mime: "image/png".to_owned(),
            bytes: vec![7],
        };
        let first = sink.save(&file).await?;
        let second = sink.save(&file).await?;
        assert_eq!(dir.path().join("upi-qr-payment.png"), first);
        assert_eq!(dir.path().join("upi-qr-payment (1).png"), second);
        assert_eq!(vec![7], std::fs::read(second)?);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_share_exit_codes() -> anyhow::Result<()> {
        use super::{CommandShare, NativeShare};

        let dir = tempfile::tempdir()?;
        let ok = CommandShare::new("true", vec![], dir.path().to_path_buf());
        assert!(ok.can_share(&payload()?));
        assert_eq!(NativeShareResult::Completed, ok.share(&payload()?).await?);
        assert!(dir.path().join(SHARE_FILE_NAME).exists());

        let cancelled = CommandShare::new(
            "sh",
            vec!["-c".to_owned(), "exit 130".to_owned()],
            dir.path().to_path_buf(),
        );
        assert_eq!(
            NativeShareResult::Cancelled,
            cancelled.share(&payload()?).await?
        );
        assert!(CommandShare::from_command_line("  ", dir.path().into()).is_none());

        let failing = CommandShare::new("false", vec![], dir.path().to_path_buf());
        assert!(failing.share(&payload()?).await.is_err());
        Ok(())
    }
}
