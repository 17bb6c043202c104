//! The payment request workflow of one interactive session.
//!
//! Submissions are split into [`PaymentSession::begin`] and [`PaymentSession::finish`] around
//! the QR image load. Every submission gets a new generation; a load that completes after a
//! newer submission (or after "new payment") is ignored.

use instapay_core::{
    amount::AmountValidator,
    error::InstapayCoreError,
    payee::Payee,
    primitives::{HistoryEntry, PaymentRequest},
    qr::{LocalQrRenderer, QrImage, QrImageResolver},
    uri::PaymentUri,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    card::CardRenderer,
    client::QrImageLoader,
    error::InstapayError,
    http::CrossPlatformHttpClient,
    localstore::{PaymentHistoryStore, SnapshotStorage},
    share::{DownloadSink, NativeShare, ShareDispatcher, ShareOutcome, SharePayload},
};

/// Where QR images come from.
#[derive(Debug, Clone)]
pub enum QrSource {
    Remote(QrImageResolver),
    Local(LocalQrRenderer),
}

impl Default for QrSource {
    fn default() -> Self {
        Self::Remote(QrImageResolver::default())
    }
}

impl QrSource {
    pub fn image_for(&self, uri: &PaymentUri) -> Result<QrImage, InstapayCoreError> {
        match self {
            Self::Remote(resolver) => Ok(resolver.resolve(uri)),
            Self::Local(renderer) => renderer.render(uri),
        }
    }
}

/// The request currently on screen together with its QR image.
#[derive(Debug, Clone)]
pub struct ActiveRequest {
    pub generation: u64,
    pub request: PaymentRequest,
    pub uri: PaymentUri,
    pub qr: QrImage,
    /// encoded image bytes once the display load completed
    pub loaded: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct PendingDisplay {
    pub generation: u64,
    pub qr: QrImage,
}

#[derive(Debug)]
pub enum DisplayOutcome {
    /// The QR is on screen. A rejected history write is reported but does not undo the display.
    Displayed { history_error: Option<InstapayError> },
    /// A newer request replaced this one before its image loaded.
    Superseded,
}

pub struct PaymentSession<S: SnapshotStorage, C: QrImageLoader = CrossPlatformHttpClient> {
    payee: Payee,
    source: QrSource,
    loader: C,
    history: PaymentHistoryStore<S>,
    active: Option<ActiveRequest>,
    generation: u64,
}

pub struct PaymentSessionBuilder<S, C = CrossPlatformHttpClient>
where
    S: SnapshotStorage,
    C: QrImageLoader + Default,
{
    payee: Option<Payee>,
    source: QrSource,
    loader: Option<C>,
    history: Option<PaymentHistoryStore<S>>,
}

impl<S, C> PaymentSessionBuilder<S, C>
where
    S: SnapshotStorage,
    C: QrImageLoader + Default,
{
    fn new() -> Self {
        Self {
            payee: None,
            source: QrSource::default(),
            loader: None,
            history: None,
        }
    }

    pub fn with_payee(mut self, payee: Payee) -> Self {
        self.payee = Some(payee);
        self
    }

    pub fn with_qr_source(mut self, source: QrSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_loader(mut self, loader: C) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_history(mut self, history: PaymentHistoryStore<S>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn build(self) -> Result<PaymentSession<S, C>, InstapayError> {
        Ok(PaymentSession {
            payee: self.payee.ok_or(InstapayError::MissingComponent("payee"))?,
            source: self.source,
            loader: self.loader.unwrap_or_default(),
            history: self
                .history
                .ok_or(InstapayError::MissingComponent("history store"))?,
            active: None,
            generation: 0,
        })
    }
}

impl<S, C> Default for PaymentSessionBuilder<S, C>
where
    S: SnapshotStorage,
    C: QrImageLoader + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> PaymentSession<S, C>
where
    S: SnapshotStorage,
    C: QrImageLoader + Default,
{
    pub fn builder() -> PaymentSessionBuilder<S, C> {
        PaymentSessionBuilder::default()
    }

    pub fn payee(&self) -> &Payee {
        &self.payee
    }

    pub fn active(&self) -> Option<&ActiveRequest> {
        self.active.as_ref()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.generation == generation)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    /// Validates the input and makes a new request active, superseding any previous one.
    pub fn begin(&mut self, raw: &str) -> Result<PendingDisplay, InstapayError> {
        let amount = AmountValidator::validate(raw).map_err(InstapayCoreError::from)?;
        let request = PaymentRequest::new(amount, self.payee.clone());
        let uri = request.uri();
        let qr = self.source.image_for(&uri)?;

        self.generation += 1;
        debug!("payment request {} for {}", self.generation, amount);
        self.active = Some(ActiveRequest {
            generation: self.generation,
            request,
            uri,
            qr: qr.clone(),
            loaded: None,
        });

        Ok(PendingDisplay {
            generation: self.generation,
            qr,
        })
    }

    /// Applies the result of a display load and records the request once it is on screen.
    pub async fn finish(
        &mut self,
        pending: PendingDisplay,
        loaded: Result<Vec<u8>, InstapayError>,
    ) -> Result<DisplayOutcome, InstapayError> {
        if !self.is_current(pending.generation) {
            debug!("ignoring superseded request {}", pending.generation);
            return Ok(DisplayOutcome::Superseded);
        }

        let bytes = loaded?;
        let entry = match self.active.as_mut() {
            Some(active) => {
                active.loaded = Some(bytes);
                HistoryEntry::from(&active.request)
            }
            None => return Ok(DisplayOutcome::Superseded),
        };

        let history_error = match self.history.record(entry).await {
            Ok(()) => None,
            Err(e) => {
                warn!("payment shown but not saved to history: {}", e);
                Some(e)
            }
        };
        Ok(DisplayOutcome::Displayed { history_error })
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn submit(&mut self, raw: &str) -> Result<DisplayOutcome, InstapayError> {
        let pending = self.begin(raw)?;
        let loaded = self.loader.load(&pending.qr).await;
        self.finish(pending, loaded).await
    }

    /// Drops the active request and its QR image.
    pub fn new_payment(&mut self) {
        if let Some(active) = self.active.take() {
            debug!("discarding payment request {}", active.generation);
        }
    }

    pub async fn share<N, D>(
        &self,
        renderer: &CardRenderer,
        dispatcher: &ShareDispatcher<N, D>,
    ) -> Result<ShareOutcome, InstapayError>
    where
        N: NativeShare,
        D: DownloadSink,
    {
        let active = self.active.as_ref().ok_or(InstapayError::NoActiveRequest)?;
        let card = renderer
            .render(&self.loader, &active.qr, &active.request)
            .await?;
        let outcome = dispatcher
            .dispatch(SharePayload::for_request(card, &active.request))
            .await?;
        info!("share finished: {:?}", outcome);
        Ok(outcome)
    }

    pub async fn clear_history(&mut self) -> Result<(), InstapayError> {
        self.history.clear().await
    }
}
