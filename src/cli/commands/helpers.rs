//! Wiring shared by several commands.

use std::sync::Arc;

use anyhow::Context;
use tracing::warn;

use crate::captcha::{
    CaptchaGatherer, CaptchaLedger, CaptchaSolver, FactorSchedule, OcrEngine, TesseractOcr,
};
use crate::client::{
    ReqwestTransport, SiteProtocolClient, TokioPause, TransportSettings,
};
use crate::config::Settings;
use crate::proxy::ProxyPool;

/// Load the proxy pool from the configured file or inline list.
pub fn load_proxies(settings: &Settings) -> anyhow::Result<ProxyPool> {
    let pool = match &settings.proxy_file {
        Some(path) => ProxyPool::from_file(path)?,
        None => ProxyPool::from_lines(&settings.proxies)
            .context("no proxies configured (set proxy_file, proxies or --proxies)")?,
    };

    Ok(if settings.shuffle_proxies {
        pool.shuffled()
    } else {
        pool
    })
}

/// Build the captcha solver on top of the tesseract binary.
pub fn build_solver(settings: &Settings) -> anyhow::Result<CaptchaSolver> {
    let ocr = TesseractOcr::new(&settings.ocr_binary, &settings.ocr_language);
    if !ocr.is_available() {
        warn!(
            "{} not found in PATH; captcha solving will fail (install tesseract-ocr)",
            settings.ocr_binary
        );
    }

    let schedule = match &settings.captcha_factors {
        Some(factors) => FactorSchedule::new(factors.clone())?,
        None => FactorSchedule::default(),
    };
    Ok(CaptchaSolver::with_schedule(Arc::new(ocr), schedule))
}

/// Connect a protocol client using real network, OCR and timers.
pub async fn connect_client(
    settings: &Settings,
    ledger: Arc<dyn CaptchaLedger>,
) -> anyhow::Result<SiteProtocolClient> {
    let proxies = Arc::new(load_proxies(settings)?);
    let solver = Arc::new(build_solver(settings)?);
    let transport = ReqwestTransport::new(TransportSettings {
        base_url: settings.base_url.clone(),
        connect_timeout: settings.connect_timeout,
        timeout: settings.request_timeout,
        user_agent: settings.user_agent.clone(),
    });

    let client = SiteProtocolClient::connect(
        Box::new(transport),
        proxies,
        solver,
        CaptchaGatherer::new(ledger),
        Arc::new(TokioPause),
        settings.client.clone(),
    )
    .await?;
    Ok(client)
}
