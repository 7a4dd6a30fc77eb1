//! HTTP trigger routes
//!
//! Each trigger answers `1` when the record is (now) correct and `0` on any
//! failure. The reason for a `0` only goes to the log.

use actix_web::{HttpResponse, web};
use ddns_core::{ClientRegistry, Credentials, ReconcileOutcome, ReconcileRequest, Reconciler};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Parameters of the DNSPod trigger
///
/// No Debug derive: the token must never reach a log line.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct DnspodParams {
    pub token: String,
    pub domain: String,
    pub record: String,
    pub ip: String,
}

/// Parameters of the AliDNS trigger
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct AlidnsParams {
    pub key: String,
    pub secret: String,
    pub domain: String,
    pub record: String,
    pub ip: String,
}

/// Form fields win; empty ones fall back to the query string
fn pick(primary: String, fallback: String) -> String {
    if primary.is_empty() { fallback } else { primary }
}

impl DnspodParams {
    fn or(self, fallback: Self) -> Self {
        Self {
            token: pick(self.token, fallback.token),
            domain: pick(self.domain, fallback.domain),
            record: pick(self.record, fallback.record),
            ip: pick(self.ip, fallback.ip),
        }
    }
}

impl AlidnsParams {
    fn or(self, fallback: Self) -> Self {
        Self {
            key: pick(self.key, fallback.key),
            secret: pick(self.secret, fallback.secret),
            domain: pick(self.domain, fallback.domain),
            record: pick(self.record, fallback.record),
            ip: pick(self.ip, fallback.ip),
        }
    }
}

fn merge<T: Default>(form: Option<web::Form<T>>, query: Option<web::Query<T>>, or: fn(T, T) -> T) -> T {
    let form = form.map(web::Form::into_inner).unwrap_or_default();
    let query = query.map(web::Query::into_inner).unwrap_or_default();
    or(form, query)
}

/// Register every route on an actix service config
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/dnspod")
            .route(web::get().to(dnspod))
            .route(web::post().to(dnspod)),
    )
    .service(
        web::resource(["/aliyun", "/alidns"])
            .route(web::get().to(alidns))
            .route(web::post().to(alidns)),
    )
    .route("/healthz", web::get().to(healthz));
}

async fn dnspod(
    registry: web::Data<ClientRegistry>,
    form: Option<web::Form<DnspodParams>>,
    query: Option<web::Query<DnspodParams>>,
) -> HttpResponse {
    let params = merge(form, query, DnspodParams::or);
    let ok = trigger(
        &registry,
        "dnspod",
        Credentials::token(params.token),
        &params.domain,
        &params.record,
        &params.ip,
    )
    .await;
    signal(ok)
}

async fn alidns(
    registry: web::Data<ClientRegistry>,
    form: Option<web::Form<AlidnsParams>>,
    query: Option<web::Query<AlidnsParams>>,
) -> HttpResponse {
    let params = merge(form, query, AlidnsParams::or);
    let ok = trigger(
        &registry,
        "alidns",
        Credentials::key_pair(params.key, params.secret),
        &params.domain,
        &params.record,
        &params.ip,
    )
    .await;
    signal(ok)
}

async fn healthz() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("ok")
}

fn signal(ok: bool) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(if ok { "1" } else { "0" })
}

/// Run one reconcile and log why it failed, if it did
async fn trigger(
    registry: &ClientRegistry,
    provider: &str,
    credentials: Credentials,
    domain: &str,
    record: &str,
    ip: &str,
) -> bool {
    let request = match ReconcileRequest::new(domain, record, ip) {
        Ok(request) => request,
        Err(e) => {
            warn!(provider, domain, record, stage = "validate", kind = e.kind(), error = %e, "Rejected trigger");
            return false;
        }
    };

    let client = match registry.client_for(provider, &credentials) {
        Ok(client) => client,
        Err(e) => {
            warn!(provider, domain, record, stage = "client", kind = e.kind(), error = %e, "Rejected trigger");
            return false;
        }
    };

    match Reconciler::new(client).reconcile(&request).await {
        Ok(ReconcileOutcome::UpToDate { value }) => {
            debug!(provider, domain = request.domain(), record = request.sub_domain(), %value, "Record already current");
            true
        }
        Ok(ReconcileOutcome::Updated { previous, current }) => {
            info!(provider, domain = request.domain(), record = request.sub_domain(), %previous, %current, "Record updated");
            true
        }
        Err(e) => {
            warn!(
                provider,
                domain = request.domain(),
                record = request.sub_domain(),
                stage = %e.stage,
                kind = e.source.kind(),
                error = %e.source,
                "Reconcile failed"
            );
            false
        }
    }
}
