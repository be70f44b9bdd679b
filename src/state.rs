use std::sync::Arc;

use crate::{
    db::OrmConn,
    utils::{mailer::Mailer, payment::PaymentGateway, storage::ObjectStore, token::JwtKeys},
};

#[derive(Clone)]
pub struct AppState {
    pub orm: Arc<OrmConn>,
    pub jwt: Arc<JwtKeys>,
    /// Externally reachable base URL, used in emailed links.
    pub public_url: String,
    pub mailer: Arc<dyn Mailer>,
    pub storage: Arc<dyn ObjectStore>,
    pub payments: Arc<dyn PaymentGateway>,
}
