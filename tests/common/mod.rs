#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use ecomm_api::{
    entity::{collections, coupons, products, users},
    middleware::auth::AuthUser,
    models::{Role, User},
    state::AppState,
    utils::{
        mailer::{MailError, MailMessage, Mailer},
        password::hash_password,
        payment::{GatewayOrder, GatewayOrderRequest, PaymentError, PaymentGateway},
        storage::{ObjectStore, StorageError},
        token::JwtKeys,
    },
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";
pub const PUBLIC_URL: &str = "http://shop.test";

/// Records every message; fails every send when `failing` is set.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<MailMessage>>,
    pub failing: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if self.failing {
            return Err(MailError::InvalidAddress(message.to));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// In-memory object store. Uploads whose key contains `fail_on` are refused.
#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_on: Option<String>,
}

impl MemoryStore {
    pub fn failing_on(fragment: &str) -> Self {
        Self {
            fail_on: Some(fragment.to_string()),
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.fail_on.as_deref().is_some_and(|f| key.contains(f)) {
            return Err(StorageError::Upload {
                key: key.to_string(),
                reason: "refused".to_string(),
            });
        }
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(format!("https://cdn.test/{key}"))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

/// Answers every order request with a fixed id and remembers the requests.
#[derive(Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<GatewayOrderRequest>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn currency(&self) -> &str {
        "INR"
    }

    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, PaymentError> {
        let order = GatewayOrder {
            id: "order_test_1".to_string(),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: Some("created".to_string()),
        };
        self.requests.lock().unwrap().push(request);
        Ok(order)
    }
}

pub struct Doubles {
    pub mailer: Arc<RecordingMailer>,
    pub storage: Arc<MemoryStore>,
    pub payments: Arc<FakeGateway>,
}

impl Default for Doubles {
    fn default() -> Self {
        Self {
            mailer: Arc::new(RecordingMailer::default()),
            storage: Arc::new(MemoryStore::default()),
            payments: Arc::new(FakeGateway::default()),
        }
    }
}

pub fn state_with(orm: DatabaseConnection, doubles: &Doubles) -> AppState {
    AppState {
        orm: Arc::new(orm),
        jwt: Arc::new(JwtKeys::new(JWT_SECRET, Duration::from_secs(3600))),
        public_url: PUBLIC_URL.to_string(),
        mailer: doubles.mailer.clone(),
        storage: doubles.storage.clone(),
        payments: doubles.payments.clone(),
    }
}

pub fn mock_state(db: MockDatabase) -> (AppState, Doubles) {
    let doubles = Doubles::default();
    (state_with(db.into_connection(), &doubles), doubles)
}

pub fn mock_db() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

pub fn user_model(role: Role, password: &str) -> users::Model {
    let now = Utc::now();
    users::Model {
        id: Uuid::new_v4(),
        name: "Test User".to_string(),
        email: "test@example.com".to_string(),
        password_hash: hash_password(password).unwrap(),
        role: role.as_str().to_string(),
        forgot_password_token: None,
        forgot_password_expiry: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

pub fn auth_user(role: Role) -> AuthUser {
    AuthUser::from(User {
        id: Uuid::new_v4(),
        name: "Tester".to_string(),
        email: "tester@example.com".to_string(),
        role,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    })
}

pub fn collection_model(name: &str) -> collections::Model {
    let now = Utc::now();
    collections::Model {
        id: Uuid::new_v4(),
        name: name.to_string(),
        created_at: now.into(),
        updated_at: now.into(),
    }
}

pub fn product_model(price: i64, stock: i32) -> products::Model {
    let now = Utc::now();
    products::Model {
        id: Uuid::new_v4(),
        name: "Widget".to_string(),
        price,
        description: Some("A widget".to_string()),
        photos: products::Photos::default(),
        stock,
        sold: 0,
        collection_id: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

pub fn coupon_model(code: &str, discount: i32, active: bool) -> coupons::Model {
    let now = Utc::now();
    coupons::Model {
        id: Uuid::new_v4(),
        code: code.to_string(),
        discount,
        active,
        created_at: now.into(),
        updated_at: now.into(),
    }
}
