pub mod mailer;
pub mod password;
pub mod payment;
pub mod storage;
pub mod token;
