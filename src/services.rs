// src/services.rs

pub mod checkout_gateway;
pub mod coupon_service;
pub mod mailer;
pub mod notification_service;
pub mod payment_gateway;
pub mod pix_gateway;
pub mod pix_sweeper;
pub mod pricing;
pub mod rate_limiter;
pub mod registration_number;
pub mod registration_service;
pub mod settlement_service;
