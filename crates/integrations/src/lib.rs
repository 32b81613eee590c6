//! Outbound integrations for The Strives backend.
//!
//! - [`aws`]: Signature V4 request signing shared by S3 and Pinpoint
//! - [`storage`]: S3 object storage for product and collection images
//! - [`sms`] and [`messages`]: transactional SMS through Pinpoint
//! - [`email`]: SMTP email with Askama templates
//! - [`payments`]: Razorpay orders and checkout signature verification
//! - [`otp`]: one-time codes and generated passwords

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod aws;
pub mod email;
pub mod messages;
pub mod otp;
pub mod payments;
pub mod sms;
pub mod storage;

pub use aws::AwsCredentials;
pub use email::{EmailError, EmailService, SmtpConfig};
pub use messages::SmsMessage;
pub use payments::{PaymentError, RazorpayClient, RazorpayConfig, RazorpayOrder};
pub use sms::{PinpointConfig, SmsClient, SmsError};
pub use storage::{ObjectStorage, S3Config, StorageError};
