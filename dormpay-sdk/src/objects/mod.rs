//! JSON object shapes exchanged with the payment backend.

pub mod payment;

pub use payment::{
    CreatePaymentRequest, CreatePaymentResponse, PaymentKind, PaymentStatus, StatusSnapshot,
};
