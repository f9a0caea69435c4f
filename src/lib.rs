//! # Chiave (Account Authentication & Session Lifecycle)
//!
//! `chiave` is the account authentication authority. It owns credential
//! verification gated by a one-time-passcode (OTP) challenge, signed-token
//! session issuance and refresh, and password recovery.
//!
//! ## Authentication flow
//!
//! Registration and login are both two-step: the first request checks the
//! credentials (or creates the account) and emails a 6-digit OTP; the second
//! request consumes the OTP and mints an access/refresh token pair. There is a
//! single OTP slot per account, shared across purposes, so a later issue
//! overwrites any prior unconsumed code.
//!
//! ## Tokens
//!
//! Access, refresh, and password-reset tokens are stateless signed JWTs with
//! distinct secrets per class. Nothing is persisted server-side; revocation
//! happens through secret rotation or the `is_active` check at refresh time.
//!
//! ## Enumeration safety
//!
//! Failures that could reveal whether an account exists are flattened into
//! stable, coarse messages ("Invalid email or password", "Invalid or expired
//! reset token") and the forgot-password endpoint answers identically for
//! known and unknown addresses.

pub mod api;
pub mod cli;
