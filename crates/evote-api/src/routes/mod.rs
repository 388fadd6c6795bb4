//! # Route Modules
//!
//! | Prefix | Module | Auth |
//! |---|---|---|
//! | `/voter/register`, `/candidate/register`, `/party/register` | [`registration`] | public |
//! | `/voter/vote` | [`ballot`] | public |
//! | `/voter/verify-receipt`, `/voter/receipt/:receipt_id` | [`receipts`] | public |
//! | `/elections/:election_id`, `/elections/:election_id/results` | [`elections`] | public |
//! | `/admin/*` | [`admin`] | Bearer token |

pub mod admin;
pub mod ballot;
pub mod elections;
pub mod receipts;
pub mod registration;
