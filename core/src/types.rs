//! Request payloads for the wider issuer operations.
//!
//! # Design
//! Operations with a handful of arguments take them directly; the ones
//! with long positional lists take one of these structs instead. Each
//! struct knows the issuer's positional order for its fields, which is
//! also the order they are hashed in.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::Value;

/// Fresh random transaction identifier (32 lowercase hex characters).
///
/// The issuer only needs ids to be unique per terminal; callers with their
/// own correlation scheme can pass any string instead.
pub fn new_transaction_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Allocate a card to a cardholder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AllocateCard {
    pub profile_number: String,
    pub card_identifier: String,
    pub first_name: String,
    pub last_name: String,
    pub id_number: String,
    pub mobile_number: String,
    pub transaction_id: String,
}

impl AllocateCard {
    pub(crate) fn business_args(&self) -> Vec<Value> {
        vec![
            Value::from(self.profile_number.as_str()),
            Value::from(self.card_identifier.as_str()),
            Value::from(self.first_name.as_str()),
            Value::from(self.last_name.as_str()),
            Value::from(self.id_number.as_str()),
            Value::from(self.mobile_number.as_str()),
            Value::from(self.transaction_id.as_str()),
        ]
    }
}

/// Move funds between two cards on the same profile. `amount` is in cents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferFunds {
    pub profile_number: String,
    pub card_identifier_from: String,
    pub card_identifier_to: String,
    pub amount: i32,
    pub transaction_id: String,
}

impl TransferFunds {
    pub(crate) fn business_args(&self) -> Vec<Value> {
        vec![
            Value::from(self.profile_number.as_str()),
            Value::from(self.card_identifier_from.as_str()),
            Value::from(self.card_identifier_to.as_str()),
            Value::from(self.amount),
            Value::from(self.transaction_id.as_str()),
        ]
    }
}

/// Register a new profile with the issuer.
///
/// The terminal's shared secret is part of the remote argument list but is
/// supplied by the client, not carried here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProfile {
    pub email_address: String,
    pub first_name: String,
    pub last_name: String,
    pub id_or_passport: String,
    pub contact_number: String,
    pub cellphone_number: String,
    pub is_company: bool,
    pub vat_number: String,
    pub company_name: String,
    #[serde(rename = "companyCCNumber")]
    pub company_cc_number: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub postal_code: String,
    pub transaction_id: String,
}

impl RegisterProfile {
    pub(crate) fn business_args(&self, terminal_secret: &str) -> Vec<Value> {
        vec![
            Value::from(self.email_address.as_str()),
            Value::from(terminal_secret),
            Value::from(self.first_name.as_str()),
            Value::from(self.last_name.as_str()),
            Value::from(self.id_or_passport.as_str()),
            Value::from(self.contact_number.as_str()),
            Value::from(self.cellphone_number.as_str()),
            Value::from(self.is_company),
            Value::from(self.vat_number.as_str()),
            Value::from(self.company_name.as_str()),
            Value::from(self.company_cc_number.as_str()),
            Value::from(self.address_line1.as_str()),
            Value::from(self.address_line2.as_str()),
            Value::from(self.city.as_str()),
            Value::from(self.postal_code.as_str()),
            Value::from(self.transaction_id.as_str()),
        ]
    }
}

/// Issue a virtual card under a campaign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateVirtualCard {
    #[serde(rename = "campaignUUID")]
    pub campaign_uuid: String,
    pub reference: String,
    pub card_label: String,
    pub cellphone_number: String,
    pub expiry_date: NaiveDateTime,
    pub transaction_id: String,
}

impl CreateVirtualCard {
    pub(crate) fn business_args(&self) -> Vec<Value> {
        vec![
            Value::from(self.campaign_uuid.as_str()),
            Value::from(self.reference.as_str()),
            Value::from(self.card_label.as_str()),
            Value::from(self.cellphone_number.as_str()),
            Value::from(self.expiry_date),
            Value::from(self.transaction_id.as_str()),
        ]
    }
}
