//! In-memory profiles and cards behind the mock issuer.
//!
//! Each operation takes the call's business arguments (terminal id,
//! transaction date and checksum already stripped) and returns the response
//! struct. Business failures are declines with a negative `resultCode`;
//! only a wrong argument layout is a fault.

use std::collections::{BTreeMap, HashMap, HashSet};

use tutuka_core::{Method, Value};
use uuid::Uuid;

pub const RESULT_APPROVED: i32 = 1;
pub const RESULT_UNKNOWN_TERMINAL: i32 = -1;
pub const RESULT_INVALID_CHECKSUM: i32 = -2;
pub const RESULT_UNKNOWN_PROFILE: i32 = -3;
pub const RESULT_UNKNOWN_CARD: i32 = -4;
pub const RESULT_INSUFFICIENT_FUNDS: i32 = -5;
pub const RESULT_CARD_STOPPED: i32 = -6;
pub const RESULT_INVALID_AMOUNT: i32 = -7;
pub const RESULT_DUPLICATE_TRANSACTION: i32 = -8;
pub const RESULT_CARD_ALREADY_LINKED: i32 = -9;
pub const RESULT_INVALID_SECRET: i32 = -10;

pub const FAULT_UNKNOWN_METHOD: i32 = -32601;
pub const FAULT_INVALID_PARAMS: i32 = -32602;

/// XML-RPC fault raised for calls whose argument layout is wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone)]
struct Profile {
    balance: i32,
    email_address: Option<String>,
}

#[derive(Debug, Clone)]
struct Card {
    profile_number: Option<String>,
    balance: i32,
    holder: Option<String>,
    stop_reason: Option<i32>,
    history: Vec<Value>,
}

impl Card {
    fn new(balance: i32) -> Self {
        Self {
            profile_number: None,
            balance,
            holder: None,
            stop_reason: None,
            history: Vec::new(),
        }
    }
}

/// Issuer-side state for every terminal the mock serves.
#[derive(Debug, Default)]
pub struct Ledger {
    profiles: HashMap<String, Profile>,
    cards: HashMap<String, Card>,
    seen_transactions: HashSet<(String, String)>,
    next_profile: u64,
}

/// Positional view over a call's business arguments.
struct Args<'a> {
    method: Method,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn new(method: Method, values: &'a [Value], expected: usize) -> Result<Self, Fault> {
        if values.len() != expected {
            return Err(Fault {
                code: FAULT_INVALID_PARAMS,
                message: format!(
                    "{method} takes {expected} business arguments, got {}",
                    values.len()
                ),
            });
        }
        Ok(Self { method, values })
    }

    fn string_at(&self, index: usize) -> Result<&'a str, Fault> {
        self.values[index].as_str().ok_or_else(|| self.bad(index, "string"))
    }

    fn int_at(&self, index: usize) -> Result<i32, Fault> {
        self.values[index].as_i32().ok_or_else(|| self.bad(index, "int"))
    }

    fn bool_at(&self, index: usize) -> Result<bool, Fault> {
        self.values[index].as_bool().ok_or_else(|| self.bad(index, "boolean"))
    }

    fn datetime_at(&self, index: usize) -> Result<Value, Fault> {
        match &self.values[index] {
            value @ Value::DateTime(_) => Ok(value.clone()),
            _ => Err(self.bad(index, "dateTime.iso8601")),
        }
    }

    /// The transaction id is always the last business argument.
    fn transaction_id(&self) -> Result<&'a str, Fault> {
        self.string_at(self.values.len() - 1)
    }

    fn bad(&self, index: usize, kind: &str) -> Fault {
        Fault {
            code: FAULT_INVALID_PARAMS,
            message: format!("{}: argument {index} must be {kind}", self.method),
        }
    }
}

fn reply(code: i32, text: &str, transaction_id: &str) -> BTreeMap<String, Value> {
    let mut members = BTreeMap::new();
    members.insert("resultCode".to_string(), Value::Int(code));
    members.insert("resultText".to_string(), Value::from(text));
    members.insert("transactionId".to_string(), Value::from(transaction_id));
    members
}

/// A struct response with only the result fields.
pub fn decline(code: i32, text: &str, transaction_id: &str) -> Value {
    Value::Struct(reply(code, text, transaction_id))
}

fn approved(transaction_id: &str) -> BTreeMap<String, Value> {
    reply(RESULT_APPROVED, "Approved", transaction_id)
}

fn history_entry(kind: &str, amount: i32, transaction_id: &str, date: &Value) -> Value {
    let mut members = BTreeMap::new();
    members.insert("type".to_string(), Value::from(kind));
    members.insert("amount".to_string(), Value::Int(amount));
    members.insert("transactionId".to_string(), Value::from(transaction_id));
    members.insert("transactionDate".to_string(), date.clone());
    Value::Struct(members)
}

/// Number of business arguments a supported method takes.
fn arity(method: Method) -> Option<usize> {
    match method {
        Method::Balance | Method::LinkCard | Method::CancelStopCard | Method::Statement => Some(3),
        Method::StopCard | Method::DeductCardLoadProfile | Method::LoadCardDeductProfile => Some(4),
        Method::TransferFunds => Some(5),
        Method::CreateVirtualCard => Some(6),
        Method::AllocateCard => Some(7),
        Method::Register => Some(16),
        _ => None,
    }
}

pub fn unsupported(method: impl std::fmt::Display) -> Fault {
    Fault {
        code: FAULT_UNKNOWN_METHOD,
        message: format!("method {method} is not supported"),
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&mut self, profile_number: &str, balance: i32) {
        self.profiles.insert(
            profile_number.to_string(),
            Profile {
                balance,
                email_address: None,
            },
        );
    }

    /// Add an unlinked card to stock.
    pub fn add_card(&mut self, card_identifier: &str, balance: i32) {
        self.cards.insert(card_identifier.to_string(), Card::new(balance));
    }

    pub fn profile_balance(&self, profile_number: &str) -> Option<i32> {
        self.profiles.get(profile_number).map(|p| p.balance)
    }

    pub fn card_balance(&self, card_identifier: &str) -> Option<i32> {
        self.cards.get(card_identifier).map(|c| c.balance)
    }

    pub fn is_stopped(&self, card_identifier: &str) -> Option<bool> {
        self.cards.get(card_identifier).map(|c| c.stop_reason.is_some())
    }

    /// Apply one call. `date` is the call's transaction timestamp.
    pub fn apply(
        &mut self,
        terminal_id: &str,
        method: Method,
        business_args: &[Value],
        date: &Value,
        terminal_secret: &str,
    ) -> Result<Value, Fault> {
        let Some(expected) = arity(method) else {
            return Err(unsupported(method));
        };
        let args = Args::new(method, business_args, expected)?;
        let transaction_id = args.transaction_id()?.to_string();

        let key = (terminal_id.to_string(), transaction_id.clone());
        if self.seen_transactions.contains(&key) {
            return Ok(decline(
                RESULT_DUPLICATE_TRANSACTION,
                "Duplicate transaction",
                &transaction_id,
            ));
        }

        let response = match method {
            Method::Balance => self.balance(&args),
            Method::AllocateCard => self.allocate_card(&args),
            Method::LinkCard => self.link_card(&args),
            Method::StopCard => self.stop_card(&args),
            Method::CancelStopCard => self.cancel_stop_card(&args),
            Method::TransferFunds => self.transfer_funds(&args, date),
            Method::DeductCardLoadProfile => self.deduct_card_load_profile(&args, date),
            Method::LoadCardDeductProfile => self.load_card_deduct_profile(&args, date),
            Method::Register => self.register(&args, terminal_secret),
            Method::Statement => self.statement(&args),
            Method::CreateVirtualCard => self.create_virtual_card(&args),
            other => return Err(unsupported(other)),
        }?;

        if response.get("resultCode") == Some(&Value::Int(RESULT_APPROVED)) {
            self.seen_transactions.insert(key);
        }
        Ok(response)
    }

    /// Card linked to `profile_number`, or the decline explaining why not.
    fn linked_card(
        &mut self,
        profile_number: &str,
        card_identifier: &str,
        transaction_id: &str,
    ) -> Result<&mut Card, Value> {
        if !self.profiles.contains_key(profile_number) {
            return Err(decline(RESULT_UNKNOWN_PROFILE, "Unknown profile", transaction_id));
        }
        match self.cards.get_mut(card_identifier) {
            Some(card) if card.profile_number.as_deref() == Some(profile_number) => Ok(card),
            _ => Err(decline(RESULT_UNKNOWN_CARD, "Unknown card", transaction_id)),
        }
    }

    fn balance(&mut self, args: &Args<'_>) -> Result<Value, Fault> {
        let tx = args.transaction_id()?;
        let card = match self.linked_card(args.string_at(0)?, args.string_at(1)?, tx) {
            Ok(card) => card,
            Err(declined) => return Ok(declined),
        };
        let mut members = approved(tx);
        members.insert("balance".to_string(), Value::Int(card.balance));
        members.insert("stopped".to_string(), Value::Bool(card.stop_reason.is_some()));
        Ok(Value::Struct(members))
    }

    fn allocate_card(&mut self, args: &Args<'_>) -> Result<Value, Fault> {
        let tx = args.transaction_id()?;
        let holder = format!("{} {}", args.string_at(2)?, args.string_at(3)?);
        // id number and mobile number must be strings even though the mock
        // does not keep them
        args.string_at(4)?;
        args.string_at(5)?;
        let card = match self.linked_card(args.string_at(0)?, args.string_at(1)?, tx) {
            Ok(card) => card,
            Err(declined) => return Ok(declined),
        };
        card.holder = Some(holder);
        Ok(Value::Struct(approved(tx)))
    }

    fn link_card(&mut self, args: &Args<'_>) -> Result<Value, Fault> {
        let tx = args.transaction_id()?;
        let profile_number = args.string_at(0)?;
        if !self.profiles.contains_key(profile_number) {
            return Ok(decline(RESULT_UNKNOWN_PROFILE, "Unknown profile", tx));
        }
        let Some(card) = self.cards.get_mut(args.string_at(1)?) else {
            return Ok(decline(RESULT_UNKNOWN_CARD, "Unknown card", tx));
        };
        if card.profile_number.is_some() {
            return Ok(decline(RESULT_CARD_ALREADY_LINKED, "Card already linked", tx));
        }
        card.profile_number = Some(profile_number.to_string());
        Ok(Value::Struct(approved(tx)))
    }

    fn stop_card(&mut self, args: &Args<'_>) -> Result<Value, Fault> {
        let tx = args.transaction_id()?;
        let reason = args.int_at(2)?;
        let card = match self.linked_card(args.string_at(0)?, args.string_at(1)?, tx) {
            Ok(card) => card,
            Err(declined) => return Ok(declined),
        };
        card.stop_reason = Some(reason);
        Ok(Value::Struct(approved(tx)))
    }

    fn cancel_stop_card(&mut self, args: &Args<'_>) -> Result<Value, Fault> {
        let tx = args.transaction_id()?;
        let card = match self.linked_card(args.string_at(0)?, args.string_at(1)?, tx) {
            Ok(card) => card,
            Err(declined) => return Ok(declined),
        };
        card.stop_reason = None;
        Ok(Value::Struct(approved(tx)))
    }

    fn transfer_funds(&mut self, args: &Args<'_>, date: &Value) -> Result<Value, Fault> {
        let tx = args.transaction_id()?;
        let profile_number = args.string_at(0)?;
        let from = args.string_at(1)?;
        let to = args.string_at(2)?;
        let amount = args.int_at(3)?;
        if amount <= 0 || from == to {
            return Ok(decline(RESULT_INVALID_AMOUNT, "Invalid amount", tx));
        }

        let source_balance = match self.linked_card(profile_number, from, tx) {
            Ok(card) if card.stop_reason.is_some() => {
                return Ok(decline(RESULT_CARD_STOPPED, "Card stopped", tx))
            }
            Ok(card) => card.balance,
            Err(declined) => return Ok(declined),
        };
        let target_balance = match self.linked_card(profile_number, to, tx) {
            Ok(card) if card.stop_reason.is_some() => {
                return Ok(decline(RESULT_CARD_STOPPED, "Card stopped", tx))
            }
            Ok(card) => card.balance,
            Err(declined) => return Ok(declined),
        };
        if source_balance < amount {
            return Ok(decline(RESULT_INSUFFICIENT_FUNDS, "Insufficient funds", tx));
        }
        let Some(credited) = target_balance.checked_add(amount) else {
            return Ok(decline(RESULT_INVALID_AMOUNT, "Invalid amount", tx));
        };

        if let Some(card) = self.cards.get_mut(from) {
            card.balance = source_balance - amount;
            card.history.push(history_entry("TransferOut", amount, tx, date));
        }
        if let Some(card) = self.cards.get_mut(to) {
            card.balance = credited;
            card.history.push(history_entry("TransferIn", amount, tx, date));
        }
        Ok(Value::Struct(approved(tx)))
    }

    fn deduct_card_load_profile(&mut self, args: &Args<'_>, date: &Value) -> Result<Value, Fault> {
        let tx = args.transaction_id()?;
        let profile_number = args.string_at(0)?;
        let amount = args.int_at(2)?;
        if amount <= 0 {
            return Ok(decline(RESULT_INVALID_AMOUNT, "Invalid amount", tx));
        }
        let profile_balance = self.profile_balance(profile_number).unwrap_or_default();
        let Some(credited) = profile_balance.checked_add(amount) else {
            return Ok(decline(RESULT_INVALID_AMOUNT, "Invalid amount", tx));
        };
        let card = match self.linked_card(profile_number, args.string_at(1)?, tx) {
            Ok(card) => card,
            Err(declined) => return Ok(declined),
        };
        if card.balance < amount {
            return Ok(decline(RESULT_INSUFFICIENT_FUNDS, "Insufficient funds", tx));
        }
        card.balance -= amount;
        card.history.push(history_entry("Deduct", amount, tx, date));
        if let Some(profile) = self.profiles.get_mut(profile_number) {
            profile.balance = credited;
        }
        Ok(Value::Struct(approved(tx)))
    }

    fn load_card_deduct_profile(&mut self, args: &Args<'_>, date: &Value) -> Result<Value, Fault> {
        let tx = args.transaction_id()?;
        let profile_number = args.string_at(0)?;
        let amount = args.int_at(2)?;
        if amount <= 0 {
            return Ok(decline(RESULT_INVALID_AMOUNT, "Invalid amount", tx));
        }
        let profile_balance = self.profile_balance(profile_number).unwrap_or_default();
        if profile_balance < amount {
            return Ok(decline(RESULT_INSUFFICIENT_FUNDS, "Insufficient funds", tx));
        }
        let card = match self.linked_card(profile_number, args.string_at(1)?, tx) {
            Ok(card) => card,
            Err(declined) => return Ok(declined),
        };
        if card.stop_reason.is_some() {
            return Ok(decline(RESULT_CARD_STOPPED, "Card stopped", tx));
        }
        let Some(credited) = card.balance.checked_add(amount) else {
            return Ok(decline(RESULT_INVALID_AMOUNT, "Invalid amount", tx));
        };
        card.balance = credited;
        card.history.push(history_entry("Load", amount, tx, date));
        if let Some(profile) = self.profiles.get_mut(profile_number) {
            profile.balance = profile_balance - amount;
        }
        Ok(Value::Struct(approved(tx)))
    }

    fn register(&mut self, args: &Args<'_>, terminal_secret: &str) -> Result<Value, Fault> {
        let tx = args.transaction_id()?;
        let email_address = args.string_at(0)?;
        if args.string_at(1)? != terminal_secret {
            return Ok(decline(RESULT_INVALID_SECRET, "Invalid terminal password", tx));
        }
        for index in (2..7).chain(8..15) {
            args.string_at(index)?;
        }
        args.bool_at(7)?;

        self.next_profile += 1;
        let profile_number = format!("{:010}", self.next_profile);
        self.profiles.insert(
            profile_number.clone(),
            Profile {
                balance: 0,
                email_address: Some(email_address.to_string()),
            },
        );
        let mut members = approved(tx);
        members.insert("profileNumber".to_string(), Value::from(profile_number));
        Ok(Value::Struct(members))
    }

    fn statement(&mut self, args: &Args<'_>) -> Result<Value, Fault> {
        let tx = args.transaction_id()?;
        let card = match self.linked_card(args.string_at(0)?, args.string_at(1)?, tx) {
            Ok(card) => card,
            Err(declined) => return Ok(declined),
        };
        let mut members = approved(tx);
        members.insert("balance".to_string(), Value::Int(card.balance));
        members.insert("transactions".to_string(), Value::Array(card.history.clone()));
        Ok(Value::Struct(members))
    }

    fn create_virtual_card(&mut self, args: &Args<'_>) -> Result<Value, Fault> {
        let tx = args.transaction_id()?;
        for index in 0..4 {
            args.string_at(index)?;
        }
        let expiry_date = args.datetime_at(4)?;

        let card_identifier = Uuid::new_v4().simple().to_string();
        let mut card = Card::new(0);
        card.holder = Some(args.string_at(2)?.to_string());
        self.cards.insert(card_identifier.clone(), card);

        let mut members = approved(tx);
        members.insert("cardIdentifier".to_string(), Value::from(card_identifier));
        members.insert("expiryDate".to_string(), expiry_date);
        Ok(Value::Struct(members))
    }

    pub fn card_holder(&self, card_identifier: &str) -> Option<&str> {
        self.cards.get(card_identifier).and_then(|c| c.holder.as_deref())
    }

    /// Email registered for a profile, if any.
    pub fn profile_email(&self, profile_number: &str) -> Option<&str> {
        self.profiles
            .get(profile_number)
            .and_then(|p| p.email_address.as_deref())
    }
}
