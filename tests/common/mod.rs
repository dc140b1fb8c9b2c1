//! Shared helpers for integration tests

#![allow(dead_code)]

use rand::Rng;
use rand::distributions::Alphanumeric;

use bank_ledger::Account;
use bank_ledger::core_types::SUPPORTED_CURRENCIES;
use bank_ledger::models::CreateAccountParams;
use bank_ledger::store::{LedgerStore, Queries};

pub fn random_string(n: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(n)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect()
}

pub fn random_owner() -> String {
    format!("owner-{}", random_string(8))
}

pub fn random_money() -> i64 {
    rand::thread_rng().gen_range(0..=1000)
}

pub fn random_currency() -> String {
    let i = rand::thread_rng().gen_range(0..SUPPORTED_CURRENCIES.len());
    SUPPORTED_CURRENCIES[i].to_string()
}

/// Create an account with a fresh random owner
pub async fn create_account(store: &dyn LedgerStore, balance: i64, currency: &str) -> Account {
    let mut conn = store.conn().await.unwrap();
    conn.create_account(CreateAccountParams {
        owner: random_owner(),
        balance,
        currency: currency.to_string(),
    })
    .await
    .unwrap()
}

pub async fn balance_of(store: &dyn LedgerStore, id: i64) -> i64 {
    let mut conn = store.conn().await.unwrap();
    conn.get_account(id).await.unwrap().balance
}
