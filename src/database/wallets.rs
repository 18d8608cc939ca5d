use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use super::models::{Wallet, WalletTransaction, WalletTransactionKind};
use super::money::{from_cents, to_cents};

const WALLET_COLUMNS: &str = "user_id, venue_id, balance_cents, updated_at";

pub fn find_wallet(conn: &Connection, user_id: &str, venue_id: i64) -> Result<Option<Wallet>> {
    let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = ?1 AND venue_id = ?2");

    conn.query_row(&sql, params![user_id, venue_id], parse_wallet_row)
        .optional()
        .context("Failed to query wallet")
}

fn parse_wallet_row(row: &rusqlite::Row) -> rusqlite::Result<Wallet> {
    Ok(Wallet {
        user_id: row.get(0)?,
        venue_id: row.get(1)?,
        balance: from_cents(row.get(2)?),
        updated_at: row.get(3)?,
    })
}

/// Creates the wallet on first touch and adds `amount` to it.
pub fn add_to_balance(
    conn: &Connection,
    user_id: &str,
    venue_id: i64,
    amount: Decimal,
    now: NaiveDateTime,
) -> Result<Wallet> {
    let sql = format!(
        "INSERT INTO wallets (user_id, venue_id, balance_cents, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (user_id, venue_id) DO UPDATE SET balance_cents = balance_cents + excluded.balance_cents, updated_at = excluded.updated_at
         RETURNING {WALLET_COLUMNS}"
    );

    let cents = to_cents(amount)?;
    conn.query_row(&sql, params![user_id, venue_id, cents, now], parse_wallet_row)
        .context("Failed to credit wallet")
}

/// Subtracts `amount` only if the balance covers it; `None` means it did not.
pub fn subtract_from_balance(
    conn: &Connection,
    user_id: &str,
    venue_id: i64,
    amount: Decimal,
    now: NaiveDateTime,
) -> Result<Option<Wallet>> {
    let sql = format!(
        "UPDATE wallets SET balance_cents = balance_cents - ?1, updated_at = ?2
         WHERE user_id = ?3 AND venue_id = ?4 AND balance_cents >= ?1
         RETURNING {WALLET_COLUMNS}"
    );

    let cents = to_cents(amount)?;
    conn.query_row(&sql, params![cents, now, user_id, venue_id], parse_wallet_row)
        .optional()
        .context("Failed to debit wallet")
}

pub fn insert_transaction(
    conn: &Connection,
    user_id: &str,
    venue_id: i64,
    kind: WalletTransactionKind,
    amount: Decimal,
    booking_id: Option<i64>,
    created_at: NaiveDateTime,
) -> Result<WalletTransaction> {
    let sql = "INSERT INTO wallet_transactions (user_id, venue_id, kind, amount_cents, booking_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING id, user_id, venue_id, kind, amount_cents, booking_id, created_at";

    let cents = to_cents(amount)?;
    conn.query_row(
        sql,
        params![user_id, venue_id, kind, cents, booking_id, created_at],
        parse_transaction_row,
    )
    .context("Failed to record wallet transaction")
}

fn parse_transaction_row(row: &rusqlite::Row) -> rusqlite::Result<WalletTransaction> {
    Ok(WalletTransaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        venue_id: row.get(2)?,
        kind: row.get(3)?,
        amount: from_cents(row.get(4)?),
        booking_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn list_transactions(conn: &Connection, user_id: &str, venue_id: i64) -> Result<Vec<WalletTransaction>> {
    let sql = "SELECT id, user_id, venue_id, kind, amount_cents, booking_id, created_at FROM wallet_transactions WHERE user_id = ?1 AND venue_id = ?2 ORDER BY id";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![user_id, venue_id], parse_transaction_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}
