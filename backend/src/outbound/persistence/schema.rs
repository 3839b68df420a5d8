//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `migrations/` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Locally stored user details.
    users (id) {
        id -> Int8,
        /// National identity document number (positive).
        dni -> Int8,
        /// Contact phone number (positive).
        phone -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Accounts, one per user, keyed to an identity provider record.
    ///
    /// `user_id`, `auth_id`, `cvu`, and `alias` each carry a unique
    /// constraint named `accounts_<column>_key`.
    accounts (id) {
        id -> Int8,
        user_id -> Int8,
        auth_id -> Text,
        /// 22 ASCII digits, enforced by a CHECK constraint.
        cvu -> Varchar,
        alias -> Text,
        /// Non-negative balance in cents.
        balance_cents -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(accounts -> users (user_id));
diesel::allow_tables_to_appear_in_same_query!(accounts, users);
