//! `define_port_error!`: typed port error enums with snake_case constructors.
//!
//! Each variant gets a constructor named after it (`Conflict { message }`
//! becomes `conflict(message)`, `TokenExpired` becomes `token_expired()`) and
//! a stable `kind()` label used as a structured log field.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* }) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }
        }
    };

    (@kind $variant:ident) => {
        ::paste::paste! { stringify!([<$variant:snake>]) }
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*

            /// Snake_case variant name for log fields.
            pub const fn kind(&self) -> &'static str {
                match self {
                    $(
                        Self::$variant { .. } => define_port_error!(@kind $variant),
                    )*
                }
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ledger {
        Savings,
    }

    impl std::fmt::Display for Ledger {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("savings")
        }
    }

    define_port_error! {
        pub enum WalletPortError {
            Locked => "wallet locked",
            Declined { message: String } => "declined: {message}",
            Frozen { ledger: Ledger } => "{ledger} ledger frozen",
            Throttled { message: String, retry_after_secs: u64 } =>
                "{message}; retry in {retry_after_secs}s",
        }
    }

    #[rstest]
    fn unit_variant_constructor_takes_no_arguments() {
        assert_eq!(WalletPortError::locked(), WalletPortError::Locked);
        assert_eq!(WalletPortError::locked().to_string(), "wallet locked");
    }

    #[rstest]
    fn string_fields_accept_str() {
        let err = WalletPortError::declined("insufficient funds");
        assert_eq!(err.to_string(), "declined: insufficient funds");
    }

    #[rstest]
    fn non_string_fields_keep_their_type() {
        assert_eq!(
            WalletPortError::frozen(Ledger::Savings).to_string(),
            "savings ledger frozen"
        );
        assert_eq!(
            WalletPortError::throttled("slow down", 30_u64).to_string(),
            "slow down; retry in 30s"
        );
    }

    #[rstest]
    #[case(WalletPortError::locked(), "locked")]
    #[case(WalletPortError::declined("no"), "declined")]
    #[case(WalletPortError::throttled("x", 1_u64), "throttled")]
    fn kind_is_the_snake_case_variant(#[case] err: WalletPortError, #[case] kind: &str) {
        assert_eq!(err.kind(), kind);
    }
}
