//! Declarative macro for flow step enums.
//!
//! - **`flow_steps!`** - Generates a step enum, its wire names and the
//!   `FlowStep` implementation tying it to a `FlowName`.
//!
//! # Usage
//!
//! ```ignore
//! flow_steps! {
//!     /// Steps of the agreement list flow.
//!     pub enum AgreementListStep for FlowName::AgreementList {
//!         MyList => "my_list",
//!         ViewDetail => "view_detail",
//!     }
//! }
//! ```
//!
//! The first variant is the flow's initial step.

/// Declares a step enum for one flow.
///
/// Generates:
/// - `ALL` - every variant in declaration order
/// - `NAMES` - the persisted step names in the same order
/// - `FlowStep` impl (`as_str`, `parse`, `FLOW`)
/// - `Display` using the persisted name
#[macro_export]
macro_rules! flow_steps {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident for $flow:path {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every step of the flow, initial step first.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Persisted names of every step, initial step first.
            pub const NAMES: &'static [&'static str] = &[$($wire),+];
        }

        impl $crate::domain::conversation::FlowStep for $name {
            const FLOW: $crate::domain::conversation::FlowName = $flow;

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            fn parse(step: &str) -> Option<Self> {
                match step {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::domain::conversation::FlowStep::as_str(self))
            }
        }
    };
}
