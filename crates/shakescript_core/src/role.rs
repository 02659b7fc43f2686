//! Role types for prompt messages.

use serde::{Deserialize, Serialize};

/// Who a prompt message speaks as.
///
/// # Examples
///
/// ```
/// use shakescript_core::Role;
///
/// assert_eq!(format!("{}", Role::System), "System");
/// assert_ne!(Role::User, Role::Assistant);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub enum Role {
    /// Standing instructions for the model
    System,
    /// Prompt text
    User,
    /// Prior model output
    Assistant,
}
