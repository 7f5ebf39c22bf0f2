// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Status codes, categories and the crate-wide [`Result`] type.
//!
//! Every interruptible operation in this crate reports failure as an
//! [`Error`]: a [`StatusCode`] plus an optional static description. Status
//! codes are small integers scoped by a [`Category`]; two codes compare
//! equal only when both the integer and the category *identity* (a stable
//! 64-bit id) match, so equality works across compilation units without
//! relying on pointer identity.

use core::fmt;

/// A process-global family of status codes.
///
/// Categories are declared as `static`s and referenced by `&'static`
/// pointer; their [`id`](Self::id) is the stable identity used for
/// equality, never the name or the address.
pub struct Category {
    id: u64,
    name: &'static str,
    message: fn(u32) -> &'static str,
}

impl Category {
    /// Declares a new category.
    ///
    /// `id` must be unique among all categories linked into the process;
    /// collaborating crates pick their own random 64-bit constant.
    pub const fn new(id: u64, name: &'static str, message: fn(u32) -> &'static str) -> Self {
        Self { id, name, message }
    }

    /// The stable 64-bit identity of this category.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The printable name of this category.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The printable message for `code` within this category.
    pub fn message(&self, code: u32) -> &'static str {
        (self.message)(code)
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Category")
            .field("id", &format_args!("{:#018x}", self.id))
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An error kind: an integer code scoped by a [`Category`].
#[derive(Clone, Copy)]
pub struct StatusCode {
    code: u32,
    category: &'static Category,
}

impl StatusCode {
    /// Builds a status code from a raw code and its category.
    pub const fn new(code: u32, category: &'static Category) -> Self {
        Self { code, category }
    }

    /// The raw integer code.
    pub const fn code(&self) -> u32 {
        self.code
    }

    /// The category this code belongs to.
    pub const fn category(&self) -> &'static Category {
        self.category
    }

    /// The printable message for this code.
    pub fn message(&self) -> &'static str {
        self.category.message(self.code)
    }
}

impl PartialEq for StatusCode {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.category.id == other.category.id
    }
}

impl Eq for StatusCode {}

impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category.name(), self.message())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// An error: a [`StatusCode`] plus an optional static description.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Error {
    status: StatusCode,
    detail: Option<&'static str>,
}

impl Error {
    /// Builds an error carrying only a status code.
    pub const fn new(status: StatusCode) -> Self {
        Self {
            status,
            detail: None,
        }
    }

    /// Builds an error with an additional static description.
    pub const fn with_detail(status: StatusCode, detail: &'static str) -> Self {
        Self {
            status,
            detail: Some(detail),
        }
    }

    /// The status code of this error.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The printable description: the explicit detail if one was attached,
    /// the category message otherwise.
    pub fn message(&self) -> &'static str {
        match self.detail {
            Some(detail) => detail,
            None => self.status.message(),
        }
    }
}

impl From<StatusCode> for Error {
    fn from(status: StatusCode) -> Self {
        Self::new(status)
    }
}

impl PartialEq<StatusCode> for Error {
    fn eq(&self, other: &StatusCode) -> bool {
        self.status == *other
    }
}

impl PartialEq<Error> for StatusCode {
    fn eq(&self, other: &Error) -> bool {
        other.status == *self
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.status)?;
        if let Some(detail) = self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for Error {}

/// The result type used by every interruptible operation in this crate.
pub type Result<T> = core::result::Result<T, Error>;

fn core_message(code: u32) -> &'static str {
    match code {
        1 => "cancel",
        2 => "timeout",
        3 => "empty",
        4 => "full",
        5 => "closed",
        6 => "broken",
        7 => "other",
        _ => "undefined",
    }
}

/// The runtime's own category.
pub static CORE: Category = Category::new(0x409f_1f76_4285_1de6, "co_lib", core_message);

/// The operation was interrupted by a stop token.
pub const CANCEL: StatusCode = StatusCode::new(1, &CORE);
/// The operation's deadline elapsed.
pub const TIMEOUT: StatusCode = StatusCode::new(2, &CORE);
/// A non-suspending pop found no element.
pub const EMPTY: StatusCode = StatusCode::new(3, &CORE);
/// A non-suspending push found no space.
pub const FULL: StatusCode = StatusCode::new(4, &CORE);
/// The channel was closed.
pub const CLOSED: StatusCode = StatusCode::new(5, &CORE);
/// A shared producer was lost before producing a value.
pub const BROKEN: StatusCode = StatusCode::new(6, &CORE);
/// Unclassified failure.
pub const OTHER: StatusCode = StatusCode::new(7, &CORE);

fn net_message(code: u32) -> &'static str {
    match code {
        1 => "eof",
        2 => "wrong address",
        3 => "network error",
        _ => "undefined",
    }
}

/// The category reserved for the network transport collaborator.
pub static NET: Category = Category::new(0xf86a_a571_88f9_59fd, "co_net", net_message);

/// Codes reserved for the network transport collaborator.
pub mod net {
    use super::{NET, StatusCode};

    /// The peer closed the connection.
    pub const EOF: StatusCode = StatusCode::new(1, &NET);
    /// The address could not be parsed or resolved.
    pub const WRONG_ADDRESS: StatusCode = StatusCode::new(2, &NET);
    /// Unclassified network failure.
    pub const OTHER_NET: StatusCode = StatusCode::new(3, &NET);
}
