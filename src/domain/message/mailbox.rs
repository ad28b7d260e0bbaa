use mailparse::{MailAddr, MailAddrList, MailHeader, SingleInfo};
use std::fmt;

use crate::Limits;

/// Represents one address of an address-list header: an optional
/// display name and an email address.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Mailbox {
    pub name: Option<String>,
    pub addr: String,
}

impl Mailbox {
    pub fn new<N, A>(name: Option<N>, address: A) -> Self
    where
        N: ToString,
        A: ToString,
    {
        Self {
            name: name.map(|name| name.to_string()),
            addr: address.to_string(),
        }
    }

    pub fn new_nameless<A>(address: A) -> Self
    where
        A: ToString,
    {
        Self {
            name: None,
            addr: address.to_string(),
        }
    }

    /// Parses the first address of the given address-list header.
    /// Encoded words are parsed as tokens, so an encoded display name
    /// may hold commas.
    pub fn from_header(header: &MailHeader) -> Option<Self> {
        match mailparse::addrparse_header(header) {
            Ok(addrs) => Self::first_of(&addrs),
            Err(_) => Self::parse_first_chunk(&header.get_value()),
        }
    }

    /// Parses the first address of the given address-list value.
    /// Following addresses are dropped. When the whole list cannot be
    /// parsed, only its first comma-separated entry is. Returns `None`
    /// when no address can be found.
    pub fn parse_first<H: AsRef<str>>(value: H) -> Option<Self> {
        let value = value.as_ref();
        match mailparse::addrparse(value) {
            Ok(addrs) => Self::first_of(&addrs),
            Err(_) => Self::parse_first_chunk(value),
        }
    }

    fn parse_first_chunk(value: &str) -> Option<Self> {
        let chunk = value.split(',').next()?;
        let addrs = mailparse::addrparse(chunk).ok()?;
        Self::first_of(&addrs)
    }

    fn first_of(addrs: &MailAddrList) -> Option<Self> {
        let info = match addrs.first()? {
            MailAddr::Single(info) => info,
            MailAddr::Group(group) => group.addrs.first()?,
        };

        Some(Mailbox::from(info)).filter(|mbox| !mbox.addr.is_empty())
    }

    /// Truncates both the display name and the address to the name
    /// limit.
    pub fn truncate(self, limits: &Limits) -> Self {
        Self {
            name: self.name.map(|name| limits.truncate_name(&name)),
            addr: limits.truncate_name(&self.addr),
        }
    }
}

impl From<&SingleInfo> for Mailbox {
    fn from(info: &SingleInfo) -> Self {
        let name = info
            .display_name
            .as_ref()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty());
        Self::new(name, info.addr.trim())
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.addr),
            None => write!(f, "{}", self.addr),
        }
    }
}
