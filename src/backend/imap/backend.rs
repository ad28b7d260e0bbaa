//! IMAP backend module.
//!
//! This module contains the definition of the IMAP backend: how to
//! open an authenticated session and how to classify what goes wrong
//! while talking to the server.

use log::{debug, log_enabled, trace, Level};
use native_tls::{TlsConnector, TlsStream};
use std::{
    io::{self, ErrorKind, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    result,
};
use thiserror::Error;
use utf7_imap::encode_utf7_imap as encode_utf7;

use crate::{config, mask, Backend, MailConfig, MailSession, RawMessage};

/// Represents the data items fetched for each message.
pub const FETCH_QUERY: &str = "(UID RFC822 BODY[TEXT])";

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot resolve imap host {1}")]
    ResolveHostError(#[source] io::Error, String),
    #[error("cannot connect to imap server {1}: connection refused")]
    ConnectionRefusedError(#[source] io::Error, String),
    #[error("cannot connect to imap server {1}: host unreachable")]
    HostUnreachableError(#[source] io::Error, String),
    #[error("cannot connect to imap server {1}: unexpected socket error")]
    SocketError(#[source] io::Error, String),
    #[error("cannot create tls connector")]
    CreateTlsConnectorError(#[source] native_tls::Error),
    #[error("cannot connect to imap server {1}")]
    ConnectImapServerError(#[source] imap::Error, String),
    #[error("cannot login to imap server {2} as {1}")]
    LoginImapServerError(#[source] imap::Error, String, String, String),
    #[error("cannot select folder {1}")]
    SelectFolderError(#[source] imap::Error, String),
    #[error("cannot search messages with query: {1}")]
    SearchMsgsError(#[source] imap::Error, String),
    #[error("cannot fetch message {1}")]
    FetchMsgError(#[source] imap::Error, u32),
    #[error("cannot find message {0}")]
    FindMsgError(u32),
    #[error("cannot get body of message {0}")]
    GetMsgBodyError(u32),
    #[error("cannot close imap folder")]
    CloseFolderError(#[source] imap::Error),
    #[error("cannot logout from imap server")]
    LogoutError(#[source] imap::Error),

    #[error(transparent)]
    ConfigError(#[from] config::Error),
}

impl Error {
    /// Returns `true` when the error should stop the whole process
    /// instead of aborting the current cycle only.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SocketError(..))
    }

    /// Gets a hint to help the user fix the error, if any.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::ResolveHostError(_, host)
            | Self::ConnectionRefusedError(_, host)
            | Self::HostUnreachableError(_, host)
            | Self::SocketError(_, host)
            | Self::ConnectImapServerError(_, host) => {
                Some(format!("is host {} reachable?", host))
            }
            Self::LoginImapServerError(_, user, host, passwd) => Some(format!(
                "is password {} correct for {}@{}?",
                passwd, user, host
            )),
            Self::SelectFolderError(_, folder) => Some(format!("does folder {} exist?", folder)),
            _ => None,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub enum ImapSessionStream {
    Tls(TlsStream<TcpStream>),
    Tcp(TcpStream),
}

impl Read for ImapSessionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tls(stream) => stream.read(buf),
            Self::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for ImapSessionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tls(stream) => stream.write(buf),
            Self::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tls(stream) => stream.flush(),
            Self::Tcp(stream) => stream.flush(),
        }
    }
}

pub type ImapSession = imap::Session<ImapSessionStream>;

/// Opens sessions on real IMAP servers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImapBackend;

impl ImapBackend {
    fn resolve_host(config: &MailConfig) -> Result<()> {
        let host = &config.host;
        let mut addrs = (host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|err| Error::ResolveHostError(err, host.to_owned()))?;
        let addr = addrs.next().ok_or_else(|| {
            let err = io::Error::new(ErrorKind::NotFound, "no address found");
            Error::ResolveHostError(err, host.to_owned())
        })?;
        trace!("resolved imap host {} to {}", host, addr);
        Ok(())
    }

    fn classify_connect_error(err: imap::Error, host: &str) -> Error {
        match err {
            imap::Error::Io(err) if err.kind() == ErrorKind::ConnectionRefused => {
                Error::ConnectionRefusedError(err, host.to_owned())
            }
            imap::Error::Io(err)
                if matches!(
                    err.kind(),
                    ErrorKind::HostUnreachable
                        | ErrorKind::NetworkUnreachable
                        | ErrorKind::TimedOut
                ) =>
            {
                Error::HostUnreachableError(err, host.to_owned())
            }
            imap::Error::Io(err) => Error::SocketError(err, host.to_owned()),
            err => Error::ConnectImapServerError(err, host.to_owned()),
        }
    }
}

impl Backend for ImapBackend {
    type Session = ImapSession;

    fn connect(&self, config: &MailConfig) -> Result<Self::Session> {
        debug!("connecting to imap server {}:{}", config.host, config.port);
        Self::resolve_host(config)?;

        let builder = TlsConnector::builder()
            .danger_accept_invalid_certs(config.insecure)
            .danger_accept_invalid_hostnames(config.insecure)
            .build()
            .map_err(Error::CreateTlsConnectorError)?;

        let mut client_builder = imap::ClientBuilder::new(&config.host, config.port);

        let client = if config.ssl {
            client_builder.connect(|domain, tcp| {
                let connector = TlsConnector::connect(&builder, domain, tcp)?;
                Ok(ImapSessionStream::Tls(connector))
            })
        } else {
            client_builder.connect(|_, tcp| Ok(ImapSessionStream::Tcp(tcp)))
        }
        .map_err(|err| Self::classify_connect_error(err, &config.host))?;

        let passwd = config.passwd()?;
        let mut session = client.login(&config.user, &passwd).map_err(|res| {
            Error::LoginImapServerError(
                res.0,
                config.user.clone(),
                config.host.clone(),
                mask(&passwd),
            )
        })?;
        session.debug = log_enabled!(Level::Trace);
        debug!("logged in to imap server {} as {}", config.host, config.user);

        Ok(session)
    }
}

impl MailSession for ImapSession {
    fn select_folder(&mut self, folder: &str) -> Result<()> {
        let encoded = encode_utf7(folder.to_owned());
        let mbox = self
            .select(&encoded)
            .map_err(|err| Error::SelectFolderError(err, folder.to_owned()))?;
        debug!("selected folder {} ({} messages)", folder, mbox.exists);
        Ok(())
    }

    fn search_uids(&mut self, query: &str) -> Result<Vec<u32>> {
        let mut uids: Vec<u32> = self
            .uid_search(query)
            .map_err(|err| Error::SearchMsgsError(err, query.to_owned()))?
            .into_iter()
            .collect();
        uids.sort_unstable();
        Ok(uids)
    }

    fn fetch_message(&mut self, uid: u32) -> Result<RawMessage> {
        let fetches = self
            .uid_fetch(uid.to_string(), FETCH_QUERY)
            .map_err(|err| Error::FetchMsgError(err, uid))?;
        let fetch = fetches
            .iter()
            .find(|fetch| fetch.uid == Some(uid))
            .ok_or(Error::FindMsgError(uid))?;
        let body = fetch.body().ok_or(Error::GetMsgBodyError(uid))?;
        Ok(RawMessage::new(uid, body))
    }

    fn close_folder(&mut self) -> Result<()> {
        self.close().map_err(Error::CloseFolderError)
    }

    fn logout(&mut self) -> Result<()> {
        imap::Session::logout(self).map_err(Error::LogoutError)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Backend, MailConfig};

    use super::*;

    fn config(host: &str) -> MailConfig {
        MailConfig {
            host: host.into(),
            port: 993,
            ssl: true,
            user: "support@y.com".into(),
            password: Some("secret".into()),
            folder: "Inbox".into(),
            ..MailConfig::default()
        }
    }

    #[test]
    fn test_unresolvable_host_is_not_fatal() {
        let err = ImapBackend.connect(&config("nonexistent.invalid")).unwrap_err();
        assert!(matches!(err, Error::ResolveHostError(..)));
        assert!(!err.is_fatal());
        assert_eq!(
            Some("is host nonexistent.invalid reachable?".to_owned()),
            err.hint()
        );
    }

    #[test]
    fn test_classify_connect_error() {
        let refused = imap::Error::Io(io::Error::new(ErrorKind::ConnectionRefused, "refused"));
        let err = ImapBackend::classify_connect_error(refused, "mail.y.com");
        assert!(matches!(err, Error::ConnectionRefusedError(..)));
        assert!(!err.is_fatal());

        let reset = imap::Error::Io(io::Error::new(ErrorKind::ConnectionReset, "reset"));
        let err = ImapBackend::classify_connect_error(reset, "mail.y.com");
        assert!(matches!(err, Error::SocketError(..)));
        assert!(err.is_fatal());

        for kind in [
            ErrorKind::HostUnreachable,
            ErrorKind::NetworkUnreachable,
            ErrorKind::TimedOut,
        ] {
            let unreachable = imap::Error::Io(io::Error::new(kind, "unreachable"));
            let err = ImapBackend::classify_connect_error(unreachable, "mail.y.com");
            assert!(matches!(err, Error::HostUnreachableError(..)), "{:?}", kind);
            assert!(!err.is_fatal(), "{:?}", kind);
            assert_eq!(Some("is host mail.y.com reachable?".to_owned()), err.hint());
        }
    }

    #[test]
    fn test_login_hint_masks_passwd() {
        let err = Error::LoginImapServerError(
            imap::Error::Io(io::Error::new(ErrorKind::Other, "no")),
            "support@y.com".into(),
            "mail.y.com".into(),
            mask("secret"),
        );
        assert!(!err.is_fatal());
        assert_eq!(
            Some("is password s****t correct for support@y.com@mail.y.com?".to_owned()),
            err.hint()
        );
    }
}
