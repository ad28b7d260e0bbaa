//! CLI entry point for `mailbot`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, error, info};
use std::{path::PathBuf, sync::atomic::Ordering};

use mailbot::{
    config::{parse_size, ClientSection},
    logger, ClientConfig, Config, ImapBackend, Job, LoggingConfig, Runner,
};

#[derive(Parser)]
#[command(name = "mailbot", version, about)]
struct Cli {
    /// Config files to read, shell patterns accepted
    #[arg(short, long, value_name = "PATTERN", num_args = 1..)]
    config: Vec<String>,

    /// Email address of the mailbox to poll, also used as login
    #[arg(
        value_name = "ADDRESS",
        required_unless_present = "config",
        conflicts_with = "config"
    )]
    address: Option<String>,

    /// IMAP server host
    #[arg(value_name = "MAILSERVER", conflicts_with = "config")]
    mailserver: Option<String>,

    /// Directory holding the database
    #[arg(value_name = "DBSERVER", conflicts_with = "config")]
    dbserver: Option<String>,

    /// Folder to poll
    #[arg(long, value_name = "FOLDER", conflicts_with = "config")]
    mailfolder: Option<String>,

    /// Mail password, prompted when missing
    #[arg(long, value_name = "PASSWORD", conflicts_with = "config")]
    mailpassword: Option<String>,

    /// Fetch every message instead of unseen ones only
    #[arg(long, conflicts_with_all = ["config", "interval"])]
    checkall: bool,

    /// Seconds between two polls, polls once when missing
    #[arg(short, long, value_name = "SECS", conflicts_with = "config")]
    interval: Option<u64>,

    /// Database user
    #[arg(long, value_name = "USER", conflicts_with = "config")]
    dbuser: Option<String>,

    /// Database password
    #[arg(long, value_name = "PASSWORD", conflicts_with = "config")]
    dbpassword: Option<String>,

    /// Database name
    #[arg(long, value_name = "NAME", conflicts_with = "config")]
    dbname: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Log file stem, `.log` is appended
    #[arg(long, value_name = "PATH")]
    logfile: Option<PathBuf>,

    /// Roll the log file over at start-up
    #[arg(long, requires = "logfile")]
    rotate: bool,

    /// Number of rolled over log files to keep
    #[arg(long, value_name = "COUNT")]
    backupcount: Option<usize>,

    /// Log file size triggering a roll over, like 10M
    #[arg(long, value_name = "SIZE")]
    maxbytes: Option<String>,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        if !self.config.is_empty() {
            return Config::from_paths(self.config.as_slice())
                .context("cannot load config files");
        }

        let address = self
            .address
            .clone()
            .context("cannot poll mailbox: no address given")?;
        let section = ClientSection {
            mailuser: Some(address.clone()),
            mailhost: self.mailserver.clone(),
            mailfolder: self.mailfolder.clone(),
            mailpassword: self.mailpassword.clone(),
            checkall: Some(self.checkall),
            interval: Some(self.interval.unwrap_or_default()),
            dbhost: self.dbserver.clone(),
            dbuser: self.dbuser.clone(),
            dbpassword: self.dbpassword.clone(),
            dbname: self.dbname.clone(),
            ..ClientSection::default()
        };
        let client = ClientConfig::from_section(address, section)?;

        Ok(Config {
            clients: vec![client],
            ..Config::default()
        })
    }

    /// Overrides the logging config with the logging flags.
    fn merge_logging(&self, logging: &mut LoggingConfig) -> Result<()> {
        logging.verbose |= self.verbose;
        if let Some(logfile) = self.logfile.as_ref() {
            logging.logfile = Some(logfile.clone());
        }
        logging.rotate |= self.rotate;
        if let Some(count) = self.backupcount {
            logging.backup_count = count;
        }
        if let Some(size) = self.maxbytes.as_ref() {
            logging.max_bytes = parse_size(size)?;
        }
        Ok(())
    }
}

/// Prompts for the password of every client lacking one.
fn prompt_passwords(clients: &mut [ClientConfig]) -> Result<()> {
    for client in clients.iter_mut().filter(|client| client.mail.lacks_passwd()) {
        let prompt = format!("Mail password for {}: ", client.mail.user);
        let passwd = rpassword::prompt_password(prompt)
            .with_context(|| format!("cannot read mail password of {}", client.mail.user))?;
        client.mail.password = Some(passwd);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = cli.load_config()?;
    cli.merge_logging(&mut config.logging)?;
    logger::init(&config.logging).context("cannot init logger")?;
    debug!("config: {:?}", config.logging);

    prompt_passwords(&mut config.clients)?;

    let jobs = config
        .clients
        .into_iter()
        .map(|client| {
            let every = client
                .interval
                .map(|interval| format!("every {}s", interval.as_secs()))
                .unwrap_or_else(|| String::from("once"));
            info!(
                "polling {} folder {} on {} {}",
                client.mail.user, client.mail.folder, client.mail.host, every
            );
            Job::new(client, ImapBackend)
        })
        .collect();
    let runner = Runner::new(jobs);

    let interrupted = runner.interrupt_flag();
    ctrlc::set_handler(move || interrupted.store(true, Ordering::Release))
        .context("cannot set interrupt handler")?;

    if let Err(err) = runner.run() {
        error!("{}", err);
        debug!("{:?}", err);
        bail!("{}", err);
    }

    Ok(())
}
